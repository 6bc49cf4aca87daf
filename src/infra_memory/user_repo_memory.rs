use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Users {
    last_id: i64,
    by_username: HashMap<String, UserCredentialsRecord>,
}

#[derive(Default)]
pub struct MemoryUserRepo {
    users: Mutex<Users>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Users>, AuthError> {
        self.users
            .lock()
            .map_err(|_| AuthError::Store("user table lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl UserRepo for MemoryUserRepo {
    async fn create(&self, username: &str, password_hash: &str) -> Result<UserId, AuthError> {
        let mut users = self.lock()?;
        if users.by_username.contains_key(username) {
            return Err(AuthError::UsernameTaken);
        }

        users.last_id += 1;
        let user_id = UserId(users.last_id);
        users.by_username.insert(
            username.to_string(),
            UserCredentialsRecord {
                user_id,
                username: username.to_string(),
                password_hash: password_hash.to_string(),
            },
        );
        Ok(user_id)
    }

    async fn get_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserCredentialsRecord>, AuthError> {
        Ok(self.lock()?.by_username.get(username).cloned())
    }

    async fn username_exists(&self, username: &str) -> Result<bool, AuthError> {
        Ok(self.lock()?.by_username.contains_key(username))
    }

    async fn id_exists(&self, user_id: UserId) -> Result<bool, AuthError> {
        Ok(self
            .lock()?
            .by_username
            .values()
            .any(|record| record.user_id == user_id))
    }
}
