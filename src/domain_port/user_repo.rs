use crate::application_port::*;
use crate::domain_model::*;

#[derive(Debug, Clone)]
pub struct UserCredentialsRecord {
    pub user_id: UserId,
    pub username: String,
    pub password_hash: String,
}

#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    /// Insert a user. A taken username fails with [`AuthError::UsernameTaken`].
    async fn create(&self, username: &str, password_hash: &str) -> Result<UserId, AuthError>;

    /// Fetch credentials by username (for login).
    async fn get_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserCredentialsRecord>, AuthError>;

    async fn username_exists(&self, username: &str) -> Result<bool, AuthError>;

    async fn id_exists(&self, user_id: UserId) -> Result<bool, AuthError>;
}
