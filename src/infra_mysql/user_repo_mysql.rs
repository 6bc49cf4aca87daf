use super::util::{is_dup_key, last_insert_id};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

pub struct MySqlUserRepo {
    pool: MySqlPool,
}

impl MySqlUserRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserRepo { pool }
    }

    fn row_to_record(row: MySqlRow) -> Result<UserCredentialsRecord, AuthError> {
        let user_id: UserId = row
            .try_get("id")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let username: String = row
            .try_get("username")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let password_hash: String = row
            .try_get("password_hash")
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(UserCredentialsRecord {
            user_id,
            username,
            password_hash,
        })
    }
}

#[async_trait::async_trait]
impl UserRepo for MySqlUserRepo {
    async fn create(&self, username: &str, password_hash: &str) -> Result<UserId, AuthError> {
        let res = sqlx::query(
            r#"
INSERT INTO app_user (username, password_hash)
VALUES (?, ?)
"#,
        )
        .bind(username)
        .bind(password_hash)
        .execute(&self.pool)
        .await;

        match res {
            Ok(done) => last_insert_id(done.last_insert_id())
                .map(UserId)
                .map_err(AuthError::Store),
            Err(e) if is_dup_key(&e) => Err(AuthError::UsernameTaken),
            Err(e) => Err(AuthError::Store(format!("user insert: {e}"))),
        }
    }

    async fn get_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserCredentialsRecord>, AuthError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT id, username, password_hash
FROM app_user
WHERE username = ?
"#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        row_opt.map(Self::row_to_record).transpose()
    }

    async fn username_exists(&self, username: &str) -> Result<bool, AuthError> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM app_user WHERE username = ?"#)
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(count > 0)
    }

    async fn id_exists(&self, user_id: UserId) -> Result<bool, AuthError> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(1) FROM app_user WHERE id = ?"#)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(count > 0)
    }
}
