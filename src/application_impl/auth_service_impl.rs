use crate::application_port::*;
use crate::domain_model::UserId;
use crate::domain_port::UserRepo;
use crate::logger::*;
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Argon2Config {
    /// Memory cost in KiB.
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
    /// Upper bound on hashes computed at the same time across all requests.
    pub max_concurrent: usize,
}

/// Argon2id hashing on the blocking pool, throttled by a semaphore so a burst
/// of signups or logins cannot occupy every core.
pub struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
    permits: Arc<Semaphore>,
}

impl Argon2PasswordHasher {
    pub fn try_new(cfg: &Argon2Config) -> Result<Self, AuthError> {
        let params = Params::new(cfg.m_cost, cfg.t_cost, cfg.p_cost, None)
            .map_err(|e| AuthError::InternalError(format!("argon2 params: {e}")))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            permits: Arc::new(Semaphore::new(cfg.max_concurrent.max(1))),
        })
    }

    async fn run_blocking<T, F>(&self, job: F) -> Result<T, AuthError>
    where
        F: FnOnce(Argon2<'static>) -> Result<T, AuthError> + Send + 'static,
        T: Send + 'static,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| AuthError::InternalError(e.to_string()))?;
        let argon2 = self.argon2.clone();
        tokio::task::spawn_blocking(move || job(argon2))
            .await
            .map_err(|e| AuthError::InternalError(format!("hashing task: {e}")))?
    }
}

#[async_trait::async_trait]
impl CredentialHasher for Argon2PasswordHasher {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_owned();
        self.run_blocking(move |argon2| {
            let salt = SaltString::generate(&mut OsRng);
            let hash = argon2
                .hash_password(password.as_bytes(), &salt)
                .map_err(|e| AuthError::InternalError(e.to_string()))?
                .to_string();
            Ok(hash)
        })
        .await
    }

    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, AuthError> {
        let password = password.to_owned();
        let password_hash = password_hash.to_owned();
        self.run_blocking(move |argon2| {
            let parsed = PasswordHash::new(&password_hash)
                .map_err(|e| AuthError::InternalError(format!("invalid PHC hash: {e}")))?;

            match argon2.verify_password(password.as_bytes(), &parsed) {
                Ok(()) => Ok(true),
                Err(argon2::password_hash::Error::Password) => Ok(false),
                Err(e) => Err(AuthError::InternalError(format!("verify error: {e}"))),
            }
        })
        .await
    }
}

#[derive(Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub signing_key: Vec<u8>,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_ttl", &self.access_ttl)
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    sub: String, // user id as string
    #[serde(rename = "userId")]
    user_id: i64,
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
    jti: String, // informational only, nothing is revoked
}

fn encode_access(uid: UserId, cfg: &JwtConfig) -> Result<(String, DateTime<Utc>), AuthError> {
    let ttl = chrono::Duration::from_std(cfg.access_ttl)
        .map_err(|e| AuthError::InternalError(format!("token ttl: {e}")))?;
    let iat_dt = Utc::now();
    let exp_dt = iat_dt + ttl;
    let claims = AccessClaims {
        sub: uid.to_string(),
        user_id: uid.0,
        exp: exp_dt.timestamp(),
        iat: iat_dt.timestamp(),
        iss: cfg.issuer.clone(),
        aud: cfg.audience.clone(),
        jti: Uuid::new_v4().to_string(),
    };
    let token = encode(
        &Header::new(jsonwebtoken::Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&cfg.signing_key),
    )
    .map_err(|e| AuthError::InternalError(e.to_string()))?;
    Ok((token, exp_dt))
}

fn decode_access(token: &str, cfg: &JwtConfig) -> Result<AccessClaims, AuthError> {
    let mut v = Validation::new(jsonwebtoken::Algorithm::HS256);
    v.validate_exp = true;
    v.set_audience(&[cfg.audience.clone()]);
    v.set_issuer(&[cfg.issuer.clone()]);
    v.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
    let data = decode::<AccessClaims>(token, &DecodingKey::from_secret(&cfg.signing_key), &v)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid,
        })?;
    Ok(data.claims)
}

pub struct JwtHs256Codec {
    cfg: JwtConfig,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig) -> Self {
        JwtHs256Codec { cfg }
    }

    #[inline]
    fn parse_user_id(claims: &AccessClaims) -> Result<UserId, AuthError> {
        let id = claims
            .sub
            .parse::<UserId>()
            .map_err(|_| AuthError::TokenInvalid)?;
        if id.0 != claims.user_id {
            return Err(AuthError::TokenInvalid);
        }
        Ok(id)
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtHs256Codec {
    async fn issue_access_token(
        &self,
        user: UserId,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError> {
        let (token, exp_dt) = encode_access(user, &self.cfg)?;
        Ok((AccessToken(token), exp_dt))
    }

    async fn verify_access_token(
        &self,
        token: &AccessToken,
    ) -> Result<TokenVerifyResult, AuthError> {
        let claims = decode_access(&token.0, &self.cfg)?;
        let user_id = Self::parse_user_id(&claims)?;
        Ok(TokenVerifyResult {
            user_id,
            jti: Some(claims.jti),
        })
    }
}

#[derive(Debug, Clone)]
pub struct AuthLimits {
    pub max_username_len: usize,
    /// In bytes. Bounds the work a single request can ask the hasher for.
    pub max_password_len: usize,
}

impl Default for AuthLimits {
    fn default() -> Self {
        Self {
            max_username_len: 64,
            max_password_len: 1024,
        }
    }
}

pub struct RealAuthService {
    user_repo: Arc<dyn UserRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_codec: Arc<dyn TokenCodec>,
    limits: AuthLimits,
}

impl RealAuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
        limits: AuthLimits,
    ) -> Self {
        Self {
            user_repo,
            credential_hasher,
            token_codec,
            limits,
        }
    }

    fn validate_signup(&self, username: &str, password: &str) -> Result<(), AuthError> {
        if username.trim().is_empty() {
            return Err(AuthError::InvalidInput("username is required".to_string()));
        }
        if username.chars().count() > self.limits.max_username_len {
            return Err(AuthError::InvalidInput(format!(
                "username must be at most {} characters",
                self.limits.max_username_len
            )));
        }
        if password.is_empty() {
            return Err(AuthError::InvalidInput("password is required".to_string()));
        }
        if password.len() > self.limits.max_password_len {
            return Err(AuthError::InvalidInput(format!(
                "password must be at most {} bytes",
                self.limits.max_password_len
            )));
        }
        Ok(())
    }

    async fn open_session(&self, user_id: UserId) -> Result<AuthSession, AuthError> {
        let (access_token, expires_at) = self.token_codec.issue_access_token(user_id).await?;
        Ok(AuthSession {
            user_id,
            access_token,
            expires_at,
        })
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn signup(&self, request: SignupInput) -> Result<AuthSession, AuthError> {
        let SignupInput { username, password } = request;

        self.validate_signup(&username, &password)?;

        if self.user_repo.username_exists(&username).await? {
            return Err(AuthError::UsernameTaken);
        }

        let password_hash = self.credential_hasher.hash_password(&password).await?;
        // A concurrent signup may have taken the name since the check above;
        // the repo reports that as UsernameTaken too.
        let user_id = self.user_repo.create(&username, &password_hash).await?;
        info!(%user_id, "user signed up");

        self.open_session(user_id).await
    }

    async fn login(&self, request: LoginInput) -> Result<AuthSession, AuthError> {
        let LoginInput { username, password } = request;

        if password.len() > self.limits.max_password_len {
            return Err(AuthError::InvalidCredentials);
        }

        let rec = self
            .user_repo
            .get_by_username(&username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let ok = self
            .credential_hasher
            .verify_password(&password, &rec.password_hash)
            .await?;
        if !ok {
            debug!(user_id = %rec.user_id, "password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        self.open_session(rec.user_id).await
    }

    async fn verify_token(&self, token: &str) -> Result<UserId, AuthError> {
        let verify_result = self
            .token_codec
            .verify_access_token(&AccessToken(token.to_string()))
            .await?;

        if !self.user_repo.id_exists(verify_result.user_id).await? {
            return Err(AuthError::UserNotFound);
        }

        trace!(user_id = %verify_result.user_id, jti = ?verify_result.jti, "token verified");
        Ok(verify_result.user_id)
    }
}
