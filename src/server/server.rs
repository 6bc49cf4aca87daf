use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::logger::*;
use crate::settings::{Auth, Settings};
use anyhow::{Result, anyhow};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use std::time::Duration;

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub country_status_service: Arc<dyn CountryStatusService>,
    pool: Option<MySqlPool>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> Result<Self> {
        let server = match settings.store.backend.as_str() {
            "memory" => {
                warn!("using the in-memory store, nothing survives a restart");
                Self::in_memory(&settings.auth)?
            }
            "mysql" => {
                if settings.store.dsn.is_empty() {
                    return Err(anyhow!("store.dsn is required for the mysql backend"));
                }
                let pool = MySqlPoolOptions::new()
                    .max_connections(settings.store.max_connections)
                    .connect(&settings.store.dsn)
                    .await?;
                if settings.store.run_migrations {
                    sqlx::migrate!("./migrations").run(&pool).await?;
                    info!("migrations applied");
                }

                Self::assemble(
                    Arc::new(MySqlUserRepo::new(pool.clone())),
                    Arc::new(MySqlCountryStatusRepo::new(pool.clone())),
                    &settings.auth,
                    Some(pool),
                )?
            }
            other => return Err(anyhow!("Unknown store backend: {}", other)),
        };

        info!(backend = %settings.store.backend, "server started");
        Ok(server)
    }

    /// Everything in process memory. Used by the dev profile and by tests.
    pub fn in_memory(auth: &Auth) -> Result<Self> {
        Self::assemble(
            Arc::new(MemoryUserRepo::new()),
            Arc::new(MemoryCountryStatusRepo::new()),
            auth,
            None,
        )
    }

    fn assemble(
        user_repo: Arc<dyn UserRepo>,
        country_status_repo: Arc<dyn CountryStatusRepo>,
        auth: &Auth,
        pool: Option<MySqlPool>,
    ) -> Result<Self> {
        if auth.jwt_secret.is_empty() {
            return Err(anyhow!("auth.jwt_secret must be set"));
        }

        let credential_hasher: Arc<dyn CredentialHasher> =
            Arc::new(Argon2PasswordHasher::try_new(&Argon2Config {
                m_cost: auth.argon2_m_cost,
                t_cost: auth.argon2_t_cost,
                p_cost: auth.argon2_p_cost,
                max_concurrent: auth.max_concurrent_hashes,
            })?);
        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(JwtConfig {
            issuer: auth.issuer.clone(),
            audience: auth.audience.clone(),
            access_ttl: Duration::from_secs(auth.token_ttl_secs),
            signing_key: auth.jwt_secret.clone().into_bytes(),
        }));

        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            user_repo,
            credential_hasher,
            token_codec,
            AuthLimits {
                max_password_len: auth.max_password_len,
                ..AuthLimits::default()
            },
        ));
        let country_status_service: Arc<dyn CountryStatusService> =
            Arc::new(RealCountryStatusService::new(country_status_repo));

        Ok(Self {
            auth_service,
            country_status_service,
            pool,
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
