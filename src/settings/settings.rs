use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub auth: Auth,
    pub http: Http,
    pub log: Log,
    pub store: Store,
}

#[derive(Clone, Deserialize)]
pub struct Auth {
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
    pub token_ttl_secs: u64,
    pub argon2_m_cost: u32,
    pub argon2_t_cost: u32,
    pub argon2_p_cost: u32,
    pub max_concurrent_hashes: usize,
    pub max_password_len: usize,
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("jwt_secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("argon2_m_cost", &self.argon2_m_cost)
            .field("argon2_t_cost", &self.argon2_t_cost)
            .field("argon2_p_cost", &self.argon2_p_cost)
            .field("max_concurrent_hashes", &self.max_concurrent_hashes)
            .field("max_password_len", &self.max_password_len)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    pub tls: Option<Tls>,
}

#[derive(Debug, Deserialize)]
pub struct Tls {
    pub cert_path: String,
    pub key_path: String,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Deserialize)]
pub struct Store {
    pub backend: String, // "memory" or "mysql"
    pub dsn: String,
    pub max_connections: u32,
    pub run_migrations: bool,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("backend", &self.backend)
            .field("dsn", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .field("run_migrations", &self.run_migrations)
            .finish()
    }
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Environment overrides look like `TRAVELMAP__AUTH__JWT_SECRET`.
const ENV_PREFIX: &str = "TRAVELMAP";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .set_default("http.address", "127.0.0.1:3000")?
        .set_default("log.filter", "info")?
        .set_default("store.backend", "memory")?
        .set_default("store.dsn", "")?
        .set_default("store.max_connections", 10)?
        .set_default("store.run_migrations", true)?
        .set_default("auth.issuer", "travelmap.auth")?
        .set_default("auth.audience", "travelmap-client")?
        .set_default("auth.token_ttl_secs", 3600)?
        .set_default("auth.argon2_m_cost", 19456)?
        .set_default("auth.argon2_t_cost", 2)?
        .set_default("auth.argon2_p_cost", 1)?
        .set_default("auth.max_concurrent_hashes", 4)?
        .set_default("auth.max_password_len", 1024)?
        .add_source(File::with_name(path))
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
