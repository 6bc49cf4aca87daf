//! Shared fixtures for unit tests.

use crate::application_impl::{Argon2Config, JwtConfig};
use crate::settings::Auth;
use std::time::Duration;

/// The smallest parameters argon2 accepts; fast enough for tests.
pub fn cheap_argon2() -> Argon2Config {
    Argon2Config {
        m_cost: 8,
        t_cost: 1,
        p_cost: 1,
        max_concurrent: 2,
    }
}

pub fn test_jwt() -> JwtConfig {
    JwtConfig {
        issuer: "travelmap.test".to_string(),
        audience: "travelmap-client".to_string(),
        access_ttl: Duration::from_secs(3600),
        signing_key: b"test-signing-key".to_vec(),
    }
}

pub fn test_auth_settings() -> Auth {
    Auth {
        jwt_secret: "test-signing-key".to_string(),
        issuer: "travelmap.test".to_string(),
        audience: "travelmap-client".to_string(),
        token_ttl_secs: 3600,
        argon2_m_cost: 8,
        argon2_t_cost: 1,
        argon2_p_cost: 1,
        max_concurrent_hashes: 2,
        max_password_len: 1024,
    }
}
