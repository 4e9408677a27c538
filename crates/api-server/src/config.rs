//! Server configuration, read once from the environment at startup.

use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_PORT: u16 = 8081;
const DEFAULT_DATA_DIR: &str = ".voyage-data";
const DEFAULT_TOKEN_TTL_SECONDS: i64 = 8 * 60 * 60;
const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 120;
const DEV_JWT_SECRET: &str = "dev-jwt-secret-change-me";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_seconds: i64,
    /// Bootstrap super admin, created on startup when both are set.
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    /// Requests per client per minute; 0 disables limiting.
    pub rate_limit_per_minute: u32,
    /// Key the limiter on `X-Forwarded-For`; only safe behind a proxy that sets it.
    pub trust_forwarded_for: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            admin_email: None,
            admin_password: None,
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
            trust_forwarded_for: false,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let jwt_secret = env_string("VOYAGE_JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("VOYAGE_JWT_SECRET is not set; using the development secret");
            defaults.jwt_secret.clone()
        });

        Self {
            port: env_parse("PORT", defaults.port),
            data_dir: env_string("VOYAGE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            jwt_secret,
            token_ttl_seconds: env_parse("VOYAGE_TOKEN_TTL_SECONDS", defaults.token_ttl_seconds),
            admin_email: env_string("VOYAGE_ADMIN_EMAIL"),
            admin_password: env_string("VOYAGE_ADMIN_PASSWORD"),
            rate_limit_per_minute: env_parse(
                "VOYAGE_RATE_LIMIT_PER_MINUTE",
                defaults.rate_limit_per_minute,
            ),
            trust_forwarded_for: env_parse(
                "VOYAGE_TRUST_FORWARDED_FOR",
                defaults.trust_forwarded_for,
            ),
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parse<T: FromStr + Copy + std::fmt::Display>(name: &str, default: T) -> T {
    match env_string(name) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}, using {}", name, raw, default);
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8081);
        assert_eq!(config.token_ttl_seconds, 8 * 3600);
        assert_eq!(config.rate_limit_per_minute, 120);
        assert_eq!(config.data_dir, PathBuf::from(".voyage-data"));
        assert!(!config.trust_forwarded_for);
    }

    #[test]
    fn invalid_numbers_fall_back() {
        std::env::set_var("VOYAGE_TEST_BAD_PORT", "not-a-port");
        assert_eq!(env_parse("VOYAGE_TEST_BAD_PORT", 8081u16), 8081);
        std::env::set_var("VOYAGE_TEST_GOOD_PORT", " 9000 ");
        assert_eq!(env_parse("VOYAGE_TEST_GOOD_PORT", 8081u16), 9000);
    }
}
