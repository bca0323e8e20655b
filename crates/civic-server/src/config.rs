use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret-dev-civic-drc",
];

/// Ten years.
const MAX_TOKEN_TTL_DAYS: i64 = 3650;

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub moderation_url: String,
    pub moderation_disabled: bool,
    pub moderation_timeout: Duration,
    pub bootstrap_admin: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = var("CIVIC_JWT_SECRET").unwrap_or_default();
        if jwt_secret.trim().is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("CIVIC_JWT_SECRET is unset or still a placeholder; set it in .env and restart");
        }

        let ttl_days: i64 = get("CIVIC_TOKEN_TTL_DAYS", "7")
            .parse()
            .context("CIVIC_TOKEN_TTL_DAYS must be a whole number of days")?;
        if !(1..=MAX_TOKEN_TTL_DAYS).contains(&ttl_days) {
            bail!("CIVIC_TOKEN_TTL_DAYS must be between 1 and {MAX_TOKEN_TTL_DAYS}");
        }

        let host = get("CIVIC_HOST", "0.0.0.0");
        let port: u16 = get("CIVIC_PORT", "3000")
            .parse()
            .context("CIVIC_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .context("CIVIC_HOST/CIVIC_PORT do not form a socket address")?;

        let timeout_ms: u64 = get("CIVIC_MODERATION_TIMEOUT_MS", "5000")
            .parse()
            .context("CIVIC_MODERATION_TIMEOUT_MS must be milliseconds")?;

        let moderation_disabled = matches!(
            var("CIVIC_MODERATION_DISABLED").as_deref().map(str::trim),
            Some("1") | Some("true")
        );

        let bootstrap_admin = var("CIVIC_BOOTSTRAP_ADMIN")
            .map(|email| email.trim().to_lowercase())
            .filter(|email| !email.is_empty());

        Ok(Self {
            jwt_secret,
            token_ttl: chrono::Duration::days(ttl_days),
            db_path: get("CIVIC_DB_PATH", "civic.db").into(),
            addr,
            moderation_url: get("CIVIC_MODERATION_URL", "http://localhost:5001"),
            moderation_disabled,
            moderation_timeout: Duration::from_millis(timeout_ms),
            bootstrap_admin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("CIVIC_JWT_SECRET", "a-real-secret")]).unwrap();
        assert_eq!(config.token_ttl, chrono::Duration::days(7));
        assert_eq!(config.db_path, PathBuf::from("civic.db"));
        assert_eq!(config.addr.port(), 3000);
        assert_eq!(config.moderation_url, "http://localhost:5001");
        assert!(!config.moderation_disabled);
        assert_eq!(config.moderation_timeout, Duration::from_secs(5));
        assert!(config.bootstrap_admin.is_none());
    }

    #[test]
    fn missing_or_placeholder_secret_is_fatal() {
        assert!(load(&[]).is_err());
        assert!(load(&[("CIVIC_JWT_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("CIVIC_JWT_SECRET", "a-real-secret"),
            ("CIVIC_PORT", "8080"),
            ("CIVIC_MODERATION_DISABLED", "true"),
            ("CIVIC_BOOTSTRAP_ADMIN", " Admin@Civic.cd "),
            ("CIVIC_TOKEN_TTL_DAYS", "30"),
        ])
        .unwrap();
        assert_eq!(config.addr.port(), 8080);
        assert!(config.moderation_disabled);
        assert_eq!(config.bootstrap_admin.as_deref(), Some("admin@civic.cd"));
        assert_eq!(config.token_ttl, chrono::Duration::days(30));

        assert!(load(&[("CIVIC_JWT_SECRET", "s"), ("CIVIC_PORT", "http")]).is_err());
    }

    #[test]
    fn token_ttl_is_bounded() {
        let ttl = |days: &str| load(&[("CIVIC_JWT_SECRET", "s"), ("CIVIC_TOKEN_TTL_DAYS", days)]);
        assert!(ttl("0").is_err());
        assert!(ttl("-3").is_err());
        assert!(ttl("100000000").is_err());
        assert_eq!(ttl("3650").unwrap().token_ttl, chrono::Duration::days(3650));
    }
}
