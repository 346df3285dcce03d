use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

const PLACEHOLDER_SECRETS: &[&str] = &["", "changeme", "change-me", "dev-secret-change-me", "secret"];

/// Process configuration, read once at startup from `LINKUP_*` variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("LINKUP_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = lookup("LINKUP_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("LINKUP_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let db_path = PathBuf::from(lookup("LINKUP_DB_PATH").unwrap_or_else(|| "linkup.db".into()));

        let jwt_secret = lookup("LINKUP_JWT_SECRET").context("LINKUP_JWT_SECRET is not set")?;
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.trim()) {
            bail!("LINKUP_JWT_SECRET is a placeholder value, set a real secret");
        }

        let ttl_days: i64 = lookup("LINKUP_TOKEN_TTL_DAYS")
            .unwrap_or_else(|| "7".into())
            .parse()
            .context("LINKUP_TOKEN_TTL_DAYS must be an integer")?;
        if ttl_days <= 0 {
            bail!("LINKUP_TOKEN_TTL_DAYS must be positive");
        }

        Ok(Self {
            addr,
            db_path,
            jwt_secret,
            token_ttl: chrono::Duration::days(ttl_days),
        })
    }
}
