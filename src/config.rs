use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use dotenvy::dotenv;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub api_prefix: String,

    // Rate limiting
    pub rate_attendance_per_min: u32,
    pub rate_admin_per_min: u32,

    // Face oracle
    pub face_oracle_addr: String,
    pub face_oracle_timeout_ms: u64,

    // Background work
    pub sweep_interval_secs: u64,
    pub sweep_workers: usize,
    pub notify_concurrency: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        Ok(Self {
            server_addr: required(&lookup, "SERVER_ADDR")?,
            database_url: required(&lookup, "DATABASE_URL")?,
            jwt_secret: required(&lookup, "JWT_SECRET")?,
            api_prefix: lookup("API_PREFIX").unwrap_or_else(|| "/api".to_string()),

            rate_attendance_per_min: parsed(&lookup, "RATE_ATTENDANCE_PER_MIN", 120)?,
            rate_admin_per_min: parsed(&lookup, "RATE_ADMIN_PER_MIN", 300)?,

            face_oracle_addr: lookup("FACE_ORACLE_ADDR").unwrap_or_else(|| "127.0.0.1:5000".to_string()),
            face_oracle_timeout_ms: parsed(&lookup, "FACE_ORACLE_TIMEOUT_MS", 10_000)?,

            sweep_interval_secs: parsed(&lookup, "SWEEP_INTERVAL_SECS", 3600)?,
            sweep_workers: parsed(&lookup, "SWEEP_WORKERS", 4)?,
            notify_concurrency: parsed(&lookup, "NOTIFY_CONCURRENCY", 16)?,
        })
    }

    pub fn face_oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.face_oracle_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<String> {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("{key} must be set"))
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display + Send + Sync + 'static,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| anyhow!("{e}"))
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("SERVER_ADDR", "0.0.0.0:8080"),
        ("DATABASE_URL", "mysql://root@localhost/hrm"),
        ("JWT_SECRET", "secret"),
    ];

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.api_prefix, "/api");
        assert_eq!(config.rate_attendance_per_min, 120);
        assert_eq!(config.rate_admin_per_min, 300);
        assert_eq!(config.face_oracle_addr, "127.0.0.1:5000");
        assert_eq!(config.face_oracle_timeout(), Duration::from_secs(10));
        assert_eq!(config.sweep_interval(), Duration::from_secs(3600));
        assert_eq!(config.sweep_workers, 4);
        assert_eq!(config.notify_concurrency, 16);
    }

    #[test]
    fn missing_required_variable_is_named() {
        let err = Config::from_lookup(lookup(&REQUIRED[..2])).err().unwrap();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn invalid_number_names_the_variable() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SWEEP_WORKERS", "many"));
        let err = Config::from_lookup(lookup(&pairs)).err().unwrap();
        assert!(err.to_string().contains("SWEEP_WORKERS"));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("FACE_ORACLE_TIMEOUT_MS", "2500"));
        pairs.push(("API_PREFIX", "/api/v1"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.face_oracle_timeout(), Duration::from_millis(2500));
        assert_eq!(config.api_prefix, "/api/v1");
    }
}
