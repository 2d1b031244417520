//! Application configuration loaded from environment variables.

use crate::errors::{ApiError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Interface the REST API binds to
    pub api_host: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// How often (in seconds) funded deals past their deadline are settled
    pub settle_interval_secs: u64,
    /// Allow any origin, so a browser UI served elsewhere can call the API
    pub cors_permissive: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup; missing keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settle_interval_secs = parse(&lookup, "SETTLE_INTERVAL_SECS", "60")?;
        if settle_interval_secs == 0 {
            return Err(ApiError::Config(
                "SETTLE_INTERVAL_SECS must be at least 1".to_string(),
            ));
        }

        Ok(Config {
            api_host: lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            api_port: parse(&lookup, "API_PORT", "3001")?,
            settle_interval_secs,
            cors_permissive: parse(&lookup, "CORS_PERMISSIVE", "true")?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

fn parse<F, T>(lookup: &F, key: &str, default: &str) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .unwrap_or_else(|| default.to_string())
        .trim()
        .parse()
        .map_err(|_| ApiError::Config(format!("Invalid {key}")))
}
