use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Without a key every report receives the fallback analysis.
    pub google_api_key: Option<String>,
    pub upload_dir: PathBuf,
    pub analysis_workers: usize,
    pub analysis_queue_capacity: usize,
    pub analysis_timeout_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            google_api_key: std::env::var("GOOGLE_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            upload_dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            analysis_workers: parse_env("ANALYSIS_WORKERS", 2)?,
            analysis_queue_capacity: parse_env("ANALYSIS_QUEUE_CAPACITY", 64)?,
            analysis_timeout_secs: parse_env("ANALYSIS_TIMEOUT_SECS", 120)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_uses_default_when_unset() {
        let value: usize = parse_env("LIFESCORE_TEST_UNSET_VARIABLE", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        std::env::set_var("LIFESCORE_TEST_BAD_PORT", "eighty");
        let result: Result<u16> = parse_env("LIFESCORE_TEST_BAD_PORT", 8080);
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("LIFESCORE_TEST_BAD_PORT"));
    }

    #[test]
    fn test_parse_env_trims_whitespace() {
        std::env::set_var("LIFESCORE_TEST_WORKERS", " 4 ");
        let value: usize = parse_env("LIFESCORE_TEST_WORKERS", 2).unwrap();
        assert_eq!(value, 4);
    }
}
