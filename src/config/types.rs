use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:///app.db";
pub const DEFAULT_SECRET_KEY: &str = "dev-key-change-in-production";
pub const DEFAULT_PORT: u16 = 3000;

/// Keys accepted in the optional YAML config file. Every key is optional;
/// environment variables take precedence over the file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub database_url: Option<String>,
    pub secret_key: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub startup_retries: Option<u32>,
    pub retry_delay_secs: Option<u64>,
    pub auto_migrate: Option<bool>,
    pub seed: Option<bool>,
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    pub secret_key: String,
    pub host: String,
    pub port: u16,
    /// Attempts for startup initialization; regular requests never retry.
    pub startup_retries: u32,
    pub retry_delay: Duration,
    pub auto_migrate: bool,
    /// Create the default accounts and sample records at startup.
    pub seed: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            secret_key: DEFAULT_SECRET_KEY.to_string(),
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            startup_retries: 3,
            retry_delay: Duration::from_secs(2),
            auto_migrate: true,
            seed: true,
        }
    }
}

impl AppConfig {
    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == DEFAULT_SECRET_KEY
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
