use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::types::{AppConfig, FileConfig};

/// Checked in order; the first one set wins.
pub const DATABASE_URL_VARS: [&str; 4] = ["DATABASE_URL", "POSTGRESQL_URL", "PG_URL", "POSTGRES_URL"];

/// Load configuration from an optional YAML file, then apply the process
/// environment on top.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let file = match path {
        Some(p) => read_file(p)?,
        None => FileConfig::default(),
    };
    Ok(resolve(file, |name| std::env::var(name).ok()))
}

pub fn read_file(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: FileConfig = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?;
    Ok(config)
}

/// Merge file values, environment lookups and defaults, in that order of
/// increasing precedence: env > file > default.
pub fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> AppConfig {
    let defaults = AppConfig::default();
    let env = |name: &str| env(name).filter(|v| !v.trim().is_empty());

    let database_url = DATABASE_URL_VARS
        .iter()
        .find_map(|name| {
            env(name).inspect(|_| tracing::debug!(variable = name, "Database URL from environment"))
        })
        .or(file.database_url)
        .map(|url| normalize_database_url(&url))
        .unwrap_or(defaults.database_url);

    AppConfig {
        database_url,
        secret_key: env("SECRET_KEY")
            .or(file.secret_key)
            .unwrap_or(defaults.secret_key),
        host: env("HOST").or(file.host).unwrap_or(defaults.host),
        port: env("PORT")
            .and_then(|v| v.trim().parse().ok())
            .or(file.port)
            .unwrap_or(defaults.port),
        startup_retries: env("DB_INIT_RETRIES")
            .and_then(|v| v.trim().parse().ok())
            .or(file.startup_retries)
            .unwrap_or(defaults.startup_retries),
        retry_delay: env("DB_INIT_RETRY_DELAY_SECS")
            .and_then(|v| v.trim().parse().ok())
            .or(file.retry_delay_secs)
            .map(Duration::from_secs)
            .unwrap_or(defaults.retry_delay),
        auto_migrate: env("AUTO_MIGRATE")
            .and_then(|v| parse_bool(&v))
            .or(file.auto_migrate)
            .unwrap_or(defaults.auto_migrate),
        seed: env("SEED_DATA")
            .and_then(|v| parse_bool(&v))
            .or(file.seed)
            .unwrap_or(defaults.seed),
    }
}

/// Hosting platforms hand out `postgres://`; normalize to `postgresql://`.
pub fn normalize_database_url(raw: &str) -> String {
    let raw = raw.trim();
    match raw.strip_prefix("postgres://") {
        Some(rest) => format!("postgresql://{}", rest),
        None => raw.to_string(),
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_without_env_or_file() {
        let config = resolve(FileConfig::default(), env_of(&[]));
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.database_url, "sqlite:///app.db");
        assert!(config.uses_default_secret());
    }

    #[test]
    fn database_url_priority_and_rewrite() {
        let config = resolve(
            FileConfig::default(),
            env_of(&[
                ("PG_URL", "postgresql://pg/other"),
                ("POSTGRESQL_URL", "postgres://u:p@host:5432/db"),
            ]),
        );
        assert_eq!(config.database_url, "postgresql://u:p@host:5432/db");
    }

    #[test]
    fn blank_env_falls_through() {
        let config = resolve(
            FileConfig::default(),
            env_of(&[("DATABASE_URL", "  "), ("POSTGRES_URL", "postgresql://x/y")]),
        );
        assert_eq!(config.database_url, "postgresql://x/y");
    }

    #[test]
    fn env_overrides_file() {
        let file: FileConfig = serde_yaml::from_str(
            "database_url: sqlite:///data/plan.db\nport: 8080\nauto_migrate: false\nseed: false\n",
        )
        .unwrap();
        let config = resolve(file, env_of(&[("PORT", "9000"), ("AUTO_MIGRATE", "yes")]));
        assert_eq!(config.database_url, "sqlite:///data/plan.db");
        assert_eq!(config.port, 9000);
        assert!(config.auto_migrate);
        assert!(!config.seed);
    }

    #[test]
    fn unknown_file_key_is_rejected() {
        assert!(serde_yaml::from_str::<FileConfig>("prot: 80\n").is_err());
    }

    #[test]
    fn unparseable_env_keeps_file_value() {
        let file = FileConfig {
            port: Some(8081),
            ..Default::default()
        };
        let config = resolve(file, env_of(&[("PORT", "eighty")]));
        assert_eq!(config.port, 8081);
    }
}
