use std::io::Write;
use std::time::Duration;

use foda_planner::config::loader::{read_file, resolve};
use tempfile::NamedTempFile;

fn write_yaml(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_read_full_config_file() {
    let file = write_yaml(
        r#"
database_url: "postgres://planner:secret@db:5432/foda"
secret_key: "from-file"
host: "127.0.0.1"
port: 8080
startup_retries: 5
retry_delay_secs: 1
auto_migrate: false
seed: false
"#,
    );

    let config = resolve(read_file(file.path()).unwrap(), |_| None);
    assert_eq!(config.database_url, "postgresql://planner:secret@db:5432/foda");
    assert_eq!(config.secret_key, "from-file");
    assert_eq!(config.bind_address(), "127.0.0.1:8080");
    assert_eq!(config.startup_retries, 5);
    assert_eq!(config.retry_delay, Duration::from_secs(1));
    assert!(!config.auto_migrate);
    assert!(!config.seed);
}

#[test]
fn test_partial_file_keeps_defaults() {
    let file = write_yaml("port: 9000\n");

    let config = resolve(read_file(file.path()).unwrap(), |_| None);
    assert_eq!(config.port, 9000);
    assert_eq!(config.database_url, "sqlite:///app.db");
    assert!(config.auto_migrate);
    assert!(config.uses_default_secret());
}

#[test]
fn test_environment_overrides_file() {
    let file = write_yaml("secret_key: \"from-file\"\nport: 8080\n");

    let config = resolve(read_file(file.path()).unwrap(), |name| match name {
        "SECRET_KEY" => Some("from-env".to_string()),
        "PORT" => Some("   ".to_string()),
        _ => None,
    });
    assert_eq!(config.secret_key, "from-env");
    // Blank values do not count as set
    assert_eq!(config.port, 8080);
}

#[test]
fn test_unknown_keys_are_rejected() {
    let file = write_yaml("databse_url: \"sqlite:///typo.db\"\n");
    let err = read_file(file.path()).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse YAML config"));
}

#[test]
fn test_missing_file_is_an_error() {
    assert!(read_file(std::path::Path::new("/nonexistent/foda.yaml")).is_err());
}
