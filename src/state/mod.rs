pub mod backend;
pub mod bootstrap;
pub mod migration;
pub mod models;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod query;
pub mod schema;
pub mod sqlite;

use anyhow::{bail, Result};
use std::sync::Arc;

pub use backend::StoreBackend;
pub use sqlite::SqliteStore;

/// Open the store a database URL points at.
///
/// Accepted forms: `sqlite:///relative/path.db`, `sqlite:////absolute/path.db`,
/// `sqlite::memory:` and `postgresql://…` (with the `postgres` feature).
pub async fn open_store(url: &str) -> Result<Arc<dyn StoreBackend>> {
    if url == "sqlite::memory:" {
        return Ok(Arc::new(SqliteStore::open_memory()?));
    }
    if let Some(path) = url.strip_prefix("sqlite:///") {
        if path.is_empty() {
            bail!("SQLite URL '{}' has no file path", url);
        }
        tracing::debug!(path, "Opening SQLite database");
        return Ok(Arc::new(SqliteStore::open(path)?));
    }
    if url.starts_with("postgresql://") || url.starts_with("postgres://") {
        return open_postgres(url).await;
    }
    bail!("Unsupported database URL scheme: '{}'", redact(url))
}

#[cfg(feature = "postgres")]
async fn open_postgres(url: &str) -> Result<Arc<dyn StoreBackend>> {
    tracing::debug!(url = %redact(url), "Connecting to PostgreSQL");
    Ok(Arc::new(postgres::PostgresStore::connect(url).await?))
}

#[cfg(not(feature = "postgres"))]
async fn open_postgres(url: &str) -> Result<Arc<dyn StoreBackend>> {
    bail!(
        "'{}' needs PostgreSQL support; rebuild with `--features postgres`",
        redact(url)
    )
}

/// Drop credentials from a URL before it reaches logs.
pub fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_credentials() {
        assert_eq!(
            redact("postgresql://user:pw@db.internal:5432/app"),
            "postgresql://***@db.internal:5432/app"
        );
        assert_eq!(redact("sqlite:///app.db"), "sqlite:///app.db");
    }

    #[tokio::test]
    async fn rejects_unknown_scheme() {
        assert!(open_store("mysql://localhost/db").await.is_err());
        assert!(open_store("sqlite:///").await.is_err());
    }

    #[tokio::test]
    async fn opens_memory_store() {
        let store = open_store("sqlite::memory:").await.unwrap();
        assert!(!store.migrate().await.unwrap().is_empty());
    }
}
