use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::models::{now, AppliedMigration};
use super::schema::{self, Migration, Step};

/// Apply every pending migration for the SQLite backend.
///
/// Each migration runs in its own transaction together with its
/// `schema_migrations` row, so a failure leaves earlier versions applied and
/// the failing one untouched.
pub fn run_sqlite(conn: &mut Connection) -> Result<Vec<AppliedMigration>> {
    conn.execute_batch(schema::MIGRATIONS_TABLE_SQLITE)?;

    let current_version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    let mut applied = Vec::new();
    for migration in schema::MIGRATIONS
        .iter()
        .filter(|m| m.version > current_version)
    {
        applied.push(apply(conn, migration).with_context(|| {
            format!(
                "Migration {} ({}) failed",
                migration.version, migration.name
            )
        })?);
    }

    if applied.is_empty() {
        tracing::debug!(version = current_version, "Schema is up to date");
    }
    Ok(applied)
}

/// Migrations recorded as applied, oldest first. An unmigrated database has none.
pub fn applied_sqlite(conn: &Connection) -> Result<Vec<AppliedMigration>> {
    let table_exists: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_migrations'",
        [],
        |row| row.get(0),
    )?;
    if table_exists == 0 {
        return Ok(Vec::new());
    }

    let mut stmt =
        conn.prepare("SELECT version, name, applied_at FROM schema_migrations ORDER BY version")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(AppliedMigration {
                version: row.get(0)?,
                name: row.get(1)?,
                applied_at: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn apply(conn: &mut Connection, migration: &Migration) -> Result<AppliedMigration> {
    let tx = conn.transaction()?;
    for step in migration.steps {
        match step {
            Step::Sql { sqlite, .. } => tx.execute_batch(sqlite)?,
            Step::EnsureColumns { table, columns } => {
                let existing = table_columns(&tx, table)?;
                for column in columns.iter() {
                    if existing.iter().any(|c| c == column.name) {
                        continue;
                    }
                    tx.execute_batch(&format!(
                        "ALTER TABLE {} ADD COLUMN {} {}",
                        table, column.name, column.sqlite_type
                    ))?;
                    tracing::debug!(table, column = column.name, "Added column");
                }
            }
        }
    }

    let record = AppliedMigration {
        version: migration.version,
        name: migration.name.to_string(),
        applied_at: now(),
    };
    tx.execute(
        "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
        params![record.version, record.name, record.applied_at],
    )?;
    tx.commit()?;

    tracing::info!(
        version = record.version,
        name = %record.name,
        "Applied migration"
    );
    Ok(record)
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}
