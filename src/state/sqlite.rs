use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use super::backend::StoreBackend;
use super::migration;
use super::models::*;
use super::query::{AspectQuery, Dialect, ASPECT_COLUMNS, SQLITE_LOWER_FN};
use crate::domain::{
    AspectEntry, CrossType, ElementKind, NewActivity, NewStrategy, NewTask, Role, Source,
    TaskStatus,
};

const STRATEGY_COLUMNS: &str = "id, tipo_cruce, interno_id, interno_tipo, interno_texto,
    externo_id, externo_tipo, externo_texto, estrategia, eje_id, eje_label, created_at, created_by";

const ACTIVITY_COLUMNS: &str = "id, estrategia_id, nombre, descripcion, responsable,
    fecha_inicio, fecha_fin, created_at, created_by";

const TASK_COLUMNS: &str = "id, actividad_id, nombre, descripcion, responsable,
    fecha_inicio, fecha_fin, estado, created_at, created_by";

const INSERT_ASPECT_SQL: &str = "INSERT INTO aspectos_ambientales
    (actividad, tipo, aspecto, fuente, bloque, created_at, updated_at, created_by)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?7)";

/// SQLite-backed store for the local, file-based deployment.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database file.
    pub fn open(db_path: &str) -> Result<Self> {
        let parent = Path::new(db_path).parent();
        if let Some(dir) = parent {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database at {}", db_path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        register_functions(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        register_functions(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection mutex poisoned"))
    }
}

/// Accented capitals such as "Á" must fold like they do on PostgreSQL.
fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        SQLITE_LOWER_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|v| v.to_lowercase()))
        },
    )
    .context("Failed to register SQL functions")?;
    Ok(())
}

#[async_trait]
impl StoreBackend for SqliteStore {
    // ─── Schema ─────────────────────────────────────────────────────────────

    async fn migrate(&self) -> Result<Vec<AppliedMigration>> {
        let mut conn = self.conn()?;
        migration::run_sqlite(&mut conn)
    }

    async fn applied_migrations(&self) -> Result<Vec<AppliedMigration>> {
        let conn = self.conn()?;
        migration::applied_sqlite(&conn)
    }

    // ─── Health ─────────────────────────────────────────────────────────────

    async fn counts(&self) -> Result<EntityCounts> {
        let conn = self.conn()?;
        let counts = conn.query_row(
            "SELECT (SELECT COUNT(*) FROM usuarios),
                    (SELECT COUNT(*) FROM aspectos_ambientales),
                    (SELECT COUNT(*) FROM estrategias_foda),
                    (SELECT COUNT(*) FROM actividades),
                    (SELECT COUNT(*) FROM tareas)",
            [],
            |row| {
                Ok(EntityCounts {
                    usuarios: row.get::<_, i64>(0)? as u64,
                    aspectos: row.get::<_, i64>(1)? as u64,
                    estrategias: row.get::<_, i64>(2)? as u64,
                    actividades: row.get::<_, i64>(3)? as u64,
                    tareas: row.get::<_, i64>(4)? as u64,
                })
            },
        )?;
        Ok(counts)
    }

    async fn group_counts(&self, dimension: CountDimension) -> Result<Vec<(String, u64)>> {
        let (table, column) = dimension.table_column();
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT COALESCE({column}, ''), COUNT(*) FROM {table} GROUP BY 1 ORDER BY 1"
        ))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ─── Users ──────────────────────────────────────────────────────────────

    async fn create_user(&self, username: &str, password_hash: &str, role: Role) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO usuarios (username, password, rol, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![username, password_hash, role.as_str(), now()],
        )
        .with_context(|| format!("Failed to create user '{}'", username))?;
        Ok(conn.last_insert_rowid())
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, username, password, rol, created_at FROM usuarios WHERE id = ?1",
                params![id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, username, password, rol, created_at FROM usuarios WHERE username = ?1",
                params![username],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, username, password, rol, created_at FROM usuarios ORDER BY username",
        )?;
        let rows = stmt
            .query_map([], user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ─── Aspect records ─────────────────────────────────────────────────────

    async fn insert_aspect(&self, entry: &AspectEntry, created_by: Option<i64>) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            INSERT_ASPECT_SQL,
            params![
                entry.actividad(),
                entry.tipo(),
                entry.aspecto(),
                entry.source().as_str(),
                entry.bloque(),
                now(),
                created_by,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    async fn insert_aspects(
        &self,
        entries: &[AspectEntry],
        created_by: Option<i64>,
    ) -> Result<Vec<i64>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(entries.len());
        {
            let mut stmt = tx.prepare(INSERT_ASPECT_SQL)?;
            let created_at = now();
            for entry in entries {
                stmt.execute(params![
                    entry.actividad(),
                    entry.tipo(),
                    entry.aspecto(),
                    entry.source().as_str(),
                    entry.bloque(),
                    created_at,
                    created_by,
                ])?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit()?;
        Ok(ids)
    }

    async fn get_aspect(&self, id: i64) -> Result<Option<AspectRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("SELECT {} FROM aspectos_ambientales WHERE id = ?1", ASPECT_COLUMNS),
                params![id],
                aspect_from_row,
            )
            .optional()?;
        Ok(record)
    }

    async fn update_aspect(&self, id: i64, entry: &AspectEntry) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE aspectos_ambientales
             SET actividad = ?2, tipo = ?3, aspecto = ?4, fuente = ?5, bloque = ?6, updated_at = ?7
             WHERE id = ?1",
            params![
                id,
                entry.actividad(),
                entry.tipo(),
                entry.aspecto(),
                entry.source().as_str(),
                entry.bloque(),
                now(),
            ],
        )?;
        Ok(changed > 0)
    }

    async fn delete_aspect(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM aspectos_ambientales WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    async fn list_aspects(&self, source: Option<Source>) -> Result<Vec<AspectRecord>> {
        let conn = self.conn()?;
        let rows = match source {
            Some(source) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM aspectos_ambientales WHERE fuente = ?1 ORDER BY actividad, id",
                    ASPECT_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![source.as_str()], aspect_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM aspectos_ambientales ORDER BY actividad, id",
                    ASPECT_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([], aspect_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(rows)
    }

    async fn recent_aspects(&self, limit: u32) -> Result<Vec<AspectRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM aspectos_ambientales ORDER BY created_at DESC, id DESC LIMIT ?1",
            ASPECT_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![limit], aspect_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    async fn aspect_exists(&self, actividad: &str, aspecto: &str) -> Result<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM aspectos_ambientales WHERE actividad = ?1 AND aspecto = ?2",
            params![actividad, aspecto],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    async fn query_aspects(&self, query: &AspectQuery) -> Result<AspectPage> {
        let conn = self.conn()?;
        let count = query.count_sql(Dialect::Sqlite);
        let total: i64 = conn.query_row(&count.sql, params_from_iter(count.params.iter()), |row| {
            row.get(0)
        })?;

        let select = query.select_sql(Dialect::Sqlite);
        let mut stmt = conn.prepare(&select.sql)?;
        let items = stmt
            .query_map(params_from_iter(select.params.iter()), aspect_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(AspectPage {
            items,
            total: total as u64,
        })
    }

    // ─── Cross-strategies ───────────────────────────────────────────────────

    async fn insert_strategy(
        &self,
        strategy: &NewStrategy,
        created_by: Option<i64>,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO estrategias_foda (tipo_cruce, interno_id, interno_tipo, interno_texto,
                externo_id, externo_tipo, externo_texto, estrategia, eje_id, eje_label,
                created_at, created_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                strategy.cross_type.as_str(),
                strategy.internal.id,
                strategy.internal.kind.as_str(),
                strategy.internal.text,
                strategy.external.id,
                strategy.external.kind.as_str(),
                strategy.external.text,
                strategy.estrategia,
                strategy.axis.map(|a| a.id()),
                strategy.axis.map(|a| a.display_label()),
                now(),
                created_by,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    async fn get_strategy(&self, id: i64) -> Result<Option<StrategyRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("SELECT {} FROM estrategias_foda WHERE id = ?1", STRATEGY_COLUMNS),
                params![id],
                strategy_from_row,
            )
            .optional()?;
        Ok(record)
    }

    async fn list_strategies(&self, filter: &StrategyFilter) -> Result<Vec<StrategyRecord>> {
        let conn = self.conn()?;
        let mut sql = format!("SELECT {} FROM estrategias_foda WHERE 1 = 1", STRATEGY_COLUMNS);
        let mut param_values: Vec<String> = Vec::new();

        if let Some(cross) = filter.tipo_cruce {
            param_values.push(cross.as_str().to_string());
            sql.push_str(&format!(" AND tipo_cruce = ?{}", param_values.len()));
        }
        if let Some(ref eje) = filter.eje_id {
            param_values.push(eje.clone());
            sql.push_str(&format!(" AND eje_id = ?{}", param_values.len()));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(param_values.iter()), strategy_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    async fn delete_strategy(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM estrategias_foda WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    // ─── Activities ─────────────────────────────────────────────────────────

    async fn insert_activity(
        &self,
        strategy_id: i64,
        activity: &NewActivity,
        created_by: Option<i64>,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO actividades (estrategia_id, nombre, descripcion, responsable,
                fecha_inicio, fecha_fin, created_at, created_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                strategy_id,
                activity.nombre,
                activity.descripcion,
                activity.responsable,
                date_text(activity.fecha_inicio),
                date_text(activity.fecha_fin),
                now(),
                created_by,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    async fn get_activity(&self, id: i64) -> Result<Option<ActivityRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("SELECT {} FROM actividades WHERE id = ?1", ACTIVITY_COLUMNS),
                params![id],
                activity_from_row,
            )
            .optional()?;
        Ok(record)
    }

    async fn list_activities(&self, strategy_id: i64) -> Result<Vec<ActivityRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM actividades WHERE estrategia_id = ?1 ORDER BY id",
            ACTIVITY_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![strategy_id], activity_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    async fn update_activity(&self, id: i64, activity: &NewActivity) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE actividades SET nombre = ?2, descripcion = ?3, responsable = ?4,
                fecha_inicio = ?5, fecha_fin = ?6
             WHERE id = ?1",
            params![
                id,
                activity.nombre,
                activity.descripcion,
                activity.responsable,
                date_text(activity.fecha_inicio),
                date_text(activity.fecha_fin),
            ],
        )?;
        Ok(changed > 0)
    }

    async fn delete_activity(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM actividades WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    // ─── Tasks ──────────────────────────────────────────────────────────────

    async fn insert_task(
        &self,
        activity_id: i64,
        task: &NewTask,
        created_by: Option<i64>,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO tareas (actividad_id, nombre, descripcion, responsable,
                fecha_inicio, fecha_fin, estado, created_at, created_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                activity_id,
                task.nombre,
                task.descripcion,
                task.responsable,
                date_text(task.fecha_inicio),
                date_text(task.fecha_fin),
                task.estado.as_str(),
                now(),
                created_by,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    async fn get_task(&self, id: i64) -> Result<Option<TaskRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("SELECT {} FROM tareas WHERE id = ?1", TASK_COLUMNS),
                params![id],
                task_from_row,
            )
            .optional()?;
        Ok(record)
    }

    async fn list_tasks(&self, activity_id: i64) -> Result<Vec<TaskRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tareas WHERE actividad_id = ?1 ORDER BY id",
            TASK_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![activity_id], task_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    async fn update_task(&self, id: i64, task: &NewTask) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE tareas SET nombre = ?2, descripcion = ?3, responsable = ?4,
                fecha_inicio = ?5, fecha_fin = ?6, estado = ?7
             WHERE id = ?1",
            params![
                id,
                task.nombre,
                task.descripcion,
                task.responsable,
                date_text(task.fecha_inicio),
                date_text(task.fecha_fin),
                task.estado.as_str(),
            ],
        )?;
        Ok(changed > 0)
    }

    async fn set_task_status(&self, id: i64, status: TaskStatus) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE tareas SET estado = ?2 WHERE id = ?1",
            params![id, status.as_str()],
        )?;
        Ok(changed > 0)
    }

    async fn delete_task(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM tareas WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}

// ─── Row decoding ───────────────────────────────────────────────────────────

fn date_text(date: Option<chrono::NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

/// Read a text column and parse it into a domain enum.
fn text_enum<T, E>(row: &Row<'_>, idx: usize, parse: impl FnOnce(&str) -> Result<T, E>) -> rusqlite::Result<T>
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let raw: String = row.get(idx)?;
    parse(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        role: text_enum(row, 3, Role::from_str)?,
        created_at: row.get(4)?,
    })
}

fn aspect_from_row(row: &Row<'_>) -> rusqlite::Result<AspectRecord> {
    Ok(AspectRecord {
        id: row.get(0)?,
        actividad: row.get(1)?,
        tipo: row.get(2)?,
        aspecto: row.get(3)?,
        fuente: text_enum(row, 4, Source::parse)?,
        bloque: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        created_by: row.get(8)?,
    })
}

fn strategy_from_row(row: &Row<'_>) -> rusqlite::Result<StrategyRecord> {
    Ok(StrategyRecord {
        id: row.get(0)?,
        tipo_cruce: text_enum(row, 1, CrossType::parse)?,
        interno_id: row.get(2)?,
        interno_tipo: text_enum(row, 3, |s| ElementKind::parse("interno_tipo", s))?,
        interno_texto: row.get(4)?,
        externo_id: row.get(5)?,
        externo_tipo: text_enum(row, 6, |s| ElementKind::parse("externo_tipo", s))?,
        externo_texto: row.get(7)?,
        estrategia: row.get(8)?,
        eje_id: row.get(9)?,
        eje_label: row.get(10)?,
        created_at: row.get(11)?,
        created_by: row.get(12)?,
    })
}

fn activity_from_row(row: &Row<'_>) -> rusqlite::Result<ActivityRecord> {
    Ok(ActivityRecord {
        id: row.get(0)?,
        estrategia_id: row.get(1)?,
        nombre: row.get(2)?,
        descripcion: row.get(3)?,
        responsable: row.get(4)?,
        fecha_inicio: row.get(5)?,
        fecha_fin: row.get(6)?,
        created_at: row.get(7)?,
        created_by: row.get(8)?,
    })
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<TaskRecord> {
    Ok(TaskRecord {
        id: row.get(0)?,
        actividad_id: row.get(1)?,
        nombre: row.get(2)?,
        descripcion: row.get(3)?,
        responsable: row.get(4)?,
        fecha_inicio: row.get(5)?,
        fecha_fin: row.get(6)?,
        estado: text_enum(row, 7, TaskStatus::parse)?,
        created_at: row.get(8)?,
        created_by: row.get(9)?,
    })
}
