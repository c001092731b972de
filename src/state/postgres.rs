use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use std::str::FromStr;

use super::backend::StoreBackend;
use super::models::*;
use super::query::{AspectQuery, Dialect, ASPECT_COLUMNS};
use super::schema::{self, Migration, Step};
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
    VALUES ($1, $2, $3, $4, $5, $6, $6, $7) RETURNING id";

/// PostgreSQL-backed store for hosted deployments.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .context("Failed to connect to PostgreSQL")?;
        Ok(Self { pool })
    }

    async fn apply(&self, migration: &Migration) -> Result<AppliedMigration> {
        let mut tx = self.pool.begin().await?;
        for step in migration.steps {
            match step {
                Step::Sql { postgres, .. } => {
                    for statement in schema::statements(postgres) {
                        sqlx::query(statement).execute(&mut *tx).await?;
                    }
                }
                Step::EnsureColumns { table, columns } => {
                    let existing = table_columns(&mut tx, table).await?;
                    for column in columns.iter() {
                        if existing.iter().any(|c| c == column.name) {
                            continue;
                        }
                        sqlx::query(&format!(
                            "ALTER TABLE {} ADD COLUMN {} {}",
                            table, column.name, column.postgres_type
                        ))
                        .execute(&mut *tx)
                        .await?;
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
        sqlx::query("INSERT INTO schema_migrations (version, name, applied_at) VALUES ($1, $2, $3)")
            .bind(record.version)
            .bind(&record.name)
            .bind(&record.applied_at)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(
            version = record.version,
            name = %record.name,
            "Applied migration"
        );
        Ok(record)
    }
}

async fn table_columns(tx: &mut Transaction<'_, Postgres>, table: &str) -> Result<Vec<String>> {
    let rows = sqlx::query(
        "SELECT column_name::text FROM information_schema.columns
         WHERE table_schema = current_schema() AND table_name = $1",
    )
    .bind(table)
    .fetch_all(&mut **tx)
    .await?;
    rows.iter()
        .map(|row| -> Result<String> { Ok(row.try_get::<String, _>(0)?) })
        .collect()
}

#[async_trait]
impl StoreBackend for PostgresStore {
    // ─── Schema ─────────────────────────────────────────────────────────────

    async fn migrate(&self) -> Result<Vec<AppliedMigration>> {
        sqlx::query(schema::MIGRATIONS_TABLE_POSTGRES)
            .execute(&self.pool)
            .await?;
        let current_version: i32 =
            sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_one(&self.pool)
                .await?;

        let mut applied = Vec::new();
        for migration in schema::MIGRATIONS
            .iter()
            .filter(|m| m.version > current_version)
        {
            applied.push(self.apply(migration).await.with_context(|| {
                format!(
                    "Migration {} ({}) failed",
                    migration.version, migration.name
                )
            })?);
        }
        Ok(applied)
    }

    async fn applied_migrations(&self) -> Result<Vec<AppliedMigration>> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables
             WHERE table_schema = current_schema() AND table_name = 'schema_migrations')",
        )
        .fetch_one(&self.pool)
        .await?;
        if !exists {
            return Ok(Vec::new());
        }
        let rows =
            sqlx::query("SELECT version, name, applied_at FROM schema_migrations ORDER BY version")
                .fetch_all(&self.pool)
                .await?;
        rows.iter()
            .map(|row| -> Result<AppliedMigration> {
                Ok(AppliedMigration {
                    version: row.try_get(0)?,
                    name: row.try_get(1)?,
                    applied_at: row.try_get(2)?,
                })
            })
            .collect()
    }

    // ─── Health ─────────────────────────────────────────────────────────────

    async fn counts(&self) -> Result<EntityCounts> {
        let row = sqlx::query(
            "SELECT (SELECT COUNT(*) FROM usuarios),
                    (SELECT COUNT(*) FROM aspectos_ambientales),
                    (SELECT COUNT(*) FROM estrategias_foda),
                    (SELECT COUNT(*) FROM actividades),
                    (SELECT COUNT(*) FROM tareas)",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(EntityCounts {
            usuarios: row.try_get::<i64, _>(0)? as u64,
            aspectos: row.try_get::<i64, _>(1)? as u64,
            estrategias: row.try_get::<i64, _>(2)? as u64,
            actividades: row.try_get::<i64, _>(3)? as u64,
            tareas: row.try_get::<i64, _>(4)? as u64,
        })
    }

    async fn group_counts(&self, dimension: CountDimension) -> Result<Vec<(String, u64)>> {
        let (table, column) = dimension.table_column();
        let rows = sqlx::query(&format!(
            "SELECT COALESCE({column}, ''), COUNT(*) FROM {table} GROUP BY 1 ORDER BY 1"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| -> Result<(String, u64)> {
                Ok((row.try_get::<String, _>(0)?, row.try_get::<i64, _>(1)? as u64))
            })
            .collect()
    }

    // ─── Users ──────────────────────────────────────────────────────────────

    async fn create_user(&self, username: &str, password_hash: &str, role: Role) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO usuarios (username, password, rol, created_at)
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(username)
        .bind(password_hash)
        .bind(role.as_str())
        .bind(now())
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to create user '{}'", username))?;
        Ok(id)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, password, rol, created_at FROM usuarios WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, password, rol, created_at FROM usuarios WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(
            "SELECT id, username, password, rol, created_at FROM usuarios ORDER BY username",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(user_from_row).collect()
    }

    // ─── Aspect records ─────────────────────────────────────────────────────

    async fn insert_aspect(&self, entry: &AspectEntry, created_by: Option<i64>) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(INSERT_ASPECT_SQL)
            .bind(entry.actividad())
            .bind(entry.tipo())
            .bind(entry.aspecto())
            .bind(entry.source().as_str())
            .bind(entry.bloque())
            .bind(now())
            .bind(created_by)
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    async fn insert_aspects(
        &self,
        entries: &[AspectEntry],
        created_by: Option<i64>,
    ) -> Result<Vec<i64>> {
        let mut tx = self.pool.begin().await?;
        let created_at = now();
        let mut ids = Vec::with_capacity(entries.len());
        for entry in entries {
            let id: i64 = sqlx::query_scalar(INSERT_ASPECT_SQL)
                .bind(entry.actividad())
                .bind(entry.tipo())
                .bind(entry.aspecto())
                .bind(entry.source().as_str())
                .bind(entry.bloque())
                .bind(&created_at)
                .bind(created_by)
                .fetch_one(&mut *tx)
                .await?;
            ids.push(id);
        }
        tx.commit().await?;
        Ok(ids)
    }

    async fn get_aspect(&self, id: i64) -> Result<Option<AspectRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM aspectos_ambientales WHERE id = $1",
            ASPECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(aspect_from_row).transpose()
    }

    async fn update_aspect(&self, id: i64, entry: &AspectEntry) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE aspectos_ambientales
             SET actividad = $2, tipo = $3, aspecto = $4, fuente = $5, bloque = $6, updated_at = $7
             WHERE id = $1",
        )
        .bind(id)
        .bind(entry.actividad())
        .bind(entry.tipo())
        .bind(entry.aspecto())
        .bind(entry.source().as_str())
        .bind(entry.bloque())
        .bind(now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_aspect(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM aspectos_ambientales WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_aspects(&self, source: Option<Source>) -> Result<Vec<AspectRecord>> {
        let rows = match source {
            Some(source) => {
                sqlx::query(&format!(
                    "SELECT {} FROM aspectos_ambientales WHERE fuente = $1 ORDER BY actividad, id",
                    ASPECT_COLUMNS
                ))
                .bind(source.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {} FROM aspectos_ambientales ORDER BY actividad, id",
                    ASPECT_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.iter().map(aspect_from_row).collect()
    }

    async fn recent_aspects(&self, limit: u32) -> Result<Vec<AspectRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM aspectos_ambientales ORDER BY created_at DESC, id DESC LIMIT $1",
            ASPECT_COLUMNS
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(aspect_from_row).collect()
    }

    async fn aspect_exists(&self, actividad: &str, aspecto: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM aspectos_ambientales WHERE actividad = $1 AND aspecto = $2)",
        )
        .bind(actividad)
        .bind(aspecto)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn query_aspects(&self, query: &AspectQuery) -> Result<AspectPage> {
        let count = query.count_sql(Dialect::Postgres);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count.sql);
        for param in &count.params {
            count_query = count_query.bind(param);
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let select = query.select_sql(Dialect::Postgres);
        let mut select_query = sqlx::query(&select.sql);
        for param in &select.params {
            select_query = select_query.bind(param);
        }
        let rows = select_query.fetch_all(&self.pool).await?;
        let items = rows.iter().map(aspect_from_row).collect::<Result<Vec<_>>>()?;
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
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO estrategias_foda (tipo_cruce, interno_id, interno_tipo, interno_texto,
                externo_id, externo_tipo, externo_texto, estrategia, eje_id, eje_label,
                created_at, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING id",
        )
        .bind(strategy.cross_type.as_str())
        .bind(strategy.internal.id)
        .bind(strategy.internal.kind.as_str())
        .bind(&strategy.internal.text)
        .bind(strategy.external.id)
        .bind(strategy.external.kind.as_str())
        .bind(&strategy.external.text)
        .bind(&strategy.estrategia)
        .bind(strategy.axis.map(|a| a.id()))
        .bind(strategy.axis.map(|a| a.display_label()))
        .bind(now())
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn get_strategy(&self, id: i64) -> Result<Option<StrategyRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM estrategias_foda WHERE id = $1",
            STRATEGY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(strategy_from_row).transpose()
    }

    async fn list_strategies(&self, filter: &StrategyFilter) -> Result<Vec<StrategyRecord>> {
        let mut sql = format!("SELECT {} FROM estrategias_foda WHERE 1 = 1", STRATEGY_COLUMNS);
        let mut param_values: Vec<String> = Vec::new();

        if let Some(cross) = filter.tipo_cruce {
            param_values.push(cross.as_str().to_string());
            sql.push_str(&format!(" AND tipo_cruce = ${}", param_values.len()));
        }
        if let Some(ref eje) = filter.eje_id {
            param_values.push(eje.clone());
            sql.push_str(&format!(" AND eje_id = ${}", param_values.len()));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");

        let mut query = sqlx::query(&sql);
        for param in &param_values {
            query = query.bind(param);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(strategy_from_row).collect()
    }

    async fn delete_strategy(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM estrategias_foda WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ─── Activities ─────────────────────────────────────────────────────────

    async fn insert_activity(
        &self,
        strategy_id: i64,
        activity: &NewActivity,
        created_by: Option<i64>,
    ) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO actividades (estrategia_id, nombre, descripcion, responsable,
                fecha_inicio, fecha_fin, created_at, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id",
        )
        .bind(strategy_id)
        .bind(&activity.nombre)
        .bind(&activity.descripcion)
        .bind(&activity.responsable)
        .bind(date_text(activity.fecha_inicio))
        .bind(date_text(activity.fecha_fin))
        .bind(now())
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn get_activity(&self, id: i64) -> Result<Option<ActivityRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM actividades WHERE id = $1",
            ACTIVITY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(activity_from_row).transpose()
    }

    async fn list_activities(&self, strategy_id: i64) -> Result<Vec<ActivityRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM actividades WHERE estrategia_id = $1 ORDER BY id",
            ACTIVITY_COLUMNS
        ))
        .bind(strategy_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(activity_from_row).collect()
    }

    async fn update_activity(&self, id: i64, activity: &NewActivity) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE actividades SET nombre = $2, descripcion = $3, responsable = $4,
                fecha_inicio = $5, fecha_fin = $6
             WHERE id = $1",
        )
        .bind(id)
        .bind(&activity.nombre)
        .bind(&activity.descripcion)
        .bind(&activity.responsable)
        .bind(date_text(activity.fecha_inicio))
        .bind(date_text(activity.fecha_fin))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_activity(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM actividades WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ─── Tasks ──────────────────────────────────────────────────────────────

    async fn insert_task(
        &self,
        activity_id: i64,
        task: &NewTask,
        created_by: Option<i64>,
    ) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO tareas (actividad_id, nombre, descripcion, responsable,
                fecha_inicio, fecha_fin, estado, created_at, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
        )
        .bind(activity_id)
        .bind(&task.nombre)
        .bind(&task.descripcion)
        .bind(&task.responsable)
        .bind(date_text(task.fecha_inicio))
        .bind(date_text(task.fecha_fin))
        .bind(task.estado.as_str())
        .bind(now())
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn get_task(&self, id: i64) -> Result<Option<TaskRecord>> {
        let row = sqlx::query(&format!("SELECT {} FROM tareas WHERE id = $1", TASK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(task_from_row).transpose()
    }

    async fn list_tasks(&self, activity_id: i64) -> Result<Vec<TaskRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM tareas WHERE actividad_id = $1 ORDER BY id",
            TASK_COLUMNS
        ))
        .bind(activity_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(task_from_row).collect()
    }

    async fn update_task(&self, id: i64, task: &NewTask) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE tareas SET nombre = $2, descripcion = $3, responsable = $4,
                fecha_inicio = $5, fecha_fin = $6, estado = $7
             WHERE id = $1",
        )
        .bind(id)
        .bind(&task.nombre)
        .bind(&task.descripcion)
        .bind(&task.responsable)
        .bind(date_text(task.fecha_inicio))
        .bind(date_text(task.fecha_fin))
        .bind(task.estado.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_task_status(&self, id: i64, status: TaskStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE tareas SET estado = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_task(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tareas WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ─── Row decoding ───────────────────────────────────────────────────────────

fn date_text(date: Option<chrono::NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

fn user_from_row(row: &PgRow) -> Result<User> {
    Ok(User {
        id: row.try_get(0)?,
        username: row.try_get(1)?,
        password_hash: row.try_get(2)?,
        role: Role::from_str(row.try_get::<&str, _>(3)?)?,
        created_at: row.try_get(4)?,
    })
}

fn aspect_from_row(row: &PgRow) -> Result<AspectRecord> {
    Ok(AspectRecord {
        id: row.try_get(0)?,
        actividad: row.try_get(1)?,
        tipo: row.try_get(2)?,
        aspecto: row.try_get(3)?,
        fuente: Source::parse(row.try_get::<&str, _>(4)?)?,
        bloque: row.try_get(5)?,
        created_at: row.try_get(6)?,
        updated_at: row.try_get(7)?,
        created_by: row.try_get(8)?,
    })
}

fn strategy_from_row(row: &PgRow) -> Result<StrategyRecord> {
    Ok(StrategyRecord {
        id: row.try_get(0)?,
        tipo_cruce: CrossType::parse(row.try_get::<&str, _>(1)?)?,
        interno_id: row.try_get(2)?,
        interno_tipo: ElementKind::parse("interno_tipo", row.try_get::<&str, _>(3)?)?,
        interno_texto: row.try_get(4)?,
        externo_id: row.try_get(5)?,
        externo_tipo: ElementKind::parse("externo_tipo", row.try_get::<&str, _>(6)?)?,
        externo_texto: row.try_get(7)?,
        estrategia: row.try_get(8)?,
        eje_id: row.try_get(9)?,
        eje_label: row.try_get(10)?,
        created_at: row.try_get(11)?,
        created_by: row.try_get(12)?,
    })
}

fn activity_from_row(row: &PgRow) -> Result<ActivityRecord> {
    Ok(ActivityRecord {
        id: row.try_get(0)?,
        estrategia_id: row.try_get(1)?,
        nombre: row.try_get(2)?,
        descripcion: row.try_get(3)?,
        responsable: row.try_get(4)?,
        fecha_inicio: row.try_get(5)?,
        fecha_fin: row.try_get(6)?,
        created_at: row.try_get(7)?,
        created_by: row.try_get(8)?,
    })
}

fn task_from_row(row: &PgRow) -> Result<TaskRecord> {
    Ok(TaskRecord {
        id: row.try_get(0)?,
        actividad_id: row.try_get(1)?,
        nombre: row.try_get(2)?,
        descripcion: row.try_get(3)?,
        responsable: row.try_get(4)?,
        fecha_inicio: row.try_get(5)?,
        fecha_fin: row.try_get(6)?,
        estado: TaskStatus::parse(row.try_get::<&str, _>(7)?)?,
        created_at: row.try_get(8)?,
        created_by: row.try_get(9)?,
    })
}
