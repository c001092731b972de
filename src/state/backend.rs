use anyhow::Result;
use async_trait::async_trait;

use super::models::{
    ActivityRecord, AppliedMigration, AspectPage, AspectRecord, CountDimension, EntityCounts,
    StrategyFilter, StrategyRecord, TaskRecord, User,
};
use super::query::AspectQuery;
use crate::domain::{AspectEntry, NewActivity, NewStrategy, NewTask, Role, Source, TaskStatus};

/// Pluggable store backend.
/// Implemented by SQLite (local file, default) and PostgreSQL (`postgres` feature).
///
/// Mutations on a missing id return `Ok(false)` rather than an error so
/// handlers can answer 404.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    // ─── Schema ─────────────────────────────────────────────────────────────

    /// Apply pending migrations in order. Returns the ones applied by this call.
    async fn migrate(&self) -> Result<Vec<AppliedMigration>>;

    /// All migrations recorded as applied, oldest first.
    async fn applied_migrations(&self) -> Result<Vec<AppliedMigration>>;

    // ─── Health ─────────────────────────────────────────────────────────────

    /// Row counts per entity; fails when the store is unreachable or unmigrated.
    async fn counts(&self) -> Result<EntityCounts>;

    /// `(value, count)` pairs for one dimension, ordered by value.
    async fn group_counts(&self, dimension: CountDimension) -> Result<Vec<(String, u64)>>;

    // ─── Users ──────────────────────────────────────────────────────────────

    async fn create_user(&self, username: &str, password_hash: &str, role: Role) -> Result<i64>;

    async fn get_user(&self, id: i64) -> Result<Option<User>>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn list_users(&self) -> Result<Vec<User>>;

    // ─── Aspect records ─────────────────────────────────────────────────────

    async fn insert_aspect(&self, entry: &AspectEntry, created_by: Option<i64>) -> Result<i64>;

    /// Insert all entries in one transaction; either every row lands or none.
    async fn insert_aspects(
        &self,
        entries: &[AspectEntry],
        created_by: Option<i64>,
    ) -> Result<Vec<i64>>;

    async fn get_aspect(&self, id: i64) -> Result<Option<AspectRecord>>;

    async fn update_aspect(&self, id: i64, entry: &AspectEntry) -> Result<bool>;

    async fn delete_aspect(&self, id: i64) -> Result<bool>;

    /// All records of one source (or every source), ordered by activity.
    async fn list_aspects(&self, source: Option<Source>) -> Result<Vec<AspectRecord>>;

    /// Most recently created records first.
    async fn recent_aspects(&self, limit: u32) -> Result<Vec<AspectRecord>>;

    /// Whether a record with this activity and aspect text exists.
    async fn aspect_exists(&self, actividad: &str, aspecto: &str) -> Result<bool>;

    /// Filtered, ordered, optionally paginated selection plus the unpaginated total.
    async fn query_aspects(&self, query: &AspectQuery) -> Result<AspectPage>;

    // ─── Cross-strategies ───────────────────────────────────────────────────

    async fn insert_strategy(&self, strategy: &NewStrategy, created_by: Option<i64>)
        -> Result<i64>;

    async fn get_strategy(&self, id: i64) -> Result<Option<StrategyRecord>>;

    async fn list_strategies(&self, filter: &StrategyFilter) -> Result<Vec<StrategyRecord>>;

    /// Deletes the strategy with its activities and their tasks.
    async fn delete_strategy(&self, id: i64) -> Result<bool>;

    // ─── Activities ─────────────────────────────────────────────────────────

    async fn insert_activity(
        &self,
        strategy_id: i64,
        activity: &NewActivity,
        created_by: Option<i64>,
    ) -> Result<i64>;

    async fn get_activity(&self, id: i64) -> Result<Option<ActivityRecord>>;

    async fn list_activities(&self, strategy_id: i64) -> Result<Vec<ActivityRecord>>;

    async fn update_activity(&self, id: i64, activity: &NewActivity) -> Result<bool>;

    /// Deletes the activity with its tasks.
    async fn delete_activity(&self, id: i64) -> Result<bool>;

    // ─── Tasks ──────────────────────────────────────────────────────────────

    async fn insert_task(
        &self,
        activity_id: i64,
        task: &NewTask,
        created_by: Option<i64>,
    ) -> Result<i64>;

    async fn get_task(&self, id: i64) -> Result<Option<TaskRecord>>;

    async fn list_tasks(&self, activity_id: i64) -> Result<Vec<TaskRecord>>;

    async fn update_task(&self, id: i64, task: &NewTask) -> Result<bool>;

    async fn set_task_status(&self, id: i64, status: TaskStatus) -> Result<bool>;

    async fn delete_task(&self, id: i64) -> Result<bool>;
}
