use axum::extract::State;
use axum::response::Html;
use axum::Json;
use serde_json::{json, Value};

use crate::http::{pages, AppState, PageError};
use crate::state::bootstrap;
use crate::state::models::EntityCounts;

/// Liveness plus database reachability. Always answers 200.
pub async fn check(State(state): State<AppState>) -> Json<Value> {
    let (database, counts) = match state.store.counts().await {
        Ok(counts) => ("conectada", counts),
        Err(e) => {
            tracing::warn!(error = %format!("{:#}", e), "Health check could not reach the database");
            ("error", EntityCounts::default())
        }
    };
    Json(json!({
        "status": "ok",
        "database": database,
        "usuarios": counts.usuarios,
        "aspectos": counts.aspectos,
        "estrategias": counts.estrategias,
        "actividades": counts.actividades,
        "tareas": counts.tareas,
        "port": state.config.port.to_string(),
    }))
}

/// Migrate, then seed default users and sample records. Safe to repeat.
pub async fn init_db(State(state): State<AppState>) -> Result<Html<String>, PageError> {
    let applied = state.store.migrate().await?;
    let seeded = bootstrap::seed_defaults(state.store.as_ref()).await?;
    tracing::info!(
        migrations = applied.len(),
        users = seeded.users_created,
        aspects = seeded.aspects_created,
        "Database initialized"
    );
    let counts = state.store.counts().await?;
    Ok(pages::init_db_page(&counts, &seeded))
}

pub async fn migrate_db(State(state): State<AppState>) -> Result<Html<String>, PageError> {
    let applied = state.store.migrate().await?;
    let all = state.store.applied_migrations().await?;
    Ok(pages::migrate_page(&applied, &all))
}
