//! Activities hang off a strategy and tasks off an activity. Deleting a
//! parent removes its children in the store.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use super::{done, saved};
use crate::auth::{ApiUser, Session};
use crate::domain::{ActivityInput, TaskInput, TaskStatus, ValidationError};
use crate::http::{AppError, AppState, JsonBody};
use crate::state::models::{ActivityRecord, TaskRecord};

#[derive(Debug, Default, Deserialize)]
pub struct StatusInput {
    pub estado: Option<String>,
}

fn authorize(session: &Session, created_by: Option<i64>) -> Result<(), AppError> {
    if session.may_modify(created_by) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

async fn activity(state: &AppState, id: i64) -> Result<ActivityRecord, AppError> {
    state
        .store
        .get_activity(id)
        .await?
        .ok_or(AppError::NotFound("Actividad"))
}

async fn task(state: &AppState, id: i64) -> Result<TaskRecord, AppError> {
    state
        .store
        .get_task(id)
        .await?
        .ok_or(AppError::NotFound("Tarea"))
}

// ─── Activities ─────────────────────────────────────────────────────────────

pub async fn list_activities(
    ApiUser(_): ApiUser,
    State(state): State<AppState>,
    Path(strategy_id): Path<i64>,
) -> Result<Json<Vec<ActivityRecord>>, AppError> {
    if state.store.get_strategy(strategy_id).await?.is_none() {
        return Err(AppError::NotFound("Estrategia"));
    }
    Ok(Json(state.store.list_activities(strategy_id).await?))
}

pub async fn create_activity(
    ApiUser(session): ApiUser,
    State(state): State<AppState>,
    Path(strategy_id): Path<i64>,
    JsonBody(input): JsonBody<ActivityInput>,
) -> Result<Json<Value>, AppError> {
    if state.store.get_strategy(strategy_id).await?.is_none() {
        return Err(AppError::NotFound("Estrategia"));
    }
    let activity = input.validate()?;
    let id = state
        .store
        .insert_activity(strategy_id, &activity, Some(session.user_id))
        .await?;
    tracing::info!(activity_id = id, strategy_id, user = %session.username, "Activity created");
    Ok(saved(id, "Actividad creada correctamente"))
}

pub async fn update_activity(
    ApiUser(session): ApiUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    JsonBody(input): JsonBody<ActivityInput>,
) -> Result<Json<Value>, AppError> {
    let existing = activity(&state, id).await?;
    authorize(&session, existing.created_by)?;
    let update = input.validate()?;
    if !state.store.update_activity(id, &update).await? {
        return Err(AppError::NotFound("Actividad"));
    }
    Ok(done("Actividad actualizada correctamente"))
}

pub async fn delete_activity(
    ApiUser(session): ApiUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let existing = activity(&state, id).await?;
    authorize(&session, existing.created_by)?;
    if !state.store.delete_activity(id).await? {
        return Err(AppError::NotFound("Actividad"));
    }
    tracing::info!(activity_id = id, user = %session.username, "Activity deleted");
    Ok(done("Actividad eliminada correctamente"))
}

// ─── Tasks ──────────────────────────────────────────────────────────────────

pub async fn list_tasks(
    ApiUser(_): ApiUser,
    State(state): State<AppState>,
    Path(activity_id): Path<i64>,
) -> Result<Json<Vec<TaskRecord>>, AppError> {
    activity(&state, activity_id).await?;
    Ok(Json(state.store.list_tasks(activity_id).await?))
}

pub async fn create_task(
    ApiUser(session): ApiUser,
    State(state): State<AppState>,
    Path(activity_id): Path<i64>,
    JsonBody(input): JsonBody<TaskInput>,
) -> Result<Json<Value>, AppError> {
    activity(&state, activity_id).await?;
    let new_task = input.validate()?;
    let id = state
        .store
        .insert_task(activity_id, &new_task, Some(session.user_id))
        .await?;
    tracing::info!(task_id = id, activity_id, user = %session.username, "Task created");
    Ok(saved(id, "Tarea creada correctamente"))
}

pub async fn update_task(
    ApiUser(session): ApiUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    JsonBody(input): JsonBody<TaskInput>,
) -> Result<Json<Value>, AppError> {
    let existing = task(&state, id).await?;
    authorize(&session, existing.created_by)?;
    let update = input.validate()?;
    if !state.store.update_task(id, &update).await? {
        return Err(AppError::NotFound("Tarea"));
    }
    Ok(done("Tarea actualizada correctamente"))
}

pub async fn delete_task(
    ApiUser(session): ApiUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let existing = task(&state, id).await?;
    authorize(&session, existing.created_by)?;
    if !state.store.delete_task(id).await? {
        return Err(AppError::NotFound("Tarea"));
    }
    tracing::info!(task_id = id, user = %session.username, "Task deleted");
    Ok(done("Tarea eliminada correctamente"))
}

/// Any status may follow any other.
pub async fn set_task_status(
    ApiUser(session): ApiUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    JsonBody(input): JsonBody<StatusInput>,
) -> Result<Json<Value>, AppError> {
    let existing = task(&state, id).await?;
    authorize(&session, existing.created_by)?;
    let raw = input
        .estado
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ValidationError::missing("estado"))?;
    let estado = TaskStatus::parse(raw)?;
    if !state.store.set_task_status(id, estado).await? {
        return Err(AppError::NotFound("Tarea"));
    }
    tracing::info!(task_id = id, from = %existing.estado, to = %estado, "Task status changed");
    Ok(done("Estado actualizado correctamente"))
}
