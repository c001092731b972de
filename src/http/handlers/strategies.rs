use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{done, saved};
use crate::auth::{ApiUser, PageUser, Session};
use crate::domain::aspect::Labelled;
use crate::domain::{CrossType, Source, StrategicAxis, StrategyInput, ValidationError};
use crate::graph;
use crate::http::{pages, AppError, AppState, JsonBody, PageError};
use crate::state::models::{StrategyFilter, StrategyRecord};

#[derive(Debug, Default, Deserialize)]
pub struct StrategyQuery {
    pub tipo_cruce: Option<String>,
    pub eje_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GraphQuery {
    pub formato: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AxisView {
    pub id: &'static str,
    pub label: &'static str,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub async fn cross_page(
    PageUser(session): PageUser,
    State(state): State<AppState>,
) -> Result<Html<String>, PageError> {
    let internal = state.store.list_aspects(Some(Source::FodaInt)).await?;
    let external = state.store.list_aspects(Some(Source::FodaExt)).await?;
    let strategies = state.store.list_strategies(&StrategyFilter::default()).await?;
    Ok(pages::cross_page(&session, &internal, &external, &strategies))
}

async fn save(
    state: &AppState,
    session: &Session,
    input: &StrategyInput,
    require_axis: bool,
) -> Result<Json<Value>, AppError> {
    let strategy = input.validate(require_axis)?;
    let id = state.store.insert_strategy(&strategy, Some(session.user_id)).await?;
    tracing::info!(
        strategy_id = id,
        tipo_cruce = strategy.cross_type.as_str(),
        eje = strategy.axis.map(|a| a.id()).unwrap_or("-"),
        user = %session.username,
        "Strategy saved"
    );
    Ok(saved(id, "Estrategia guardada correctamente"))
}

pub async fn save_cross(
    ApiUser(session): ApiUser,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<StrategyInput>,
) -> Result<Json<Value>, AppError> {
    save(&state, &session, &input, false).await
}

pub async fn save_axis(
    ApiUser(session): ApiUser,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<StrategyInput>,
) -> Result<Json<Value>, AppError> {
    save(&state, &session, &input, true).await
}

pub async fn list(
    ApiUser(_): ApiUser,
    State(state): State<AppState>,
    Query(query): Query<StrategyQuery>,
) -> Result<Json<Vec<StrategyRecord>>, AppError> {
    let filter = StrategyFilter {
        tipo_cruce: present(&query.tipo_cruce).map(CrossType::parse).transpose()?,
        eje_id: present(&query.eje_id)
            .map(|raw| StrategicAxis::parse_field("eje_id", raw))
            .transpose()?
            .map(|axis| axis.id().to_string()),
    };
    Ok(Json(state.store.list_strategies(&filter).await?))
}

/// Graph of every strategy, as JSON nodes/edges or `?formato=dot`.
pub async fn graph(
    ApiUser(_): ApiUser,
    State(state): State<AppState>,
    Query(query): Query<GraphQuery>,
) -> Result<Response, AppError> {
    let strategies = state.store.list_strategies(&StrategyFilter::default()).await?;
    let built = graph::build_graph(&strategies);
    match present(&query.formato) {
        None | Some("json") => Ok(Json(graph::to_payload(&built)).into_response()),
        Some("dot") => Ok((
            [(CONTENT_TYPE, "text/vnd.graphviz; charset=utf-8")],
            graph::to_dot(&built),
        )
            .into_response()),
        Some(other) => Err(ValidationError::not_in("formato", other, &["json", "dot"]).into()),
    }
}

/// Deletes the strategy along with its activities and their tasks.
pub async fn remove(
    ApiUser(session): ApiUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let strategy = state
        .store
        .get_strategy(id)
        .await?
        .ok_or(AppError::NotFound("Estrategia"))?;
    if !session.may_modify(strategy.created_by) {
        return Err(AppError::Forbidden);
    }
    if !state.store.delete_strategy(id).await? {
        return Err(AppError::NotFound("Estrategia"));
    }
    tracing::info!(strategy_id = id, user = %session.username, "Strategy deleted");
    Ok(done("Estrategia eliminada correctamente"))
}

pub async fn axes(ApiUser(_): ApiUser) -> Json<Vec<AxisView>> {
    Json(
        StrategicAxis::ALL
            .iter()
            .map(|axis| AxisView {
                id: axis.id(),
                label: axis.display_label(),
            })
            .collect(),
    )
}
