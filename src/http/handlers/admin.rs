use axum::extract::{Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;

use crate::auth::{ApiAdmin, PageAdmin};
use crate::http::{pages, AppError, AppState, PageError};
use crate::report::csv::export_filename;
use crate::report::{format_csv, stats, FilterParams, FilterResponse, Statistics};
use crate::state::models::now;

pub async fn dashboard(
    PageAdmin(session): PageAdmin,
    State(state): State<AppState>,
) -> Result<Html<String>, PageError> {
    let users = state.store.list_users().await?;
    let counts = state.store.counts().await?;
    let recent = state.store.recent_aspects(10).await?;
    Ok(pages::admin_page(&session, &users, &counts, &recent))
}

pub async fn filter(
    ApiAdmin(_): ApiAdmin,
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> Result<Json<FilterResponse>, AppError> {
    let query = params.to_page_query()?;
    let page = state.store.query_aspects(&query).await?;
    Ok(Json(FilterResponse::new(
        page,
        query.pagination.unwrap_or_default(),
    )))
}

/// Same filter as `filter`; exports every matching row unless a page is asked for.
pub async fn export_csv(
    ApiAdmin(session): ApiAdmin,
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> Result<Response, AppError> {
    let query = params.to_export_query()?;
    let page = state.store.query_aspects(&query).await?;
    let filename = export_filename(&now());
    tracing::info!(rows = page.items.len(), user = %session.username, "CSV export");
    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        format_csv(&page.items),
    )
        .into_response())
}

pub async fn statistics(
    ApiAdmin(_): ApiAdmin,
    State(state): State<AppState>,
) -> Result<Json<Statistics>, AppError> {
    Ok(Json(stats::collect(state.store.as_ref()).await?))
}
