use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{done, saved};
use crate::auth::{ApiUser, PageUser, Session};
use crate::domain::{AspectEntry, AspectInput, Source, ValidationError};
use crate::http::{pages, AppError, AppState, JsonBody, PageError};
use crate::state::models::AspectRecord;

#[derive(Debug, Default, Deserialize)]
pub struct SourceQuery {
    pub fuente: Option<String>,
}

/// `origen=fuente` marks a post from one of the source pages, which the
/// user returns to after saving.
#[derive(Debug, Default, Deserialize)]
pub struct OriginQuery {
    pub origen: Option<String>,
}

impl OriginQuery {
    fn from_source_page(&self) -> bool {
        self.origen.as_deref() == Some("fuente")
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CanvaBatch {
    pub elementos: Option<Vec<AspectInput>>,
}

/// The record behind `id`, provided `session` may change it.
async fn modifiable(state: &AppState, session: &Session, id: i64) -> Result<AspectRecord, AppError> {
    let record = state
        .store
        .get_aspect(id)
        .await?
        .ok_or(AppError::NotFound("Aspecto"))?;
    if !session.may_modify(record.created_by) {
        tracing::warn!(user = %session.username, aspect_id = id, "Modification refused");
        return Err(AppError::Forbidden);
    }
    Ok(record)
}

fn form_values(record: &AspectRecord) -> AspectInput {
    AspectInput {
        actividad: Some(record.actividad.clone()),
        tipo: Some(record.tipo.clone()),
        aspecto: Some(record.aspecto.clone()),
        fuente: Some(record.fuente.as_str().to_string()),
    }
}

// ─── HTML ───────────────────────────────────────────────────────────────────

pub async fn list_page(
    PageUser(session): PageUser,
    State(state): State<AppState>,
) -> Result<Html<String>, PageError> {
    let records = state.store.list_aspects(None).await?;
    Ok(pages::aspect_list_page(&session, &records))
}

pub async fn create_form(PageUser(session): PageUser) -> Html<String> {
    pages::aspect_form_page(
        &session,
        "Nuevo aspecto",
        "/aspectos/crear",
        &AspectInput::default(),
        None,
    )
}

pub async fn create(
    PageUser(session): PageUser,
    State(state): State<AppState>,
    Query(origin): Query<OriginQuery>,
    Form(input): Form<AspectInput>,
) -> Result<Response, PageError> {
    let entry = match input.validate() {
        Ok(entry) => entry,
        Err(e) => {
            let action = if origin.from_source_page() {
                "/aspectos/crear?origen=fuente"
            } else {
                "/aspectos/crear"
            };
            let page = pages::aspect_form_page(&session, "Nuevo aspecto", action, &input, Some(&e));
            return Ok((StatusCode::BAD_REQUEST, page).into_response());
        }
    };
    let id = state.store.insert_aspect(&entry, Some(session.user_id)).await?;
    tracing::info!(aspect_id = id, fuente = %entry.source(), user = %session.username, "Aspect created");
    let target = if origin.from_source_page() {
        entry.source().page_path()
    } else {
        "/aspectos"
    };
    Ok(Redirect::to(target).into_response())
}

pub async fn edit_form(
    PageUser(session): PageUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Html<String>, PageError> {
    let record = modifiable(&state, &session, id).await?;
    Ok(pages::aspect_form_page(
        &session,
        "Editar aspecto",
        &format!("/aspectos/{}/editar", id),
        &form_values(&record),
        None,
    ))
}

pub async fn edit(
    PageUser(session): PageUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(input): Form<AspectInput>,
) -> Result<Response, PageError> {
    modifiable(&state, &session, id).await?;
    let entry = match input.validate() {
        Ok(entry) => entry,
        Err(e) => {
            let action = format!("/aspectos/{}/editar", id);
            let page = pages::aspect_form_page(&session, "Editar aspecto", &action, &input, Some(&e));
            return Ok((StatusCode::BAD_REQUEST, page).into_response());
        }
    };
    if !state.store.update_aspect(id, &entry).await? {
        return Err(AppError::NotFound("Aspecto").into());
    }
    tracing::info!(aspect_id = id, user = %session.username, "Aspect updated");
    Ok(Redirect::to("/aspectos").into_response())
}

/// Form-button deletion. Refusals answer JSON like the API route.
pub async fn delete_page(
    PageUser(session): PageUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    remove(&state, &session, id).await?;
    Ok(Redirect::to("/aspectos"))
}

async fn remove(state: &AppState, session: &Session, id: i64) -> Result<(), AppError> {
    modifiable(state, session, id).await?;
    if !state.store.delete_aspect(id).await? {
        return Err(AppError::NotFound("Aspecto"));
    }
    tracing::info!(aspect_id = id, user = %session.username, "Aspect deleted");
    Ok(())
}

async fn source_listing(
    session: Session,
    state: AppState,
    source: Source,
) -> Result<Html<String>, PageError> {
    let records = state.store.list_aspects(Some(source)).await?;
    Ok(pages::source_page(&session, source, &records))
}

pub async fn foda_ext_page(
    PageUser(session): PageUser,
    State(state): State<AppState>,
) -> Result<Html<String>, PageError> {
    source_listing(session, state, Source::FodaExt).await
}

pub async fn foda_int_page(
    PageUser(session): PageUser,
    State(state): State<AppState>,
) -> Result<Html<String>, PageError> {
    source_listing(session, state, Source::FodaInt).await
}

pub async fn canva_page(
    PageUser(session): PageUser,
    State(state): State<AppState>,
) -> Result<Html<String>, PageError> {
    source_listing(session, state, Source::Canva).await
}

// ─── JSON ───────────────────────────────────────────────────────────────────

pub async fn list_json(
    ApiUser(_): ApiUser,
    State(state): State<AppState>,
    Query(query): Query<SourceQuery>,
) -> Result<Json<Vec<AspectRecord>>, AppError> {
    let source = match query.fuente.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(Source::parse(raw)?),
        _ => None,
    };
    Ok(Json(state.store.list_aspects(source).await?))
}

pub async fn delete_json(
    ApiUser(session): ApiUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    remove(&state, &session, id).await?;
    Ok(done("Aspecto eliminado correctamente"))
}

async fn save_for(
    state: &AppState,
    session: &Session,
    source: Source,
    input: &AspectInput,
) -> Result<Json<Value>, AppError> {
    let entry = input.validate_for(source)?;
    let id = state.store.insert_aspect(&entry, Some(session.user_id)).await?;
    tracing::info!(aspect_id = id, fuente = %source, user = %session.username, "Aspect saved");
    Ok(saved(id, &format!("Registro de {} guardado correctamente", source.title())))
}

pub async fn save_foda_ext(
    ApiUser(session): ApiUser,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<AspectInput>,
) -> Result<Json<Value>, AppError> {
    save_for(&state, &session, Source::FodaExt, &input).await
}

pub async fn save_foda_int(
    ApiUser(session): ApiUser,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<AspectInput>,
) -> Result<Json<Value>, AppError> {
    save_for(&state, &session, Source::FodaInt, &input).await
}

pub async fn save_canva(
    ApiUser(session): ApiUser,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<AspectInput>,
) -> Result<Json<Value>, AppError> {
    save_for(&state, &session, Source::Canva, &input).await
}

/// Drag-and-drop board save: every element is validated before any insert,
/// and the inserts share one transaction.
pub async fn save_canva_bulk(
    ApiUser(session): ApiUser,
    State(state): State<AppState>,
    JsonBody(batch): JsonBody<CanvaBatch>,
) -> Result<Json<Value>, AppError> {
    let elementos = batch.elementos.ok_or_else(|| ValidationError::missing("elementos"))?;
    if elementos.is_empty() {
        return Err(ValidationError::new("elementos", "No hay elementos para guardar").into());
    }
    let entries = elementos
        .iter()
        .enumerate()
        .map(|(i, input)| {
            input.validate_for(Source::Canva).map_err(|e| {
                ValidationError::new(e.field, format!("Elemento {}: {}", i + 1, e.message))
            })
        })
        .collect::<Result<Vec<AspectEntry>, _>>()?;

    let ids = state.store.insert_aspects(&entries, Some(session.user_id)).await?;
    tracing::info!(count = ids.len(), user = %session.username, "Canvas board saved");
    Ok(Json(json!({
        "success": true,
        "ids": ids,
        "guardados": ids.len(),
        "mensaje": format!("{} elementos guardados correctamente", ids.len()),
    })))
}

