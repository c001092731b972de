//! HTTP surface: HTML pages for the analysis forms, JSON endpoints for the
//! scripts behind them, and the admin reporting API.

pub mod error;
pub mod handlers;
pub mod json;
pub mod middleware;
pub mod pages;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use tokio::net::TcpListener;

use crate::auth::SessionKeys;
use crate::config::AppConfig;
use crate::state::StoreBackend;

pub use error::{AppError, PageError};
pub use json::JsonBody;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StoreBackend>,
    pub sessions: Arc<SessionKeys>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn StoreBackend>, config: AppConfig) -> Self {
        Self {
            store,
            sessions: Arc::new(SessionKeys::new(&config.secret_key)),
            config: Arc::new(config),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    use handlers::{admin, aspects, auth, ops, plans, strategies};

    Router::new()
        // Session
        .route("/", get(auth::index))
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/inicio", get(auth::home))
        .route("/admin", get(admin::dashboard))
        // Aspect records
        .route("/aspectos", get(aspects::list_page))
        .route("/aspectos/crear", get(aspects::create_form).post(aspects::create))
        .route("/aspectos/:id/editar", get(aspects::edit_form).post(aspects::edit))
        .route("/aspectos/:id/eliminar", post(aspects::delete_page))
        .route("/api/aspectos", get(aspects::list_json))
        .route("/api/aspectos/:id", delete(aspects::delete_json))
        .route("/guardar_foda_ext", post(aspects::save_foda_ext))
        .route("/guardar_foda_int", post(aspects::save_foda_int))
        .route("/guardar_canva", post(aspects::save_canva))
        .route("/guardar_actividad_canva", post(aspects::save_canva_bulk))
        .route("/fodaext", get(aspects::foda_ext_page))
        .route("/fodaint", get(aspects::foda_int_page))
        .route("/canvas", get(aspects::canva_page))
        // Cross-strategies
        .route("/cruzado", get(strategies::cross_page))
        .route("/guardar_estrategia_foda", post(strategies::save_cross))
        .route("/guardar_estrategia_eje", post(strategies::save_axis))
        .route("/api/estrategias_foda", get(strategies::list))
        .route("/api/estrategias_foda/grafo", get(strategies::graph))
        .route("/api/estrategias_foda/:id", delete(strategies::remove))
        .route("/api/ejes", get(strategies::axes))
        // Activities and tasks
        .route(
            "/api/estrategias_foda/:id/actividades",
            get(plans::list_activities).post(plans::create_activity),
        )
        .route(
            "/api/actividades/:id",
            put(plans::update_activity).delete(plans::delete_activity),
        )
        .route(
            "/api/actividades/:id/tareas",
            get(plans::list_tasks).post(plans::create_task),
        )
        .route("/api/tareas/:id", put(plans::update_task).delete(plans::delete_task))
        .route("/api/tareas/:id/estado", patch(plans::set_task_status))
        // Reporting
        .route("/api/admin/filtrar", get(admin::filter))
        .route("/api/admin/exportar_csv", get(admin::export_csv))
        .route("/api/admin/estadisticas", get(admin::statistics))
        // Operations
        .route("/check", get(ops::check))
        .route("/init-db", get(ops::init_db))
        .route("/migrate-db", get(ops::migrate_db))
        .fallback(not_found)
        .layer(axum::middleware::from_fn(middleware::request_tracing_middleware))
        .with_state(state)
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        pages::error_page(StatusCode::NOT_FOUND, "Página no encontrada"),
    )
}

/// Bind `config.bind_address()` and serve until the process is stopped.
pub async fn serve(state: AppState) -> Result<()> {
    let address = state.config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!(address = %address, "Listening");
    axum::serve(listener, build_router(state))
        .await
        .context("HTTP server failed")
}
