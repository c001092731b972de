pub mod admin;
pub mod aspects;
pub mod auth;
pub mod ops;
pub mod plans;
pub mod strategies;

use axum::Json;
use serde_json::{json, Value};

/// Success body of the create endpoints.
pub(crate) fn saved(id: i64, mensaje: &str) -> Json<Value> {
    Json(json!({ "success": true, "id": id, "mensaje": mensaje }))
}

/// Success body of updates and deletions.
pub(crate) fn done(mensaje: &str) -> Json<Value> {
    Json(json!({ "success": true, "mensaje": mensaje }))
}
