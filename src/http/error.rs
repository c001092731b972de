use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use super::pages;
use crate::domain::ValidationError;

/// Error taxonomy of the JSON routes.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Debe iniciar sesión")]
    Unauthorized,

    #[error("No tiene permisos para realizar esta acción")]
    Forbidden,

    #[error("{0} no existe")]
    NotFound(&'static str),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Error interno del servidor")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn log(&self) {
        if let AppError::Internal(e) = self {
            tracing::error!(error = %format!("{:#}", e), "Request failed");
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        let body = match &self {
            AppError::Validation(e) => json!({
                "success": false,
                "error": e.message,
                "campo": e.field,
            }),
            other => json!({
                "success": false,
                "error": other.to_string(),
            }),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Same taxonomy rendered for browsers: a redirect to the login form or an
/// HTML error page.
#[derive(Debug)]
pub struct PageError(pub AppError);

impl From<AppError> for PageError {
    fn from(e: AppError) -> Self {
        PageError(e)
    }
}

impl From<anyhow::Error> for PageError {
    fn from(e: anyhow::Error) -> Self {
        PageError(AppError::Internal(e))
    }
}

impl From<ValidationError> for PageError {
    fn from(e: ValidationError) -> Self {
        PageError(AppError::Validation(e))
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let PageError(inner) = self;
        if let AppError::Unauthorized = inner {
            return Redirect::to("/login").into_response();
        }
        inner.log();
        let status = inner.status();
        (status, pages::error_page(status, &inner.to_string())).into_response()
    }
}
