//! Request extractors for the two authorization tiers.
//!
//! Page extractors reject with a redirect; API extractors reject with a JSON
//! error so scripts get a status code instead of a login form.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};

use super::session::Session;
use crate::http::{AppError, AppState, PageError};

/// Any logged-in user on an HTML route.
pub struct PageUser(pub Session);

/// An admin on an HTML route.
pub struct PageAdmin(pub Session);

/// Any logged-in user on a JSON route.
pub struct ApiUser(pub Session);

/// An admin on a JSON route.
pub struct ApiAdmin(pub Session);

/// The cookie's session, refreshed from the stored account on every request.
/// A deleted account yields no session and the stored role overrides the one
/// signed into the cookie.
async fn current_session(parts: &Parts, state: &AppState) -> Result<Option<Session>, AppError> {
    let Some(session) = state.sessions.from_headers(&parts.headers) else {
        return Ok(None);
    };
    let Some(user) = state.store.get_user(session.user_id).await? else {
        tracing::info!(user = %session.username, "Session refers to a missing account");
        return Ok(None);
    };
    Ok(Some(Session {
        user_id: user.id,
        username: user.username,
        rol: user.role,
    }))
}

#[async_trait]
impl FromRequestParts<AppState> for PageUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match current_session(parts, state).await {
            Ok(Some(session)) => Ok(PageUser(session)),
            Ok(None) => Err(Redirect::to("/login").into_response()),
            Err(e) => Err(PageError(e).into_response()),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for PageAdmin {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match current_session(parts, state).await {
            Ok(Some(session)) if session.rol.is_admin() => Ok(PageAdmin(session)),
            Ok(Some(session)) => {
                tracing::debug!(user = %session.username, "Non-admin sent to landing page");
                Err(Redirect::to("/inicio").into_response())
            }
            Ok(None) => Err(Redirect::to("/login").into_response()),
            Err(e) => Err(PageError(e).into_response()),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for ApiUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        current_session(parts, state)
            .await?
            .map(ApiUser)
            .ok_or(AppError::Unauthorized)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for ApiAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match current_session(parts, state).await? {
            Some(session) if session.rol.is_admin() => Ok(ApiAdmin(session)),
            Some(_) => Err(AppError::Forbidden),
            None => Err(AppError::Unauthorized),
        }
    }
}
