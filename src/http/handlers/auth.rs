use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use crate::auth::{burn_verification, verify_password, PageUser, Session, SessionKeys};
use crate::http::{pages, AppState, PageError};

const BAD_CREDENTIALS: &str = "Usuario o contraseña incorrectos";
const STORE_UNAVAILABLE: &str = "Error de conexión a la base de datos";

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    pub username: Option<String>,
    pub password: Option<String>,
}

pub async fn index() -> Redirect {
    Redirect::to("/login")
}

/// Already signed-in visitors skip the form.
pub async fn login_form(user: Option<PageUser>) -> Response {
    match user {
        Some(PageUser(session)) => Redirect::to(session.rol.landing_path()).into_response(),
        None => pages::login_page(None).into_response(),
    }
}

pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let username = form.username.unwrap_or_default().trim().to_string();
    let password = form.password.unwrap_or_default();

    let user = match state.store.get_user_by_username(&username).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "User lookup failed");
            return (StatusCode::SERVICE_UNAVAILABLE, pages::login_page(Some(STORE_UNAVAILABLE)))
                .into_response();
        }
    };

    let verified = match user {
        Some(user) => {
            let stored = user.password_hash.clone();
            let ok = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
                .await
                .unwrap_or(false);
            ok.then_some(user)
        }
        None => {
            // Same cost as a real check so timing does not reveal the account.
            let _ = tokio::task::spawn_blocking(move || burn_verification(&password)).await;
            None
        }
    };

    let Some(user) = verified else {
        tracing::warn!(username = %username, "Rejected login");
        return (StatusCode::UNAUTHORIZED, pages::login_page(Some(BAD_CREDENTIALS))).into_response();
    };

    let session = Session {
        user_id: user.id,
        username: user.username,
        rol: user.role,
    };
    match state.sessions.set_cookie(&session) {
        Ok(cookie) => {
            tracing::info!(user = %session.username, rol = %session.rol, "Logged in");
            (
                [(SET_COOKIE, cookie)],
                Redirect::to(session.rol.landing_path()),
            )
                .into_response()
        }
        Err(e) => PageError::from(e).into_response(),
    }
}

pub async fn logout() -> impl IntoResponse {
    ([(SET_COOKIE, SessionKeys::clear_cookie())], Redirect::to("/login"))
}

pub async fn home(
    PageUser(session): PageUser,
    State(state): State<AppState>,
) -> Result<Html<String>, PageError> {
    let counts = state.store.counts().await?;
    let recent = state.store.recent_aspects(5).await?;
    Ok(pages::home_page(&session, &counts, &recent))
}
