use super::flash::{self, Flash};
use super::views::{render, render_with_status, AuthTemplate};
use super::AppState;
use crate::error::ApiError;
use crate::models::api::AuthResponse;
use crate::models::user::Credentials;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use tower_cookies::Cookies;
use tracing::info;

fn auth_page(state: &AppState, cookies: &Cookies, register: bool) -> Response {
    let template = AuthTemplate {
        flash: flash::take(cookies),
        nav_email: state.nav_email(),
        register,
        email: String::new(),
        error: None,
    };
    render(&template)
}

fn auth_failed(register: bool, email: &str, message: String) -> Response {
    let template = AuthTemplate {
        flash: None,
        nav_email: None,
        register,
        email: email.trim().to_string(),
        error: Some(message),
    };
    render_with_status(StatusCode::BAD_REQUEST, &template)
}

pub async fn login_page(State(state): State<AppState>, cookies: Cookies) -> Response {
    auth_page(&state, &cookies, false)
}

pub async fn register_page(State(state): State<AppState>, cookies: Cookies) -> Response {
    auth_page(&state, &cookies, true)
}

pub async fn login_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(credentials): Form<Credentials>,
) -> Response {
    let result = state.api.login(&credentials).await;
    finish_auth(&cookies, &credentials, result, false, "Welcome back!")
}

pub async fn register_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(credentials): Form<Credentials>,
) -> Response {
    let result = state.api.register(&credentials).await;
    finish_auth(&cookies, &credentials, result, true, "Account created.")
}

fn finish_auth(
    cookies: &Cookies,
    credentials: &Credentials,
    result: Result<AuthResponse, ApiError>,
    register: bool,
    greeting: &str,
) -> Response {
    match result {
        Ok(response) if response.token.is_some() => {
            flash::set(cookies, Flash::success(greeting));
            Redirect::to("/dashboard").into_response()
        }
        // A 2xx without a token, e.g. `{"success": false, "message": ...}`.
        Ok(response) => auth_failed(
            register,
            &credentials.email,
            response
                .message
                .unwrap_or_else(|| "Authentication failed".to_string()),
        ),
        Err(e) => auth_failed(register, &credentials.email, e.to_string()),
    }
}

pub async fn logout_handler(State(state): State<AppState>, cookies: Cookies) -> Response {
    match state.api.logout().await {
        Ok(()) => {
            info!("User logged out");
            flash::set(&cookies, Flash::success("You have been logged out."));
        }
        Err(e) => flash::set(&cookies, Flash::error(e.to_string())),
    }
    Redirect::to("/login").into_response()
}
