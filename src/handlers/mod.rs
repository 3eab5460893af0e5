use crate::models::config::AppConfig;
use crate::services::api_client::ApiClient;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_cookies::{CookieManagerLayer, Cookies};
use tower_http::{compression::CompressionLayer, services::ServeDir, trace::TraceLayer};
use tracing::warn;

pub mod auth;
pub mod flash;
pub mod jobs;
pub mod views;

use flash::Flash;

// State
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<ApiClient>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Email shown in the navigation bar, from the cached profile.
    pub fn nav_email(&self) -> Option<String> {
        self.api.current_user().map(|user| user.email)
    }
}

pub fn create_app(api: Arc<ApiClient>, config: AppConfig) -> Router {
    let state = AppState {
        api,
        config: Arc::new(config),
    };

    let guarded = Router::new()
        .route("/dashboard", get(jobs::dashboard_page))
        .route("/jobs/new", get(jobs::new_job_page).post(jobs::create_job_handler))
        .route("/jobs/:id", get(jobs::job_page))
        .route("/jobs/:id/start", post(jobs::start_job_handler))
        .route("/jobs/:id/pause", post(jobs::pause_job_handler))
        .route("/jobs/:id/stop", post(jobs::stop_job_handler))
        .route("/jobs/:id/delete", post(jobs::delete_job_handler))
        .route("/logout", post(auth::logout_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .route("/", get(root))
        .route("/login", get(auth::login_page).post(auth::login_handler))
        .route("/register", get(auth::register_page).post(auth::register_handler))
        .route("/api/health", get(api_health))
        .merge(guarded)
        .nest_service("/static", ServeDir::new("static"))
        .layer(middleware::from_fn(same_origin))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CookieManagerLayer::new())
        .with_state(state)
}

/// Every request acts with the one session this process holds, so forms posted
/// from another site are refused. Browsers send `Origin` (or at least `Referer`)
/// on cross-site posts; a request carrying neither is not from a browser page.
async fn same_origin(request: Request, next: Next) -> Response {
    if matches!(*request.method(), Method::GET | Method::HEAD | Method::OPTIONS) {
        return next.run(request).await;
    }
    let foreign = foreign_source(request.headers());
    match foreign {
        None => next.run(request).await,
        Some(source) => {
            warn!(source = %source, path = %request.uri().path(), "Rejected cross-site request");
            (StatusCode::FORBIDDEN, "Cross-site request rejected").into_response()
        }
    }
}

/// The `Origin`/`Referer` value when it names a different site than `Host`.
fn foreign_source(headers: &HeaderMap) -> Option<String> {
    let source = headers
        .get(header::ORIGIN)
        .or_else(|| headers.get(header::REFERER))?;
    let source = match source.to_str() {
        Ok(source) => source,
        Err(_) => return Some("<non-ascii>".to_string()),
    };
    let host = headers.get(header::HOST).and_then(|h| h.to_str().ok());

    match host {
        Some(host) if same_site(source, host) => None,
        _ => Some(source.to_string()),
    }
}

fn same_site(source: &str, host: &str) -> bool {
    let Ok(url) = reqwest::Url::parse(source) else {
        return false;
    };
    let Some(source_host) = url.host_str() else {
        return false;
    };
    let authority = match url.port() {
        Some(port) => format!("{}:{}", source_host, port),
        None => source_host.to_string(),
    };
    matches!(url.scheme(), "http" | "https") && authority.eq_ignore_ascii_case(host)
}

/// Sends anyone without a cached token to the login view.
async fn require_session(
    State(state): State<AppState>,
    cookies: Cookies,
    request: Request,
    next: Next,
) -> Response {
    if state.api.is_authenticated() {
        return next.run(request).await;
    }
    flash::set(&cookies, Flash::info("Please login to continue"));
    Redirect::to("/login").into_response()
}

// Routes
async fn root(State(state): State<AppState>) -> impl IntoResponse {
    if state.api.is_authenticated() {
        Redirect::to("/dashboard")
    } else {
        Redirect::to("/login")
    }
}

async fn api_health(State(state): State<AppState>) -> impl IntoResponse {
    let authenticated = state.api.is_authenticated();
    match state.api.health().await {
        Ok(health) => Json(json!({
            "backend": "ok",
            "authenticated": authenticated,
            "detail": health,
        })),
        Err(e) => Json(json!({
            "backend": "unreachable",
            "authenticated": authenticated,
            "error": e.to_string(),
        })),
    }
}
