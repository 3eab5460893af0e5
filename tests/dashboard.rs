mod support;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use darkwatch::handlers::create_app;
use darkwatch::models::config::AppConfig;
use darkwatch::services::session::{MemorySessionStore, SessionStore};
use serde_json::json;
use std::sync::Arc;
use support::{job_json, user_json, FakeBackend};
use tower::ServiceExt;

fn app(backend: &FakeBackend, token: Option<&str>) -> (Router, Arc<MemorySessionStore>) {
    let (client, store) = match token {
        Some(token) => backend.client_with_token(token),
        None => backend.client(),
    };
    (create_app(Arc::new(client), AppConfig::default()), store)
}

struct Reply {
    status: StatusCode,
    location: Option<String>,
    set_cookie: Vec<String>,
    body: String,
}

async fn send(app: &Router, method: Method, uri: &str, form: Option<&str>) -> Reply {
    send_with_headers(app, method, uri, form, &[]).await
}

async fn send_with_headers(
    app: &Router,
    method: Method,
    uri: &str,
    form: Option<&str>,
    headers: &[(header::HeaderName, &str)],
) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(name.clone(), *value);
    }
    let body = match form {
        Some(form) => {
            builder = builder.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
            Body::from(form.to_string())
        }
        None => Body::empty(),
    };
    let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();

    let status = resp.status();
    let location = resp
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string());
    let set_cookie = resp
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    Reply {
        status,
        location,
        set_cookie,
        body: String::from_utf8_lossy(&body).into_owned(),
    }
}

#[tokio::test]
async fn anonymous_users_are_sent_to_login() {
    let backend = FakeBackend::start().await;
    let (app, _store) = app(&backend, None);

    for uri in ["/dashboard", "/jobs/new", "/jobs/1"] {
        let reply = send(&app, Method::GET, uri, None).await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER, "{}", uri);
        assert_eq!(reply.location.as_deref(), Some("/login"));
        assert!(reply.set_cookie.iter().any(|c| c.starts_with("darkwatch_flash=")));
    }
    assert!(backend.requests().is_empty());

    let root = send(&app, Method::GET, "/", None).await;
    assert_eq!(root.location.as_deref(), Some("/login"));
}

#[tokio::test]
async fn login_page_renders_form() {
    let backend = FakeBackend::start().await;
    let (app, _store) = app(&backend, None);

    let reply = send(&app, Method::GET, "/login", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("action=\"/login\""));

    let reply = send(&app, Method::GET, "/register", None).await;
    assert!(reply.body.contains("confirm_password"));
}

#[tokio::test]
async fn dashboard_loads_profile_and_jobs_together() {
    let backend = FakeBackend::start().await;
    backend.respond(Method::GET, "/auth/profile", StatusCode::OK, json!({"success": true, "user": user_json()}));
    backend.respond(
        Method::GET,
        "/jobs",
        StatusCode::OK,
        json!({"success": true, "total": 2, "jobs": [
            job_json(1, "Sequoia", "running"),
            job_json(2, "Accel", "paused"),
        ]}),
    );
    let (app, _store) = app(&backend, Some("tok"));

    let root = send(&app, Method::GET, "/", None).await;
    assert_eq!(root.location.as_deref(), Some("/dashboard"));

    let reply = send(&app, Method::GET, "/dashboard", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("Sequoia"));
    assert!(reply.body.contains("Accel"));
    assert!(reply.body.contains("status-running"));
    assert!(reply.body.contains("/jobs/2/start"));
    assert_eq!(backend.requests_to("/auth/profile").len(), 1);
    assert_eq!(backend.requests_to("/jobs").len(), 1);
}

#[tokio::test]
async fn dashboard_load_failure_redirects_to_login() {
    let backend = FakeBackend::start().await;
    backend.respond(Method::GET, "/auth/profile", StatusCode::OK, json!({"success": true, "user": user_json()}));
    backend.respond(Method::GET, "/jobs", StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "database down"}));
    let (app, store) = app(&backend, Some("tok"));

    let reply = send(&app, Method::GET, "/dashboard", None).await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location.as_deref(), Some("/login"));
    // Not a 401, so the session itself survives.
    assert!(store.is_authenticated());
}

#[tokio::test]
async fn invalid_job_form_is_rejected_without_backend_call() {
    let backend = FakeBackend::start().await;
    let (app, _store) = app(&backend, Some("tok"));

    let reply = send(
        &app,
        Method::POST,
        "/jobs/new",
        Some("name=Portfolio&url=https%3A%2F%2Fvc.example.com&check_interval_minutes=1441"),
    )
    .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body.contains("between 1 and 1440"));
    assert!(reply.body.contains("value=\"1441\""));
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn valid_job_form_creates_and_returns_to_dashboard() {
    let backend = FakeBackend::start().await;
    backend.respond(
        Method::POST,
        "/jobs",
        StatusCode::CREATED,
        json!({"success": true, "job": job_json(11, "Portfolio", "created")}),
    );
    let (app, _store) = app(&backend, Some("tok"));

    let reply = send(
        &app,
        Method::POST,
        "/jobs/new",
        Some("name=Portfolio&url=https%3A%2F%2Fvc.example.com&check_interval_minutes=1440"),
    )
    .await;

    assert_eq!(reply.location.as_deref(), Some("/dashboard"));
    assert_eq!(backend.requests_to("/jobs")[0].body.as_ref().unwrap()["check_interval_minutes"], 1440);
}

#[tokio::test]
async fn failed_login_rerenders_with_backend_message() {
    let backend = FakeBackend::start().await;
    backend.respond(Method::POST, "/auth/login", StatusCode::BAD_REQUEST, json!({"error": "invalid credentials"}));
    let (app, store) = app(&backend, None);

    let reply = send(&app, Method::POST, "/login", Some("email=a%40b.com&password=nope")).await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body.contains("invalid credentials"));
    assert!(reply.body.contains("value=\"a@b.com\""));
    assert!(!store.is_authenticated());
}

#[tokio::test]
async fn successful_login_redirects_to_dashboard() {
    let backend = FakeBackend::start().await;
    backend.respond(
        Method::POST,
        "/auth/login",
        StatusCode::OK,
        json!({"success": true, "token": "tok123", "user": user_json()}),
    );
    let (app, store) = app(&backend, None);

    let reply = send(&app, Method::POST, "/login", Some("email=a%40b.com&password=secret1")).await;

    assert_eq!(reply.location.as_deref(), Some("/dashboard"));
    assert_eq!(store.token().as_deref(), Some("tok123"));
}

#[tokio::test]
async fn failed_job_action_notifies_without_logging_out() {
    let backend = FakeBackend::start().await;
    backend.respond(Method::POST, "/jobs/7/pause", StatusCode::CONFLICT, json!({"error": "Job is not running"}));
    let (app, store) = app(&backend, Some("tok"));

    let reply = send(&app, Method::POST, "/jobs/7/pause", Some("return_to=%2Fjobs%2F7")).await;

    assert_eq!(reply.location.as_deref(), Some("/jobs/7"));
    assert!(reply.set_cookie.iter().any(|c| c.starts_with("darkwatch_flash=")));
    assert!(store.is_authenticated());
}

#[tokio::test]
async fn unauthorized_job_action_forces_login() {
    let backend = FakeBackend::start().await;
    backend.respond(Method::POST, "/jobs/7/stop", StatusCode::UNAUTHORIZED, json!({}));
    let (app, store) = app(&backend, Some("tok"));

    let reply = send(&app, Method::POST, "/jobs/7/stop", Some("return_to=%2Fdashboard")).await;

    assert_eq!(reply.location.as_deref(), Some("/login"));
    assert!(!store.is_authenticated());
}

#[tokio::test]
async fn job_page_renders_results_without_stats() {
    let backend = FakeBackend::start().await;
    backend.respond(Method::GET, "/jobs/4", StatusCode::OK, json!({"success": true, "job": job_json(4, "Benchmark", "running")}));
    backend.respond(
        Method::GET,
        "/jobs/4/results",
        StatusCode::OK,
        json!({"success": true, "total_results": 1, "results": [{
            "type": "new_portfolio_companies",
            "description": "Two companies added",
            "new_companies": ["Acme Robotics", "Globex"],
            "ai_analysis": {"summary": "Seed-stage robotics investments", "new_companies_detected": true}
        }]}),
    );
    let (app, _store) = app(&backend, Some("tok"));

    let reply = send(&app, Method::GET, "/jobs/4?limit=10", None).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("Benchmark"));
    assert!(reply.body.contains("Acme Robotics"));
    assert!(reply.body.contains("Seed-stage robotics investments"));
    assert!(reply.body.contains("New companies detected"));
    assert_eq!(backend.requests_to("/jobs/4/results")[0].query.as_deref(), Some("limit=10"));
    assert_eq!(backend.requests_to("/jobs/4/stats").len(), 1);
}

#[tokio::test]
async fn logout_clears_session_and_returns_to_login() {
    let backend = FakeBackend::start().await;
    backend.respond(Method::POST, "/auth/logout", StatusCode::OK, json!({"success": true}));
    let (app, store) = app(&backend, Some("tok"));

    let reply = send(&app, Method::POST, "/logout", None).await;

    assert_eq!(reply.location.as_deref(), Some("/login"));
    assert!(!store.is_authenticated());
}

#[tokio::test]
async fn cross_site_posts_never_reach_the_backend() {
    let backend = FakeBackend::start().await;
    backend.respond(Method::DELETE, "/jobs/3", StatusCode::OK, json!({"success": true}));
    let (app, store) = app(&backend, Some("tok"));

    for uri in ["/jobs/3/delete", "/logout", "/login"] {
        let reply = send_with_headers(
            &app,
            Method::POST,
            uri,
            Some("email=a%40b.com&password=secret1"),
            &[(header::HOST, "127.0.0.1:5001"), (header::ORIGIN, "https://evil.example")],
        )
        .await;
        assert_eq!(reply.status, StatusCode::FORBIDDEN, "{}", uri);
    }

    let referer_only = send_with_headers(
        &app,
        Method::POST,
        "/jobs/3/delete",
        None,
        &[(header::HOST, "127.0.0.1:5001"), (header::REFERER, "https://evil.example/page")],
    )
    .await;
    assert_eq!(referer_only.status, StatusCode::FORBIDDEN);

    assert!(backend.requests().is_empty());
    assert_eq!(store.token().as_deref(), Some("tok"));
}

#[tokio::test]
async fn same_site_posts_are_forwarded() {
    let backend = FakeBackend::start().await;
    backend.respond(Method::DELETE, "/jobs/3", StatusCode::OK, json!({"success": true}));
    let (app, _store) = app(&backend, Some("tok"));

    let reply = send_with_headers(
        &app,
        Method::POST,
        "/jobs/3/delete",
        Some("return_to=%2Fjobs%2F3"),
        &[(header::HOST, "127.0.0.1:5001"), (header::ORIGIN, "http://127.0.0.1:5001")],
    )
    .await;

    assert_eq!(reply.location.as_deref(), Some("/dashboard"));
    assert_eq!(backend.requests_to("/jobs/3").len(), 1);
}

#[tokio::test]
async fn encoded_slash_in_job_id_is_not_found() {
    let backend = FakeBackend::start().await;
    let (app, store) = app(&backend, Some("tok"));

    let reply = send(&app, Method::POST, "/jobs/1%2Fstart/delete", None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = send(&app, Method::GET, "/jobs/..%2Fstats", None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    assert!(backend.requests().is_empty());
    assert!(store.is_authenticated());
}

#[tokio::test]
async fn tokenless_login_reply_is_a_failure_even_with_a_cached_session() {
    let backend = FakeBackend::start().await;
    backend.respond(
        Method::POST,
        "/auth/login",
        StatusCode::OK,
        json!({"success": false, "message": "Account locked"}),
    );
    let (app, _store) = app(&backend, Some("old-tok"));

    let reply = send(&app, Method::POST, "/login", Some("email=a%40b.com&password=secret1")).await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body.contains("Account locked"));
    assert_eq!(reply.location, None);
}

