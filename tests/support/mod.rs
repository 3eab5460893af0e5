//! In-process stand-in for the Dark Watch backend.
//!
//! Serves canned responses keyed by method and path, and records every
//! request it receives so tests can assert on headers and bodies.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use darkwatch::models::config::BackendConfig;
use darkwatch::services::api_client::ApiClient;
use darkwatch::services::session::{MemorySessionStore, SessionStore};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Option<Value>,
}

#[derive(Clone)]
struct Canned {
    status: StatusCode,
    body: String,
    delay: Option<Duration>,
}

#[derive(Clone, Default)]
struct Shared {
    routes: Arc<Mutex<HashMap<(Method, String), Canned>>>,
    log: Arc<Mutex<Vec<Recorded>>>,
}

pub struct FakeBackend {
    pub base_url: String,
    shared: Shared,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let shared = Shared::default();
        let app = Router::new().fallback(handle).with_state(shared.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            shared,
        }
    }

    /// Answers `method path` (path relative to `/api`) with a JSON body.
    pub fn respond(&self, method: Method, path: &str, status: StatusCode, body: Value) {
        self.respond_raw(method, path, status, &body.to_string());
    }

    pub fn respond_raw(&self, method: Method, path: &str, status: StatusCode, body: &str) {
        self.insert(method, path, Canned {
            status,
            body: body.to_string(),
            delay: None,
        });
    }

    pub fn respond_slowly(&self, method: Method, path: &str, delay: Duration, body: Value) {
        self.insert(method, path, Canned {
            status: StatusCode::OK,
            body: body.to_string(),
            delay: Some(delay),
        });
    }

    fn insert(&self, method: Method, path: &str, canned: Canned) {
        self.shared
            .routes
            .lock()
            .insert((method, format!("/api{}", path)), canned);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.shared.log.lock().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        let full = format!("/api{}", path);
        self.requests().into_iter().filter(|r| r.path == full).collect()
    }

    pub fn config(&self) -> BackendConfig {
        BackendConfig {
            base_url: self.base_url.clone(),
            timeout_secs: 5,
            connect_timeout_secs: 2,
        }
    }

    pub fn client(&self) -> (ApiClient, Arc<MemorySessionStore>) {
        let store = Arc::new(MemorySessionStore::new());
        let client = ApiClient::new(&self.config(), store.clone()).unwrap();
        (client, store)
    }

    pub fn client_with_token(&self, token: &str) -> (ApiClient, Arc<MemorySessionStore>) {
        let (client, store) = self.client();
        store.set_token(token).unwrap();
        store.set_user(&serde_json::from_value(user_json()).unwrap()).unwrap();
        (client, store)
    }
}

async fn handle(
    State(shared): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header_str = |name| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    shared.log.lock().push(Recorded {
        method: method.clone(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: header_str(header::AUTHORIZATION),
        content_type: header_str(header::CONTENT_TYPE),
        body: serde_json::from_slice(&body).ok(),
    });

    let canned = shared
        .routes
        .lock()
        .get(&(method, uri.path().to_string()))
        .cloned();
    match canned {
        Some(canned) => {
            if let Some(delay) = canned.delay {
                tokio::time::sleep(delay).await;
            }
            (
                canned.status,
                [(header::CONTENT_TYPE, "application/json")],
                canned.body,
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, json!({"error": "Not found"}).to_string()).into_response(),
    }
}

pub fn user_json() -> Value {
    json!({
        "id": 1,
        "email": "a@b.com",
        "created_at": "2024-01-01T09:00:00",
        "last_login": "2024-06-01T10:00:00Z"
    })
}

pub fn job_json(id: u64, name: &str, status: &str) -> Value {
    json!({
        "id": id,
        "user_id": 1,
        "name": name,
        "url": format!("https://{}.example.com", name.to_lowercase()),
        "check_interval_minutes": 60,
        "created_at": "2024-05-01T12:00:00",
        "status": status,
        "last_check": null,
        "total_checks": 4,
        "changes_detected": 1,
        "error_message": null
    })
}
