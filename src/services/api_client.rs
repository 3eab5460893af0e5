//! REST client for the Dark Watch backend.
//!
//! Every call goes through [`ApiClient::request`], which owns the whole
//! session discipline: it attaches the cached bearer token, maps failures onto
//! [`ApiError`], and clears the local session whenever the backend answers 401.

use crate::error::{ApiError, ConfigError, ValidationError};
use crate::models::api::{
    ActionResponse, AuthResponse, JobResponse, JobsResponse, ProfileResponse, ResultsResponse,
    StatsResponse, StatusResponse,
};
use crate::models::config::BackendConfig;
use crate::models::job::NewJob;
use crate::models::user::{AuthMode, Credentials, User};
use crate::models::wire::Id;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::session::SessionStore;

const LOGIN_ENDPOINT: &str = "/auth/login";
const REGISTER_ENDPOINT: &str = "/auth/register";
const USER_AGENT: &str = concat!("DarkWatch-Dashboard/", env!("CARGO_PKG_VERSION"));

pub struct ApiClient {
    http: reqwest::Client,
    api_base: String,
    session: Arc<dyn SessionStore>,
    cancel: CancellationToken,
}

impl ApiClient {
    pub fn new(config: &BackendConfig, session: Arc<dyn SessionStore>) -> Result<Self, ConfigError> {
        let api_base = config.api_base()?;

        // The cookie store keeps the backend's legacy session cookie as a fallback.
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .build()?;

        Ok(Self {
            http,
            api_base,
            session,
            cancel: CancellationToken::new(),
        })
    }

    /// Shares an externally owned cancellation token, e.g. the server's shutdown signal.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Aborts in-flight requests; every later request fails with [`ApiError::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn current_user(&self) -> Option<User> {
        self.session.user()
    }

    fn bearer_token(&self, endpoint: &str) -> Option<String> {
        let path = endpoint.split('?').next().unwrap_or(endpoint);
        if path == LOGIN_ENDPOINT || path == REGISTER_ENDPOINT {
            return None;
        }
        self.session.token()
    }

    fn clear_session(&self) {
        if let Err(e) = self.session.clear() {
            warn!("Failed to clear local session: {}", e);
        }
    }

    /// Sends one request to `<api_base><endpoint>`. Exactly one attempt is made.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
        headers: HeaderMap,
    ) -> Result<T, ApiError> {
        if self.cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }

        let url = format!("{}{}", self.api_base, endpoint);
        let mut builder = self
            .http
            .request(method.clone(), &url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .headers(headers);
        if let Some(token) = self.bearer_token(endpoint) {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        debug!(%method, endpoint, "Sending backend request");

        let response = tokio::select! {
            _ = self.cancel.cancelled() => return Err(ApiError::Cancelled),
            result = builder.send() => result?,
        };
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            warn!(%method, endpoint, "Backend rejected credentials, clearing session");
            self.clear_session();
            return Err(ApiError::Authentication);
        }

        let bytes = tokio::select! {
            _ = self.cancel.cancelled() => return Err(ApiError::Cancelled),
            result = response.bytes() => result?,
        };

        if !status.is_success() {
            let message = error_message(status, &bytes);
            warn!(%method, endpoint, status = status.as_u16(), "Backend request failed: {}", message);
            return Err(ApiError::Request {
                status: status.as_u16(),
                message,
            });
        }

        // Empty success bodies (204 and friends) decode as an empty object.
        let payload: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &bytes
        };
        serde_json::from_slice(payload).map_err(ApiError::Decode)
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.request(Method::GET, endpoint, None, HeaderMap::new()).await
    }

    async fn post<T: DeserializeOwned>(&self, endpoint: &str, body: Option<Value>) -> Result<T, ApiError> {
        self.request(Method::POST, endpoint, body, HeaderMap::new()).await
    }

    async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.request(Method::DELETE, endpoint, None, HeaderMap::new()).await
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub async fn register(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        credentials.validate(AuthMode::Register)?;
        self.authenticate(REGISTER_ENDPOINT, credentials).await
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        credentials.validate(AuthMode::Login)?;
        self.authenticate(LOGIN_ENDPOINT, credentials).await
    }

    /// Posts the credentials and, only on success, stores the returned token and user.
    async fn authenticate(&self, endpoint: &str, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        let body = json!({
            "email": credentials.email.trim(),
            "password": credentials.password,
        });
        let response: AuthResponse = self.post(endpoint, Some(body)).await?;

        if let Some(token) = &response.token {
            self.session.set_token(token)?;
        }
        if let Some(user) = &response.user {
            self.session.set_user(user)?;
        }
        info!(endpoint, email = %credentials.email.trim(), "Authenticated with backend");

        Ok(response)
    }

    /// Best effort on the server, unconditional locally: the session is cleared
    /// whatever the backend says.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let result: Result<Value, ApiError> = self.post("/auth/logout", None).await;
        if let Err(e) = result {
            warn!("Backend logout failed, clearing local session anyway: {}", e);
        }
        self.session.clear()?;
        info!("Logged out");
        Ok(())
    }

    pub async fn profile(&self) -> Result<ProfileResponse, ApiError> {
        self.get("/auth/profile").await
    }

    /// Checks a cached token against the backend. Any failure clears the session.
    pub async fn validate_session(&self) -> bool {
        if !self.session.is_authenticated() {
            return false;
        }

        match self.profile().await {
            Ok(response) => {
                if let Err(e) = self.session.set_user(&response.user) {
                    warn!("Failed to refresh cached user: {}", e);
                }
                true
            }
            Err(e) => {
                warn!("Cached session is no longer valid: {}", e);
                self.clear_session();
                false
            }
        }
    }

    // =========================================================================
    // Jobs
    // =========================================================================

    /// Validates locally first; invalid input never reaches the network.
    pub async fn create_job(&self, job: &NewJob) -> Result<JobResponse, ApiError> {
        job.validate()?;
        let body = json!(job.normalized());
        self.post("/jobs", Some(body)).await
    }

    pub async fn list_jobs(&self) -> Result<JobsResponse, ApiError> {
        self.get("/jobs").await
    }

    pub async fn get_job(&self, id: &Id) -> Result<JobResponse, ApiError> {
        self.get(&job_endpoint(id, "")?).await
    }

    /// `api_key` is forwarded untouched for targets that need their own credential.
    pub async fn start_job(&self, id: &Id, api_key: Option<&str>) -> Result<ActionResponse, ApiError> {
        let body = api_key.map(|key| json!({ "api_key": key }));
        self.post(&job_endpoint(id, "/start")?, body).await
    }

    pub async fn pause_job(&self, id: &Id) -> Result<ActionResponse, ApiError> {
        self.post(&job_endpoint(id, "/pause")?, None).await
    }

    pub async fn stop_job(&self, id: &Id) -> Result<ActionResponse, ApiError> {
        self.post(&job_endpoint(id, "/stop")?, None).await
    }

    pub async fn delete_job(&self, id: &Id) -> Result<ActionResponse, ApiError> {
        self.delete(&job_endpoint(id, "")?).await
    }

    pub async fn job_results(&self, id: &Id, limit: Option<u32>) -> Result<ResultsResponse, ApiError> {
        let mut endpoint = job_endpoint(id, "/results")?;
        if let Some(limit) = limit {
            endpoint.push_str(&format!("?limit={}", limit));
        }
        self.get(&endpoint).await
    }

    pub async fn job_stats(&self, id: &Id) -> Result<StatsResponse, ApiError> {
        self.get(&job_endpoint(id, "/stats")?).await
    }

    // =========================================================================
    // Status
    // =========================================================================

    pub async fn status(&self) -> Result<StatusResponse, ApiError> {
        self.get("/status").await
    }

    pub async fn health(&self) -> Result<StatusResponse, ApiError> {
        self.get("/health").await
    }
}

/// `/jobs/<id><suffix>`. Ids that would not stay a single path segment are refused
/// before anything is sent.
fn job_endpoint(id: &Id, suffix: &str) -> Result<String, ApiError> {
    if !id.is_path_safe() {
        return Err(ValidationError::new("id", format!("Invalid job id '{}'", id)).into());
    }
    Ok(format!("/jobs/{}{}", id, suffix))
}

/// `error`, then `message` from a JSON body, else `HTTP <status>`.
fn error_message(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| {
            ["error", "message"]
                .iter()
                .find_map(|key| value.get(key).and_then(Value::as_str).map(str::to_string))
        })
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}
