use super::flash::{self, Flash};
use super::views::{
    render, render_with_status, DashboardTemplate, JobRow, JobTemplate, NewJobTemplate, ProfileView,
    ResultView,
};
use super::AppState;
use crate::error::{ApiError, ValidationError};
use crate::models::api::ActionResponse;
use crate::models::job::{JobSummary, NewJob};
use crate::models::wire::Id;
use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tower_cookies::Cookies;
use tracing::{info, warn};

const MAX_RESULTS_LIMIT: u32 = 500;
const DEFAULT_INTERVAL: &str = "60";

/// Job id taken from the URL. Anything that is not one plain path segment is
/// answered with 404 and never reaches the backend.
pub struct JobId(pub Id);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for JobId {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        let id = Id::new(raw);
        if id.is_path_safe() {
            Ok(Self(id))
        } else {
            warn!(job_id = %id, "Rejected malformed job id");
            Err((StatusCode::NOT_FOUND, "Job not found").into_response())
        }
    }
}

/// Essential data could not be loaded: notify and send the user to login.
fn load_failed(cookies: &Cookies, what: &str, err: ApiError) -> Response {
    warn!("Failed to load {}: {}", what, err);
    flash::set(cookies, Flash::error(err.to_string()));
    Redirect::to("/login").into_response()
}

pub async fn dashboard_page(State(state): State<AppState>, cookies: Cookies) -> Response {
    let loaded = futures::try_join!(state.api.profile(), state.api.list_jobs());
    let (profile, jobs) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => return load_failed(&cookies, "dashboard", e),
    };

    let template = DashboardTemplate {
        flash: flash::take(&cookies),
        nav_email: Some(profile.user.email.clone()),
        profile: ProfileView::from(&profile.user),
        summary: JobSummary::from_jobs(&jobs.jobs),
        jobs: jobs.jobs.iter().map(JobRow::from).collect(),
    };
    render(&template)
}

#[derive(Debug, Deserialize)]
pub struct NewJobForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub check_interval_minutes: String,
}

impl NewJobForm {
    fn to_new_job(&self) -> Result<NewJob, ValidationError> {
        let interval = self.check_interval_minutes.trim().parse::<i64>().map_err(|_| {
            ValidationError::new("check_interval_minutes", "Check interval must be a whole number of minutes")
        })?;
        Ok(NewJob::new(self.name.clone(), self.url.clone(), interval))
    }
}

pub async fn new_job_page(State(state): State<AppState>, cookies: Cookies) -> Response {
    let template = NewJobTemplate {
        flash: flash::take(&cookies),
        nav_email: state.nav_email(),
        name: String::new(),
        url: String::new(),
        interval: DEFAULT_INTERVAL.to_string(),
        error: None,
    };
    render(&template)
}

pub async fn create_job_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<NewJobForm>,
) -> Response {
    let result = match form.to_new_job() {
        Ok(job) => state.api.create_job(&job).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(created) => {
            info!(job_id = %created.job.id, "Created job");
            flash::set(&cookies, Flash::success(format!("Job \"{}\" created.", created.job.name)));
            Redirect::to("/dashboard").into_response()
        }
        Err(ApiError::Authentication) => {
            flash::set(&cookies, Flash::error(ApiError::Authentication.to_string()));
            Redirect::to("/login").into_response()
        }
        Err(e) => {
            let template = NewJobTemplate {
                flash: None,
                nav_email: state.nav_email(),
                name: form.name,
                url: form.url,
                interval: form.check_interval_minutes,
                error: Some(e.to_string()),
            };
            render_with_status(StatusCode::BAD_REQUEST, &template)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResultsQuery {
    pub limit: Option<u32>,
}

pub async fn job_page(
    State(state): State<AppState>,
    cookies: Cookies,
    JobId(id): JobId,
    Query(query): Query<ResultsQuery>,
) -> Response {
    let limit = query
        .limit
        .unwrap_or(state.config.display.results_limit)
        .clamp(1, MAX_RESULTS_LIMIT);

    // Statistics are informational; the page still renders without them.
    let (essential, stats) = futures::join!(
        futures::future::try_join(state.api.get_job(&id), state.api.job_results(&id, Some(limit))),
        state.api.job_stats(&id),
    );
    let (job, results) = match essential {
        Ok(loaded) => loaded,
        Err(e) => return load_failed(&cookies, "job", e),
    };
    let stats = match stats {
        Ok(stats) => stats.rows(),
        Err(e) => {
            warn!(job_id = %id, "Job statistics unavailable: {}", e);
            Vec::new()
        }
    };

    let template = JobTemplate {
        flash: flash::take(&cookies),
        nav_email: state.nav_email(),
        job: JobRow::from(&job.job),
        stats,
        total_results: results
            .total_results
            .unwrap_or(results.results.len() as u64),
        results: results.results.iter().map(ResultView::from).collect(),
        limit,
    };
    render(&template)
}

#[derive(Debug, Default, Deserialize)]
pub struct ActionForm {
    pub return_to: Option<String>,
    pub api_key: Option<String>,
}

impl ActionForm {
    /// Local paths only, so the form cannot bounce the user off-site.
    fn return_path(&self, fallback: &str) -> String {
        match self.return_to.as_deref() {
            Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
            _ => fallback.to_string(),
        }
    }

    fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|key| !key.is_empty())
    }
}

/// Job actions only notify on failure; they do not imply a broken session.
fn finish_action(
    cookies: &Cookies,
    action: &str,
    id: &Id,
    result: Result<ActionResponse, ApiError>,
    return_to: String,
) -> Response {
    match result {
        Ok(response) => {
            info!(job_id = %id, action, "Job action succeeded");
            let message = response
                .message
                .unwrap_or_else(|| format!("Job {} {}.", id, action));
            flash::set(cookies, Flash::success(message));
            Redirect::to(&return_to).into_response()
        }
        Err(ApiError::Authentication) => {
            flash::set(cookies, Flash::error(ApiError::Authentication.to_string()));
            Redirect::to("/login").into_response()
        }
        Err(e) => {
            warn!(job_id = %id, action, "Job action failed: {}", e);
            flash::set(cookies, Flash::error(e.to_string()));
            Redirect::to(&return_to).into_response()
        }
    }
}

pub async fn start_job_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    JobId(id): JobId,
    Form(form): Form<ActionForm>,
) -> Response {
    let result = state.api.start_job(&id, form.api_key()).await;
    finish_action(&cookies, "started", &id, result, form.return_path(&format!("/jobs/{}", id)))
}

pub async fn pause_job_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    JobId(id): JobId,
    Form(form): Form<ActionForm>,
) -> Response {
    let result = state.api.pause_job(&id).await;
    finish_action(&cookies, "paused", &id, result, form.return_path(&format!("/jobs/{}", id)))
}

pub async fn stop_job_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    JobId(id): JobId,
    Form(form): Form<ActionForm>,
) -> Response {
    let result = state.api.stop_job(&id).await;
    finish_action(&cookies, "stopped", &id, result, form.return_path(&format!("/jobs/{}", id)))
}

pub async fn delete_job_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    JobId(id): JobId,
    Form(form): Form<ActionForm>,
) -> Response {
    let result = state.api.delete_job(&id).await;
    // The job page no longer exists after a delete.
    let return_to = match form.return_path("/dashboard") {
        path if path.starts_with(&format!("/jobs/{}", id)) => "/dashboard".to_string(),
        path => path,
    };
    finish_action(&cookies, "deleted", &id, result, return_to)
}
