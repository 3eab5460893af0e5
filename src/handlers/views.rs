//! Askama page templates and the display rows they render.

use super::flash::Flash;
use crate::models::job::{Job, JobSummary};
use crate::models::result::{JobResult, ResultChange};
use crate::models::user::User;
use crate::models::wire::format_timestamp;
use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use tracing::error;

pub fn render<T: Template>(template: &T) -> Response {
    render_with_status(StatusCode::OK, template)
}

pub fn render_with_status<T: Template>(status: StatusCode, template: &T) -> Response {
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!("Template render failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
        }
    }
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct AuthTemplate {
    pub flash: Option<Flash>,
    pub nav_email: Option<String>,
    pub register: bool,
    pub email: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub flash: Option<Flash>,
    pub nav_email: Option<String>,
    pub profile: ProfileView,
    pub summary: JobSummary,
    pub jobs: Vec<JobRow>,
}

#[derive(Template)]
#[template(path = "new_job.html")]
pub struct NewJobTemplate {
    pub flash: Option<Flash>,
    pub nav_email: Option<String>,
    pub name: String,
    pub url: String,
    pub interval: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "job.html")]
pub struct JobTemplate {
    pub flash: Option<Flash>,
    pub nav_email: Option<String>,
    pub job: JobRow,
    pub stats: Vec<(String, String)>,
    pub results: Vec<ResultView>,
    pub total_results: u64,
    pub limit: u32,
}

/// Only http(s) URLs from the backend are rendered as links; anything else,
/// `javascript:` included, is shown as text.
pub fn safe_href(raw: &str) -> Option<String> {
    let url = reqwest::Url::parse(raw.trim()).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

pub struct Link {
    pub text: String,
    pub href: Option<String>,
}

impl Link {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            href: safe_href(text),
        }
    }
}

pub struct ProfileView {
    pub email: String,
    pub member_since: String,
    pub last_login: String,
}

impl From<&User> for ProfileView {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            member_since: format_timestamp(&user.created_at),
            last_login: user
                .last_login
                .as_ref()
                .map(format_timestamp)
                .unwrap_or_else(|| "never".to_string()),
        }
    }
}

pub struct JobRow {
    pub id: String,
    pub name: String,
    pub url: String,
    pub href: Option<String>,
    pub status: String,
    pub interval: u32,
    pub created_at: String,
    pub last_check: String,
    pub total_checks: u64,
    pub changes_detected: u64,
    pub error_message: Option<String>,
    pub can_start: bool,
    pub can_pause: bool,
    pub can_stop: bool,
}

impl From<&Job> for JobRow {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.to_string(),
            name: job.name.clone(),
            url: job.url.clone(),
            href: safe_href(&job.url),
            status: job.status.to_string(),
            interval: job.check_interval_minutes,
            created_at: format_timestamp(&job.created_at),
            last_check: job
                .last_check
                .as_ref()
                .map(format_timestamp)
                .unwrap_or_else(|| "never".to_string()),
            total_checks: job.total_checks,
            changes_detected: job.changes_detected,
            error_message: job.error_message.clone().filter(|m| !m.is_empty()),
            can_start: job.status.can_start(),
            can_pause: job.status.can_pause(),
            can_stop: job.status.can_stop(),
        }
    }
}

/// One result, with only the sections its change kind carries filled in.
pub struct ResultView {
    pub kind: String,
    pub description: String,
    pub detected_at: String,
    pub before: Option<String>,
    pub after: Option<String>,
    pub images: Vec<Link>,
    pub companies: Vec<String>,
    pub error: Option<String>,
    pub has_analysis: bool,
    pub summary: Option<String>,
    pub mentioned: Vec<String>,
    pub new_companies_detected: bool,
}

impl From<&JobResult> for ResultView {
    fn from(result: &JobResult) -> Self {
        let mut view = Self {
            kind: result.change.kind().to_string(),
            description: result.description.clone(),
            detected_at: result
                .detected_at
                .as_ref()
                .map(format_timestamp)
                .unwrap_or_else(|| "-".to_string()),
            before: None,
            after: None,
            images: Vec::new(),
            companies: Vec::new(),
            error: None,
            has_analysis: result.analysis.is_some(),
            summary: None,
            mentioned: Vec::new(),
            new_companies_detected: false,
        };

        match &result.change {
            ResultChange::NewImages { images } => {
                view.images = images.iter().map(|image| Link::new(image)).collect()
            }
            ResultChange::NewPortfolioCompanies { companies } => view.companies = companies.clone(),
            ResultChange::Error { message } => view.error = Some(message.clone()),
            other => {
                if let Some(diff) = other.diff() {
                    view.before = diff.before.clone();
                    view.after = diff.after.clone();
                }
            }
        }

        if let Some(analysis) = &result.analysis {
            view.summary = analysis.summary.clone();
            view.mentioned = analysis.companies_mentioned.clone();
            view.new_companies_detected = analysis.new_companies_detected;
        }

        view
    }
}
