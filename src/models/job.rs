use crate::error::ValidationError;
use crate::models::wire::{self, Id};
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_INTERVAL_MINUTES: u32 = 1;
pub const MAX_INTERVAL_MINUTES: u32 = 1440;
pub const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Created,
    Running,
    Paused,
    Stopped,
    Error,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn can_start(self) -> bool {
        !matches!(self, JobStatus::Running)
    }

    pub fn can_pause(self) -> bool {
        matches!(self, JobStatus::Running)
    }

    pub fn can_stop(self) -> bool {
        matches!(self, JobStatus::Running | JobStatus::Paused)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Created => write!(f, "created"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Paused => write!(f, "paused"),
            JobStatus::Stopped => write!(f, "stopped"),
            JobStatus::Error => write!(f, "error"),
            JobStatus::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Id,
    #[serde(default)]
    pub user_id: Option<Id>,
    pub name: String,
    pub url: String,
    pub check_interval_minutes: u32,
    #[serde(deserialize_with = "wire::timestamp")]
    pub created_at: DateTime<Utc>,
    pub status: JobStatus,
    #[serde(default, deserialize_with = "wire::optional_timestamp")]
    pub last_check: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "wire::nullable")]
    pub total_checks: u64,
    #[serde(default, deserialize_with = "wire::nullable")]
    pub changes_detected: u64,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Aggregate counters shown at the top of the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobSummary {
    pub total: usize,
    pub running: usize,
    pub changes: u64,
}

impl JobSummary {
    pub fn from_jobs(jobs: &[Job]) -> Self {
        jobs.iter().fold(Self::default(), |mut acc, job| {
            acc.total += 1;
            if job.status == JobStatus::Running {
                acc.running += 1;
            }
            acc.changes += job.changes_detected;
            acc
        })
    }
}

/// Body of `POST /jobs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    pub name: String,
    pub url: String,
    pub check_interval_minutes: i64,
}

impl NewJob {
    pub fn new(name: impl Into<String>, url: impl Into<String>, check_interval_minutes: i64) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            check_interval_minutes,
        }
    }

    /// Rejects input the backend would refuse anyway, so it never leaves the client.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::new("name", "Job name is required"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(ValidationError::new(
                "name",
                format!("Job name must be at most {} characters", MAX_NAME_LEN),
            ));
        }

        let url = self.url.trim();
        if url.is_empty() {
            return Err(ValidationError::new("url", "URL is required"));
        }
        let parsed = Url::parse(url)
            .map_err(|_| ValidationError::new("url", "Please enter a valid URL"))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(ValidationError::new("url", "URL must start with http:// or https://"));
        }

        let range = i64::from(MIN_INTERVAL_MINUTES)..=i64::from(MAX_INTERVAL_MINUTES);
        if !range.contains(&self.check_interval_minutes) {
            return Err(ValidationError::new(
                "check_interval_minutes",
                format!(
                    "Check interval must be between {} and {} minutes",
                    MIN_INTERVAL_MINUTES, MAX_INTERVAL_MINUTES
                ),
            ));
        }

        Ok(())
    }

    /// Trimmed copy of the form input, as sent to the backend.
    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            url: self.url.trim().to_string(),
            check_interval_minutes: self.check_interval_minutes,
        }
    }
}
