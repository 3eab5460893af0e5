//! Response envelopes returned by the Dark Watch backend.

use crate::models::job::Job;
use crate::models::result::JobResult;
use crate::models::user::User;
use crate::models::wire;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    /// A profile the client cannot read must not cost the caller its token.
    #[serde(default, deserialize_with = "wire::lenient")]
    pub user: Option<User>,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileResponse {
    #[serde(default)]
    pub success: bool,
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub job: Job,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, deserialize_with = "wire::nullable")]
    pub jobs: Vec<Job>,
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, deserialize_with = "wire::nullable")]
    pub results: Vec<JobResult>,
    #[serde(default)]
    pub total_results: Option<u64>,
}

/// Start/pause/stop/delete acknowledgements.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub job: Option<Job>,
}

/// Statistics, status and health payloads have no fixed shape; keep every field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl OpenResponse {
    /// Flattens nested objects into `(label, value)` rows for display.
    pub fn rows(&self) -> Vec<(String, String)> {
        let mut rows = Vec::new();
        for (key, value) in &self.fields {
            flatten_into(&mut rows, key, value);
        }
        rows
    }
}

fn flatten_into(rows: &mut Vec<(String, String)>, prefix: &str, value: &Value) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                flatten_into(rows, &format!("{}.{}", prefix, key), nested);
            }
        }
        Value::String(s) => rows.push((prefix.to_string(), s.clone())),
        Value::Null => rows.push((prefix.to_string(), "-".to_string())),
        other => rows.push((prefix.to_string(), other.to_string())),
    }
}

pub type StatsResponse = OpenResponse;
pub type StatusResponse = OpenResponse;
