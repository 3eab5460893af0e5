use crate::error::ValidationError;
use crate::models::wire::{self, Id};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    pub email: String,
    #[serde(deserialize_with = "wire::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "wire::optional_timestamp")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default)]
    pub job_count: Option<u64>,
    #[serde(default)]
    pub running_count: Option<u64>,
    #[serde(default)]
    pub change_count: Option<u64>,
}

/// Which auth form was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Register,
}

/// Email/password pair sent to `/auth/login` and `/auth/register`.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    /// Only checked on registration; never sent to the backend.
    #[serde(default)]
    pub confirm_password: Option<String>,
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            confirm_password: None,
        }
    }

    pub fn validate(&self, mode: AuthMode) -> Result<(), ValidationError> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(ValidationError::new("email", "Email is required"));
        }
        if !email_pattern().is_match(email) {
            return Err(ValidationError::new("email", "Please enter a valid email address"));
        }
        if self.password.is_empty() {
            return Err(ValidationError::new("password", "Password is required"));
        }

        if mode == AuthMode::Register {
            if self.password.len() < MIN_PASSWORD_LEN {
                return Err(ValidationError::new(
                    "password",
                    format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
                ));
            }
            if let Some(confirm) = &self.confirm_password {
                if confirm != &self.password {
                    return Err(ValidationError::new("confirm_password", "Passwords do not match"));
                }
            }
        }

        Ok(())
    }
}
