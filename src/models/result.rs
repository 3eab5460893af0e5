//! Detected-change records.
//!
//! The backend has shipped two result shapes: a legacy flat record with
//! `old_content`/`new_content`, and typed records keyed by `type`. Both decode
//! into [`JobResult`], whose [`ResultChange`] carries only the payload that
//! belongs to its kind.

use crate::models::wire;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentDiff {
    pub before: Option<String>,
    pub after: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultChange {
    ContentChange(ContentDiff),
    TextChange(ContentDiff),
    StructureChange(ContentDiff),
    NewImages { images: Vec<String> },
    NewPortfolioCompanies { companies: Vec<String> },
    Error { message: String },
    /// Any tag this client does not know; the tag itself is preserved.
    Other { kind: String, diff: ContentDiff },
}

impl ResultChange {
    pub fn kind(&self) -> &str {
        match self {
            ResultChange::ContentChange(_) => "content_change",
            ResultChange::TextChange(_) => "text_change",
            ResultChange::StructureChange(_) => "structure_change",
            ResultChange::NewImages { .. } => "new_images",
            ResultChange::NewPortfolioCompanies { .. } => "new_portfolio_companies",
            ResultChange::Error { .. } => "error",
            ResultChange::Other { kind, .. } => kind,
        }
    }

    pub fn diff(&self) -> Option<&ContentDiff> {
        match self {
            ResultChange::ContentChange(diff)
            | ResultChange::TextChange(diff)
            | ResultChange::StructureChange(diff)
            | ResultChange::Other { diff, .. } => Some(diff),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiAnalysis {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "wire::nullable")]
    pub companies_mentioned: Vec<String>,
    #[serde(default, deserialize_with = "wire::nullable")]
    pub new_companies_detected: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawJobResult")]
pub struct JobResult {
    pub detected_at: Option<DateTime<Utc>>,
    pub description: String,
    pub change: ResultChange,
    pub analysis: Option<AiAnalysis>,
}

/// Every field either result shape has been seen to carry.
#[derive(Deserialize)]
struct RawJobResult {
    #[serde(default, rename = "type", alias = "change_type")]
    kind: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, alias = "timestamp", deserialize_with = "wire::optional_timestamp")]
    detected_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "before")]
    old_content: Option<String>,
    #[serde(default, alias = "after")]
    new_content: Option<String>,
    #[serde(default, alias = "images", deserialize_with = "wire::nullable")]
    new_images: Vec<String>,
    #[serde(default, alias = "companies", deserialize_with = "wire::nullable")]
    new_companies: Vec<String>,
    #[serde(default, alias = "error_message")]
    error: Option<String>,
    #[serde(default, alias = "analysis")]
    ai_analysis: Option<AiAnalysis>,
}

impl From<RawJobResult> for JobResult {
    fn from(raw: RawJobResult) -> Self {
        let diff = ContentDiff {
            before: raw.old_content,
            after: raw.new_content,
        };
        let description = raw.description.unwrap_or_default();
        // Untyped legacy records are content changes.
        let kind = raw.kind.unwrap_or_else(|| "content_change".to_string());

        let change = match kind.as_str() {
            "content_change" => ResultChange::ContentChange(diff),
            "text_change" => ResultChange::TextChange(diff),
            "structure_change" => ResultChange::StructureChange(diff),
            "new_images" => ResultChange::NewImages {
                images: raw.new_images,
            },
            "new_portfolio_companies" => ResultChange::NewPortfolioCompanies {
                companies: raw.new_companies,
            },
            "error" => ResultChange::Error {
                message: raw.error.unwrap_or_else(|| description.clone()),
            },
            _ => ResultChange::Other { kind, diff },
        };

        Self {
            detected_at: raw.detected_at,
            description,
            change,
            analysis: raw.ai_analysis,
        }
    }
}
