//! Records read from the document store.
//!
//! Field names follow the store's camelCase documents so fixtures and store
//! payloads deserialize without mapping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{CommentId, EnvironmentId, ProjectId, ReportId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Environment of a project ("production", "staging", ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectEnvironment {
    pub id: EnvironmentId,
    pub project_id: ProjectId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: ReportId,
    #[serde(default)]
    pub project_environment_id: Option<EnvironmentId>,
    pub title: String,
    #[serde(default)]
    pub details: Option<String>,
    /// Browser/runtime environment captured by the client.
    #[serde(default)]
    pub environment: Option<serde_json::Value>,
    #[serde(default)]
    pub form_data: Option<serde_json::Value>,
    /// Serialized logs. The first element holds the JSON-encoded log array.
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub comments: Vec<CommentId>,
}

impl Report {
    /// The raw JSON log array, if the client sent one.
    pub fn raw_logs(&self) -> Option<&str> {
        self.logs
            .first()
            .map(String::as_str)
            .filter(|raw| !raw.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    #[serde(default)]
    pub author: Option<String>,
    pub text: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
