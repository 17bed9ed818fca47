//! Input handed to the prompt formatter.
//!
//! Every field is optional. A field that is `None` produces no prompt segment;
//! the processor leaves a field out when its feature flag is off or when the
//! report simply has no such data.

use serde::Serialize;

use super::report::Comment;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDetails {
    pub title: String,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_environment_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_details: Option<ReportDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_logs: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_form_data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_environment: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<Comment>>,
}

impl PromptContext {
    /// Names of the fragments present, in formatter order.
    pub fn present_fragments(&self) -> Vec<&'static str> {
        let mut present = Vec::new();
        if self.project_description.is_some() {
            present.push("projectDescription");
        }
        if self.project_environment_name.is_some() {
            present.push("projectEnvironmentName");
        }
        if self.report_details.is_some() {
            present.push("reportDetails");
        }
        if self.report_logs.is_some() {
            present.push("reportLogs");
        }
        if self.report_form_data.is_some() {
            present.push("reportFormData");
        }
        if self.report_environment.is_some() {
            present.push("reportEnvironment");
        }
        if self.comments.is_some() {
            present.push("comments");
        }
        present
    }
}
