//! Feature flags for AI summary generation.

use serde::{Deserialize, Serialize};

/// Flags read by the report processor each time it builds a request.
///
/// Keys keep the camelCase names used by the settings document, so the same
/// names work in TOML and JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeatureConfig {
    #[serde(rename = "enableAISummary", alias = "enableAiSummary")]
    pub enable_ai_summary: bool,
    pub summary_generation_include_project_description: bool,
    pub summary_generation_include_project_environment: bool,
    pub summary_generation_include_report_details: bool,
    pub summary_generation_include_report_logs: bool,
    pub summary_generation_include_report_form_data: bool,
    pub summary_generation_include_report_environment: bool,
    pub summary_generation_include_comments: bool,
}

impl Default for FeatureConfig {
    /// AI summaries are off until enabled; once on, everything is included.
    fn default() -> Self {
        Self {
            enable_ai_summary: false,
            summary_generation_include_project_description: true,
            summary_generation_include_project_environment: true,
            summary_generation_include_report_details: true,
            summary_generation_include_report_logs: true,
            summary_generation_include_report_form_data: true,
            summary_generation_include_report_environment: true,
            summary_generation_include_comments: true,
        }
    }
}

impl FeatureConfig {
    /// AI summaries on, every fragment included.
    pub fn all_enabled() -> Self {
        Self {
            enable_ai_summary: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_settings_document_names() {
        let flags: FeatureConfig = serde_json::from_str(
            r#"{ "enableAISummary": true, "summaryGenerationIncludeReportLogs": false }"#,
        )
        .unwrap();
        assert!(flags.enable_ai_summary);
        assert!(!flags.summary_generation_include_report_logs);
        // unspecified flags keep their defaults
        assert!(flags.summary_generation_include_comments);
    }

    #[test]
    fn disabled_by_default() {
        assert!(!FeatureConfig::default().enable_ai_summary);
        assert!(FeatureConfig::all_enabled().enable_ai_summary);
    }
}
