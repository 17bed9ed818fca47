//! AI assessment of a report.

use serde::{Deserialize, Serialize};

use super::ids::ReportId;
use super::severity::Severity;

/// Result delivered to everyone waiting on a report.
///
/// Both fields are optional: a disabled feature yields an empty summary, and
/// the model is allowed to omit either field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub report_id: ReportId,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl ReportSummary {
    pub fn empty(report_id: ReportId) -> Self {
        Self {
            report_id,
            severity: None,
            summary: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.severity.is_none() && self.summary.is_none()
    }

    /// Text of the admin comment posted on the report, or `None` when there is
    /// nothing worth posting.
    pub fn to_admin_comment(&self) -> Option<String> {
        let summary = self
            .summary
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        match (self.severity, summary) {
            (None, None) => None,
            (Some(severity), None) => Some(format!("Severity: {}", severity.label())),
            (None, Some(summary)) => Some(summary.to_string()),
            (Some(severity), Some(summary)) => {
                Some(format!("Severity: {}\n\n{}", severity.label(), summary))
            }
        }
    }
}
