//! Parsing of the model's `{severity, summary}` answer.

use serde::Deserialize;

use crate::domain::{ReportId, ReportSummary, Severity};
use crate::error::BeaconError;

#[derive(Debug, Deserialize)]
struct Verdict {
    #[serde(default)]
    severity: Option<Severity>,
    #[serde(default)]
    summary: Option<String>,
}

/// Parse the model text and attach `report_id`.
///
/// Accepts the JSON object on its own or wrapped in a Markdown code fence.
pub fn parse_summary(report_id: &ReportId, text: &str) -> Result<ReportSummary, BeaconError> {
    let json = strip_code_fence(text);
    let verdict: Verdict =
        serde_json::from_str(json).map_err(|e| BeaconError::MalformedResponse {
            report_id: report_id.clone(),
            message: e.to_string(),
        })?;

    Ok(ReportSummary {
        report_id: report_id.clone(),
        severity: verdict.severity,
        summary: verdict.summary,
    })
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string ("json") on the opening line
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(r#"{"severity": 2, "summary": "Crash on save"}"#)]
    #[case("  {\"severity\": 2, \"summary\": \"Crash on save\"}\n")]
    #[case("```json\n{\"severity\": 2, \"summary\": \"Crash on save\"}\n```")]
    #[case("```\n{\"severity\": \"Error\", \"summary\": \"Crash on save\"}\n```")]
    fn parses_verdict(#[case] text: &str) {
        let summary = parse_summary(&ReportId::new("r1"), text).unwrap();
        assert_eq!(summary.report_id, ReportId::new("r1"));
        assert_eq!(summary.severity, Some(Severity::Error));
        assert_eq!(summary.summary.as_deref(), Some("Crash on save"));
    }

    #[test]
    fn missing_fields_stay_empty() {
        let summary = parse_summary(&ReportId::new("r1"), "{}").unwrap();
        assert!(summary.is_empty());
    }

    #[rstest]
    #[case("Sure! Here is the JSON you asked for")]
    #[case(r#"{"severity": 7}"#)]
    #[case("")]
    fn malformed_output_names_the_report(#[case] text: &str) {
        let err = parse_summary(&ReportId::new("r9"), text).unwrap_err();
        assert!(matches!(
            err,
            BeaconError::MalformedResponse { ref report_id, .. } if report_id.as_str() == "r9"
        ));
    }
}
