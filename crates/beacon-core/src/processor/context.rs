//! Flag-driven assembly of the prompt context for one report.

use std::sync::Arc;

use futures::future::join_all;
use tracing::warn;

use crate::config::FeatureConfig;
use crate::domain::{Comment, ProjectEnvironment, PromptContext, Report, ReportDetails};
use crate::error::BeaconError;
use crate::ports::{CommentStore, ProjectStore};

/// Build the context for `report`.
///
/// A fragment is present only if its flag is on *and* the report has the
/// data. Missing project/environment documents and unloadable comments are
/// skipped; store errors on the environment lookup are propagated.
pub async fn assemble_context(
    report: &Report,
    flags: &FeatureConfig,
    projects: &Arc<dyn ProjectStore>,
    comments: &Arc<dyn CommentStore>,
) -> Result<PromptContext, BeaconError> {
    let mut context = PromptContext::default();

    let wants_project = flags.summary_generation_include_project_description
        || flags.summary_generation_include_project_environment;
    if wants_project {
        if let Some(environment) = load_environment(report, projects).await? {
            if flags.summary_generation_include_project_description {
                context.project_description = load_description(&environment, projects).await?;
            }
            if flags.summary_generation_include_project_environment {
                context.project_environment_name = Some(environment.name);
            }
        }
    }

    if flags.summary_generation_include_report_details {
        context.report_details = Some(ReportDetails {
            title: report.title.clone(),
            details: report.details.clone(),
        });
    }

    if flags.summary_generation_include_report_logs {
        context.report_logs = report.raw_logs().map(|raw| parse_logs(report, raw));
    }

    if flags.summary_generation_include_report_form_data {
        context.report_form_data = report.form_data.clone();
    }

    if flags.summary_generation_include_report_environment {
        context.report_environment = report.environment.clone();
    }

    if flags.summary_generation_include_comments && !report.comments.is_empty() {
        let loaded = load_comments(report, comments).await;
        context.comments = (!loaded.is_empty()).then_some(loaded);
    }

    Ok(context)
}

async fn load_environment(
    report: &Report,
    projects: &Arc<dyn ProjectStore>,
) -> Result<Option<ProjectEnvironment>, BeaconError> {
    let Some(env_id) = &report.project_environment_id else {
        return Ok(None);
    };
    let environment = projects.find_environment(env_id).await?;
    if environment.is_none() {
        warn!(report_id = %report.id, environment_id = %env_id, "report environment not found");
    }
    Ok(environment)
}

async fn load_description(
    environment: &ProjectEnvironment,
    projects: &Arc<dyn ProjectStore>,
) -> Result<Option<String>, BeaconError> {
    let Some(project) = projects.find_project(&environment.project_id).await? else {
        warn!(project_id = %environment.project_id, "project not found");
        return Ok(None);
    };
    Ok(project.description.filter(|d| !d.trim().is_empty()))
}

/// Logs arrive as a JSON string. Anything that does not parse is passed on
/// verbatim as a JSON string.
fn parse_logs(report: &Report, raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!(report_id = %report.id, error = %e, "report logs are not valid JSON");
        serde_json::Value::String(raw.to_string())
    })
}

/// Load every comment concurrently, dropping the ones that fail to load.
async fn load_comments(report: &Report, store: &Arc<dyn CommentStore>) -> Vec<Comment> {
    let lookups = report.comments.iter().map(|id| async move {
        match store.find_comment(id).await {
            Ok(Some(comment)) => Some(comment),
            Ok(None) => {
                warn!(report_id = %report.id, comment_id = %id, "comment not found");
                None
            }
            Err(e) => {
                warn!(report_id = %report.id, comment_id = %id, error = %e, "comment failed to load");
                None
            }
        }
    });
    join_all(lookups).await.into_iter().flatten().collect()
}
