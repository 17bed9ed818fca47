use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use beacon_core::config::spawn_feature_reloader;
use beacon_core::impls::{GeminiClient, InMemoryStore, SegmentPromptFormatter};
use beacon_core::observability::init_tracing;
use beacon_core::ports::{
    GenerateContentRequest, GenerateContentResponse, GenerativeModel, ModelError,
};
use beacon_core::{
    AiReportProcessor, BeaconConfig, FeatureConfigCell, ProcessorDeps, ReportId, ReportSummary,
    Severity,
};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "beacon", version, about = "AI triage for bug and feedback reports")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Summarize reports from a JSON fixture.
    Process {
        /// Report ids. Every report in the fixture when empty.
        ids: Vec<String>,

        /// Fixture with projects, environments, reports and comments.
        #[arg(long)]
        data: PathBuf,

        /// TOML config. Its [features] table is reloaded while running.
        #[arg(long, env = "BEACON_CONFIG")]
        config: Option<PathBuf>,

        /// Call the model once per report, bypassing the queue.
        #[arg(long)]
        direct: bool,

        /// Use the built-in keyword heuristic instead of Gemini.
        #[arg(long)]
        offline: bool,

        /// Turn AI summaries on regardless of the config.
        #[arg(long)]
        enable: bool,
    },

    /// Print the effective feature flags.
    Flags {
        #[arg(long, env = "BEACON_CONFIG")]
        config: Option<PathBuf>,
    },
}

/// One line of output per report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Outcome {
    report_id: ReportId,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ReportSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    admin_comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Offline stand-in for the hosted model: grades by keywords in the user turn.
struct HeuristicModel;

#[async_trait]
impl GenerativeModel for HeuristicModel {
    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ModelError> {
        let text = request
            .contents
            .iter()
            .skip(1)
            .flat_map(|c| c.parts.iter())
            .map(|p| p.text.to_lowercase())
            .collect::<Vec<_>>()
            .join("\n");

        let severity = if ["crash", "data loss", "cannot log in", "outage"]
            .iter()
            .any(|k| text.contains(k))
        {
            Severity::CriticalError
        } else if ["error", "exception", "fails", "broken"]
            .iter()
            .any(|k| text.contains(k))
        {
            Severity::Error
        } else if ["slow", "typo", "warning"].iter().any(|k| text.contains(k)) {
            Severity::Warning
        } else {
            Severity::Information
        };

        let title = text
            .lines()
            .skip_while(|line| !line.starts_with("report:"))
            .nth(1)
            .unwrap_or("report");
        let body = serde_json::json!({
            "severity": severity.ordinal(),
            "summary": format!("Offline assessment of \"{title}\": {}.", severity.label()),
        });
        Ok(GenerateContentResponse::from_text(body.to_string()))
    }
}

async fn load_config(path: Option<&PathBuf>) -> Result<BeaconConfig> {
    match path {
        Some(path) => BeaconConfig::load(path)
            .await
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(BeaconConfig::default()),
    }
}

async fn process(
    ids: Vec<String>,
    data: PathBuf,
    config_path: Option<PathBuf>,
    direct: bool,
    offline: bool,
    enable: bool,
) -> Result<()> {
    // (A) config と feature flags
    let config = load_config(config_path.as_ref()).await?;
    let features = FeatureConfigCell::new(config.features.clone());
    if enable {
        features.update(|flags| flags.enable_ai_summary = true);
    }
    let reloader = config_path
        .clone()
        .map(|path| spawn_feature_reloader(path, features.clone(), Duration::from_secs(2)));

    // (B) store / formatter / model
    let fixture = tokio::fs::read_to_string(&data)
        .await
        .with_context(|| format!("reading {}", data.display()))?;
    let store = Arc::new(InMemoryStore::from_json(&fixture)?);
    let model: Arc<dyn GenerativeModel> = if offline {
        Arc::new(HeuristicModel)
    } else {
        Arc::new(GeminiClient::new(config.gemini.clone())?)
    };
    let ids: Vec<ReportId> = if ids.is_empty() {
        store.report_ids()
    } else {
        ids.into_iter().map(ReportId::from).collect()
    };

    let formatter = Arc::new(SegmentPromptFormatter::default());
    let deps = ProcessorDeps::from_store(store, formatter, model);
    let processor = AiReportProcessor::new(deps, features, config.queue.clone())?;
    info!(reports = ids.len(), direct, offline, "processing reports");

    // (C) 全件投入してから待つ（subscription は投入時点で張られる）
    let results = if direct {
        join_all(ids.iter().map(|id| processor.process_report(id))).await
    } else {
        let waiting: Vec<_> = ids
            .iter()
            .map(|id| processor.add_process_report_to_queue(id))
            .collect();
        tokio::select! {
            results = join_all(waiting) => results,
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupted, cancelling queued work");
                processor.queue().cancel_all();
                anyhow::bail!("interrupted");
            }
        }
    };

    // (D) 結果を 1 行 1 JSON で出力
    for (id, result) in ids.into_iter().zip(results) {
        let outcome = match result {
            Ok(summary) => Outcome {
                report_id: id,
                admin_comment: summary.to_admin_comment(),
                summary: Some(summary),
                error: None,
            },
            Err(e) => Outcome {
                report_id: id,
                summary: None,
                admin_comment: None,
                error: Some(e.task_cause().unwrap_or(&e).to_string()),
            },
        };
        println!("{}", serde_json::to_string(&outcome)?);
    }

    info!(stats = ?processor.stats(), "done");
    if let Some(reloader) = reloader {
        reloader.abort();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("beacon=info");

    match Cli::parse().command {
        Command::Process {
            ids,
            data,
            config,
            direct,
            offline,
            enable,
        } => process(ids, data, config, direct, offline, enable).await,
        Command::Flags { config } => {
            let config = load_config(config.as_ref()).await?;
            println!("{}", serde_json::to_string_pretty(&config.features)?);
            Ok(())
        }
    }
}
