//! AI report processor.
//!
//! Turns "assess report X" into a generate-content call and delivers the
//! parsed `{severity, summary}` to every caller waiting on X. Calls go through
//! a [`TaskQueue`] keyed by report id, so concurrent requests for the same
//! report that arrive before its batch starts share one model call, and the
//! hosted model never sees more than `batch_size` requests at once.

mod context;
mod parse;

pub use self::context::assemble_context;
pub use self::parse::parse_summary;

use std::sync::Arc;

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use tracing::{debug, info};

use crate::config::FeatureConfigCell;
use crate::domain::{ReportId, ReportSummary};
use crate::error::BeaconError;
use crate::observability::QueueStats;
use crate::ports::{
    CommentStore, GenerateContentRequest, GenerativeModel, ProjectStore, PromptFormatter,
    ReportStore,
};
use crate::queue::{QueueConfig, TaskQueue};

/// Collaborators the processor reads from and calls out to.
#[derive(Clone)]
pub struct ProcessorDeps {
    pub reports: Arc<dyn ReportStore>,
    pub comments: Arc<dyn CommentStore>,
    pub projects: Arc<dyn ProjectStore>,
    pub formatter: Arc<dyn PromptFormatter>,
    pub model: Arc<dyn GenerativeModel>,
}

impl ProcessorDeps {
    /// Deps backed by one store that serves every document kind.
    pub fn from_store<S>(
        store: Arc<S>,
        formatter: Arc<dyn PromptFormatter>,
        model: Arc<dyn GenerativeModel>,
    ) -> Self
    where
        S: ReportStore + CommentStore + ProjectStore + 'static,
    {
        Self {
            reports: store.clone(),
            comments: store.clone(),
            projects: store,
            formatter,
            model,
        }
    }
}

pub struct AiReportProcessor {
    deps: ProcessorDeps,
    features: FeatureConfigCell,
    queue: TaskQueue<ReportSummary>,
}

impl AiReportProcessor {
    /// Build a processor with its own queue. Must be called inside a tokio
    /// runtime.
    pub fn new(
        deps: ProcessorDeps,
        features: FeatureConfigCell,
        queue_config: QueueConfig,
    ) -> Result<Self, BeaconError> {
        Ok(Self {
            deps,
            features,
            queue: TaskQueue::new(queue_config)?,
        })
    }

    /// Queue an assessment of `report_id` and return a future for its result.
    ///
    /// The result subscription is taken before this returns, so the future
    /// may be awaited after the batch ran. It fails with `WaitError::Lagged`
    /// if more than `event_capacity` queue events pile up first. With AI
    /// summaries disabled the future resolves to an empty summary and nothing
    /// is queued.
    pub fn add_process_report_to_queue(
        &self,
        report_id: &ReportId,
    ) -> BoxFuture<'static, Result<ReportSummary, BeaconError>> {
        if !self.features.current().enable_ai_summary {
            debug!(%report_id, "AI summary disabled, skipping queue");
            return future::ready(Ok(ReportSummary::empty(report_id.clone()))).boxed();
        }

        let deps = self.deps.clone();
        let features = self.features.clone();
        let id = report_id.clone();
        let waiting = self
            .queue
            .enqueue_and_wait(report_id.as_str(), move || async move {
                process(&deps, &features, &id).await
            });
        waiting.map(|result| result.map_err(BeaconError::from)).boxed()
    }

    /// Assess `report_id` right away, bypassing the queue.
    pub async fn process_report(&self, report_id: &ReportId) -> Result<ReportSummary, BeaconError> {
        process(&self.deps, &self.features, report_id).await
    }

    pub fn features(&self) -> &FeatureConfigCell {
        &self.features
    }

    pub fn queue(&self) -> &TaskQueue<ReportSummary> {
        &self.queue
    }

    pub fn stats(&self) -> QueueStats {
        self.queue.stats()
    }
}

/// The unit of work behind every queued assessment.
///
/// Flags are read when this runs, so a flag flipped while a report waits in
/// the queue still applies to it.
pub async fn process(
    deps: &ProcessorDeps,
    features: &FeatureConfigCell,
    report_id: &ReportId,
) -> Result<ReportSummary, BeaconError> {
    let flags = features.current();
    if !flags.enable_ai_summary {
        return Ok(ReportSummary::empty(report_id.clone()));
    }

    let report = deps
        .reports
        .find_report(report_id)
        .await?
        .ok_or_else(|| BeaconError::ReportNotFound(report_id.clone()))?;

    let context = assemble_context(&report, &flags, &deps.projects, &deps.comments).await?;
    let request = GenerateContentRequest::from_segments(deps.formatter.format(&context))
        .ok_or_else(|| BeaconError::EmptyPrompt(report_id.clone()))?;
    debug!(
        %report_id,
        fragments = ?context.present_fragments(),
        turns = request.contents.len(),
        "requesting report summary"
    );

    let response = deps.model.generate_content(&request).await?;
    let summary = parse_summary(report_id, response.text())?;
    info!(%report_id, severity = ?summary.severity, "report summary generated");
    Ok(summary)
}

#[cfg(test)]
mod tests;
