use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::sleep;

use super::*;
use crate::config::FeatureConfig;
use crate::domain::Severity;
use crate::impls::{InMemoryStore, SegmentPromptFormatter};
use crate::ports::{GenerateContentResponse, ModelError, Role};

const FIXTURE: &str = r#"{
    "projects": [{ "id": "p1", "name": "Shop", "description": "Online shop" }],
    "environments": [{ "id": "e1", "projectId": "p1", "name": "production" }],
    "reports": [
        {
            "id": "r1",
            "projectEnvironmentId": "e1",
            "title": "Checkout fails",
            "logs": ["[{\"level\":\"error\",\"message\":\"TypeError\"}]"]
        },
        { "id": "r2", "title": "Typo on landing page" },
        { "id": "r3", "title": "garbled" }
    ]
}"#;

/// Answers `{severity: 2}` with the report title echoed back, except for
/// reports titled "garbled" which get prose instead of JSON.
#[derive(Default)]
struct ScriptedModel {
    calls: AtomicUsize,
    requests: Mutex<Vec<GenerateContentRequest>>,
}

impl ScriptedModel {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn user_turn(&self, index: usize) -> String {
        self.requests.lock()[index]
            .contents
            .get(1)
            .map(|c| {
                c.parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());
        sleep(Duration::from_millis(50)).await;

        let user = request
            .contents
            .get(1)
            .and_then(|c| c.parts.iter().find(|p| p.text.starts_with("Report:")))
            .map(|p| p.text.trim_start_matches("Report:\n").to_string())
            .unwrap_or_default();
        if user == "garbled" {
            return Ok(GenerateContentResponse::from_text(
                "This looks like a serious problem.",
            ));
        }
        let body = serde_json::json!({ "severity": 2, "summary": format!("About: {user}") });
        Ok(GenerateContentResponse::from_text(body.to_string()))
    }
}

fn processor(flags: FeatureConfig) -> (AiReportProcessor, Arc<ScriptedModel>) {
    let store = Arc::new(InMemoryStore::from_json(FIXTURE).unwrap());
    let model = Arc::new(ScriptedModel::default());
    let deps = ProcessorDeps::from_store(
        store,
        Arc::new(SegmentPromptFormatter::default()),
        model.clone(),
    );
    let processor = AiReportProcessor::new(
        deps,
        FeatureConfigCell::new(flags),
        QueueConfig::for_ai_requests(),
    )
    .unwrap();
    (processor, model)
}

#[tokio::test(start_paused = true)]
async fn disabled_feature_short_circuits() {
    let (processor, model) = processor(FeatureConfig::default());
    let id = ReportId::new("r1");

    let queued = processor.add_process_report_to_queue(&id).await.unwrap();
    let direct = processor.process_report(&id).await.unwrap();

    assert_eq!(queued, ReportSummary::empty(id.clone()));
    assert_eq!(direct, ReportSummary::empty(id));
    assert_eq!(model.calls(), 0);
    assert_eq!(processor.stats().batches_started, 0);
}

#[tokio::test(start_paused = true)]
async fn callers_before_the_batch_starts_share_one_call() {
    let (processor, model) = processor(FeatureConfig::all_enabled());
    let id = ReportId::new("r1");

    let severity_request = processor.add_process_report_to_queue(&id);
    let comment_request = processor.add_process_report_to_queue(&id);
    let (a, b) = tokio::join!(severity_request, comment_request);

    let a = a.unwrap();
    assert_eq!(a, b.unwrap());
    assert_eq!(a.severity, Some(Severity::Error));
    assert_eq!(a.summary.as_deref(), Some("About: Checkout fails"));
    assert_eq!(model.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn request_has_model_and_user_turns() {
    let (processor, model) = processor(FeatureConfig::all_enabled());

    processor
        .add_process_report_to_queue(&ReportId::new("r1"))
        .await
        .unwrap();

    let request = model.requests.lock()[0].clone();
    assert_eq!(request.contents.len(), 2);
    assert_eq!(request.contents[0].role, Role::Model);
    assert_eq!(request.contents[1].role, Role::User);
    let user = model.user_turn(0);
    assert!(user.contains("Project environment: production"));
    assert!(user.contains("TypeError"));
}

#[tokio::test(start_paused = true)]
async fn report_without_logs_sends_no_log_segment() {
    let (processor, model) = processor(FeatureConfig::all_enabled());

    let summary = processor
        .add_process_report_to_queue(&ReportId::new("r2"))
        .await
        .unwrap();

    assert_eq!(summary.summary.as_deref(), Some("About: Typo on landing page"));
    assert!(!model.user_turn(0).contains("Client logs"));
}

#[tokio::test(start_paused = true)]
async fn flags_are_read_when_the_task_runs() {
    let (processor, model) = processor(FeatureConfig::all_enabled());

    let waiting = processor.add_process_report_to_queue(&ReportId::new("r1"));
    processor
        .features()
        .update(|flags| flags.summary_generation_include_report_logs = false);
    waiting.await.unwrap();

    assert!(!model.user_turn(0).contains("TypeError"));
}

#[tokio::test(start_paused = true)]
async fn disabling_while_queued_yields_empty_summary() {
    let (processor, model) = processor(FeatureConfig::all_enabled());
    let id = ReportId::new("r1");

    let waiting = processor.add_process_report_to_queue(&id);
    processor
        .features()
        .update(|flags| flags.enable_ai_summary = false);

    assert_eq!(waiting.await.unwrap(), ReportSummary::empty(id));
    assert_eq!(model.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn missing_report_is_propagated() {
    let (processor, model) = processor(FeatureConfig::all_enabled());
    let id = ReportId::new("nope");

    let direct = processor.process_report(&id).await.unwrap_err();
    assert!(matches!(direct, BeaconError::ReportNotFound(ref missing) if *missing == id));

    let queued = processor.add_process_report_to_queue(&id).await.unwrap_err();
    assert!(matches!(
        queued.task_cause(),
        Some(BeaconError::ReportNotFound(missing)) if *missing == id
    ));
    assert_eq!(model.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn malformed_answer_only_fails_its_own_report() {
    let (processor, model) = processor(FeatureConfig::all_enabled());

    let good = processor.add_process_report_to_queue(&ReportId::new("r2"));
    let bad = processor.add_process_report_to_queue(&ReportId::new("r3"));
    let (good, bad) = tokio::join!(good, bad);

    assert_eq!(good.unwrap().severity, Some(Severity::Error));
    let err = bad.unwrap_err();
    assert!(matches!(
        err.task_cause(),
        Some(BeaconError::MalformedResponse { report_id, .. }) if report_id.as_str() == "r3"
    ));
    assert_eq!(model.calls(), 2);
    assert_eq!(processor.stats().batches_started, 1);
}
