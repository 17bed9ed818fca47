//! SegmentPromptFormatter - default `PromptFormatter`.

use crate::domain::{PromptContext, Severity};
use crate::ports::PromptFormatter;

/// Instruction sent as the first (model) turn. It documents the response
/// contract the processor parses.
pub const DEFAULT_INSTRUCTION: &str = r#"You triage bug and feedback reports submitted from a web application.
Read the report data that follows and assess it.

Respond with ONLY a JSON object, no Markdown and no preamble:
{"severity": <number>, "summary": "<two or three sentences for the project admins>"}

Severity scale:
{scale}

Pick the lowest severity that fits. The summary should say what the user was doing, what went wrong and anything in the logs that points at the cause."#;

const DEFAULT_MAX_SEGMENT_CHARS: usize = 16_000;

/// Builds one segment per present context field.
#[derive(Debug, Clone)]
pub struct SegmentPromptFormatter {
    instruction: String,
    max_segment_chars: usize,
}

impl Default for SegmentPromptFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_INSTRUCTION)
    }
}

impl SegmentPromptFormatter {
    /// `{scale}` in the instruction is replaced with the severity scale.
    pub fn new(instruction: &str) -> Self {
        Self {
            instruction: instruction.replace("{scale}", &severity_scale()),
            max_segment_chars: DEFAULT_MAX_SEGMENT_CHARS,
        }
    }

    pub fn with_max_segment_chars(mut self, max: usize) -> Self {
        self.max_segment_chars = max;
        self
    }

    fn segment(&self, heading: &str, body: &str) -> String {
        format!("{heading}:\n{}", truncate(body, self.max_segment_chars))
    }
}

impl PromptFormatter for SegmentPromptFormatter {
    fn format(&self, context: &PromptContext) -> Vec<String> {
        let mut segments = vec![self.instruction.clone()];

        if let Some(description) = &context.project_description {
            segments.push(self.segment("Project description", description));
        }
        if let Some(name) = &context.project_environment_name {
            segments.push(format!("Project environment: {name}"));
        }
        if let Some(details) = &context.report_details {
            let body = match details.details.as_deref() {
                Some(text) if !text.trim().is_empty() => format!("{}\n\n{}", details.title, text),
                _ => details.title.clone(),
            };
            segments.push(self.segment("Report", &body));
        }
        if let Some(logs) = &context.report_logs {
            segments.push(self.segment("Client logs (JSON)", &pretty(logs)));
        }
        if let Some(form_data) = &context.report_form_data {
            segments.push(self.segment("Submitted form data (JSON)", &pretty(form_data)));
        }
        if let Some(environment) = &context.report_environment {
            segments.push(self.segment("Client environment (JSON)", &pretty(environment)));
        }
        if let Some(comments) = context.comments.as_ref().filter(|c| !c.is_empty()) {
            let body = comments
                .iter()
                .map(|c| match &c.author {
                    Some(author) => format!("- {author}: {}", c.text),
                    None => format!("- {}", c.text),
                })
                .collect::<Vec<_>>()
                .join("\n");
            segments.push(self.segment("Comments", &body));
        }

        segments
    }
}

fn severity_scale() -> String {
    Severity::ALL
        .iter()
        .map(|s| format!("{} = {}", s.ordinal(), s.label()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Cut `text` to at most `max` bytes on a char boundary.
fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
