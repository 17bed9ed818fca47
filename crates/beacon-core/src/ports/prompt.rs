//! PromptFormatter port - turns a `PromptContext` into prompt segments.

use crate::domain::PromptContext;

/// Pure formatting step.
///
/// The first segment is the instruction (sent as the model turn), the rest
/// is report data (sent together as the user turn). Fields that are `None`
/// produce no segment.
pub trait PromptFormatter: Send + Sync {
    fn format(&self, context: &PromptContext) -> Vec<String>;
}
