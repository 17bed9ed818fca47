//! Domain model: ids, store records, severity, summaries and prompt input.

pub mod ids;
pub mod prompt;
pub mod report;
pub mod severity;
pub mod summary;

pub use ids::{BatchId, CommentId, EnvironmentId, Id, IdMarker, ProjectId, ReportId};
pub use prompt::{PromptContext, ReportDetails};
pub use report::{Comment, Project, ProjectEnvironment, Report};
pub use severity::Severity;
pub use summary::ReportSummary;
