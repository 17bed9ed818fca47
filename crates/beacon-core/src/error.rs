use std::path::PathBuf;

use thiserror::Error;

use crate::domain::ReportId;
use crate::ports::{ModelError, StoreError};
use crate::queue::WaitError;

#[derive(Debug, Error)]
pub enum BeaconError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to load config from {path}: {message}")]
    ConfigLoad { path: PathBuf, message: String },

    #[error("no tokio runtime available to drive the task queue")]
    NoRuntime,

    #[error("{kind} not found: {0}", kind = .0.kind())]
    ReportNotFound(ReportId),

    #[error("prompt formatter produced no segments for report {0}")]
    EmptyPrompt(ReportId),

    #[error("malformed model response for report {report_id}: {message}")]
    MalformedResponse { report_id: ReportId, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Wait(#[from] WaitError),
}

impl BeaconError {
    /// The error raised inside a queued task, when this error came out of the
    /// queue (`TaskFailed` / `BatchFailed`) and the task failed with a
    /// `BeaconError`.
    pub fn task_cause(&self) -> Option<&BeaconError> {
        match self {
            BeaconError::Wait(wait) => wait
                .task_error()
                .and_then(|error| error.downcast_ref::<BeaconError>()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_id_kind() {
        let err = BeaconError::ReportNotFound(ReportId::new("r9"));
        assert_eq!(err.to_string(), "report not found: r9");
    }
}
