//! Store ports - read access to the document store.
//!
//! Lookups return `Ok(None)` for a missing document; `Err` is reserved for the
//! store itself failing.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{
    Comment, CommentId, EnvironmentId, Project, ProjectEnvironment, ProjectId, Report, ReportId,
};

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt {kind} document {id}: {message}")]
    Corrupt {
        kind: &'static str,
        id: String,
        message: String,
    },
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn find_report(&self, id: &ReportId) -> Result<Option<Report>, StoreError>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn find_comment(&self, id: &CommentId) -> Result<Option<Comment>, StoreError>;
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn find_project(&self, id: &ProjectId) -> Result<Option<Project>, StoreError>;

    async fn find_environment(
        &self,
        id: &EnvironmentId,
    ) -> Result<Option<ProjectEnvironment>, StoreError>;
}
