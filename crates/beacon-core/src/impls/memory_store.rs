//! InMemoryStore - document store kept in memory.
//!
//! Implements every store port. Used by the CLI (loaded from a JSON fixture)
//! and by tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;

use crate::domain::{
    Comment, CommentId, EnvironmentId, Project, ProjectEnvironment, ProjectId, Report, ReportId,
};
use crate::ports::{CommentStore, ProjectStore, ReportStore, StoreError};

/// Fixture file layout.
///
/// ```json
/// { "projects": [...], "environments": [...], "reports": [...], "comments": [...] }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreFixture {
    pub projects: Vec<Project>,
    pub environments: Vec<ProjectEnvironment>,
    pub reports: Vec<Report>,
    pub comments: Vec<Comment>,
}

#[derive(Default)]
struct Documents {
    projects: HashMap<ProjectId, Project>,
    environments: HashMap<EnvironmentId, ProjectEnvironment>,
    reports: HashMap<ReportId, Report>,
    comments: HashMap<CommentId, Comment>,
}

#[derive(Default)]
pub struct InMemoryStore {
    docs: RwLock<Documents>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: StoreFixture) -> Self {
        let store = Self::new();
        for project in fixture.projects {
            store.insert_project(project);
        }
        for environment in fixture.environments {
            store.insert_environment(environment);
        }
        for report in fixture.reports {
            store.insert_report(report);
        }
        for comment in fixture.comments {
            store.insert_comment(comment);
        }
        store
    }

    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let fixture: StoreFixture =
            serde_json::from_str(json).map_err(|e| StoreError::Corrupt {
                kind: "fixture",
                id: "-".to_string(),
                message: e.to_string(),
            })?;
        Ok(Self::from_fixture(fixture))
    }

    pub fn insert_project(&self, project: Project) {
        self.docs.write().projects.insert(project.id.clone(), project);
    }

    pub fn insert_environment(&self, environment: ProjectEnvironment) {
        self.docs
            .write()
            .environments
            .insert(environment.id.clone(), environment);
    }

    pub fn insert_report(&self, report: Report) {
        self.docs.write().reports.insert(report.id.clone(), report);
    }

    pub fn insert_comment(&self, comment: Comment) {
        self.docs.write().comments.insert(comment.id.clone(), comment);
    }

    pub fn report_ids(&self) -> Vec<ReportId> {
        let mut ids: Vec<ReportId> = self.docs.read().reports.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl ReportStore for InMemoryStore {
    async fn find_report(&self, id: &ReportId) -> Result<Option<Report>, StoreError> {
        Ok(self.docs.read().reports.get(id).cloned())
    }
}

#[async_trait]
impl CommentStore for InMemoryStore {
    async fn find_comment(&self, id: &CommentId) -> Result<Option<Comment>, StoreError> {
        Ok(self.docs.read().comments.get(id).cloned())
    }
}

#[async_trait]
impl ProjectStore for InMemoryStore {
    async fn find_project(&self, id: &ProjectId) -> Result<Option<Project>, StoreError> {
        Ok(self.docs.read().projects.get(id).cloned())
    }

    async fn find_environment(
        &self,
        id: &EnvironmentId,
    ) -> Result<Option<ProjectEnvironment>, StoreError> {
        Ok(self.docs.read().environments.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "projects": [{ "id": "p1", "name": "Shop", "description": "Online shop" }],
        "environments": [{ "id": "e1", "projectId": "p1", "name": "production" }],
        "reports": [{ "id": "r1", "projectEnvironmentId": "e1", "title": "Broken", "comments": ["c1"] }],
        "comments": [{ "id": "c1", "text": "Also on Firefox" }]
    }"#;

    #[tokio::test]
    async fn loads_fixture_documents() {
        let store = InMemoryStore::from_json(FIXTURE).unwrap();

        let report = store.find_report(&ReportId::new("r1")).await.unwrap().unwrap();
        assert_eq!(report.title, "Broken");

        let env_id = report.project_environment_id.unwrap();
        let env = store.find_environment(&env_id).await.unwrap().unwrap();
        assert_eq!(env.name, "production");

        let project = store.find_project(&env.project_id).await.unwrap().unwrap();
        assert_eq!(project.description.as_deref(), Some("Online shop"));

        let comment = store.find_comment(&CommentId::new("c1")).await.unwrap();
        assert!(comment.is_some());
        assert_eq!(store.report_ids(), vec![ReportId::new("r1")]);
    }

    #[tokio::test]
    async fn missing_documents_are_none() {
        let store = InMemoryStore::new();
        assert!(store.find_report(&ReportId::new("nope")).await.unwrap().is_none());
    }

    #[test]
    fn bad_fixture_is_reported() {
        assert!(matches!(
            InMemoryStore::from_json("{ not json"),
            Err(StoreError::Corrupt { kind: "fixture", .. })
        ));
    }
}
