//! GenerativeModel port - a generate-content call on a hosted model.
//!
//! The request/response shapes follow the Gemini `generateContent` API, which
//! is also what the HTTP client in `impls::gemini` speaks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn new(role: Role, texts: impl IntoIterator<Item = String>) -> Self {
        Self {
            role,
            parts: texts.into_iter().map(|text| Part { text }).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

impl GenerateContentRequest {
    /// First segment as the model turn, the remaining ones as one user turn.
    ///
    /// Returns `None` for an empty segment list.
    pub fn from_segments(segments: Vec<String>) -> Option<Self> {
        let mut segments = segments.into_iter();
        let instruction = segments.next()?;
        let mut contents = vec![Content::new(Role::Model, [instruction])];
        let user = Content::new(Role::User, segments);
        if !user.parts.is_empty() {
            contents.push(user);
        }
        Some(Self { contents })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateContentResponse {
    pub candidates: Vec<Candidate>,
    /// Full response text, used when no candidate carries a part.
    pub raw_text: String,
}

impl GenerateContentResponse {
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            candidates: vec![Candidate {
                content: Some(CandidateContent {
                    parts: vec![Part { text: text.clone() }],
                }),
            }],
            raw_text: text,
        }
    }

    /// `candidates[0].content.parts[0].text`, falling back to the raw text.
    pub fn text(&self) -> &str {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
            .map(|p| p.text.as_str())
            .unwrap_or(self.raw_text.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("no API key configured (set gemini.api_key or GEMINI_API_KEY)")]
    MissingApiKey,
}

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_segment_becomes_the_model_turn() {
        let request = GenerateContentRequest::from_segments(vec![
            "instruction".into(),
            "details".into(),
            "logs".into(),
        ])
        .unwrap();

        assert_eq!(request.contents.len(), 2);
        assert_eq!(request.contents[0].role, Role::Model);
        assert_eq!(request.contents[0].parts[0].text, "instruction");
        assert_eq!(request.contents[1].role, Role::User);
        assert_eq!(request.contents[1].parts.len(), 2);
    }

    #[test]
    fn no_segments_no_request() {
        assert!(GenerateContentRequest::from_segments(vec![]).is_none());
    }

    #[test]
    fn request_serializes_roles_in_lowercase() {
        let request = GenerateContentRequest::from_segments(vec!["a".into(), "b".into()]).unwrap();
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["role"], "model");
        assert_eq!(value["contents"][1]["parts"][0]["text"], "b");
    }

    #[test]
    fn text_falls_back_to_raw_body() {
        let response = GenerateContentResponse {
            candidates: vec![],
            raw_text: "{\"severity\":1}".into(),
        };
        assert_eq!(response.text(), "{\"severity\":1}");

        let response = GenerateContentResponse::from_text("hello");
        assert_eq!(response.text(), "hello");
    }
}
