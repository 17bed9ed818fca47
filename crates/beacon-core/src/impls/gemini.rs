//! GeminiClient - `GenerativeModel` over the Gemini REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ports::{
    Candidate, Content, GenerateContentRequest, GenerateContentResponse, GenerativeModel,
    ModelError,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub endpoint: String,
    pub model: String,
    /// Falls back to the `GEMINI_API_KEY` environment variable.
    pub api_key: Option<String>,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key: None,
            temperature: 0.2,
            timeout_secs: 60,
        }
    }
}

impl GeminiConfig {
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: &'a [Content],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

pub struct GeminiClient {
    config: GeminiConfig,
    api_key: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, ModelError> {
        let api_key = config.resolved_api_key().ok_or(ModelError::MissingApiKey)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ModelError::Connection(e.to_string()))?;
        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ModelError> {
        let body = GeminiRequest {
            contents: &request.contents,
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: self.config.temperature,
            },
        };

        debug!(model = %self.config.model, turns = request.contents.len(), "calling Gemini");
        let resp = self
            .client
            .post(self.config.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Connection(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ModelError::Connection(e.to_string()))?;
        if !status.is_success() {
            return Err(ModelError::Api(format!("HTTP {status}: {text}")));
        }

        parse_response(text)
    }
}

fn parse_response(text: String) -> Result<GenerateContentResponse, ModelError> {
    let parsed: GeminiResponse =
        serde_json::from_str(&text).map_err(|e| ModelError::Parse(e.to_string()))?;
    Ok(GenerateContentResponse {
        candidates: parsed.candidates,
        raw_text: text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::Role;

    #[test]
    fn url_includes_model_and_trims_slash() {
        let config = GeminiConfig {
            endpoint: "http://localhost:8080/".into(),
            model: "gemini-test".into(),
            ..GeminiConfig::default()
        };
        assert_eq!(
            config.url(),
            "http://localhost:8080/v1beta/models/gemini-test:generateContent"
        );
    }

    #[test]
    fn request_body_matches_api_shape() {
        let request =
            GenerateContentRequest::from_segments(vec!["instr".into(), "data".into()]).unwrap();
        let body = GeminiRequest {
            contents: &request.contents,
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: 0.2,
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(value["contents"][0]["role"], "model");
        assert_eq!(request.contents[1].role, Role::User);
    }

    #[test]
    fn parses_candidate_text() {
        let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"{\"severity\":2}"}]}}]}"#;
        let response = parse_response(body.to_string()).unwrap();
        assert_eq!(response.text(), "{\"severity\":2}");
    }

    #[test]
    fn response_without_candidates_falls_back_to_body() {
        let response = parse_response("{}".to_string()).unwrap();
        assert_eq!(response.text(), "{}");
    }

    #[test]
    fn non_json_body_is_a_parse_error() {
        assert!(matches!(
            parse_response("<html>".to_string()),
            Err(ModelError::Parse(_))
        ));
    }

    #[test]
    fn explicit_key_wins() {
        let config = GeminiConfig {
            api_key: Some("k".into()),
            ..GeminiConfig::default()
        };
        assert_eq!(config.resolved_api_key().as_deref(), Some("k"));
        assert!(GeminiClient::new(config).is_ok());
    }
}
