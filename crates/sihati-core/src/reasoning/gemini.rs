use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use super::{
    ExtractionRequest, OverlapRequest, RawResponse, ReasoningService, ServiceError, ServiceResult,
};
use crate::config::ReasoningConfig;

const MAX_ERROR_BODY: usize = 500;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    fn into_text(self) -> ServiceResult<String> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ServiceError::EmptyResponse(format!("prompt blocked: {reason}")));
        }

        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(ServiceError::EmptyResponse("no candidates".to_string()));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.text)
            .collect();

        if text.trim().is_empty() {
            let reason = candidate
                .finish_reason
                .unwrap_or_else(|| "empty candidate".to_string());
            return Err(ServiceError::EmptyResponse(reason));
        }

        Ok(text)
    }
}

/// Google Generative Language API client.
pub struct GeminiClient {
    http: Client,
    base_url: Url,
    api_key: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
    request_timeout: Duration,
}

impl GeminiClient {
    pub fn new(config: &ReasoningConfig) -> ServiceResult<Self> {
        let api_key = config.api_key.trim();
        if api_key.is_empty() {
            return Err(ServiceError::NotConfigured("missing API key".to_string()));
        }

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ServiceError::NotConfigured(format!("invalid base URL: {e}")))?;

        let http = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .user_agent(concat!("sihati/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            api_key: api_key.to_string(),
            model: config.model.trim().to_string(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            request_timeout: config.request_timeout(),
        })
    }

    fn endpoint(&self) -> ServiceResult<Url> {
        self.base_url
            .join(&format!("v1beta/models/{}:generateContent", self.model))
            .map_err(|e| ServiceError::NotConfigured(format!("invalid model endpoint: {e}")))
    }

    fn body<'a>(&self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
                response_mime_type: "application/json",
            },
        }
    }

    async fn generate(&self, prompt: &str) -> ServiceResult<RawResponse> {
        let url = self.endpoint()?;

        tracing::debug!(model = %self.model, prompt_chars = prompt.chars().count(), "Calling reasoning service");

        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.body(prompt))
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ServiceError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| self.map_transport(e))?;
        parsed.into_text().map(RawResponse::new)
    }

    fn map_transport(&self, err: reqwest::Error) -> ServiceError {
        if err.is_timeout() {
            ServiceError::Timeout(self.request_timeout)
        } else {
            ServiceError::Http(err)
        }
    }
}

#[async_trait]
impl ReasoningService for GeminiClient {
    fn model(&self) -> Option<&str> {
        Some(&self.model)
    }

    async fn extract(&self, request: &ExtractionRequest<'_>) -> ServiceResult<RawResponse> {
        self.generate(&request.prompt()).await
    }

    async fn analyze_overlap(&self, request: &OverlapRequest<'_>) -> ServiceResult<RawResponse> {
        self.generate(&request.prompt()).await
    }
}
