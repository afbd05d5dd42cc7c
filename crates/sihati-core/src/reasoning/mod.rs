mod gemini;
mod prompt;
mod response;
mod retry;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::ReasoningConfig;
use crate::record::EntityRecord;

pub use gemini::GeminiClient;
pub use prompt::{extraction_prompt, overlap_prompt};
pub use response::{parse_object, strip_code_fence, Fields, SchemaError, SchemaResult};
pub use retry::{GuardedService, RetryPolicy};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Quota exceeded or rate limited")]
    RateLimited,
    #[error("Service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Service returned no content: {0}")]
    EmptyResponse(String),
    #[error("Service not configured: {0}")]
    NotConfigured(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::RateLimited => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Http(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            Self::EmptyResponse(_) | Self::NotConfigured(_) => false,
        }
    }
}

/// Raw text payload returned by the reasoning service. Expected to hold a
/// JSON object, but nothing about it is trusted until validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub text: String,
}

impl RawResponse {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Structured-extraction request for one entity's budgeted excerpt.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionRequest<'a> {
    pub entity_name: &'a str,
    pub source_documents: &'a [String],
    pub excerpt: &'a str,
}

impl ExtractionRequest<'_> {
    #[must_use]
    pub fn prompt(&self) -> String {
        extraction_prompt(self.entity_name, self.source_documents, self.excerpt)
    }
}

/// Comparative overlap request over all extracted records.
#[derive(Debug, Clone, Copy)]
pub struct OverlapRequest<'a> {
    pub records: &'a [EntityRecord],
}

impl OverlapRequest<'_> {
    #[must_use]
    pub fn prompt(&self) -> String {
        overlap_prompt(self.records)
    }
}

/// External semantic service used for both structured extraction and
/// comparative overlap analysis.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// Model identifier reported in the final report, if known.
    fn model(&self) -> Option<&str> {
        None
    }

    async fn extract(&self, request: &ExtractionRequest<'_>) -> ServiceResult<RawResponse>;

    async fn analyze_overlap(&self, request: &OverlapRequest<'_>) -> ServiceResult<RawResponse>;
}

#[async_trait]
impl<T: ReasoningService + ?Sized> ReasoningService for Arc<T> {
    fn model(&self) -> Option<&str> {
        (**self).model()
    }

    async fn extract(&self, request: &ExtractionRequest<'_>) -> ServiceResult<RawResponse> {
        (**self).extract(request).await
    }

    async fn analyze_overlap(&self, request: &OverlapRequest<'_>) -> ServiceResult<RawResponse> {
        (**self).analyze_overlap(request).await
    }
}

/// Gemini client wrapped in the configured retry and per-attempt timeout.
pub fn connect(config: &ReasoningConfig) -> ServiceResult<GuardedService<GeminiClient>> {
    let client = GeminiClient::new(config)?;
    Ok(GuardedService::new(
        client,
        config.retry.clone(),
        config.request_timeout(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ServiceError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(ServiceError::RateLimited.is_transient());
        assert!(ServiceError::Status { status: 503, body: String::new() }.is_transient());
        assert!(!ServiceError::Status { status: 400, body: String::new() }.is_transient());
        assert!(!ServiceError::EmptyResponse("SAFETY".into()).is_transient());
        assert!(!ServiceError::NotConfigured("missing API key".into()).is_transient());
    }

    #[test]
    fn test_request_prompts_embed_inputs() {
        let sources = vec!["renstra.pdf".to_string()];
        let request = ExtractionRequest {
            entity_name: "Badan Pusat Statistik",
            source_documents: &sources,
            excerpt: "Menyelenggarakan sensus penduduk",
        };

        let prompt = request.prompt();
        assert!(prompt.contains("Badan Pusat Statistik"));
        assert!(prompt.contains("renstra.pdf"));
        assert!(prompt.contains("Menyelenggarakan sensus penduduk"));
    }
}
