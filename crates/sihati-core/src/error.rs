use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::reasoning::{SchemaError, ServiceError};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Extraction failed for {document}: {reason}")]
    ExtractionFailure { document: String, reason: String },

    #[error("OCR subsystem unavailable")]
    OcrUnavailable,

    #[error("Reasoning service error: {0}")]
    ReasoningService(#[from] ServiceError),

    #[error("Schema validation error: {0}")]
    SchemaValidation(#[from] SchemaError),

    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    #[error("Overlap analysis needs at least two entity records, got {found}")]
    InsufficientEntities { found: usize },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ExtractionFailure { .. } => ErrorKind::ExtractionFailure,
            Self::OcrUnavailable => ErrorKind::OcrUnavailable,
            Self::ReasoningService(_) => ErrorKind::ReasoningService,
            Self::SchemaValidation(_) => ErrorKind::SchemaValidation,
            Self::InsufficientEntities { .. } => ErrorKind::InsufficientEntities,
            Self::InvalidCategory(_) | Self::Config(_) | Self::Io(_) | Self::Serialization(_) => {
                ErrorKind::Internal
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ExtractionFailure,
    OcrUnavailable,
    ReasoningService,
    SchemaValidation,
    InsufficientEntities,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExtractionFailure => "extraction_failure",
            Self::OcrUnavailable => "ocr_unavailable",
            Self::ReasoningService => "reasoning_service",
            Self::SchemaValidation => "schema_validation",
            Self::InsufficientEntities => "insufficient_entities",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage of the run a diagnostic was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    TextExtraction,
    StructuredExtraction,
    OverlapAnalysis,
}

impl Phase {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextExtraction => "text_extraction",
            Self::StructuredExtraction => "structured_extraction",
            Self::OverlapAnalysis => "overlap_analysis",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recoverable failure attached to the entity (and document) it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub phase: Phase,
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(phase: Phase, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            phase,
            kind,
            entity: None,
            document: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn from_error(phase: Phase, error: &Error) -> Self {
        let document = match error {
            Error::ExtractionFailure { document, .. } => Some(document.clone()),
            _ => None,
        };
        Self {
            document,
            ..Self::new(phase, error.kind(), error.to_string())
        }
    }

    #[must_use]
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    #[must_use]
    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.document = Some(document.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.phase)?;
        if let Some(entity) = &self.entity {
            write!(f, " {entity}")?;
        }
        if let Some(document) = &self.document {
            write!(f, " ({document})")?;
        }
        write!(f, ": {}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_failure_carries_document() {
        let err = Error::ExtractionFailure {
            document: "renstra.pdf".into(),
            reason: "unreadable or encrypted document".into(),
        };

        let diag = Diagnostic::from_error(Phase::TextExtraction, &err).with_entity("Kemenkeu");

        assert_eq!(diag.kind, ErrorKind::ExtractionFailure);
        assert_eq!(diag.document.as_deref(), Some("renstra.pdf"));
        assert_eq!(
            diag.to_string(),
            "[text_extraction] Kemenkeu (renstra.pdf): Extraction failed for renstra.pdf: unreadable or encrypted document"
        );
    }

    #[test]
    fn test_insufficient_entities_kind() {
        let err = Error::InsufficientEntities { found: 1 };
        assert_eq!(err.kind(), ErrorKind::InsufficientEntities);
        assert!(err.to_string().contains("got 1"));
    }

    #[test]
    fn test_diagnostic_serialization_skips_empty_fields() {
        let diag = Diagnostic::new(Phase::OverlapAnalysis, ErrorKind::ReasoningService, "timeout");
        let json = serde_json::to_value(&diag).unwrap();

        assert_eq!(json["phase"], "overlap_analysis");
        assert_eq!(json["kind"], "reasoning_service");
        assert!(json.get("entity").is_none());
        assert!(json.get("document").is_none());
    }
}
