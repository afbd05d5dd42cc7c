use serde::Serialize;

use super::document::SourceDocument;
use super::gateway::{ExtractionOutcome, OcrShortfall, TextExtractionGateway};
use super::ocr::TesseractOcr;
use super::pdf::LopdfTextLayer;
use crate::config::ExtractionConfig;
use crate::error::{Diagnostic, Error, Phase};

/// Separates documents in a combined text. Each document segment follows it
/// as `\nDOCUMENT: <name>\n<text>`.
pub const DOCUMENT_BOUNDARY: &str = "\n\n==================================================";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentOutcome {
    Extracted { chars: usize },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentStatus {
    pub name: String,
    #[serde(flatten)]
    pub outcome: DocumentOutcome,
}

/// Combined text of one entity's documents plus per-document status.
#[derive(Debug, Clone, Default)]
pub struct AggregatedText {
    pub combined: String,
    pub documents: Vec<DocumentStatus>,
    pub warnings: Vec<Diagnostic>,
}

impl AggregatedText {
    /// True when no document produced text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.combined.is_empty()
    }

    fn push_text(&mut self, name: &str, text: &str) {
        let chars = text.chars().count();
        tracing::debug!(document = %name, chars, "Extracted document");

        self.combined.push_str(DOCUMENT_BOUNDARY);
        self.combined.push_str("\nDOCUMENT: ");
        self.combined.push_str(name);
        self.combined.push('\n');
        self.combined.push_str(text);

        self.documents.push(DocumentStatus {
            name: name.to_string(),
            outcome: DocumentOutcome::Extracted { chars },
        });
    }

    /// Names of the documents that contributed text, in input order.
    pub fn extracted(&self) -> impl Iterator<Item = &str> {
        self.documents
            .iter()
            .filter(|d| matches!(d.outcome, DocumentOutcome::Extracted { .. }))
            .map(|d| d.name.as_str())
    }
}

/// Runs the extraction gateway over every document of an entity.
pub struct MultiDocumentAggregator {
    gateway: TextExtractionGateway,
    max_file_size: u64,
}

impl MultiDocumentAggregator {
    #[must_use]
    pub fn new(gateway: TextExtractionGateway) -> Self {
        Self {
            gateway,
            max_file_size: ExtractionConfig::default().max_file_size_bytes(),
        }
    }

    /// `lopdf` text layer with `tesseract` OCR, configured from `config`.
    #[must_use]
    pub fn from_config(config: &ExtractionConfig) -> Self {
        let gateway = TextExtractionGateway::new(
            Box::new(LopdfTextLayer),
            Box::new(TesseractOcr::new(config)),
        )
        .with_min_text_chars(config.min_text_chars);

        Self::new(gateway).with_max_file_size(config.max_file_size_bytes())
    }

    #[must_use]
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Admission checks, then the gateway's fallback chain.
    pub async fn extract_document(&self, document: &SourceDocument) -> ExtractionOutcome {
        let format = match document.admit(self.max_file_size) {
            Ok(format) => format,
            Err(e) => return ExtractionOutcome::Failure(e.to_string()),
        };

        let mut reader = match document.open() {
            Ok(reader) => reader,
            Err(e) => return ExtractionOutcome::Failure(e.to_string()),
        };

        self.gateway.extract(format, &mut *reader).await
    }

    pub async fn aggregate(&self, documents: &[SourceDocument]) -> AggregatedText {
        let mut aggregated = AggregatedText::default();

        for document in documents {
            let name = document.name();
            match self.extract_document(document).await {
                ExtractionOutcome::Text(text) => aggregated.push_text(name, &text),
                ExtractionOutcome::Partial { text, shortfall } => {
                    tracing::warn!(document = %name, %shortfall, "Keeping partial text layer");

                    let error = match shortfall {
                        OcrShortfall::Unavailable => Error::OcrUnavailable,
                        other => Error::ExtractionFailure {
                            document: name.to_string(),
                            reason: format!("{other}, kept partial text layer"),
                        },
                    };
                    aggregated.warnings.push(
                        Diagnostic::from_error(Phase::TextExtraction, &error).with_document(name),
                    );
                    aggregated.push_text(name, &text);
                }
                ExtractionOutcome::Failure(reason) => {
                    tracing::warn!(document = %name, reason = %reason, "Skipping document");

                    let error = Error::ExtractionFailure {
                        document: name.to_string(),
                        reason: reason.clone(),
                    };
                    aggregated
                        .warnings
                        .push(Diagnostic::from_error(Phase::TextExtraction, &error));
                    aggregated.documents.push(DocumentStatus {
                        name: name.to_string(),
                        outcome: DocumentOutcome::Failed { reason },
                    });
                }
            }
        }

        aggregated
    }
}
