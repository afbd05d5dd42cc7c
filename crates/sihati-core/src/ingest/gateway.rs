use std::io::{Read, Seek, SeekFrom};

use super::document::{DocumentFormat, ExtractionResult};
use super::ocr::OcrEngine;
use super::pdf::TextLayer;

pub const UNREADABLE: &str = "unreadable or encrypted document";
pub const EMPTY_DOCUMENT: &str = "empty document";
pub const DEFAULT_MIN_TEXT_CHARS: usize = 100;

/// Why OCR could not take over from a weak text layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrShortfall {
    Unavailable,
    NoText,
    Failed(String),
}

impl std::fmt::Display for OcrShortfall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => f.write_str("OCR unavailable"),
            Self::NoText => f.write_str("OCR recognized no text"),
            Self::Failed(reason) => write!(f, "OCR failed: {reason}"),
        }
    }
}

/// Result of extracting one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    Text(String),
    /// Only the sparse text layer could be recovered.
    Partial { text: String, shortfall: OcrShortfall },
    Failure(String),
}

impl ExtractionOutcome {
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) | Self::Partial { text, .. } => Some(text),
            Self::Failure(_) => None,
        }
    }
}

fn read_from_start<R: Read + Seek + ?Sized>(reader: &mut R) -> std::io::Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Joins pages under `--- Page n ---` headers, skipping blank pages.
fn with_page_headers(pages: &[String]) -> String {
    let mut out = String::new();
    for (index, page) in pages.iter().enumerate() {
        let page = page.trim();
        if page.is_empty() {
            continue;
        }
        out.push_str(&format!("\n--- Page {} ---\n", index + 1));
        out.push_str(page);
    }
    out
}

/// Extracts text from one document with a fallback chain: text layer, then
/// OCR, then whatever non-empty text-layer pages were found.
pub struct TextExtractionGateway {
    text_layer: Box<dyn TextLayer>,
    ocr: Box<dyn OcrEngine>,
    min_text_chars: usize,
}

impl TextExtractionGateway {
    #[must_use]
    pub fn new(text_layer: Box<dyn TextLayer>, ocr: Box<dyn OcrEngine>) -> Self {
        Self {
            text_layer,
            ocr,
            min_text_chars: DEFAULT_MIN_TEXT_CHARS,
        }
    }

    #[must_use]
    pub fn with_min_text_chars(mut self, min_text_chars: usize) -> Self {
        self.min_text_chars = min_text_chars;
        self
    }

    /// Never fails outright: read errors and unreadable content become
    /// [`ExtractionOutcome::Failure`].
    pub async fn extract<R>(&self, format: DocumentFormat, reader: &mut R) -> ExtractionOutcome
    where
        R: Read + Seek + Send + ?Sized,
    {
        let result = match format {
            DocumentFormat::PlainText => Self::extract_plain(reader),
            DocumentFormat::Pdf => self.extract_pdf(reader).await,
        };

        result.unwrap_or_else(|e| ExtractionOutcome::Failure(e.to_string()))
    }

    fn extract_plain<R: Read + Seek + ?Sized>(reader: &mut R) -> ExtractionResult<ExtractionOutcome> {
        let bytes = read_from_start(reader)?;
        let text = String::from_utf8_lossy(&bytes);
        if text.trim().is_empty() {
            return Ok(ExtractionOutcome::Failure(EMPTY_DOCUMENT.to_string()));
        }
        Ok(ExtractionOutcome::Text(text.into_owned()))
    }

    async fn extract_pdf<R>(&self, reader: &mut R) -> ExtractionResult<ExtractionOutcome>
    where
        R: Read + Seek + Send + ?Sized,
    {
        let bytes = read_from_start(reader)?;
        let pages = match self.text_layer.extract_pages(&bytes) {
            Ok(pages) => pages,
            Err(e) => {
                tracing::debug!(error = %e, "Text layer extraction failed");
                Vec::new()
            }
        };
        drop(bytes);

        let joined = pages.join("\n");
        if joined.trim().chars().count() >= self.min_text_chars {
            return Ok(ExtractionOutcome::Text(joined));
        }

        let shortfall = if self.ocr.is_available() {
            let bytes = read_from_start(reader)?;
            match self.ocr.recognize_pages(&bytes).await {
                Ok(ocr_pages) => {
                    let text = with_page_headers(&ocr_pages);
                    if !text.is_empty() {
                        return Ok(ExtractionOutcome::Text(text));
                    }
                    tracing::warn!("OCR recognized no text");
                    OcrShortfall::NoText
                }
                Err(e) => {
                    tracing::warn!(error = %e, "OCR failed");
                    OcrShortfall::Failed(e.to_string())
                }
            }
        } else {
            tracing::warn!("OCR unavailable, using partial text layer");
            OcrShortfall::Unavailable
        };

        let partial = with_page_headers(&pages);
        if !partial.is_empty() {
            return Ok(ExtractionOutcome::Partial {
                text: partial,
                shortfall,
            });
        }

        Ok(ExtractionOutcome::Failure(match shortfall {
            OcrShortfall::Failed(reason) => format!("{UNREADABLE}; OCR failed: {reason}"),
            OcrShortfall::Unavailable | OcrShortfall::NoText => UNREADABLE.to_string(),
        }))
    }
}
