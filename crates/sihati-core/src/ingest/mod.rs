mod aggregate;
mod budget;
mod document;
mod gateway;
mod ocr;
mod pdf;

pub use aggregate::{
    AggregatedText, DocumentOutcome, DocumentStatus, MultiDocumentAggregator, DOCUMENT_BOUNDARY,
};
pub use budget::{TextBudgetAllocator, DEFAULT_MAX_EXCERPT_CHARS};
pub use document::{DocumentFormat, ExtractionError, ExtractionResult, ReadSeek, SourceDocument};
pub use gateway::{
    ExtractionOutcome, OcrShortfall, TextExtractionGateway, DEFAULT_MIN_TEXT_CHARS, EMPTY_DOCUMENT, UNREADABLE,
};
pub use ocr::{OcrEngine, OcrError, OcrResult, TesseractOcr};
pub use pdf::{LopdfTextLayer, TextLayer};
