pub mod config;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod overlap;
pub mod pipeline;
pub mod reasoning;
pub mod record;

pub use config::{
    model_info, BudgetConfig, ConfigError, ExtractionConfig, ModelInfo, PipelineConfig,
    ReasoningConfig, SihatiConfig, KNOWN_MODELS,
};
pub use error::{Diagnostic, Error, ErrorKind, Phase, Result};
pub use extract::{decode_record, EntityExtraction, EntityExtractionCoordinator};
pub use ingest::{
    AggregatedText, DocumentFormat, DocumentOutcome, DocumentStatus, ExtractionOutcome,
    LopdfTextLayer, MultiDocumentAggregator, OcrEngine, OcrShortfall, SourceDocument, TesseractOcr,
    TextBudgetAllocator, TextExtractionGateway, TextLayer,
};
pub use overlap::{
    Category, OverlapEngine, OverlapFinding, OverlapMetrics, OverlapReport, Priority,
    Recommendation, Severity,
};
pub use pipeline::{EntityInput, Pipeline, PipelineEvent, PipelineOutput};
pub use reasoning::{
    connect, GeminiClient, GuardedService, RawResponse, ReasoningService, RetryPolicy, ServiceError,
};
pub use record::{EntityRecord, ListField};
