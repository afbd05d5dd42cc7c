use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Semaphore;

use crate::config::SihatiConfig;
use crate::error::{Diagnostic, ErrorKind, Phase, Result};
use crate::extract::EntityExtractionCoordinator;
use crate::ingest::{DocumentOutcome, MultiDocumentAggregator, SourceDocument, TextBudgetAllocator};
use crate::overlap::{OverlapEngine, OverlapReport, DEFAULT_NAME_THRESHOLD};
use crate::reasoning::ReasoningService;
use crate::record::EntityRecord;

/// An entity and the documents describing its mandate.
#[derive(Debug, Clone)]
pub struct EntityInput {
    pub name: String,
    pub documents: Vec<SourceDocument>,
}

impl EntityInput {
    #[must_use]
    pub fn new(name: impl Into<String>, documents: Vec<SourceDocument>) -> Self {
        Self {
            name: name.into(),
            documents,
        }
    }
}

/// Progress notifications, in the order they happen for each entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    EntityStarted {
        entity: String,
        documents: usize,
    },
    DocumentExtracted {
        entity: String,
        document: String,
        chars: usize,
    },
    DocumentFailed {
        entity: String,
        document: String,
        reason: String,
    },
    EntityExtracted {
        entity: String,
        items: usize,
        degraded: bool,
    },
    EntityFailed {
        entity: String,
        reason: String,
    },
    OverlapStarted {
        entities: usize,
    },
    Finished {
        findings: usize,
        diagnostics: usize,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub records: Vec<EntityRecord>,
    pub report: OverlapReport,
    pub diagnostics: Vec<Diagnostic>,
}

struct EntityOutcome {
    record: Option<EntityRecord>,
    diagnostics: Vec<Diagnostic>,
}

struct Shared {
    aggregator: MultiDocumentAggregator,
    allocator: TextBudgetAllocator,
    coordinator: EntityExtractionCoordinator<Arc<dyn ReasoningService>>,
    events: Option<UnboundedSender<PipelineEvent>>,
}

impl Shared {
    fn emit(&self, event: PipelineEvent) {
        if let Some(events) = &self.events {
            // a dropped receiver only means nobody is watching
            let _ = events.send(event);
        }
    }

    async fn process(&self, input: EntityInput) -> EntityOutcome {
        let entity = input.name;
        self.emit(PipelineEvent::EntityStarted {
            entity: entity.clone(),
            documents: input.documents.len(),
        });

        let aggregated = self.aggregator.aggregate(&input.documents).await;

        for status in &aggregated.documents {
            self.emit(match &status.outcome {
                DocumentOutcome::Extracted { chars } => PipelineEvent::DocumentExtracted {
                    entity: entity.clone(),
                    document: status.name.clone(),
                    chars: *chars,
                },
                DocumentOutcome::Failed { reason } => PipelineEvent::DocumentFailed {
                    entity: entity.clone(),
                    document: status.name.clone(),
                    reason: reason.clone(),
                },
            });
        }

        let mut diagnostics: Vec<Diagnostic> = aggregated
            .warnings
            .iter()
            .cloned()
            .map(|d| d.with_entity(entity.as_str()))
            .collect();

        if aggregated.is_empty() {
            let reason = "no document produced any text".to_string();
            tracing::error!(entity = %entity, "Excluding entity: {reason}");
            diagnostics.push(
                Diagnostic::new(Phase::TextExtraction, ErrorKind::ExtractionFailure, reason.as_str())
                    .with_entity(entity.as_str()),
            );
            self.emit(PipelineEvent::EntityFailed { entity, reason });
            return EntityOutcome {
                record: None,
                diagnostics,
            };
        }

        let sources: Vec<String> = aggregated.extracted().map(str::to_string).collect();
        let excerpt = self.allocator.allocate(&aggregated.combined);
        tracing::debug!(
            entity = %entity,
            combined_chars = aggregated.combined.chars().count(),
            excerpt_chars = excerpt.chars().count(),
            "Allocated excerpt"
        );

        let extraction = self
            .coordinator
            .extract_entity(&excerpt, &entity, &sources)
            .await;
        diagnostics.extend(extraction.diagnostic);

        self.emit(PipelineEvent::EntityExtracted {
            entity,
            items: extraction.record.item_count(),
            degraded: extraction.record.is_degraded(),
        });

        EntityOutcome {
            record: Some(extraction.record),
            diagnostics,
        }
    }
}

/// Documents in, overlap report out. Entities are processed independently
/// (up to `max_concurrent` at once) and overlap analysis waits for all of them.
pub struct Pipeline {
    aggregator: MultiDocumentAggregator,
    allocator: TextBudgetAllocator,
    service: Arc<dyn ReasoningService>,
    events: Option<UnboundedSender<PipelineEvent>>,
    max_concurrent: usize,
    name_threshold: f64,
}

impl Pipeline {
    #[must_use]
    pub fn new(aggregator: MultiDocumentAggregator, service: Arc<dyn ReasoningService>) -> Self {
        Self {
            aggregator,
            allocator: TextBudgetAllocator::default(),
            service,
            events: None,
            max_concurrent: 1,
            name_threshold: DEFAULT_NAME_THRESHOLD,
        }
    }

    #[must_use]
    pub fn from_config(config: &SihatiConfig, service: Arc<dyn ReasoningService>) -> Self {
        Self::new(MultiDocumentAggregator::from_config(&config.extraction), service)
            .with_allocator(TextBudgetAllocator::new(config.budget.max_excerpt_chars))
            .with_max_concurrent(config.pipeline.max_concurrent_entities)
            .with_name_threshold(config.pipeline.name_match_threshold)
    }

    #[must_use]
    pub fn with_allocator(mut self, allocator: TextBudgetAllocator) -> Self {
        self.allocator = allocator;
        self
    }

    #[must_use]
    pub fn with_events(mut self, events: UnboundedSender<PipelineEvent>) -> Self {
        self.events = Some(events);
        self
    }

    #[must_use]
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    #[must_use]
    pub fn with_name_threshold(mut self, threshold: f64) -> Self {
        self.name_threshold = threshold;
        self
    }

    /// Fails only with [`crate::Error::InsufficientEntities`]; every other
    /// problem is reported through the output's diagnostics. The event
    /// sender is dropped when the run completes.
    pub async fn run(self, entities: Vec<EntityInput>) -> Result<PipelineOutput> {
        tracing::info!(
            entities = entities.len(),
            max_concurrent = self.max_concurrent,
            "Starting analysis run"
        );

        let shared = Arc::new(Shared {
            aggregator: self.aggregator,
            allocator: self.allocator,
            coordinator: EntityExtractionCoordinator::new(Arc::clone(&self.service)),
            events: self.events,
        });
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles = Vec::with_capacity(entities.len());

        for input in entities {
            let name = input.name.clone();
            let shared = Arc::clone(&shared);
            let semaphore = Arc::clone(&semaphore);
            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                shared.process(input).await
            });
            handles.push((name, handle));
        }

        let mut records = Vec::new();
        let mut diagnostics = Vec::new();

        for (name, handle) in handles {
            match handle.await {
                Ok(outcome) => {
                    records.extend(outcome.record);
                    diagnostics.extend(outcome.diagnostics);
                }
                Err(e) => {
                    tracing::error!(entity = %name, error = %e, "Entity task failed");
                    diagnostics.push(
                        Diagnostic::new(Phase::StructuredExtraction, ErrorKind::Internal, e.to_string())
                            .with_entity(name),
                    );
                }
            }
        }

        shared.emit(PipelineEvent::OverlapStarted {
            entities: records.len(),
        });

        let engine = OverlapEngine::new(Arc::clone(&self.service))
            .with_name_threshold(self.name_threshold);
        let report = engine.analyze(&records).await?;

        if let Some(failure) = &report.failure {
            diagnostics.push(Diagnostic::new(
                Phase::OverlapAnalysis,
                ErrorKind::ReasoningService,
                failure.as_str(),
            ));
        }

        shared.emit(PipelineEvent::Finished {
            findings: report.findings.len(),
            diagnostics: diagnostics.len(),
        });

        tracing::info!(
            records = records.len(),
            findings = report.findings.len(),
            diagnostics = diagnostics.len(),
            "Analysis run complete"
        );

        Ok(PipelineOutput {
            records,
            report,
            diagnostics,
        })
    }
}
