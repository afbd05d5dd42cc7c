use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use sihati_core::{EntityInput, Pipeline, PipelineEvent, PipelineOutput, SihatiConfig, SourceDocument};
use tokio::sync::mpsc;

use super::EntitySpec;

pub async fn run(entities: Vec<EntitySpec>, config: Option<&Path>, output: Option<&Path>) -> Result<()> {
    if entities.len() < 2 {
        bail!(
            "at least two entities are required for overlap analysis (got {})",
            entities.len()
        );
    }

    let config = SihatiConfig::load(config).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let service = sihati_core::connect(&config.reasoning)
        .context("Failed to set up the reasoning service")?;

    let inputs = entities
        .into_iter()
        .map(|spec| {
            let documents = spec.documents.into_iter().map(SourceDocument::from_path).collect();
            EntityInput::new(spec.name, documents)
        })
        .collect();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let progress = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            log_event(&event);
        }
    });

    let result = Pipeline::from_config(&config, Arc::new(service))
        .with_events(tx)
        .run(inputs)
        .await;
    progress.await.context("Progress reporter failed")?;

    let report = result.context("Analysis failed")?;
    for diagnostic in &report.diagnostics {
        tracing::warn!("{diagnostic}");
    }

    write_report(&report, output)
}

fn log_event(event: &PipelineEvent) {
    match event {
        PipelineEvent::EntityStarted { entity, documents } => {
            tracing::info!(entity = %entity, documents, "Processing entity");
        }
        PipelineEvent::DocumentExtracted {
            entity,
            document,
            chars,
        } => tracing::info!(entity = %entity, document = %document, chars, "Document extracted"),
        PipelineEvent::DocumentFailed {
            entity,
            document,
            reason,
        } => tracing::warn!(entity = %entity, document = %document, "Document failed: {reason}"),
        PipelineEvent::EntityExtracted {
            entity,
            items,
            degraded,
        } => tracing::info!(entity = %entity, items, degraded, "Entity extracted"),
        PipelineEvent::EntityFailed { entity, reason } => {
            tracing::warn!(entity = %entity, "Entity excluded: {reason}");
        }
        PipelineEvent::OverlapStarted { entities } => {
            tracing::info!(entities, "Analyzing overlap");
        }
        PipelineEvent::Finished {
            findings,
            diagnostics,
        } => tracing::info!(findings, diagnostics, "Finished"),
    }
}

fn write_report(report: &PipelineOutput, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;

    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Report written to {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}
