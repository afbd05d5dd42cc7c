use std::path::Path;

use anyhow::{bail, Context, Result};
use sihati_core::{ExtractionOutcome, MultiDocumentAggregator, SihatiConfig, SourceDocument};

pub async fn run(file: &Path, config: Option<&Path>) -> Result<()> {
    let config = SihatiConfig::load(config).context("Failed to load configuration")?;
    let aggregator = MultiDocumentAggregator::from_config(&config.extraction);

    let document = SourceDocument::from_path(file);
    match aggregator.extract_document(&document).await {
        ExtractionOutcome::Text(text) => {
            tracing::info!(document = %document.name(), chars = text.chars().count(), "Extracted");
            println!("{text}");
            Ok(())
        }
        ExtractionOutcome::Partial { text, shortfall } => {
            tracing::warn!(document = %document.name(), %shortfall, "Kept partial text layer");
            println!("{text}");
            Ok(())
        }
        ExtractionOutcome::Failure(reason) => bail!("{}: {reason}", file.display()),
    }
}
