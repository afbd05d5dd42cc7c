use anyhow::{Context, Result};
use console::style;
use sihati_core::KNOWN_MODELS;

pub fn run(json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(KNOWN_MODELS).context("Failed to serialize models")?;
        println!("{out}");
        return Ok(());
    }

    for model in KNOWN_MODELS {
        let marker = if model.recommended {
            style("●").green()
        } else {
            style("○").dim()
        };
        println!("{marker} {} ({})", style(model.id).bold(), model.name);
        println!("  {}", model.description);
        println!("  cost: {}, speed: {}", model.cost, model.speed);
    }

    Ok(())
}
