pub mod analyze;
pub mod extract;
pub mod models;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "sihati",
    about = "Mandate overlap analysis for government institutions",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract mandates for each entity and analyze overlap between them
    Analyze {
        /// Entity and its documents as NAME=doc1.pdf,doc2.pdf (repeat per entity)
        #[arg(short = 'e', long = "entity", value_parser = parse_entity)]
        entities: Vec<EntitySpec>,
        /// Configuration file (JSON)
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,
        /// Write the JSON report here instead of stdout
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },
    /// Print the extracted text of a single document
    Extract {
        /// PDF or plain-text document
        file: PathBuf,
        /// Configuration file (JSON)
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,
    },
    /// List known reasoning models
    Models {
        /// Print the catalogue as JSON
        #[arg(long)]
        json: bool,
    },
}

/// One `--entity` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySpec {
    pub name: String,
    pub documents: Vec<PathBuf>,
}

fn parse_entity(s: &str) -> Result<EntitySpec, String> {
    let (name, documents) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=doc1,doc2, got '{s}'"))?;

    let name = name.trim();
    if name.is_empty() {
        return Err("entity name is empty".to_string());
    }

    let documents: Vec<PathBuf> = documents
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(PathBuf::from)
        .collect();
    if documents.is_empty() {
        return Err(format!("entity '{name}' has no documents"));
    }

    Ok(EntitySpec {
        name: name.to_string(),
        documents,
    })
}
