//! skyweave CLI
//!
//! Offline hydration over JSON fixtures, backed by the in-memory data plane.
//!
//! ## Commands
//!
//! - `extract <payload.json>`: Extract entities from a payload and label them
//! - `labels <labels.json> --subject <uri>...`: Fold a label fixture for a set of subjects

use clap::{Parser, Subcommand};
use serde::Serialize;
use skyweave::{
    config::{HydrationConfig, HydrationConfigProvider, TomlConfigProvider},
    dataplane::MemoryDataPlane,
    hydration::{HydrateCtx, Hydrator},
    properties::{ParsedLabelers, RawLabel},
    HydrationError,
};
use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(name = "skyweave")]
#[command(author, version, about = "Hydrate social-graph payloads and fold moderation labels", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Accepted labelers, in labelers header form: `did:plc:a;redact,did:plc:b`
    #[arg(short, long, global = true, default_value = "")]
    labelers: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract posts, actors and counters from a payload, then hydrate their labels
    Extract {
        /// Path to the JSON payload
        payload: PathBuf,

        /// JSON array of labels served by the data plane
        #[arg(long)]
        labels: Option<PathBuf>,
    },

    /// Fold the labels on the given subjects
    Labels {
        /// JSON array of labels served by the data plane
        labels: PathBuf,

        /// Subject URI or DID; may be repeated
        #[arg(short, long = "subject", required = true)]
        subjects: Vec<String>,
    },
}

fn load_config(path: Option<PathBuf>) -> Result<HydrationConfig, HydrationError> {
    match path {
        Some(path) => TomlConfigProvider::new(path).get_config(),
        None => Ok(HydrationConfig::default()),
    }
}

fn load_labels(path: &Path) -> Result<Vec<RawLabel>, HydrationError> {
    let content = read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), HydrationError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config)?;
    let labelers = ParsedLabelers::parse_header(&cli.labelers);
    let ctx = HydrateCtx::new(labelers);
    let dataplane = MemoryDataPlane::new();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match cli.command {
        Commands::Extract { payload, labels } => {
            if let Some(path) = labels {
                dataplane.add_labels(load_labels(&path)?);
            }
            let payload: serde_json::Value = serde_json::from_str(&read_to_string(&payload)?)?;
            let hydrator = Hydrator::new(&dataplane, config);
            let hydrated = runtime.block_on(hydrator.hydrate_payload(&payload, &ctx))?;
            tracing::info!(
                "Extracted {} posts and {} actors",
                hydrated.uris.len(),
                hydrated.state.actors.len()
            );
            print_json(&hydrated)?;
        }

        Commands::Labels { labels, subjects } => {
            if ctx.labelers.is_empty() {
                tracing::warn!("No labelers given; every subject will come back unlabeled");
            }
            dataplane.add_labels(load_labels(&labels)?);
            let hydrator = Hydrator::new(&dataplane, config);
            let folded = runtime.block_on(
                hydrator
                    .label_hydrator()
                    .get_labels_for_subjects(&subjects, &ctx.labelers),
            )?;
            print_json(&folded)?;
        }
    }

    Ok(())
}
