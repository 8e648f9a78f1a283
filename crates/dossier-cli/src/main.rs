//! dossier: create, inspect, pull, and push structured reports.

mod outline;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use dossier_client::{
    AssetCoordinator, ClientConfig, FlushOutcome, Flusher, NoticeBus, TokenCell, from_wire,
    http_backends, hydrate, to_wire,
};
use dossier_doc::{Document, RenderTree, Renderer};
use dossier_types::{ExternalItemId, WireDocument};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::outline::OutlineRenderer;

#[derive(Parser, Debug)]
#[command(name = "dossier")]
#[command(about = "Structured compliance report tool")]
struct Args {
    /// Client config (RON). Defaults to ~/.config/dossier/client.ron
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a fresh report's wire JSON
    New {
        #[arg(long)]
        item: String,
        #[arg(long)]
        title: Option<String>,
    },
    /// Print the page outline of a wire JSON file
    Outline { file: PathBuf },
    /// Load a report from the backend and print its outline
    Pull { item: String },
    /// Validate a wire JSON file and save it to the backend
    Push { file: PathBuf },
}

fn read_wire(path: &Path) -> anyhow::Result<WireDocument> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn print_outline(doc: &Document) -> anyhow::Result<()> {
    let text = OutlineRenderer.render(&RenderTree::assemble(doc))?;
    print!("{text}");
    Ok(())
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = ClientConfig::load_or_default(args.config.as_deref()).with_env();

    match args.command {
        Command::New { item, title } => {
            let mut doc = Document::new(ExternalItemId::new(item));
            if let Some(title) = title {
                doc.header.title = title;
            }
            println!("{}", serde_json::to_string_pretty(&to_wire(&doc))?);
        }
        Command::Outline { file } => {
            let wire = read_wire(&file)?;
            print_outline(&hydrate(&wire)?)?;
        }
        Command::Pull { item } => {
            let credentials = Arc::new(TokenCell::from_env());
            let backends = http_backends(&config, credentials)?;
            let item = ExternalItemId::new(item);
            let token = backends
                .credentials
                .token()
                .context("DOSSIER_TOKEN is not set")?;
            let Some(wire) = backends.reports.load(&token, &item).await? else {
                bail!("no report saved for item {item}");
            };
            let assets = AssetCoordinator::new(backends, config.allowed_image_types.clone(), NoticeBus::default());
            print_outline(&from_wire(&wire, &assets).await?)?;
        }
        Command::Push { file } => {
            let wire = read_wire(&file)?;
            wire.validate()?;
            let credentials = Arc::new(TokenCell::from_env());
            let backends = http_backends(&config, credentials)?;
            let flusher = Flusher::new(backends.reports, backends.credentials);
            match flusher.flush(&wire).await {
                FlushOutcome::Saved => println!("saved {}", wire.external_item_id),
                FlushOutcome::Skipped => bail!("DOSSIER_TOKEN is not set"),
                FlushOutcome::Idle => {}
                FlushOutcome::Failed(e) => return Err(e.into()),
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
