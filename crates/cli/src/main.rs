mod backend;
mod commands;

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use deckforge_core::{
    config::{self, AppConfig},
    persist::{FsDeckStore, Reconciler},
    Format,
};
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::{backend::RemoteBackend, commands::Session};

#[derive(Parser, Debug)]
#[command(author, version, about = "Build decks from the cards you own")]
struct Args {
    /// Inventory JSON file; overrides `inventory_path` from the config file.
    #[arg(long, global = true)]
    inventory: Option<PathBuf>,
    /// Save edits even when stored cards no longer resolve and would be dropped.
    #[arg(long, global = true)]
    drop_missing: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List locally saved decks.
    List,
    /// Create and save an empty deck.
    New {
        /// Deck name.
        name: String,
        /// Deck format; defaults to `default_format` from the config.
        #[arg(long)]
        format: Option<Format>,
    },
    /// Print a deck with its mana curve and summary.
    Show {
        /// Deck id.
        id: String,
        /// Load from the remote service instead of the local store.
        #[arg(long)]
        remote: bool,
    },
    /// Add copies of a card.
    Add {
        /// Deck id.
        id: String,
        /// Card name as listed in the inventory.
        card: String,
        /// Copies to add.
        #[arg(long, short, default_value_t = 1)]
        count: u32,
    },
    /// Remove copies of a card.
    Remove {
        /// Deck id.
        id: String,
        /// Card name as listed in the inventory.
        card: String,
        /// Copies to remove.
        #[arg(long, short, default_value_t = 1)]
        count: u32,
    },
    /// Set the number of copies of a card; zero removes it.
    Set {
        /// Deck id.
        id: String,
        /// Card name as listed in the inventory.
        card: String,
        /// Target count.
        count: u32,
    },
    /// Remove every card from a deck.
    Clear {
        /// Deck id.
        id: String,
    },
    /// Apply a JSON list of `{cardName, count, reason}` suggestions.
    Suggest {
        /// Deck id.
        id: String,
        /// Suggestions file.
        file: PathBuf,
    },
    /// Delete the local copy of a deck.
    Delete {
        /// Deck id.
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    config::ensure_default_config()?;
    let config = AppConfig::load()?;
    init_logging(&config.data_dir)?;

    let remote = RemoteBackend::from_config(&config.remote)?;
    let local = FsDeckStore::in_data_dir(&config.data_dir);
    let inventory_path = args.inventory.or_else(|| config.inventory_path.clone());
    let session = Session::new(
        Reconciler::new(remote, local),
        inventory_path.as_deref(),
        config.default_format,
        args.drop_missing,
    )?;

    match args.command {
        Command::List => session.list(),
        Command::New { name, format } => session.create(&name, format).await,
        Command::Show { id, remote } => session.show(&id, remote).await,
        Command::Add { id, card, count } => session.add(&id, &card, count).await,
        Command::Remove { id, card, count } => session.remove(&id, &card, count).await,
        Command::Set { id, card, count } => session.set(&id, &card, count).await,
        Command::Clear { id } => session.clear(&id).await,
        Command::Suggest { id, file } => session.suggest(&id, &file).await,
        Command::Delete { id } => session.delete(&id),
    }
}

fn init_logging(data_dir: &Path) -> Result<()> {
    let log_dir = data_dir.join("logs");
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create {}", log_dir.display()))?;
    let log_path = log_dir.join("deckforge.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}
