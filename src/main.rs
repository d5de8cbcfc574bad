//! skirmish - play one encounter from a catalog file

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use skirmish::catalog::MemoryCatalog;
use skirmish::combat::{Intent, Phase, StepOutcome};
use skirmish::store::{CharacterStore, MemoryStore, SqliteStore};
use skirmish::{Config, EncounterService};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "skirmish")]
#[command(version, about = "Play a turn-based encounter from a catalog file")]
struct Args {
    /// Catalog JSON file with characters and monsters
    #[arg(long)]
    catalog: PathBuf,

    /// Character id
    #[arg(long)]
    character: String,

    /// Monster id
    #[arg(long)]
    monster: String,

    /// RNG seed for a reproducible fight
    #[arg(long)]
    seed: Option<u64>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQLite database for character state (default: in-memory)
    #[arg(long)]
    db: Option<String>,

    /// Escape after this many rounds
    #[arg(long, default_value = "100")]
    max_rounds: u32,

    /// Emit diagnostics as JSON
    #[arg(long)]
    json: bool,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "skirmish=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json);

    let mut config = Config::load(args.config.as_deref())?;
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.db.is_some() {
        config.db_path = args.db.clone();
    }

    let catalog = Arc::new(MemoryCatalog::load(&args.catalog)?);

    match config.db_path.clone() {
        Some(path) => {
            let store = Arc::new(SqliteStore::open(Some(&path)).await?);
            info!("Using database {}", path);
            play(EncounterService::new(catalog, store, config), &args).await
        }
        None => play(EncounterService::new(catalog, MemoryStore::shared(), config), &args).await,
    }
}

/// Auto-pilot: basic attacks until resolved, then take every reward
async fn play<S: CharacterStore>(service: EncounterService<MemoryCatalog, S>, args: &Args) -> Result<()> {
    let (id, view) = service.start(&args.character, &args.monster).await?;
    println!(
        "{} ({} HP) vs {} ({} HP)",
        args.character, view.player_health, view.monster_name, view.monster_health
    );

    let mut view = view;
    loop {
        let intent = match view.phase {
            Phase::AwaitingInitiative => Intent::RollInitiative,
            Phase::PlayerTurn if view.round > args.max_rounds => Intent::Escape,
            Phase::PlayerTurn => Intent::BasicAttack,
            Phase::MonsterTurn => Intent::Advance,
            Phase::Resolved(_) => match &view.pending_rewards {
                Some(pending) => Intent::SettleRewards {
                    selected_item_ids: pending.items.iter().map(|s| s.item_id.clone()).collect(),
                    accept_currency: true,
                },
                None => break,
            },
        };

        let outcome = service.apply(id, intent).await?;
        print_outcome(&outcome);
        if let Some(reason) = outcome.rejected {
            bail!("intent rejected: {}", reason);
        }
        view = outcome.view;
    }

    let view = service.end_session(id).await?;
    println!(
        "Result: {} after {} round(s), {} HP left",
        view.phase, view.round, view.player_health
    );
    Ok(())
}

fn print_outcome(outcome: &StepOutcome) {
    for entry in &outcome.entries {
        println!("[{}] {}", entry.tag, entry.message);
    }
}
