//! Squad Battle - Development Tools

use std::path::{Path, PathBuf};
use std::sync::Arc;

use battle_core::data::BattleSetup;
use battle_core::provider::{UnitTypeProvider, UnitTypeRegistry};
use battle_core::replay::BattleReplay;
use battle_tools::error::Result;
use battle_tools::simulate::{check_replay, simulate, summary, LogSink};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "battle-tools")]
#[command(about = "Development tools for the squad battle engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate data files
    Validate {
        /// Path to data directory
        #[arg(default_value = "data")]
        path: String,
    },
    /// Run a battle headless with both squads on the AI
    Simulate {
        /// Battle setup file
        setup: PathBuf,
        /// Unit data file
        #[arg(long, default_value = "data/units.ron")]
        units: PathBuf,
        /// Override the setup's seed
        #[arg(long)]
        seed: Option<u64>,
        /// Play this many seeds in a row and report win rates
        #[arg(long)]
        runs: Option<u64>,
        /// Write a replay of the battle here
        #[arg(long)]
        replay: Option<PathBuf>,
    },
    /// Check that a replay reproduces its recording
    Replay {
        /// Replay file
        file: PathBuf,
        /// Unit data file
        #[arg(long, default_value = "data/units.ron")]
        units: PathBuf,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { path } => validate(&path),
        Commands::Simulate {
            setup,
            units,
            seed,
            runs,
            replay,
        } => run_simulation(&setup, &units, seed, runs, replay.as_deref()),
        Commands::Replay { file, units } => run_replay(&file, &units),
    };

    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

fn load_units(path: &Path) -> Result<Arc<dyn UnitTypeProvider>> {
    Ok(Arc::new(UnitTypeRegistry::load(path)?))
}

fn validate(path: &str) -> Result<()> {
    tracing::info!("Validating data files in: {path}");
    let report = battle_tools::validate::validate_data_directory(Path::new(path))?;
    tracing::info!(
        unit_types = report.unit_types,
        battles = report.battles,
        "Validation passed"
    );
    Ok(())
}

fn run_simulation(
    setup_path: &Path,
    units: &Path,
    seed: Option<u64>,
    runs: Option<u64>,
    replay_path: Option<&Path>,
) -> Result<()> {
    let provider = load_units(units)?;
    let mut setup = BattleSetup::load(setup_path)?;
    if let Some(seed) = seed {
        setup.seed = seed;
    }

    if let Some(runs) = runs {
        let first = setup.seed;
        let stats = battle_test_utils::balance::run_matchup(&setup, &provider, first..first.saturating_add(runs))?;
        tracing::info!(
            battles = stats.total_battles,
            attacker_wins = stats.attacker_wins,
            defender_wins = stats.defender_wins,
            draws = stats.draws,
            avg_rounds = stats.avg_rounds(),
            "Matchup finished"
        );
        return Ok(());
    }

    let (outcome, replay) = simulate(setup, provider, &mut LogSink::default())?;
    for line in summary(&outcome) {
        tracing::info!("{line}");
    }
    if let Some(path) = replay_path {
        replay.save(path)?;
        tracing::info!(path = %path.display(), "Replay written");
    }
    Ok(())
}

fn run_replay(file: &Path, units: &Path) -> Result<()> {
    let provider = load_units(units)?;
    let replay = BattleReplay::load(file)?;
    check_replay(&replay, provider, &file.display().to_string())?;
    tracing::info!(commands = replay.command_count(), "Replay matches its recording");
    Ok(())
}
