use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use room::StoreConfig;
use simulation::{run_game, SimulationConfig, SimulationError};
use strategies::{DefaultStrategy, InputStrategy, RandomStrategy};
use types::Strategy;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum StrategyKind {
    Default,
    Random,
}

#[derive(Parser, Debug)]
struct Params {
    /// YAML table description.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Overrides the players from the config.
    #[arg(short, long)]
    player: Vec<String>,
    /// Store url, `memory://` or `sqlite:...`.
    #[arg(long)]
    store: Option<String>,
    #[arg(short, long, value_enum, default_value_t = StrategyKind::Default)]
    strategy: StrategyKind,
    /// 1-based seat answered from stdin.
    #[arg(long)]
    interactive_seat: Option<usize>,
    #[arg(short, long)]
    games: Option<usize>,
}

fn seat_strategies(args: &Params, players: usize) -> Vec<Box<dyn Strategy>> {
    (0..players)
        .map(|seat| -> Box<dyn Strategy> {
            if args.interactive_seat == Some(seat + 1) {
                return Box::new(InputStrategy::default());
            }
            match args.strategy {
                StrategyKind::Default => Box::new(DefaultStrategy::default()),
                StrategyKind::Random => Box::new(RandomStrategy::default()),
            }
        })
        .collect()
}

async fn run(args: Params) -> Result<(), SimulationError> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if !args.player.is_empty() {
        config.players = args.player.clone();
    }
    if let Some(games) = args.games {
        config.games = games;
    }

    let store = StoreConfig::from_cli_or_env_or_yaml(args.store.clone(), config.store_url.clone())
        .connect()
        .await?;
    let mut seats = seat_strategies(&args, config.players.len());
    for game in 1..=config.games {
        let summary = run_game(store.clone(), &config, &mut seats).await?;
        log::info!(
            "Game {game} in room {}: winner {:?} after {} nights, {} events played",
            summary.room,
            summary.winner,
            summary.nights,
            summary.events.len()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Params::parse();
    log::info!("args: {args:?}");
    if let Err(err) = run(args).await {
        log::error!("Simulation failed: {err}");
        std::process::exit(1);
    }
}
