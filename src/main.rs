use anyhow::{Context, Result, anyhow};
use clap::Parser;
use grid_snake::game::{GameConfig, GameEngine};
use grid_snake::modes::HumanMode;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "grid_snake")]
#[command(version, about = "Snake on a square grid, played in the terminal")]
struct Cli {
    /// JSON file with game settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Width and height of the board (overrides the config file)
    #[arg(long)]
    grid_size: Option<usize>,

    /// Milliseconds between ticks (overrides the config file)
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Seed for food placement, for reproducible games
    #[arg(long)]
    seed: Option<u64>,

    /// Where to write the log; the terminal itself is taken by the game
    #[arg(long, default_value = "grid_snake.log")]
    log_file: PathBuf,
}

impl Cli {
    fn game_config(&self) -> Result<GameConfig> {
        let mut config = match &self.config {
            Some(path) => GameConfig::load(path)?,
            None => GameConfig::default(),
        };

        if let Some(grid_size) = self.grid_size {
            config.grid_size = grid_size;
        }
        if let Some(tick_ms) = self.tick_ms {
            config.tick_interval_ms = tick_ms;
        }

        config
            .validate()
            .map_err(|msg| anyhow!("Invalid game config: {msg}"))?;
        Ok(config)
    }
}

fn init_logging(path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create log file {:?}", path))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow!("Failed to initialize logging: {err}"))?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_file)?;

    let config = cli.game_config()?;
    info!(
        grid_size = config.grid_size,
        tick_interval_ms = config.tick_interval_ms,
        seed = ?cli.seed,
        "starting grid_snake"
    );

    let engine = match cli.seed {
        Some(seed) => GameEngine::with_seed(config, seed),
        None => GameEngine::new(config),
    };

    let mut human_mode = HumanMode::new(engine);
    human_mode.run().await?;

    info!("exiting");
    Ok(())
}
