use std::{fs::File, path::PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use env_logger::{Builder, Env, Target};

use crate::model::simulation_config::SimulationConfig;

use self::{play::PlayArg, simulate::SimulateArg, watch::WatchArg};

mod play;
mod simulate;
mod watch;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Train neural artisans headless and report per-generation fitness
    Simulate(#[clap(flatten)] SimulateArg),
    /// Train while drawing the running games in the terminal
    Watch(#[clap(flatten)] WatchArg),
    /// Play one game between two random artisans and print the final board
    Play(#[clap(flatten)] PlayArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args
        .mode
        .unwrap_or(Mode::Simulate(SimulateArg::default()))
    {
        Mode::Simulate(arg) => {
            init_logging("info", None)?;
            simulate::run(&arg)?;
        }
        Mode::Watch(arg) => {
            // the terminal belongs to the UI unless logs go to a file
            let default_filter = if arg.log_file.is_some() { "info" } else { "off" };
            init_logging(default_filter, arg.log_file.clone())?;
            watch::run(&arg)?;
        }
        Mode::Play(arg) => {
            init_logging("warn", None)?;
            play::run(&arg)?;
        }
    }
    Ok(())
}

fn init_logging(default_filter: &str, log_file: Option<PathBuf>) -> anyhow::Result<()> {
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_filter));
    if let Some(path) = log_file {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create log file: {}", path.display()))?;
        builder.target(Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

/// Training settings shared by `simulate` and `watch`: an optional config
/// file, overridden field by field by flags.
#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct SettingsArg {
    /// Simulation config file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Games played per artisan evaluation
    #[arg(long)]
    games: Option<usize>,
    /// Worker threads
    #[arg(long)]
    threads: Option<usize>,
    /// Artisans per generation
    #[arg(long)]
    population: Option<usize>,
    /// Generations to train
    #[arg(long)]
    generations: Option<usize>,
    #[arg(long)]
    width: Option<usize>,
    #[arg(long)]
    height: Option<usize>,
    /// Size of the color palette
    #[arg(long)]
    colors: Option<usize>,
    /// Hidden layer sizes, comma separated
    #[arg(long, value_delimiter = ',')]
    hidden: Option<Vec<usize>>,
    /// Milliseconds between two polls of the running games
    #[arg(long)]
    frame_ms: Option<u64>,
}

impl SettingsArg {
    pub(crate) fn resolve(&self) -> anyhow::Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::open(path)?,
            None => SimulationConfig::default(),
        };

        let orchestrator = &mut config.orchestrator;
        override_with(&mut orchestrator.n_games, self.games);
        override_with(&mut orchestrator.n_threads, self.threads);
        override_with(&mut orchestrator.board.width, self.width);
        override_with(&mut orchestrator.board.height, self.height);
        override_with(&mut orchestrator.board.colors, self.colors);
        override_with(&mut config.population, self.population);
        override_with(&mut config.generations, self.generations);
        override_with(&mut config.hidden_layers, self.hidden.clone());
        override_with(&mut config.frame_interval_ms, self.frame_ms);
        Ok(config)
    }
}

fn override_with<T>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}
