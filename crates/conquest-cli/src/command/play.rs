use std::io;

use anyhow::Context;
use conquest_artisan::artisan::RandomArtisan;
use conquest_engine::{BoardConfig, Game};
use conquest_training::play_game;

use crate::view;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct PlayArg {
    /// Seed for the board layout; random when omitted
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = 20)]
    width: usize,
    #[arg(long, default_value_t = 20)]
    height: usize,
    /// Size of the color palette
    #[arg(long, default_value_t = 6)]
    colors: usize,
}

pub(crate) fn run(arg: &PlayArg) -> anyhow::Result<()> {
    let PlayArg {
        seed,
        width,
        height,
        colors,
    } = *arg;
    let config = BoardConfig {
        width,
        height,
        colors,
        ..BoardConfig::default()
    };
    let game = match seed {
        Some(seed) => Game::with_seed(config, seed),
        None => Game::new(config),
    }
    .context("Invalid board settings")?;

    play_game(&game, 0, &RandomArtisan, &RandomArtisan);

    view::write_board(&mut io::stdout().lock(), &game.cells())
        .context("Failed to draw the board")?;

    println!("Turns played: {}", game.turns_played());
    for player in game.players() {
        println!(
            "  Seat {}: {} cells (color {})",
            player.index(),
            player.owned_cells(),
            player.current_color()
        );
    }
    Ok(())
}
