pub use self::{core::*, engine::*};

pub mod core;
pub mod engine;

/// Reasons a [`BoardConfig`] is refused.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ConfigError {
    #[display("board must be at least {min}x{min} cells, got {width}x{height}")]
    BoardTooSmall {
        width: usize,
        height: usize,
        min: usize,
    },
    #[display("player count must be between 1 and {max}, got {players}")]
    UnsupportedPlayerCount { players: usize, max: usize },
    #[display("{colors} colors cannot serve {players} players (need more colors than players)")]
    NotEnoughColors { colors: usize, players: usize },
    #[display("{colors} colors exceeds the limit of {max}")]
    TooManyColors { colors: usize, max: usize },
}

/// Reasons a move is rejected by [`Game::execute_turn`].
///
/// A rejected move never mutates the game.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum TurnError {
    #[display("wrong turn: player {expected} is to move, got player {actual}")]
    WrongTurn { expected: usize, actual: usize },
    #[display("color {color} is out of range (board has {colors} colors)")]
    ColorOutOfRange { color: usize, colors: usize },
    #[display("color {color} is already claimed by player {owner}")]
    ColorTaken { color: usize, owner: usize },
}
