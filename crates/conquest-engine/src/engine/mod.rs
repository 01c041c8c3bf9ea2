//! Game rules and state management.
//!
//! - [`BoardConfig`] - Board dimensions, palette size, seat count and turn limit
//! - [`Game`] - One match: board, players, turn order, behind a per-game lock
//! - [`Observation`] - A consistent snapshot handed to a policy
//!
//! # Turn Flow
//!
//! 1. The seat to move picks a color nobody currently claims
//! 2. Its territory is recolored from the anchor cell (flood fill)
//! 3. Every cell of that color connected to the anchor is claimed (BFS)
//! 4. The turn passes to the next seat
//!
//! The game is done once every cell is owned by some player.
//!
//! # Example
//!
//! ```
//! use conquest_engine::{BoardConfig, Game};
//!
//! let game = Game::with_seed(BoardConfig::default(), 7).unwrap();
//! let color = game.available_moves()[0];
//! game.execute_turn(0, color).unwrap();
//! assert_eq!(game.turn(), 1);
//! assert!(game.execute_turn(0, color).is_err());
//! ```

pub use self::{config::*, game::*};

mod config;
mod game;
