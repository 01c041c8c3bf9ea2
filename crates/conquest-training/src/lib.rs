//! Parallel evaluation and evolution of Conquest artisans.
//!
//! # How Training Works
//!
//! 1. **Population** - A set of [`Evolvable`](conquest_artisan::artisan::Evolvable)
//!    artisans, evaluated one at a time
//! 2. **Evaluation** - The active artisan plays seat 0 in `n_games` parallel
//!    games against a fixed opponent
//! 3. **Fitness** - Sum over those games of the cells seat 0 owns at the end
//! 4. **Evolution** - Once every artisan is scored, the population is
//!    truncated, mutated and refilled (see [`genetic`])
//! 5. **Repeat** - Boards are re-randomized and the next artisan is dispatched
//!
//! # Architecture
//!
//! ```text
//! Orchestrator (caller thread, polled with update())
//!     ↓ one job per game
//! WorkerPool (bounded threads, unbounded queue)
//!     ↓ play to completion
//! Game slots (NotStarted → InProgress → Done)
//!     ↓ all Done
//! Fitness → PopulationEvolver → next generation
//! ```
//!
//! The orchestrator never blocks on workers outside [`Orchestrator::stop`]:
//! [`Orchestrator::update`] is a non-blocking barrier meant to be called once
//! per frame.
//!
//! # Current Limitations
//!
//! - **Fixed opponent**: artisans never play each other
//! - **One artisan at a time**: the pool only parallelizes across games of the
//!   same artisan

pub use self::{genetic::*, orchestrator::*, worker_pool::WorkerPool};

use conquest_engine::ConfigError;

pub mod genetic;
pub mod orchestrator;
pub mod worker_pool;

/// Reasons an [`Orchestrator`] cannot be built.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum OrchestratorError {
    #[display("at least one game per artisan is required")]
    NoGames,
    #[display("the population is empty")]
    EmptyPopulation,
    #[display("invalid board: {_0}")]
    InvalidBoard(ConfigError),
    #[display("evolution parameter {name} out of range: {value}")]
    InvalidEvolution { name: &'static str, value: f64 },
}
