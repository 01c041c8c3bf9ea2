//! Move-selection policies ("artisans") for Conquest.
//!
//! An artisan looks at an [`Observation`](conquest_engine::Observation) of a
//! running game and names the color its seat should claim next.
//!
//! # Modules
//!
//! - [`neural_net`] - Fixed-topology feed-forward network with mutation and
//!   crossover operators, no backpropagation
//! - [`artisan`] - The [`Artisan`](artisan::Artisan) policy trait, the
//!   [`Evolvable`](artisan::Evolvable) extension used by training, and the
//!   random and neural policies
//!
//! # Architecture
//!
//! ```text
//! Observation (board snapshot + available moves)
//!     ↓ one-hot encoded
//! Neural_net (forward pass)
//!     ↓ (color, score) pairs
//! NeuralArtisan (filter to legal moves, pick the extremum)
//!     ↓
//! ColorIndex
//! ```
//!
//! # Current Limitations
//!
//! - **No bias terms**: neurons only weight their inputs
//! - **Lowest score wins**: the neural policy picks the minimum score among
//!   legal moves; training adapts to that convention
//! - **Weights change only through evolution**: there is no gradient-based
//!   learning

pub mod artisan;
pub mod neural_net;

/// Errors raised by [`neural_net::NeuralNet`].
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum NetworkError {
    #[display("topology {topology:?} needs at least two non-empty layers")]
    InvalidTopology { topology: Vec<usize> },
    #[display("expected {expected} inputs, got {actual}")]
    InputSizeMismatch { expected: usize, actual: usize },
    #[display("cannot cross topologies {left:?} and {right:?}")]
    TopologyMismatch { left: Vec<usize>, right: Vec<usize> },
}
