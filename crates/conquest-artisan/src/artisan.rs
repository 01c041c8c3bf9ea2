use std::fmt;

use conquest_engine::{BoardConfig, ColorIndex, Observation};
use log::{error, warn};
use rand::{Rng, seq::IndexedRandom as _};

use crate::{
    NetworkError,
    neural_net::{NeuralNet, inverse_abs},
};

/// A move-selection policy.
///
/// `play` takes `&self` so one artisan can serve many games at once.
pub trait Artisan: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Picks the color to claim, or `None` if there is nothing to play.
    fn play(&self, observation: &Observation) -> Option<ColorIndex>;
}

/// An artisan that can be scored and bred by the genetic algorithm.
pub trait Evolvable: Artisan + Clone {
    fn fitness(&self) -> f64;

    fn set_fitness(&mut self, fitness: f64);

    fn mutate_random<R>(&mut self, likelihood: f64, rng: &mut R)
    where
        R: Rng + ?Sized;

    fn mutate_by_delta<R>(&mut self, likelihood: f64, delta: f64, rng: &mut R)
    where
        R: Rng + ?Sized;

    /// Breeds a child that inherits from `a` with probability `a_bias` per
    /// gene and from `b` otherwise.
    #[must_use]
    fn crossover<R>(a: &Self, b: &Self, a_bias: f64, rng: &mut R) -> Self
    where
        R: Rng + ?Sized;
}

/// Plays a uniformly random available color.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomArtisan;

impl Artisan for RandomArtisan {
    fn name(&self) -> &str {
        "random"
    }

    fn play(&self, observation: &Observation) -> Option<ColorIndex> {
        observation
            .available_moves()
            .choose(&mut rand::rng())
            .copied()
    }
}

/// Scores every color with a [`NeuralNet`] and plays the lowest-scoring
/// available one.
#[derive(Debug, Clone, PartialEq)]
pub struct NeuralArtisan {
    net: NeuralNet,
    fitness: f64,
}

impl NeuralArtisan {
    /// Creates an artisan sized for boards of `board`, with the given hidden
    /// layer sizes between the one-hot input layer and one output per color.
    pub fn new<R>(board: &BoardConfig, hidden_layers: &[usize], rng: &mut R) -> Result<Self, NetworkError>
    where
        R: Rng + ?Sized,
    {
        let topology: Vec<usize> = [board.area() * board.colors]
            .into_iter()
            .chain(hidden_layers.iter().copied())
            .chain([board.colors])
            .collect();
        Ok(Self::from_net(NeuralNet::new(&topology, rng)?))
    }

    #[must_use]
    pub fn from_net(net: NeuralNet) -> Self {
        Self { net, fitness: 0.0 }
    }

    #[must_use]
    pub fn net(&self) -> &NeuralNet {
        &self.net
    }

    fn choose(&self, observation: &Observation) -> Result<Option<ColorIndex>, NetworkError> {
        let available = observation.available_moves();
        let outputs = self.net.process(&encode(observation), inverse_abs)?;
        Ok(outputs
            .into_iter()
            .filter(|(color, _)| available.contains(color))
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(color, _)| color))
    }
}

impl Artisan for NeuralArtisan {
    fn name(&self) -> &str {
        "neural"
    }

    fn play(&self, observation: &Observation) -> Option<ColorIndex> {
        let available = observation.available_moves();
        if available.is_empty() {
            return None;
        }
        match self.choose(observation) {
            Ok(Some(color)) => return Some(color),
            Ok(None) => warn!("network scored no available color, playing at random"),
            Err(e) => warn!("network rejected the observation ({e}), playing at random"),
        }
        available.choose(&mut rand::rng()).copied()
    }
}

impl Evolvable for NeuralArtisan {
    fn fitness(&self) -> f64 {
        self.fitness
    }

    fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
    }

    fn mutate_random<R>(&mut self, likelihood: f64, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        self.net.mutate_random(likelihood, rng);
    }

    fn mutate_by_delta<R>(&mut self, likelihood: f64, delta: f64, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        self.net.mutate_by_delta(likelihood, delta, rng);
    }

    fn crossover<R>(a: &Self, b: &Self, a_bias: f64, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        match NeuralNet::crossover(&a.net, &b.net, a_bias, rng) {
            Ok(net) => Self::from_net(net),
            Err(e) => {
                error!("crossover failed ({e}), cloning the first parent");
                Self::from_net(a.net.clone())
            }
        }
    }
}

/// One-hot encoding: input `cell_index * colors + color` is 1 for each cell.
fn encode(observation: &Observation) -> Vec<f64> {
    let colors = observation.colors();
    let mut inputs = vec![0.0; observation.board().area() * colors];
    for (index, cell) in observation.board().cells().iter().enumerate() {
        if cell.color() < colors {
            inputs[index * colors + cell.color()] = 1.0;
        }
    }
    inputs
}
