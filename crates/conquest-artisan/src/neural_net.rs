//! Fixed-topology feed-forward neural network.
//!
//! The network is a sequence of layers, each a sequence of neurons. A neuron
//! carries one outgoing weight per neuron of the next layer; neurons of the
//! last layer carry none. There are no bias terms.
//!
//! Weights never change through the forward pass. They change only through
//! the genetic operators:
//!
//! - [`NeuralNet::mutate_random`] - replace weights with fresh uniform values
//! - [`NeuralNet::mutate_by_delta`] - nudge weights by a bounded uniform amount
//! - [`NeuralNet::crossover`] - weight-level uniform crossover of two parents
//!
//! # Example
//!
//! ```
//! use conquest_artisan::neural_net::{NeuralNet, inverse_abs};
//!
//! let mut rng = rand::rng();
//! let net = NeuralNet::new(&[3, 4, 2], &mut rng).unwrap();
//! let outputs = net.process(&[1.0, 0.0, 0.5], inverse_abs).unwrap();
//! assert_eq!(outputs.len(), 2);
//! assert_eq!(outputs[1].0, 1);
//! ```

use rand::Rng;

use crate::NetworkError;

/// `1 / (1 + |x|)`: bounded in `(0, 1]`, symmetric around zero.
#[must_use]
pub fn inverse_abs(x: f64) -> f64 {
    1.0 / (1.0 + x.abs())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Neuron {
    weights: Vec<f64>,
}

impl Neuron {
    /// Outgoing weights, one per neuron of the next layer.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

pub type Layer = Vec<Neuron>;

#[derive(Debug, Clone, PartialEq)]
pub struct NeuralNet {
    layers: Vec<Layer>,
}

impl NeuralNet {
    /// Creates a network with the given layer sizes.
    ///
    /// Every weight is drawn uniformly from `[0, 1)`.
    pub fn new<R>(topology: &[usize], rng: &mut R) -> Result<Self, NetworkError>
    where
        R: Rng + ?Sized,
    {
        if topology.len() < 2 || topology.contains(&0) {
            return Err(NetworkError::InvalidTopology {
                topology: topology.to_vec(),
            });
        }

        let next_sizes = topology.iter().skip(1).copied().chain([0]);
        let layers = topology
            .iter()
            .zip(next_sizes)
            .map(|(&size, next_size)| {
                (0..size)
                    .map(|_| Neuron {
                        weights: (0..next_size).map(|_| rng.random()).collect(),
                    })
                    .collect()
            })
            .collect();

        Ok(Self { layers })
    }

    /// Neuron count of every layer, input layer first.
    #[must_use]
    pub fn topology(&self) -> Vec<usize> {
        self.layers.iter().map(Vec::len).collect()
    }

    #[must_use]
    pub fn input_size(&self) -> usize {
        self.layers[0].len()
    }

    #[must_use]
    pub fn output_size(&self) -> usize {
        self.layers[self.layers.len() - 1].len()
    }

    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Every weight in layer, neuron, weight order.
    pub fn weights(&self) -> impl Iterator<Item = f64> + '_ {
        self.layers
            .iter()
            .flatten()
            .flat_map(|n| n.weights.iter().copied())
    }

    fn weights_mut(&mut self) -> impl Iterator<Item = &mut f64> + '_ {
        self.layers
            .iter_mut()
            .flatten()
            .flat_map(|n| n.weights.iter_mut())
    }

    /// Runs a forward pass and returns the final layer's outputs paired with
    /// their index.
    ///
    /// Each neuron after the input layer outputs
    /// `activation(Σ previous.output × previous.weights[this])`.
    pub fn process<F>(&self, inputs: &[f64], activation: F) -> Result<Vec<(usize, f64)>, NetworkError>
    where
        F: Fn(f64) -> f64,
    {
        if inputs.len() != self.input_size() {
            return Err(NetworkError::InputSizeMismatch {
                expected: self.input_size(),
                actual: inputs.len(),
            });
        }

        let mut outputs = inputs.to_vec();
        for (prev_layer, layer) in self.layers.iter().zip(&self.layers[1..]) {
            let mut sums = vec![0.0; layer.len()];
            for (neuron, output) in prev_layer.iter().zip(&outputs) {
                for (sum, weight) in sums.iter_mut().zip(&neuron.weights) {
                    *sum += output * weight;
                }
            }
            outputs = sums.into_iter().map(&activation).collect();
        }

        Ok(outputs.into_iter().enumerate().collect())
    }

    /// Replaces each weight with a fresh `[0, 1)` value with probability
    /// `likelihood`.
    pub fn mutate_random<R>(&mut self, likelihood: f64, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        let likelihood = likelihood.clamp(0.0, 1.0);
        for weight in self.weights_mut() {
            if rng.random_bool(likelihood) {
                *weight = rng.random();
            }
        }
    }

    /// Adds a uniform value from `[-delta/2, delta/2]` to each weight with
    /// probability `likelihood`.
    pub fn mutate_by_delta<R>(&mut self, likelihood: f64, delta: f64, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        let half = delta.abs() / 2.0;
        if half.is_nan() || half <= 0.0 {
            return;
        }
        let likelihood = likelihood.clamp(0.0, 1.0);
        for weight in self.weights_mut() {
            if rng.random_bool(likelihood) {
                *weight += rng.random_range(-half..=half);
            }
        }
    }

    /// Creates a child network: a copy of `a` in which each weight is taken
    /// from `b` with probability `1 - a_bias`.
    pub fn crossover<R>(a: &Self, b: &Self, a_bias: f64, rng: &mut R) -> Result<Self, NetworkError>
    where
        R: Rng + ?Sized,
    {
        let same_shape = a.layers.len() == b.layers.len()
            && a.layers.iter().zip(&b.layers).all(|(la, lb)| {
                la.len() == lb.len()
                    && la
                        .iter()
                        .zip(lb)
                        .all(|(na, nb)| na.weights.len() == nb.weights.len())
            });
        if !same_shape {
            return Err(NetworkError::TopologyMismatch {
                left: a.topology(),
                right: b.topology(),
            });
        }

        let b_likelihood = (1.0 - a_bias).clamp(0.0, 1.0);
        let mut child = a.clone();
        for (weight, b_weight) in child.weights_mut().zip(b.weights()) {
            if rng.random_bool(b_likelihood) {
                *weight = b_weight;
            }
        }
        Ok(child)
    }
}
