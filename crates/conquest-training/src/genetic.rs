//! Truncation-selection genetic algorithm over [`Evolvable`] artisans.
//!
//! One evolution step:
//!
//! 1. **Rank** - sort the population by fitness, best first
//! 2. **Truncate** - keep the top half (at least one survivor)
//! 3. **Mutate** - every survivor gets a random-replacement mutation followed
//!    by a delta mutation
//! 4. **Refill** - breed `survivor[0] × survivor[1]` until the population is
//!    back to its original size (`survivor[0]` is paired with itself when it
//!    is the only survivor)
//!
//! Fitness values are not reset by the step; the orchestrator overwrites
//! each artisan's fitness when it is evaluated in the next generation.

use conquest_artisan::artisan::Evolvable;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::OrchestratorError;

/// Controls how one generation turns into the next.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationEvolver {
    /// Per-weight probability of replacing a survivor's weight with a fresh value
    pub mutation_likelihood: f64,
    /// Per-weight probability of nudging a survivor's weight
    pub delta_likelihood: f64,
    /// Width of the nudge interval `[-delta/2, delta/2]`
    pub delta: f64,
    /// Probability that a child's weight comes from the first parent
    pub crossover_bias: f64,
}

impl Default for PopulationEvolver {
    fn default() -> Self {
        Self {
            mutation_likelihood: 0.05,
            delta_likelihood: 0.05,
            delta: 0.1,
            crossover_bias: 0.6,
        }
    }
}

impl PopulationEvolver {
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        let probabilities = [
            ("mutation_likelihood", self.mutation_likelihood),
            ("delta_likelihood", self.delta_likelihood),
            ("crossover_bias", self.crossover_bias),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(OrchestratorError::InvalidEvolution { name, value });
            }
        }
        if !self.delta.is_finite() || self.delta < 0.0 {
            return Err(OrchestratorError::InvalidEvolution {
                name: "delta",
                value: self.delta,
            });
        }
        Ok(())
    }

    /// Produces the next generation, the same size as `population`.
    #[must_use]
    pub fn evolve<A, R>(&self, population: &[A], rng: &mut R) -> Vec<A>
    where
        A: Evolvable,
        R: Rng + ?Sized,
    {
        if population.is_empty() {
            return vec![];
        }

        let mut next = population.to_vec();
        next.sort_by(|a, b| b.fitness().total_cmp(&a.fitness()));

        let survivors = (next.len() / 2).max(1);
        next.truncate(survivors);
        for artisan in &mut next {
            artisan.mutate_random(self.mutation_likelihood, rng);
            artisan.mutate_by_delta(self.delta_likelihood, self.delta, rng);
        }

        let second = usize::from(survivors > 1);
        while next.len() < population.len() {
            let child = A::crossover(&next[0], &next[second], self.crossover_bias, rng);
            next.push(child);
        }
        next
    }
}

/// Fitness statistics of one evaluated generation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub generation: usize,
    /// Population index of the fittest artisan (first one on ties)
    pub best_index: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl GenerationSummary {
    /// Summarizes `population` as evaluated; an empty population yields
    /// all-zero statistics.
    #[must_use]
    pub fn from_population<A>(generation: usize, population: &[A]) -> Self
    where
        A: Evolvable,
    {
        let mut summary = Self {
            generation,
            ..Self::default()
        };
        let Some(first) = population.first() else {
            return summary;
        };

        summary.min = first.fitness();
        summary.max = first.fitness();
        let mut sum = 0.0;
        for (index, artisan) in population.iter().enumerate() {
            let fitness = artisan.fitness();
            if fitness > summary.max {
                summary.max = fitness;
                summary.best_index = index;
            }
            summary.min = summary.min.min(fitness);
            sum += fitness;
        }
        #[expect(clippy::cast_precision_loss)]
        let count = population.len() as f64;
        summary.mean = sum / count;
        summary
    }
}
