use std::{path::Path, time::Duration};

use anyhow::Context;
use conquest_artisan::artisan::{NeuralArtisan, RandomArtisan};
use conquest_training::{Orchestrator, OrchestratorConfig};
use serde::{Deserialize, Serialize};

use crate::util;

/// Settings of a training run, loadable from JSON.
///
/// Missing fields take their defaults, so a file only needs to name what it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub orchestrator: OrchestratorConfig,
    /// Number of artisans per generation
    pub population: usize,
    /// Generations to train before stopping
    pub generations: usize,
    /// Hidden layer sizes of every neural artisan
    pub hidden_layers: Vec<usize>,
    /// Milliseconds between two polls of the orchestrator
    pub frame_interval_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            orchestrator: OrchestratorConfig::default(),
            population: 10,
            generations: 10,
            hidden_layers: vec![64],
            frame_interval_ms: 16,
        }
    }
}

impl SimulationConfig {
    pub fn open<P>(path: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path>,
    {
        util::read_json_file("simulation config", path)
    }

    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    /// Builds a fresh random population and an orchestrator pitting it
    /// against a random opponent.
    pub fn build_orchestrator(&self) -> anyhow::Result<Orchestrator<NeuralArtisan>> {
        anyhow::ensure!(self.generations > 0, "at least one generation is required");

        let mut rng = rand::rng();
        let population = (0..self.population)
            .map(|_| NeuralArtisan::new(&self.orchestrator.board, &self.hidden_layers, &mut rng))
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to build the artisan population")?;
        let orchestrator = Orchestrator::new(self.orchestrator.clone(), population, RandomArtisan)
            .context("Invalid simulation config")?;
        Ok(orchestrator)
    }
}
