use chrono::{DateTime, Utc};
use conquest_training::GenerationSummary;
use serde::{Deserialize, Serialize};

use super::simulation_config::SimulationConfig;

/// Result of a training run, written by `simulate --output`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub trained_at: DateTime<Utc>,
    pub config: SimulationConfig,
    pub generations: Vec<GenerationSummary>,
    /// Best fitness seen across all generations
    pub best_fitness: f64,
}

impl TrainingReport {
    #[must_use]
    pub fn new(config: SimulationConfig, generations: Vec<GenerationSummary>) -> Self {
        let best_fitness = generations
            .iter()
            .map(|g| g.max)
            .fold(0.0, f64::max);
        Self {
            trained_at: Utc::now(),
            config,
            generations,
            best_fitness,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_fitness_spans_generations() {
        let summary = |generation, max| GenerationSummary {
            generation,
            max,
            ..GenerationSummary::default()
        };
        let report = TrainingReport::new(
            SimulationConfig::default(),
            vec![summary(0, 40.0), summary(1, 75.0), summary(2, 60.0)],
        );
        assert_eq!(report.best_fitness, 75.0);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["generations"].as_array().unwrap().len(), 3);
        assert!(json["trained_at"].is_string());
    }
}
