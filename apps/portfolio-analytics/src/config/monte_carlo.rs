//! Monte Carlo projection settings.

use serde::{Deserialize, Serialize};

/// Projection horizon, path count and seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    /// Run the projection at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Days projected per path.
    #[serde(default = "default_horizon_days")]
    pub horizon_days: usize,
    /// Number of simulated paths.
    #[serde(default = "default_simulation_count")]
    pub simulation_count: usize,
    /// Seed for reproducibility (None = random).
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            horizon_days: default_horizon_days(),
            simulation_count: default_simulation_count(),
            seed: None,
        }
    }
}

const fn default_enabled() -> bool {
    true
}

const fn default_horizon_days() -> usize {
    252
}

const fn default_simulation_count() -> usize {
    1000
}
