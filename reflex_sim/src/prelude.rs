// reflex_sim/src/prelude.rs

// Re-export the entire reflex_core prelude so you can easily access
// pure types like `State`, `Plant`, `DelayCompensatedEstimator`, etc.
pub use reflex_core::prelude::*;

// Re-export common simulation-specific types for easy access.
pub use crate::config::{ScenarioConfig, ScenarioError};
pub use crate::controller::PdController;
pub use crate::episode::{EpisodeRunner, EpisodeSummary};
pub use crate::prng::SimulationRng;
pub use crate::sensor::NoisySensor;
