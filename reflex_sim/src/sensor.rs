// reflex_sim/src/sensor.rs

use rand_distr::{Distribution, Normal};
use reflex_core::prelude::{DelayLine, State};

use crate::config::{ScenarioError, SensorConfig};
use crate::prng::SimulationRng;

/// Reads the true state and corrupts it with independent zero-mean Gaussian
/// noise per component.
///
/// With `latency = 0` the reading is the state at the instant the command is
/// issued. A positive latency hands back the state from `latency` steps
/// earlier; before that much history exists, the episode's first state stands
/// in for everything older.
#[derive(Debug, Clone)]
pub struct NoisySensor {
    noise: Option<Normal<f64>>,
    latency: usize,
    readings: Option<DelayLine<State>>,
}

impl NoisySensor {
    /// A standard deviation of zero gives exact readings.
    pub fn new(noise_std: f64, latency: usize) -> Result<Self, ScenarioError> {
        if !(noise_std.is_finite() && noise_std >= 0.0) {
            return Err(ScenarioError::InvalidValue {
                field: "sensor.noise_std",
                reason: format!("must be finite and non-negative, got {noise_std}"),
            });
        }
        let noise = if noise_std == 0.0 {
            None
        } else {
            let normal = Normal::new(0.0, noise_std).map_err(|e| ScenarioError::InvalidValue {
                field: "sensor.noise_std",
                reason: e.to_string(),
            })?;
            Some(normal)
        };
        Ok(Self {
            noise,
            latency,
            readings: None,
        })
    }

    pub fn from_config(config: &SensorConfig) -> Result<Self, ScenarioError> {
        Self::new(config.noise_std, config.latency)
    }

    pub fn latency(&self) -> usize {
        self.latency
    }

    /// Forgets the buffered readings; call at the start of every episode.
    pub fn reset(&mut self) {
        self.readings = None;
    }

    pub fn observe(&mut self, truth: &State, rng: &mut SimulationRng) -> State {
        let latency = self.latency;
        let readings = self
            .readings
            .get_or_insert_with(|| DelayLine::new(latency, truth.clone()));
        // A zero-capacity line drops nothing, so the fresh state goes straight out.
        let delayed = readings.push(truth.clone()).unwrap_or_else(|| truth.clone());

        match &self.noise {
            Some(normal) => delayed.map(|value| value + normal.sample(&mut rng.0)),
            None => delayed,
        }
    }
}
