// reflex_sim/src/config.rs

//! Scenario configuration: loading, defaults and validation.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use reflex_core::prelude::*;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("scenario file not found: {0}")]
    Missing(PathBuf),

    #[error("failed to parse scenario: {0}")]
    Parse(#[from] Box<figment::Error>),

    #[error("invalid `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("`{field}` has {found} entries, the plant needs {expected}")]
    DimensionMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Estimator(#[from] EstimatorError),
}

// =========================================================================
// == Top-Level Configuration ==
// =========================================================================

/// # ScenarioConfig
/// The root of the data parsed from a `scenario.toml` file.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)] // Fail if the TOML has fields not in our struct
pub struct ScenarioConfig {
    #[serde(default)] // Use default if the [simulation] section is missing
    pub simulation: Simulation,

    #[serde(default)]
    pub estimator: EstimatorSection,

    #[serde(default)]
    pub plant: PlantConfig,

    #[serde(default)]
    pub sensor: SensorConfig,

    #[serde(default)]
    pub controller: ControllerConfig,

    /// True state every episode starts from. Zeros when omitted.
    #[serde(default)]
    pub initial_state: Option<Vec<f64>>,
}

// =========================================================================
// == Configuration Sub-Structs ==
// These map directly to the sections in the scenario file.
// =========================================================================

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Simulation {
    /// Optional seed for the pseudo-random number generator for determinism.
    pub seed: Option<u64>,
    #[serde(default = "default_episodes")]
    pub episodes: usize,
    #[serde(default = "default_steps")]
    pub steps_per_episode: usize,
}

fn default_episodes() -> usize {
    1
}

fn default_steps() -> usize {
    300
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            seed: None,
            episodes: default_episodes(),
            steps_per_episode: default_steps(),
        }
    }
}

/// The estimator parameters a scenario controls. Dimensions come from the plant.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EstimatorSection {
    /// Feedback latency in control steps.
    #[serde(default = "default_delay")]
    pub delay: usize,
    #[serde(default = "default_blend_weight")]
    pub blend_weight: f64,
    #[serde(default)]
    pub cold_start: ColdStart,
}

fn default_delay() -> usize {
    5
}

fn default_blend_weight() -> f64 {
    DEFAULT_BLEND_WEIGHT
}

impl Default for EstimatorSection {
    fn default() -> Self {
        Self {
            delay: default_delay(),
            blend_weight: DEFAULT_BLEND_WEIGHT,
            cold_start: ColdStart::default(),
        }
    }
}

impl EstimatorSection {
    pub fn to_config(&self, plant: &dyn Plant) -> EstimatorConfig {
        EstimatorConfig::for_plant(plant, self.delay)
            .with_blend_weight(self.blend_weight)
            .with_cold_start(self.cold_start)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntegratorKind {
    Rk1,
    Rk2,
    #[default]
    Rk4,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlantConfig {
    /// `x' = x + u` in `dim` dimensions.
    Additive { dim: usize },
    /// Per-axis `[position.., velocity..]` driven by accelerations.
    DoubleIntegrator {
        axes: usize,
        #[serde(default = "default_dt")]
        dt: f64,
    },
    TwoJointArm {
        /// Control step (s).
        #[serde(default = "default_dt")]
        dt: f64,
        #[serde(default)]
        integrator: IntegratorKind,
        #[serde(default)]
        arm: ArmParameters,
    },
}

fn default_dt() -> f64 {
    0.01
}

impl Default for PlantConfig {
    fn default() -> Self {
        PlantConfig::TwoJointArm {
            dt: default_dt(),
            integrator: IntegratorKind::default(),
            arm: ArmParameters::default(),
        }
    }
}

impl PlantConfig {
    pub fn build(&self) -> Result<Box<dyn Plant>, ScenarioError> {
        match self {
            PlantConfig::Additive { dim } => {
                check_positive("plant.dim", *dim)?;
                Ok(Box::new(AdditivePlant::new(*dim)))
            }
            PlantConfig::DoubleIntegrator { axes, dt } => {
                check_positive("plant.axes", *axes)?;
                Ok(Box::new(LinearPlant::double_integrator(*axes, *dt)?))
            }
            PlantConfig::TwoJointArm {
                dt,
                integrator,
                arm,
            } => {
                let arm = TwoJointArm::new(*arm)?;
                let plant: Box<dyn Plant> = match integrator {
                    IntegratorKind::Rk1 => Box::new(Discretized::new(arm, RK1, *dt)?),
                    IntegratorKind::Rk2 => Box::new(Discretized::new(arm, RK2, *dt)?),
                    IntegratorKind::Rk4 => Box::new(Discretized::new(arm, RK4, *dt)?),
                };
                Ok(plant)
            }
        }
    }
}

fn check_positive(field: &'static str, value: usize) -> Result<(), ScenarioError> {
    if value == 0 {
        return Err(ScenarioError::InvalidValue {
            field,
            reason: "must be positive".into(),
        });
    }
    Ok(())
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SensorConfig {
    /// Standard deviation of the zero-mean Gaussian noise on each component.
    #[serde(default)]
    pub noise_std: f64,
    /// Control steps between the true state and the reading the loop receives.
    #[serde(default)]
    pub latency: usize,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            noise_std: 0.0,
            latency: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ControllerConfig {
    /// Position setpoint, one entry per command. Zeros when omitted.
    #[serde(default)]
    pub target: Option<Vec<f64>>,
    #[serde(default = "default_kp")]
    pub kp: f64,
    #[serde(default = "default_kd")]
    pub kd: f64,
    /// Symmetric saturation applied to every command component.
    #[serde(default)]
    pub max_command: Option<f64>,
}

fn default_kp() -> f64 {
    1.5
}

fn default_kd() -> f64 {
    0.4
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            target: None,
            kp: default_kp(),
            kd: default_kd(),
            max_command: None,
        }
    }
}

impl ScenarioConfig {
    /// Loads a scenario file, then applies `REFLEX_`-prefixed environment
    /// overrides (`REFLEX_ESTIMATOR__DELAY=3` sets `estimator.delay`).
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        if !path.exists() {
            return Err(ScenarioError::Missing(path.to_path_buf()));
        }
        let config: ScenarioConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("REFLEX_").split("__"))
            .extract()
            .map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a scenario from TOML text, without environment overrides.
    pub fn from_toml_str(text: &str) -> Result<Self, ScenarioError> {
        let config: ScenarioConfig = Figment::new()
            .merge(Toml::string(text))
            .extract()
            .map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Cross-section checks that serde cannot express.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.simulation.steps_per_episode == 0 {
            return Err(ScenarioError::InvalidValue {
                field: "simulation.steps_per_episode",
                reason: "must be positive".into(),
            });
        }
        let std = self.sensor.noise_std;
        if !(std.is_finite() && std >= 0.0) {
            return Err(ScenarioError::InvalidValue {
                field: "sensor.noise_std",
                reason: format!("must be finite and non-negative, got {std}"),
            });
        }

        let plant = self.plant.build()?;
        self.estimator.to_config(&*plant).validate()?;

        if let Some(initial) = &self.initial_state {
            check_entries("initial_state", plant.state_dim(), initial.len())?;
        }
        if let Some(target) = &self.controller.target {
            check_entries("controller.target", plant.command_dim(), target.len())?;
        }
        Ok(())
    }

    pub fn initial_state(&self, state_dim: usize) -> State {
        match &self.initial_state {
            Some(values) => State::from_row_slice(values),
            None => State::zeros(state_dim),
        }
    }
}

fn check_entries(field: &'static str, expected: usize, found: usize) -> Result<(), ScenarioError> {
    if expected == found {
        Ok(())
    } else {
        Err(ScenarioError::DimensionMismatch {
            field,
            expected,
            found,
        })
    }
}
