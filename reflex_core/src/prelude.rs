// reflex_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::estimation::StateEstimator;
pub use crate::models::dynamics::{ContinuousDynamics, Discretized, Plant};
pub use crate::utils::integrators::{Integrator, RK1, RK2, RK4};

// --- Core Data Structures ---
pub use crate::error::{EstimatorError, ModelError};
pub use crate::estimation::delay_line::DelayLine;
pub use crate::types::{Command, State};

// --- Estimation Algorithms ---
pub use crate::estimation::filters::delay_compensated::{
    ColdStart, Correction, DelayCompensatedEstimator, EstimatorConfig, Phase,
    DEFAULT_BLEND_WEIGHT,
};
pub use crate::estimation::filters::open_loop::OpenLoopPredictor;

// --- Concrete Model Implementations (Export common ones for convenience) ---
pub use crate::models::dynamics::arm::{ArmParameters, TwoJointArm};
pub use crate::models::dynamics::generic::{AdditivePlant, LinearPlant};
