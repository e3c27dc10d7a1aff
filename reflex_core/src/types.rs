// reflex_core/src/types.rs

use nalgebra::DVector;

// --- Core Type Aliases ---
/// The minimal dynamical state of a plant at one instant (e.g. joint angles and velocities).
pub type State = DVector<f64>;
/// The input applied to a plant over one control step (e.g. joint torques).
pub type Command = DVector<f64>;
