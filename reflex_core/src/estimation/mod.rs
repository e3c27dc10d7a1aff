// reflex_core/src/estimation/mod.rs

use crate::error::EstimatorError;
use crate::types::{Command, State};

/// The contract for any algorithm that performs the "State Estimator" role
/// inside a fixed-rate control loop.
///
/// Each episode starts with one `init` call, followed by one `update` per
/// control step. Returned estimates are owned copies; the estimator keeps
/// its internal belief to itself.
pub trait StateEstimator: Send + Sync {
    /// Resets all episode state and returns the first estimate.
    fn init(&mut self, initial_state: &State) -> Result<State, EstimatorError>;

    /// Folds in the observation available at this step together with the
    /// command being issued, and returns the estimate of the state that
    /// command leads to.
    fn update(
        &mut self,
        observed_state: &State,
        issued_command: &Command,
    ) -> Result<State, EstimatorError>;

    /// Returns a reference to the current best estimate, if an episode is running.
    fn current_estimate(&self) -> Option<&State>;
}

pub mod delay_line;
pub mod filters;
