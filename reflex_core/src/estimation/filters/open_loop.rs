// reflex_core/src/estimation/filters/open_loop.rs

use crate::error::{check_len, EstimatorError};
use crate::estimation::StateEstimator;
use crate::models::dynamics::Plant;
use crate::types::{Command, State};

/// Dead reckoning: rolls the model forward with the issued commands and never
/// looks at observations. Serves as the baseline a delay-compensated
/// estimator is measured against.
#[derive(Debug, Clone)]
pub struct OpenLoopPredictor {
    plant: Box<dyn Plant>,
    estimate: Option<State>,
}

impl OpenLoopPredictor {
    pub fn new(plant: Box<dyn Plant>) -> Self {
        Self {
            plant,
            estimate: None,
        }
    }
}

impl StateEstimator for OpenLoopPredictor {
    fn init(&mut self, initial_state: &State) -> Result<State, EstimatorError> {
        check_len("initial state", self.plant.state_dim(), initial_state.len())?;
        self.estimate = Some(initial_state.clone());
        Ok(initial_state.clone())
    }

    fn update(
        &mut self,
        observed_state: &State,
        issued_command: &Command,
    ) -> Result<State, EstimatorError> {
        check_len("observed state", self.plant.state_dim(), observed_state.len())?;
        check_len("issued command", self.plant.command_dim(), issued_command.len())?;
        let current = self.estimate.as_ref().ok_or(EstimatorError::NotInitialized)?;

        let next = self.plant.next_state(current, issued_command);
        if next.len() != self.plant.state_dim() {
            return Err(EstimatorError::PlantOutput {
                expected: self.plant.state_dim(),
                found: next.len(),
            });
        }
        self.estimate = Some(next.clone());
        Ok(next)
    }

    fn current_estimate(&self) -> Option<&State> {
        self.estimate.as_ref()
    }
}
