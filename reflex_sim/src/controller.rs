// reflex_sim/src/controller.rs

use reflex_core::prelude::{Command, State};

use crate::config::{ControllerConfig, ScenarioError};

/// How the state vector splits into the quantities the controller regulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// `state == position`, one command per component.
    Position,
    /// `state == [position, velocity]`, one command per position component.
    PositionVelocity,
}

/// A fixed-gain PD policy acting on the estimated state.
///
/// `u = kp * (target - q) - kd * q_dot`, saturated to `max_command`.
/// When the state carries no velocity half, the damping term is dropped.
#[derive(Debug, Clone)]
pub struct PdController {
    target: Command,
    kp: f64,
    kd: f64,
    max_command: Option<f64>,
    layout: Layout,
}

impl PdController {
    pub fn new(
        config: &ControllerConfig,
        state_dim: usize,
        command_dim: usize,
    ) -> Result<Self, ScenarioError> {
        let layout = if state_dim == command_dim {
            Layout::Position
        } else if state_dim == 2 * command_dim {
            Layout::PositionVelocity
        } else {
            return Err(ScenarioError::InvalidValue {
                field: "controller",
                reason: format!(
                    "cannot map a {state_dim}-dimensional state onto {command_dim} commands"
                ),
            });
        };

        let target = match &config.target {
            Some(values) if values.len() != command_dim => {
                return Err(ScenarioError::DimensionMismatch {
                    field: "controller.target",
                    expected: command_dim,
                    found: values.len(),
                })
            }
            Some(values) => Command::from_row_slice(values),
            None => Command::zeros(command_dim),
        };

        Ok(Self {
            target,
            kp: config.kp,
            kd: config.kd,
            max_command: config.max_command.map(f64::abs),
            layout,
        })
    }

    pub fn command(&self, estimate: &State) -> Command {
        let n = self.target.len();
        let position = estimate.rows(0, n);
        let mut command = (&self.target - position) * self.kp;

        if self.layout == Layout::PositionVelocity {
            command -= estimate.rows(n, n) * self.kd;
        }
        if let Some(limit) = self.max_command {
            command.apply(|u| *u = u.clamp(-limit, limit));
        }
        command
    }
}
