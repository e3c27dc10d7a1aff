// reflex_core/src/models/dynamics/mod.rs

use crate::error::ModelError;
use crate::types::{Command, State};
use crate::utils::integrators::Integrator;
use dyn_clone::DynClone;
use std::fmt::Debug;

// --- PLANT TRAIT ---
// The discrete-time forward model consumed by estimators. `x_k+1 = f(x_k, u_k)`
/// A deterministic, discrete-time forward dynamics model.
///
/// Estimators treat a plant as an opaque pure function: calling `next_state`
/// twice with the same arguments must give the same answer, and no call may
/// have side effects visible to the caller.
pub trait Plant: DynClone + Debug + Send + Sync {
    /// Returns the length of the state vector `x`.
    fn state_dim(&self) -> usize;

    /// Returns the length of the command vector `u`.
    fn command_dim(&self) -> usize;

    /// Advances `state` by one control step while `command` is applied.
    fn next_state(&self, state: &State, command: &Command) -> State;
}

// This macro automatically generates the implementation of `Clone` for `Box<dyn Plant>`.
dyn_clone::clone_trait_object!(Plant);

// --- CONTINUOUS DYNAMICS TRAIT ---
/// A physics model expressed as a time derivative, `x_dot = f(x, u, t)`.
///
/// Continuous models become a [`Plant`] by wrapping them in [`Discretized`],
/// which integrates one fixed control step.
pub trait ContinuousDynamics: DynClone + Debug + Send + Sync {
    fn state_dim(&self) -> usize;

    fn command_dim(&self) -> usize;

    /// Computes the time derivative of the state vector.
    ///
    /// # Arguments
    /// * `x`: Current state vector.
    /// * `u`: Control input, assumed constant over the integration step.
    /// * `t`: Time since the start of the step.
    fn get_derivatives(&self, x: &State, u: &Command, t: f64) -> State;
}

dyn_clone::clone_trait_object!(ContinuousDynamics);

/// Turns a [`ContinuousDynamics`] model into a [`Plant`] by integrating it over
/// a fixed step `dt` with the given integrator.
#[derive(Debug, Clone)]
pub struct Discretized<M, I> {
    model: M,
    integrator: I,
    dt: f64,
}

impl<M, I> Discretized<M, I> {
    pub fn new(model: M, integrator: I, dt: f64) -> Result<Self, ModelError> {
        check_step(dt)?;
        Ok(Self {
            model,
            integrator,
            dt,
        })
    }

    /// The control step integrated by every `next_state` call.
    pub fn dt(&self) -> f64 {
        self.dt
    }
}

pub(crate) fn check_step(dt: f64) -> Result<(), ModelError> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(ModelError::InvalidParameter {
            name: "dt",
            value: dt,
        })
    }
}

impl<M, I> Plant for Discretized<M, I>
where
    M: ContinuousDynamics + Clone + 'static,
    I: Integrator<f64> + Debug + Clone + 'static,
{
    fn state_dim(&self) -> usize {
        self.model.state_dim()
    }

    fn command_dim(&self) -> usize {
        self.model.command_dim()
    }

    fn next_state(&self, state: &State, command: &Command) -> State {
        // Define the closure f(x, t) for the integrator, capturing the command.
        let func = |x: &State, t: f64| -> State { self.model.get_derivatives(x, command, t) };
        self.integrator.step(&func, state, 0.0, self.dt)
    }
}

pub mod arm;
pub mod generic;
