// reflex_core/src/models/dynamics/generic.rs

use crate::error::ModelError;
use crate::models::dynamics::{check_step, Plant};
use crate::types::{Command, State};
use nalgebra::DMatrix;

// --- Additive Plant ---
// The command is a displacement: `x_k+1 = x_k + u_k`.
// Handy as a reference plant because every rollout can be worked out by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdditivePlant {
    pub dim: usize,
}

impl AdditivePlant {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Plant for AdditivePlant {
    fn state_dim(&self) -> usize {
        self.dim
    }

    fn command_dim(&self) -> usize {
        self.dim
    }

    fn next_state(&self, state: &State, command: &Command) -> State {
        state + command
    }
}

// --- Linear Plant ---
/// A discrete linear time-invariant system, `x_k+1 = A x_k + B u_k`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearPlant {
    a: DMatrix<f64>,
    b: DMatrix<f64>,
}

impl LinearPlant {
    /// `a` must be square (n x n) and `b` must have n rows.
    pub fn new(a: DMatrix<f64>, b: DMatrix<f64>) -> Result<Self, ModelError> {
        let n = a.nrows();
        if a.ncols() != n {
            return Err(ModelError::ShapeMismatch {
                name: "a",
                rows: a.nrows(),
                cols: a.ncols(),
                expected_rows: n,
                expected_cols: n,
            });
        }
        if b.nrows() != n {
            return Err(ModelError::ShapeMismatch {
                name: "b",
                rows: b.nrows(),
                cols: b.ncols(),
                expected_rows: n,
                expected_cols: b.ncols(),
            });
        }
        Ok(Self { a, b })
    }

    /// The zero-order-hold discretization of a double integrator per axis:
    /// state `[p.., v..]`, command `[accel..]`.
    pub fn double_integrator(axes: usize, dt: f64) -> Result<Self, ModelError> {
        check_step(dt)?;
        let n = 2 * axes;
        let mut a = DMatrix::identity(n, n);
        let mut b = DMatrix::zeros(n, axes);
        for i in 0..axes {
            a[(i, axes + i)] = dt;
            b[(i, i)] = 0.5 * dt * dt;
            b[(axes + i, i)] = dt;
        }
        Ok(Self { a, b })
    }
}

impl Plant for LinearPlant {
    fn state_dim(&self) -> usize {
        self.a.nrows()
    }

    fn command_dim(&self) -> usize {
        self.b.ncols()
    }

    fn next_state(&self, state: &State, command: &Command) -> State {
        &self.a * state + &self.b * command
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn additive_adds() {
        let plant = AdditivePlant::new(2);
        let next = plant.next_state(
            &State::from_vec(vec![1.0, -1.0]),
            &Command::from_vec(vec![0.5, 2.0]),
        );
        assert_eq!(next, State::from_vec(vec![1.5, 1.0]));
    }

    #[test]
    fn linear_rejects_non_square_a() {
        let err = LinearPlant::new(DMatrix::zeros(2, 3), DMatrix::zeros(2, 1)).unwrap_err();
        assert!(matches!(err, ModelError::ShapeMismatch { name: "a", .. }));
    }

    #[test]
    fn linear_rejects_b_with_wrong_rows() {
        let err = LinearPlant::new(DMatrix::identity(2, 2), DMatrix::zeros(3, 1)).unwrap_err();
        assert!(matches!(err, ModelError::ShapeMismatch { name: "b", .. }));
    }

    #[test]
    fn double_integrator_matches_kinematics() {
        let plant = LinearPlant::double_integrator(1, 0.1).unwrap();
        assert_eq!(plant.state_dim(), 2);
        assert_eq!(plant.command_dim(), 1);

        // p = 1, v = 2, a = 4 over 0.1s: p' = 1 + 0.2 + 0.02, v' = 2.4
        let next = plant.next_state(
            &State::from_vec(vec![1.0, 2.0]),
            &Command::from_vec(vec![4.0]),
        );
        assert_abs_diff_eq!(next[0], 1.22, epsilon = 1e-12);
        assert_abs_diff_eq!(next[1], 2.4, epsilon = 1e-12);
    }

    #[test]
    fn double_integrator_rejects_non_positive_step() {
        assert_eq!(
            LinearPlant::double_integrator(2, 0.0).unwrap_err(),
            ModelError::InvalidParameter {
                name: "dt",
                value: 0.0
            }
        );
    }
}
