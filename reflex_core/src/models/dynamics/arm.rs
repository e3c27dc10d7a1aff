// reflex_core/src/models/dynamics/arm.rs

use crate::error::ModelError;
use crate::models::dynamics::ContinuousDynamics;
use crate::types::{Command, State};
use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

/// Physical parameters of a planar two-link arm (shoulder + elbow).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArmParameters {
    /// Upper arm and forearm lengths (m).
    pub lengths: [f64; 2],
    /// Segment masses (kg).
    pub masses: [f64; 2],
    /// Distance from each joint to its segment's center of mass (m).
    pub com_distances: [f64; 2],
    /// Segment moments of inertia about their centers of mass (kg m^2).
    pub inertias: [f64; 2],
    /// Viscous joint friction matrix, row-major `[b11, b12, b21, b22]`.
    pub damping: [f64; 4],
}

impl Default for ArmParameters {
    fn default() -> Self {
        Self {
            lengths: [0.30, 0.35],
            masses: [1.4, 1.1],
            com_distances: [0.11, 0.16],
            inertias: [0.025, 0.045],
            damping: [0.05, 0.025, 0.025, 0.05],
        }
    }
}

/// A torque-driven two-joint arm moving in the horizontal plane (no gravity).
///
/// State layout: `[q_shoulder, q_elbow, q_dot_shoulder, q_dot_elbow]`.
/// Command layout: `[tau_shoulder, tau_elbow]`.
///
/// The equations of motion are the usual rigid-body form
/// `M(q) q_ddot + C(q, q_dot) + B q_dot = tau`.
#[derive(Debug, Clone, PartialEq)]
pub struct TwoJointArm {
    params: ArmParameters,
}

impl TwoJointArm {
    pub fn new(params: ArmParameters) -> Result<Self, ModelError> {
        let checks = [
            ("lengths[0]", params.lengths[0]),
            ("lengths[1]", params.lengths[1]),
            ("masses[0]", params.masses[0]),
            ("masses[1]", params.masses[1]),
            ("com_distances[0]", params.com_distances[0]),
            ("com_distances[1]", params.com_distances[1]),
            ("inertias[0]", params.inertias[0]),
            ("inertias[1]", params.inertias[1]),
        ];
        for (name, value) in checks {
            // Positive masses and inertias keep M(q) positive definite for every q.
            if !(value.is_finite() && value > 0.0) {
                return Err(ModelError::InvalidParameter { name, value });
            }
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &ArmParameters {
        &self.params
    }

    /// The inertia matrix `M(q)`, which only depends on the elbow angle.
    pub fn inertia_matrix(&self, q_elbow: f64) -> Matrix2<f64> {
        let p = &self.params;
        let (l1, lc1, lc2) = (p.lengths[0], p.com_distances[0], p.com_distances[1]);
        let (m1, m2) = (p.masses[0], p.masses[1]);
        let (i1, i2) = (p.inertias[0], p.inertias[1]);

        let coupling = m2 * l1 * lc2 * q_elbow.cos();
        let m22 = i2 + m2 * lc2 * lc2;
        let m12 = m22 + coupling;
        let m11 = i1 + m1 * lc1 * lc1 + m2 * l1 * l1 + m22 + 2.0 * coupling;

        Matrix2::new(m11, m12, m12, m22)
    }

    /// Elbow and hand positions in the shoulder frame.
    pub fn forward_kinematics(&self, q: &Vector2<f64>) -> (Vector2<f64>, Vector2<f64>) {
        let (l1, l2) = (self.params.lengths[0], self.params.lengths[1]);
        let elbow = Vector2::new(l1 * q[0].cos(), l1 * q[0].sin());
        let hand = elbow + Vector2::new(l2 * (q[0] + q[1]).cos(), l2 * (q[0] + q[1]).sin());
        (elbow, hand)
    }
}

impl ContinuousDynamics for TwoJointArm {
    fn state_dim(&self) -> usize {
        4
    }

    fn command_dim(&self) -> usize {
        2
    }

    fn get_derivatives(&self, x: &State, u: &Command, _t: f64) -> State {
        let p = &self.params;
        let q_dot = Vector2::new(x[2], x[3]);
        let tau = Vector2::new(u[0], u[1]);

        // Coriolis and centrifugal terms.
        let h = p.masses[1] * p.lengths[0] * p.com_distances[1] * x[1].sin();
        let coriolis = Vector2::new(
            -h * q_dot[1] * (2.0 * q_dot[0] + q_dot[1]),
            h * q_dot[0] * q_dot[0],
        );

        let damping = Matrix2::new(p.damping[0], p.damping[1], p.damping[2], p.damping[3]);
        let rhs = tau - coriolis - damping * q_dot;

        // Solve the 2x2 system by Cramer's rule; det > 0 is guaranteed by `new`.
        let m = self.inertia_matrix(x[1]);
        let det = m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)];
        let q_ddot = Vector2::new(
            (m[(1, 1)] * rhs[0] - m[(0, 1)] * rhs[1]) / det,
            (m[(0, 0)] * rhs[1] - m[(1, 0)] * rhs[0]) / det,
        );

        State::from_vec(vec![q_dot[0], q_dot[1], q_ddot[0], q_ddot[1]])
    }
}
