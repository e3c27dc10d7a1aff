// reflex_core/src/utils/integrators.rs

use nalgebra::DVector;
use num_traits::Float;

/// A fixed-step ODE solver: advances `x_dot = func(x, t)` from `t0` to `tf`.
pub trait Integrator<T>: Send + Sync {
    fn step(
        &self,
        func: &dyn Fn(&DVector<T>, T) -> DVector<T>,
        x0: &DVector<T>,
        t0: T,
        tf: T,
    ) -> DVector<T>;
}

// Runge-Kutta methods
#[derive(Debug, Default, Clone, Copy)]
pub struct RK1;

impl<T> Integrator<T> for RK1
where
    T: Float + nalgebra::Scalar + std::ops::MulAssign + std::ops::AddAssign,
{
    fn step(
        &self,
        func: &dyn Fn(&DVector<T>, T) -> DVector<T>,
        x0: &DVector<T>,
        t0: T,
        tf: T,
    ) -> DVector<T> {
        let dt = tf - t0;
        x0 + func(x0, t0) * dt // Euler's method
    }
}

/// Heun's method (explicit trapezoid).
#[derive(Debug, Default, Clone, Copy)]
pub struct RK2;

impl<T> Integrator<T> for RK2
where
    T: Float + nalgebra::Scalar + std::ops::MulAssign + std::ops::AddAssign,
{
    fn step(
        &self,
        func: &dyn Fn(&DVector<T>, T) -> DVector<T>,
        x0: &DVector<T>,
        t0: T,
        tf: T,
    ) -> DVector<T> {
        let dt = tf - t0;
        let half = T::one() / (T::one() + T::one());

        let k1 = func(x0, t0);
        let k2 = func(&(x0 + &k1 * dt), tf);

        // Weighted average of k1 and k2
        x0 + (k1 + k2) * (half * dt)
    }
}

/// Classic fourth-order Runge-Kutta.
#[derive(Debug, Default, Clone, Copy)]
pub struct RK4;

impl<T> Integrator<T> for RK4
where
    T: Float + nalgebra::Scalar + std::ops::MulAssign + std::ops::AddAssign,
{
    fn step(
        &self,
        func: &dyn Fn(&DVector<T>, T) -> DVector<T>,
        x0: &DVector<T>,
        t0: T,
        tf: T,
    ) -> DVector<T> {
        let dt = tf - t0;
        let two = T::one() + T::one();
        let half = T::one() / two;
        let sixth = T::one() / (two * (two + T::one()));

        let k1 = func(x0, t0);
        let k2 = func(&(x0 + &k1 * (half * dt)), t0 + half * dt);
        let k3 = func(&(x0 + &k2 * (half * dt)), t0 + half * dt);
        let k4 = func(&(x0 + &k3 * dt), tf);

        x0 + (k1 + k2 * two + k3 * two + k4) * (dt * sixth)
    }
}
