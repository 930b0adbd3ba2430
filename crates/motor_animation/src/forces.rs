//! Forces and physical models
//!
//! A [`PhysicalModel`] is a mass plus a small set of [`Force`] terms. Summing
//! the forces for a [`ChannelState`] and dividing by the mass yields the
//! acceleration the simulation integrates.
//!
//! ```
//! use motor_animation::{ChannelState, PhysicalModel};
//!
//! let model = PhysicalModel::critically_damped(10.0);
//! let state = ChannelState::at(0.0).with_target(1.0);
//! assert_eq!(model.acceleration(&state), 100.0);
//! ```

use smallvec::{smallvec, SmallVec};

use crate::channel::ChannelState;

/// Default angular frequency for controlled motion
pub const DEFAULT_FREQUENCY: f64 = 10.0;

/// Drag coefficient of the default uncontrolled model
pub const DEFAULT_DRAG: f64 = 5.0;

/// One additive force term
///
/// `Custom` forces never compare equal.
#[derive(Clone, Copy, Debug)]
pub enum Force {
    /// Constant force toward negative values
    Gravity(f64),
    /// Linear drag, `-k * v`
    AirDrag(f64),
    /// Quadratic drag, `-k * v * |v|`
    FluidDrag(f64),
    /// Hooke spring pulling toward the target, `k * (target - x)`
    Spring(f64),
    /// Viscous damper, `-c * v`
    Damper(f64),
    /// Arbitrary force of the current state
    Custom(fn(&ChannelState) -> f64),
}

impl Force {
    /// Force for the given state
    pub fn evaluate(&self, state: &ChannelState) -> f64 {
        match *self {
            Force::Gravity(g) => -g,
            Force::AirDrag(k) | Force::Damper(k) => -k * state.velocity,
            Force::FluidDrag(k) => -k * state.velocity * state.velocity.abs(),
            // A spring without a target has nothing to pull toward
            Force::Spring(k) => state.target.map_or(0.0, |target| k * (target - state.value)),
            Force::Custom(f) => f(state),
        }
    }
}

impl PartialEq for Force {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Force::Gravity(a), Force::Gravity(b))
            | (Force::AirDrag(a), Force::AirDrag(b))
            | (Force::FluidDrag(a), Force::FluidDrag(b))
            | (Force::Spring(a), Force::Spring(b))
            | (Force::Damper(a), Force::Damper(b)) => a == b,
            _ => false,
        }
    }
}

/// Mass plus the forces acting on it
#[derive(Clone, Debug, PartialEq)]
pub struct PhysicalModel {
    mass: f64,
    forces: SmallVec<[Force; 3]>,
}

impl PhysicalModel {
    pub fn new(mass: f64) -> Self {
        Self {
            mass,
            forces: SmallVec::new(),
        }
    }

    /// Add a force term
    pub fn with(mut self, force: Force) -> Self {
        self.forces.push(force);
        self
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn forces(&self) -> &[Force] {
        &self.forces
    }

    /// Net force divided by mass
    pub fn acceleration(&self, state: &ChannelState) -> f64 {
        let force: f64 = self.forces.iter().map(|f| f.evaluate(state)).sum();
        force / self.mass
    }

    /// Model with no forces at all
    pub fn free() -> Self {
        Self::new(1.0)
    }

    /// Spring of stiffness `k` with damping `c` on mass `m`
    pub fn mass_spring_damper(mass: f64, stiffness: f64, damping: f64) -> Self {
        Self {
            mass,
            forces: smallvec![Force::Spring(stiffness), Force::Damper(damping)],
        }
    }

    /// Unit-mass oscillator with angular frequency `frequency` and damping
    /// ratio `damping_ratio`
    pub fn damped_harmonic_oscillator(frequency: f64, damping_ratio: f64) -> Self {
        Self::mass_spring_damper(
            1.0,
            frequency * frequency,
            2.0 * frequency * damping_ratio,
        )
    }

    pub fn critically_damped(frequency: f64) -> Self {
        Self::damped_harmonic_oscillator(frequency, 1.0)
    }

    pub fn under_damped() -> Self {
        Self::damped_harmonic_oscillator(DEFAULT_FREQUENCY, 0.5)
    }

    pub fn over_damped() -> Self {
        Self::damped_harmonic_oscillator(DEFAULT_FREQUENCY, 1.3)
    }

    /// Damper alone, no spring
    pub fn damper(damping: f64) -> Self {
        Self::new(1.0).with(Force::Damper(damping))
    }

    pub fn gravity(g: f64) -> Self {
        Self::new(1.0).with(Force::Gravity(g))
    }

    pub fn air_drag(k: f64) -> Self {
        Self::new(1.0).with(Force::AirDrag(k))
    }

    pub fn fluid_drag(k: f64) -> Self {
        Self::new(1.0).with(Force::FluidDrag(k))
    }

    /// Linear drag used for uncontrolled motion by default
    pub fn linear_damper() -> Self {
        Self::air_drag(DEFAULT_DRAG)
    }
}

impl Default for PhysicalModel {
    fn default() -> Self {
        Self::critically_damped(DEFAULT_FREQUENCY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spring_pulls_toward_target() {
        let spring = Force::Spring(4.0);
        assert_eq!(spring.evaluate(&ChannelState::at(1.0).with_target(3.0)), 8.0);
        assert_eq!(spring.evaluate(&ChannelState::at(5.0).with_target(3.0)), -8.0);
        assert_eq!(spring.evaluate(&ChannelState::at(5.0)), 0.0);
    }

    #[test]
    fn test_drag_opposes_motion() {
        let moving_up = ChannelState::at(0.0).with_velocity(2.0);
        let moving_down = ChannelState::at(0.0).with_velocity(-2.0);

        assert_eq!(Force::AirDrag(3.0).evaluate(&moving_up), -6.0);
        assert_eq!(Force::AirDrag(3.0).evaluate(&moving_down), 6.0);
        assert_eq!(Force::FluidDrag(1.0).evaluate(&moving_up), -4.0);
        assert_eq!(Force::FluidDrag(1.0).evaluate(&moving_down), 4.0);
    }

    #[test]
    fn test_acceleration_divides_by_mass() {
        let model = PhysicalModel::new(2.0)
            .with(Force::Gravity(10.0))
            .with(Force::Custom(|s| s.value));
        assert_eq!(model.acceleration(&ChannelState::at(4.0)), -3.0);
    }

    #[test]
    fn test_oscillator_coefficients() {
        let model = PhysicalModel::damped_harmonic_oscillator(10.0, 0.5);
        assert_eq!(model.mass(), 1.0);
        assert_eq!(model.forces(), &[Force::Spring(100.0), Force::Damper(10.0)]);
        assert_eq!(PhysicalModel::default(), PhysicalModel::critically_damped(10.0));
    }

    #[test]
    fn test_free_model_has_no_acceleration() {
        let state = ChannelState::at(3.0).with_velocity(-1.0).with_target(0.0);
        assert_eq!(PhysicalModel::free().acceleration(&state), 0.0);
    }
}
