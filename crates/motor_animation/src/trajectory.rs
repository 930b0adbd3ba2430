//! Closed-form trajectories
//!
//! Analytic solutions for a damped harmonic oscillator released from a start
//! value with an initial velocity, plus the exponential decay used for
//! velocity-matched settling. Each trajectory satisfies its boundary
//! conditions: `value(0)` is the start value and `velocity(0)` the initial
//! velocity.

/// Tolerance under which a damping ratio counts as critical
const CRITICAL_TOLERANCE: f64 = 1e-9;

/// Damping regime of an oscillator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DampingRegime {
    UnderDamped,
    CriticallyDamped,
    OverDamped,
}

/// Damped harmonic oscillator parameters
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DampedOscillator {
    /// Undamped angular frequency (rad/s)
    pub frequency: f64,
    /// Damping ratio, 1.0 is critical
    pub damping_ratio: f64,
}

impl DampedOscillator {
    pub const UNDER_DAMPED: Self = Self::new(10.0, 0.3);
    pub const CRITICALLY_DAMPED: Self = Self::new(10.0, 1.0);
    pub const OVER_DAMPED: Self = Self::new(10.0, 1.5);

    pub const fn new(frequency: f64, damping_ratio: f64) -> Self {
        Self {
            frequency,
            damping_ratio,
        }
    }

    /// Oscillator equivalent to a mass on a spring with a damper
    pub fn from_mass_spring_damper(mass: f64, stiffness: f64, damping: f64) -> Self {
        Self {
            frequency: (stiffness / mass).sqrt(),
            damping_ratio: damping / (2.0 * (stiffness * mass).sqrt()),
        }
    }

    pub fn regime(&self) -> DampingRegime {
        if (self.damping_ratio - 1.0).abs() <= CRITICAL_TOLERANCE {
            DampingRegime::CriticallyDamped
        } else if self.damping_ratio < 1.0 {
            DampingRegime::UnderDamped
        } else {
            DampingRegime::OverDamped
        }
    }

    /// Trajectory from `start` toward `end` with initial velocity `velocity`
    pub fn solve(&self, start: f64, end: f64, velocity: f64) -> Trajectory {
        let omega = self.frequency;
        let zeta = self.damping_ratio;
        let x0 = start - end;

        let shape = match self.regime() {
            DampingRegime::UnderDamped => {
                let omega_d = omega * (1.0 - zeta * zeta).sqrt();
                Shape::UnderDamped {
                    decay: zeta * omega,
                    omega_d,
                    a: x0,
                    b: (zeta * omega * x0 + velocity) / omega_d,
                }
            }
            DampingRegime::CriticallyDamped => Shape::CriticallyDamped {
                omega,
                a: x0,
                b: x0 * omega + velocity,
            },
            DampingRegime::OverDamped => {
                let s = (zeta * zeta - 1.0).sqrt();
                let r1 = omega * (s - zeta);
                let r2 = omega * (-s - zeta);
                Shape::OverDamped {
                    r1,
                    r2,
                    x0,
                    q: (r1 * x0 - velocity) / (r2 - r1),
                }
            }
        };

        Trajectory { start, end, shape }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Shape {
    UnderDamped { decay: f64, omega_d: f64, a: f64, b: f64 },
    CriticallyDamped { omega: f64, a: f64, b: f64 },
    OverDamped { r1: f64, r2: f64, x0: f64, q: f64 },
    Decay { lambda: f64, n0: f64 },
    Constant,
}

/// A solved trajectory, queried by elapsed time in seconds
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Trajectory {
    start: f64,
    end: f64,
    shape: Shape,
}

impl Trajectory {
    /// Exponential decay from `start` to `end` whose initial velocity is
    /// `velocity`. Degenerates to a constant when the velocity does not point
    /// toward `end`.
    pub fn decay(start: f64, end: f64, velocity: f64) -> Self {
        let n0 = start - end;
        let lambda = if n0 == 0.0 { 0.0 } else { velocity / (end - start) };
        let shape = if lambda > 0.0 && lambda.is_finite() {
            Shape::Decay { lambda, n0 }
        } else {
            Shape::Constant
        };
        Self { start, end, shape }
    }

    pub fn start_value(&self) -> f64 {
        self.start
    }

    pub fn end_value(&self) -> f64 {
        self.end
    }

    /// Value at time `t`
    pub fn value(&self, t: f64) -> f64 {
        // Written as start + (displacement - initial displacement) so that t = 0
        // lands exactly on the start value.
        match self.shape {
            Shape::UnderDamped { decay, omega_d, a, b } => {
                let (sin, cos) = (omega_d * t).sin_cos();
                self.start + ((-decay * t).exp() * (a * cos + b * sin) - a)
            }
            Shape::CriticallyDamped { omega, a, b } => {
                self.start + ((a + b * t) * (-omega * t).exp() - a)
            }
            Shape::OverDamped { r1, r2, x0, q } => {
                let e1 = (r1 * t).exp();
                let e2 = (r2 * t).exp();
                self.start + (x0 * e1 + q * (e1 - e2) - x0)
            }
            Shape::Decay { lambda, n0 } => self.start + n0 * ((-lambda * t).exp() - 1.0),
            Shape::Constant => self.end,
        }
    }

    /// Velocity at time `t`
    pub fn velocity(&self, t: f64) -> f64 {
        match self.shape {
            Shape::UnderDamped { decay, omega_d, a, b } => {
                let (sin, cos) = (omega_d * t).sin_cos();
                (-decay * t).exp()
                    * ((b * omega_d - decay * a) * cos - (a * omega_d + decay * b) * sin)
            }
            Shape::CriticallyDamped { omega, a, b } => {
                (-omega * t).exp() * (b - omega * (a + b * t))
            }
            Shape::OverDamped { r1, r2, x0, q } => {
                let e1 = (r1 * t).exp();
                let e2 = (r2 * t).exp();
                (x0 + q) * r1 * e1 - q * r2 * e2
            }
            Shape::Decay { lambda, n0 } => -lambda * n0 * (-lambda * t).exp(),
            Shape::Constant => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const H: f64 = 1e-6;

    fn assert_boundary(trajectory: &Trajectory, start: f64, velocity: f64) {
        assert_eq!(trajectory.value(0.0), start);
        assert!((trajectory.velocity(0.0) - velocity).abs() < 1e-9);

        let slope = (trajectory.value(H) - trajectory.value(0.0)) / H;
        assert!(
            (slope - velocity).abs() < 1e-3,
            "finite difference {slope} vs {velocity}"
        );
    }

    #[test]
    fn test_regimes() {
        assert_eq!(DampedOscillator::UNDER_DAMPED.regime(), DampingRegime::UnderDamped);
        assert_eq!(DampedOscillator::CRITICALLY_DAMPED.regime(), DampingRegime::CriticallyDamped);
        assert_eq!(DampedOscillator::OVER_DAMPED.regime(), DampingRegime::OverDamped);
        assert_eq!(
            DampedOscillator::new(10.0, 1.0 + 1e-12).regime(),
            DampingRegime::CriticallyDamped
        );
    }

    #[test]
    fn test_boundary_conditions_in_every_regime() {
        for oscillator in [
            DampedOscillator::UNDER_DAMPED,
            DampedOscillator::CRITICALLY_DAMPED,
            DampedOscillator::OVER_DAMPED,
        ] {
            for (start, end, velocity) in [(0.1, 0.3, 0.0), (0.0, 1.0, 3.0), (5.0, -2.0, -4.0)] {
                let trajectory = oscillator.solve(start, end, velocity);
                assert_boundary(&trajectory, start, velocity);
            }
        }
    }

    #[test]
    fn test_velocity_matches_derivative_mid_flight() {
        let trajectory = DampedOscillator::UNDER_DAMPED.solve(0.0, 10.0, 2.0);
        for t in [0.05, 0.2, 0.6] {
            let slope = (trajectory.value(t + H) - trajectory.value(t - H)) / (2.0 * H);
            assert!((slope - trajectory.velocity(t)).abs() < 1e-4);
        }
    }

    #[test]
    fn test_settles_at_end_value() {
        for oscillator in [
            DampedOscillator::UNDER_DAMPED,
            DampedOscillator::CRITICALLY_DAMPED,
            DampedOscillator::OVER_DAMPED,
        ] {
            let trajectory = oscillator.solve(0.0, 10.0, 0.0);
            assert!((trajectory.value(20.0) - 10.0).abs() < 1e-6);
            assert!(trajectory.velocity(20.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_under_damped_overshoots() {
        let trajectory = DampedOscillator::UNDER_DAMPED.solve(0.0, 1.0, 0.0);
        let peak = (1..200)
            .map(|i| trajectory.value(i as f64 * 0.005))
            .fold(f64::MIN, f64::max);
        assert!(peak > 1.0);
    }

    #[test]
    fn test_mass_spring_damper_mapping() {
        let oscillator = DampedOscillator::from_mass_spring_damper(1.0, 100.0, 20.0);
        assert_eq!(oscillator.frequency, 10.0);
        assert_eq!(oscillator.damping_ratio, 1.0);
    }

    #[test]
    fn test_decay() {
        let trajectory = Trajectory::decay(0.0, 10.0, 5.0);
        assert_boundary(&trajectory, 0.0, 5.0);
        assert!((trajectory.value(50.0) - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_decay_moving_away_is_constant() {
        let trajectory = Trajectory::decay(0.0, 10.0, -5.0);
        assert_eq!(trajectory.value(0.0), 10.0);
        assert_eq!(trajectory.value(1.0), 10.0);
        assert_eq!(trajectory.velocity(0.5), 0.0);
    }
}
