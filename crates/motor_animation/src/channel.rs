//! Animation channels
//!
//! A channel is the live motion of one property of one owner. Its
//! [`ChannelState`] is an immutable snapshot; every frame the channel's
//! [`Driver`] maps the previous snapshot to the next one and the registry
//! stores the result.

use crate::easing::Easing;
use crate::simulation::Simulation;
use crate::trajectory::Trajectory;

/// Snapshot of one channel's motion
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChannelState {
    /// Current value
    pub value: f64,
    /// Velocity in value units per second
    pub velocity: f64,
    /// Acceleration (physical channels only, zero otherwise)
    pub acceleration: f64,
    /// Target value for controlled and input channels
    pub target: Option<f64>,
    /// Set once the driver decides the motion is over
    pub finished: bool,
}

impl ChannelState {
    /// A state at rest at `value`
    pub fn at(value: f64) -> Self {
        Self {
            value,
            ..Default::default()
        }
    }

    pub fn with_velocity(mut self, velocity: f64) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_acceleration(mut self, acceleration: f64) -> Self {
        self.acceleration = acceleration;
        self
    }

    pub fn with_target(mut self, target: f64) -> Self {
        self.target = Some(target);
        self
    }
}

/// Timing information for one frame pass
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameStep {
    /// Seconds since the previous frame pass
    pub dt: f64,
    /// Current host time in seconds
    pub now: f64,
}

/// How a channel ended
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationEnd {
    /// `true` when the driver completed, `false` when superseded or cancelled
    pub finished: bool,
    /// Last state the channel reached
    pub state: ChannelState,
}

/// Completion callback attached to a single channel
pub type EndCallback = Box<dyn FnOnce(AnimationEnd)>;

/// Which kind of live input feeds a channel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputMode {
    /// Input values are written straight to the property
    Direct,
    /// Input values become the target of a controlled simulation
    Indirect,
}

/// Closed-form easing from a start value to an end value
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EasedDriver {
    pub start_time: f64,
    pub duration: f64,
    pub start: f64,
    pub end: f64,
    pub easing: Easing,
    pub fade: Option<FadeBlend>,
}

/// Blend from a linear extrapolation of the previous velocity into the new
/// curve over the first `fraction` of the animation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FadeBlend {
    pub easing: Easing,
    pub fraction: f64,
    pub velocity: f64,
}

impl EasedDriver {
    /// Value at normalized progress `p`
    pub fn value_at(&self, p: f64) -> f64 {
        let eased = self.start + self.easing.apply(p) * (self.end - self.start);
        match self.fade {
            Some(fade) if p < fade.fraction => {
                let weight = fade.easing.apply(p / fade.fraction);
                let carried = self.start + fade.velocity * p * self.duration;
                (1.0 - weight) * carried + weight * eased
            }
            _ => eased,
        }
    }

    fn advance(&self, state: &ChannelState, step: FrameStep) -> ChannelState {
        let progress = ((step.now - self.start_time) / self.duration).clamp(0.0, 1.0);
        let finished = progress >= 1.0;
        let value = if finished {
            self.end
        } else {
            self.value_at(progress)
        };
        ChannelState {
            value,
            velocity: measured_velocity(state, value, step.dt),
            finished,
            ..*state
        }
    }
}

/// Closed-form trajectory (damped oscillator or decay), stopped once settled
/// at its end value
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrajectoryDriver {
    pub start_time: f64,
    pub end: f64,
    pub trajectory: Trajectory,
    pub epsilon: f64,
}

impl TrajectoryDriver {
    fn advance(&self, state: &ChannelState, step: FrameStep) -> ChannelState {
        let t = (step.now - self.start_time).max(0.0);
        let mut next = ChannelState {
            value: self.trajectory.value(t),
            velocity: self.trajectory.velocity(t),
            ..*state
        };
        if next.velocity.abs() <= self.epsilon && (next.value - self.end).abs() <= self.epsilon {
            next.value = self.end;
            next.finished = true;
        }
        next
    }
}

/// The step function that moves a channel forward
#[derive(Clone, Debug, PartialEq)]
pub enum Driver {
    Eased(EasedDriver),
    Trajectory(TrajectoryDriver),
    Simulated(Simulation),
    /// Follows the externally supplied target verbatim
    Direct,
}

impl Driver {
    /// Compute the next snapshot from `state`
    pub fn advance(&self, state: &ChannelState, step: FrameStep) -> ChannelState {
        match self {
            Driver::Eased(eased) => eased.advance(state, step),
            Driver::Trajectory(trajectory) => trajectory.advance(state, step),
            Driver::Simulated(simulation) => simulation.step(state, step.dt),
            Driver::Direct => {
                let value = state.target.unwrap_or(state.value);
                ChannelState {
                    value,
                    velocity: measured_velocity(state, value, step.dt),
                    ..*state
                }
            }
        }
    }
}

/// Finite-difference velocity, keeping the previous one for empty frames
fn measured_velocity(state: &ChannelState, value: f64, dt: f64) -> f64 {
    if dt > 0.0 {
        (value - state.value) / dt
    } else {
        state.velocity
    }
}

/// The one live animation of an (owner, property) pair
pub struct Channel {
    state: ChannelState,
    driver: Driver,
    input: Option<InputMode>,
    on_end: Option<EndCallback>,
}

impl Channel {
    pub fn new(state: ChannelState, driver: Driver) -> Self {
        Self {
            state,
            driver,
            input: None,
            on_end: None,
        }
    }

    /// Mark the channel as fed by live input
    pub fn with_input(mut self, mode: InputMode) -> Self {
        self.input = Some(mode);
        self
    }

    /// Attach a completion callback
    pub fn with_on_end(mut self, on_end: Option<EndCallback>) -> Self {
        self.on_end = on_end;
        self
    }

    pub fn state(&self) -> &ChannelState {
        &self.state
    }

    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    pub fn input_mode(&self) -> Option<InputMode> {
        self.input
    }

    pub fn value(&self) -> f64 {
        self.state.value
    }

    pub fn velocity(&self) -> f64 {
        self.state.velocity
    }

    pub fn is_finished(&self) -> bool {
        self.state.finished
    }

    /// Run the driver once and store the resulting snapshot
    pub fn advance(&mut self, step: FrameStep) -> &ChannelState {
        self.state = self.driver.advance(&self.state, step);
        &self.state
    }

    /// Retarget a running channel without restarting it
    pub fn set_target(&mut self, target: f64) {
        self.state = ChannelState {
            target: Some(target),
            ..self.state
        };
    }

    /// Fire the completion callback, if any. Subsequent calls do nothing.
    pub fn notify_end(&mut self, finished: bool) {
        if let Some(on_end) = self.on_end.take() {
            on_end(AnimationEnd {
                finished,
                state: self.state,
            });
        }
    }

    /// Drop the completion callback without firing it
    pub fn discard_callback(&mut self) {
        self.on_end = None;
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("state", &self.state)
            .field("driver", &self.driver)
            .field("input", &self.input)
            .field("has_on_end", &self.on_end.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn linear(start_time: f64, duration: f64, start: f64, end: f64) -> EasedDriver {
        EasedDriver {
            start_time,
            duration,
            start,
            end,
            easing: Easing::Linear,
            fade: None,
        }
    }

    #[test]
    fn test_eased_driver_measures_velocity() {
        let driver = Driver::Eased(linear(0.0, 2.0, 0.0, 4.0));
        let mut channel = Channel::new(ChannelState::at(0.0), driver);

        channel.advance(FrameStep { dt: 0.5, now: 0.5 });
        assert_eq!(channel.value(), 1.0);
        assert_eq!(channel.velocity(), 2.0);
        assert!(!channel.is_finished());

        channel.advance(FrameStep { dt: 2.0, now: 2.5 });
        assert_eq!(channel.value(), 4.0);
        assert!(channel.is_finished());
    }

    #[test]
    fn test_zero_dt_keeps_previous_velocity() {
        let state = ChannelState::at(1.0).with_velocity(3.0);
        let driver = Driver::Eased(linear(0.0, 1.0, 1.0, 2.0));
        let next = driver.advance(&state, FrameStep { dt: 0.0, now: 0.0 });
        assert_eq!(next.value, 1.0);
        assert_eq!(next.velocity, 3.0);
    }

    #[test]
    fn test_fade_starts_on_previous_velocity() {
        let driver = EasedDriver {
            fade: Some(FadeBlend {
                easing: Easing::QuadOut,
                fraction: 0.5,
                velocity: 2.0,
            }),
            ..linear(0.0, 1.0, 0.0, 1.0)
        };

        assert_eq!(driver.value_at(0.0), 0.0);
        // Early on the blend follows the carried velocity, not the new curve
        let p = 1e-4;
        let slope = (driver.value_at(p) - driver.value_at(0.0)) / p;
        assert!((slope - 2.0).abs() < 0.05, "slope {slope}");
        // Past the fade window only the new curve remains
        assert_eq!(driver.value_at(0.75), 0.75);
    }

    #[test]
    fn test_direct_driver_follows_target() {
        let state = ChannelState::at(1.0).with_target(3.0);
        let next = Driver::Direct.advance(&state, FrameStep { dt: 0.5, now: 10.0 });
        assert_eq!(next.value, 3.0);
        assert_eq!(next.velocity, 4.0);
        assert!(!next.finished);
    }

    #[test]
    fn test_notify_end_fires_once() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let calls_clone = calls.clone();
        let mut channel = Channel::new(ChannelState::at(2.0), Driver::Direct)
            .with_on_end(Some(Box::new(move |end: AnimationEnd| {
                calls_clone.borrow_mut().push(end);
            })));

        channel.notify_end(false);
        channel.notify_end(true);

        let calls = calls.borrow();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].finished);
        assert_eq!(calls[0].state.value, 2.0);
    }
}
