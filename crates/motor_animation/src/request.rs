//! Animation requests
//!
//! Each request type describes how a property should move next. The
//! scheduler validates a request, cancels whatever channel the property had,
//! and turns the request into a new [`Channel`] that starts from the old
//! channel's value and velocity.
//!
//! ```
//! use motor_animation::{Easing, EaseTo, Fade, SimulateToHalt};
//!
//! let slide = EaseTo::new(100.0)
//!     .duration(0.3)
//!     .easing(Easing::QuadOut)
//!     .fade(Fade::default());
//! let fling = SimulateToHalt::uncontrolled().start_velocity(1200.0);
//! # let _ = (slide, fling);
//! ```

use smallvec::SmallVec;

use crate::channel::{
    AnimationEnd, Channel, ChannelState, Driver, EasedDriver, EndCallback, FadeBlend, InputMode,
    TrajectoryDriver,
};
use crate::config::SchedulerConfig;
use crate::easing::Easing;
use crate::error::{AnimationError, Result};
use crate::forces::PhysicalModel;
use crate::simulation::{Constraint, EndCondition, Simulation};
use crate::trajectory::{DampedOscillator, Trajectory};

/// Where a superseded channel left off
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Handoff {
    pub value: f64,
    pub velocity: f64,
    pub now: f64,
}

/// The value a controlled animation heads for
pub enum EndValue {
    Fixed(f64),
    /// Computed once, at request time, from the velocity handed over by the
    /// previous channel
    FromVelocity(Box<dyn FnOnce(f64) -> f64>),
}

impl EndValue {
    pub fn from_velocity(f: impl FnOnce(f64) -> f64 + 'static) -> Self {
        EndValue::FromVelocity(Box::new(f))
    }

    fn fixed(&self) -> Option<f64> {
        match self {
            EndValue::Fixed(value) => Some(*value),
            EndValue::FromVelocity(_) => None,
        }
    }

    fn resolve(self, property: &str, velocity: f64) -> Result<f64> {
        let value = match self {
            EndValue::Fixed(value) => value,
            EndValue::FromVelocity(f) => f(velocity),
        };
        finite(property, "end value", value)
    }
}

impl From<f64> for EndValue {
    fn from(value: f64) -> Self {
        EndValue::Fixed(value)
    }
}

impl std::fmt::Debug for EndValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndValue::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            EndValue::FromVelocity(_) => f.write_str("FromVelocity(..)"),
        }
    }
}

/// Shape of an ease
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Curve {
    /// Normalized easing over a fixed duration
    Easing(Easing),
    /// Closed-form damped oscillator, running until it settles
    Oscillator(DampedOscillator),
    /// Exponential approach whose rate matches the handed-over velocity.
    /// Without velocity toward the end value it jumps straight there.
    Decay,
}

impl Default for Curve {
    fn default() -> Self {
        Curve::Easing(Easing::default())
    }
}

/// Velocity-preserving blend into a new ease
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fade {
    pub easing: Easing,
    /// Share of the new ease spent blending, in (0, 1]. Falls back to the
    /// scheduler default.
    pub fraction: Option<f64>,
    /// Velocity to continue with instead of the previous channel's
    pub starting_velocity: Option<f64>,
}

impl Default for Fade {
    fn default() -> Self {
        Self {
            easing: Easing::QuadOut,
            fraction: None,
            starting_velocity: None,
        }
    }
}

impl Fade {
    pub fn fraction(mut self, fraction: f64) -> Self {
        self.fraction = Some(fraction);
        self
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn starting_velocity(mut self, velocity: f64) -> Self {
        self.starting_velocity = Some(velocity);
        self
    }
}

/// Ease a property to an end value
pub struct EaseTo {
    pub end_value: EndValue,
    pub duration: Option<f64>,
    pub curve: Curve,
    pub fade: Option<Fade>,
    pub start_value: Option<f64>,
    on_end: Option<EndCallback>,
}

impl EaseTo {
    pub fn new(end_value: impl Into<EndValue>) -> Self {
        Self {
            end_value: end_value.into(),
            duration: None,
            curve: Curve::default(),
            fade: None,
            start_value: None,
            on_end: None,
        }
    }

    /// End value derived from the handed-over velocity
    pub fn from_velocity(f: impl FnOnce(f64) -> f64 + 'static) -> Self {
        Self::new(EndValue::from_velocity(f))
    }

    pub fn duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.curve = Curve::Easing(easing);
        self
    }

    pub fn oscillator(mut self, oscillator: DampedOscillator) -> Self {
        self.curve = Curve::Oscillator(oscillator);
        self
    }

    /// Decay toward the end value at the rate set by the current velocity
    pub fn decay(mut self) -> Self {
        self.curve = Curve::Decay;
        self
    }

    pub fn fade(mut self, fade: Fade) -> Self {
        self.fade = Some(fade);
        self
    }

    /// Start from this value instead of the property's current one
    pub fn start_value(mut self, value: f64) -> Self {
        self.start_value = Some(value);
        self
    }

    pub fn on_end(mut self, f: impl FnOnce(AnimationEnd) + 'static) -> Self {
        self.on_end = Some(Box::new(f));
        self
    }

    fn validate(&self, property: &str) -> Result<()> {
        if let Some(end) = self.end_value.fixed() {
            finite(property, "end value", end)?;
        }
        if let Some(start) = self.start_value {
            finite(property, "start value", start)?;
        }
        if let Some(duration) = self.duration {
            if !(duration.is_finite() && duration > 0.0) {
                return Err(AnimationError::InvalidDuration {
                    property: property.to_string(),
                    duration,
                });
            }
        }
        if let Some(fade) = &self.fade {
            if let Some(fraction) = fade.fraction {
                if !(fraction > 0.0 && fraction <= 1.0) {
                    return Err(AnimationError::InvalidFade {
                        property: property.to_string(),
                        fraction,
                    });
                }
            }
            if let Some(velocity) = fade.starting_velocity {
                finite(property, "starting velocity", velocity)?;
            }
        }
        Ok(())
    }

    fn into_channel(
        self,
        property: &str,
        handoff: Handoff,
        config: &SchedulerConfig,
    ) -> Result<Channel> {
        let start = self.start_value.unwrap_or(handoff.value);
        let velocity = self
            .fade
            .and_then(|fade| fade.starting_velocity)
            .unwrap_or(handoff.velocity);
        let end = self.end_value.resolve(property, velocity)?;

        let driver = match self.curve {
            Curve::Easing(easing) => Driver::Eased(EasedDriver {
                start_time: handoff.now,
                duration: self.duration.unwrap_or(config.default_duration),
                start,
                end,
                easing,
                fade: self.fade.map(|fade| FadeBlend {
                    easing: fade.easing,
                    fraction: fade.fraction.unwrap_or(config.default_fade_fraction),
                    velocity,
                }),
            }),
            Curve::Oscillator(oscillator) => Driver::Trajectory(TrajectoryDriver {
                start_time: handoff.now,
                end,
                trajectory: oscillator.solve(start, end, velocity),
                epsilon: config.default_epsilon,
            }),
            Curve::Decay => Driver::Trajectory(TrajectoryDriver {
                start_time: handoff.now,
                end,
                trajectory: Trajectory::decay(start, end, velocity),
                epsilon: config.default_epsilon,
            }),
        };

        let state = ChannelState::at(start).with_velocity(velocity).with_target(end);
        Ok(Channel::new(state, driver).with_on_end(self.on_end))
    }
}

/// Simulate physical motion until the end condition holds
///
/// With an end value the motion is controlled: it settles at the end value
/// and snaps onto it. Without one it coasts until nearly stationary.
pub struct SimulateToHalt {
    pub end_value: Option<EndValue>,
    pub model: Option<PhysicalModel>,
    pub constraints: SmallVec<[Constraint; 2]>,
    pub end_condition: Option<EndCondition>,
    pub start_velocity: Option<f64>,
    on_end: Option<EndCallback>,
}

impl SimulateToHalt {
    pub fn controlled(end_value: impl Into<EndValue>) -> Self {
        Self {
            end_value: Some(end_value.into()),
            ..Self::uncontrolled()
        }
    }

    pub fn uncontrolled() -> Self {
        Self {
            end_value: None,
            model: None,
            constraints: SmallVec::new(),
            end_condition: None,
            start_velocity: None,
            on_end: None,
        }
    }

    pub fn model(mut self, model: PhysicalModel) -> Self {
        self.model = Some(model);
        self
    }

    pub fn constraint(mut self, constraint: impl Into<Constraint>) -> Self {
        self.constraints.push(constraint.into());
        self
    }

    pub fn end_condition(mut self, end_condition: EndCondition) -> Self {
        self.end_condition = Some(end_condition);
        self
    }

    /// Launch with this velocity instead of the handed-over one
    pub fn start_velocity(mut self, velocity: f64) -> Self {
        self.start_velocity = Some(velocity);
        self
    }

    pub fn on_end(mut self, f: impl FnOnce(AnimationEnd) + 'static) -> Self {
        self.on_end = Some(Box::new(f));
        self
    }

    pub fn is_controlled(&self) -> bool {
        self.end_value.is_some()
    }

    fn validate(&self, property: &str) -> Result<()> {
        if let Some(end) = self.end_value.as_ref().and_then(EndValue::fixed) {
            finite(property, "end value", end)?;
        }
        if let Some(velocity) = self.start_velocity {
            finite(property, "start velocity", velocity)?;
        }
        if let Some(model) = &self.model {
            check_mass(property, model)?;
        }
        if let Some(end_condition) = &self.end_condition {
            check_tolerance(property, end_condition)?;
        }
        Ok(())
    }

    fn into_channel(
        self,
        property: &str,
        handoff: Handoff,
        config: &SchedulerConfig,
    ) -> Result<Channel> {
        let velocity = self.start_velocity.unwrap_or(handoff.velocity);
        let target = self
            .end_value
            .map(|end| end.resolve(property, velocity))
            .transpose()?;

        let model = self.model.unwrap_or_else(|| match target {
            Some(_) => PhysicalModel::critically_damped(config.default_frequency),
            None => PhysicalModel::linear_damper(),
        });
        let epsilon = config.default_epsilon;
        let end_condition = self.end_condition.unwrap_or(match target {
            Some(_) => EndCondition::ControlledStop { epsilon },
            None => EndCondition::UncontrolledStop { epsilon },
        });

        let state = ChannelState {
            target,
            ..ChannelState::at(handoff.value).with_velocity(velocity)
        };
        let simulation = Simulation {
            model,
            constraints: self.constraints,
            end_condition,
        };
        Ok(simulated_channel(state, simulation).with_on_end(self.on_end))
    }
}

/// Follow user input verbatim
#[derive(Default)]
pub struct DirectInput {
    /// Initial value, defaults to the property's current value
    pub value: Option<f64>,
    on_end: Option<EndCallback>,
}

impl DirectInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn on_end(mut self, f: impl FnOnce(AnimationEnd) + 'static) -> Self {
        self.on_end = Some(Box::new(f));
        self
    }

    fn validate(&self, property: &str) -> Result<()> {
        if let Some(value) = self.value {
            finite(property, "input value", value)?;
        }
        Ok(())
    }

    fn into_channel(self, handoff: Handoff) -> Channel {
        let value = self.value.unwrap_or(handoff.value);
        let state = ChannelState::at(value)
            .with_velocity(handoff.velocity)
            .with_target(value);
        Channel::new(state, Driver::Direct)
            .with_input(InputMode::Direct)
            .with_on_end(self.on_end)
    }
}

/// Chase user input with a controlled simulation that never ends on its own
pub struct IndirectInput {
    pub end_value: f64,
    pub model: Option<PhysicalModel>,
    pub constraints: SmallVec<[Constraint; 2]>,
    on_end: Option<EndCallback>,
}

impl IndirectInput {
    pub fn new(end_value: f64) -> Self {
        Self {
            end_value,
            model: None,
            constraints: SmallVec::new(),
            on_end: None,
        }
    }

    pub fn model(mut self, model: PhysicalModel) -> Self {
        self.model = Some(model);
        self
    }

    pub fn constraint(mut self, constraint: impl Into<Constraint>) -> Self {
        self.constraints.push(constraint.into());
        self
    }

    pub fn on_end(mut self, f: impl FnOnce(AnimationEnd) + 'static) -> Self {
        self.on_end = Some(Box::new(f));
        self
    }

    fn validate(&self, property: &str) -> Result<()> {
        finite(property, "end value", self.end_value)?;
        if let Some(model) = &self.model {
            check_mass(property, model)?;
        }
        Ok(())
    }

    fn into_channel(self, handoff: Handoff, config: &SchedulerConfig) -> Channel {
        let state = ChannelState::at(handoff.value)
            .with_velocity(handoff.velocity)
            .with_target(self.end_value);
        let simulation = Simulation {
            model: self
                .model
                .unwrap_or_else(|| PhysicalModel::critically_damped(config.default_frequency)),
            constraints: self.constraints,
            end_condition: EndCondition::Never,
        };
        simulated_channel(state, simulation)
            .with_input(InputMode::Indirect)
            .with_on_end(self.on_end)
    }
}

/// Any request the scheduler accepts
pub enum AnimationRequest {
    EaseTo(EaseTo),
    SimulateToHalt(SimulateToHalt),
    DirectInput(DirectInput),
    IndirectInput(IndirectInput),
}

impl AnimationRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            AnimationRequest::EaseTo(_) => "ease_to",
            AnimationRequest::SimulateToHalt(_) => "simulate_to_halt",
            AnimationRequest::DirectInput(_) => "direct_input",
            AnimationRequest::IndirectInput(_) => "indirect_input",
        }
    }

    /// Check everything that can be checked before touching the old channel
    pub(crate) fn validate(&self, property: &str) -> Result<()> {
        match self {
            AnimationRequest::EaseTo(request) => request.validate(property),
            AnimationRequest::SimulateToHalt(request) => request.validate(property),
            AnimationRequest::DirectInput(request) => request.validate(property),
            AnimationRequest::IndirectInput(request) => request.validate(property),
        }
    }

    pub(crate) fn into_channel(
        self,
        property: &str,
        handoff: Handoff,
        config: &SchedulerConfig,
    ) -> Result<Channel> {
        match self {
            AnimationRequest::EaseTo(request) => request.into_channel(property, handoff, config),
            AnimationRequest::SimulateToHalt(request) => {
                request.into_channel(property, handoff, config)
            }
            AnimationRequest::DirectInput(request) => Ok(request.into_channel(handoff)),
            AnimationRequest::IndirectInput(request) => Ok(request.into_channel(handoff, config)),
        }
    }
}

impl From<EaseTo> for AnimationRequest {
    fn from(request: EaseTo) -> Self {
        AnimationRequest::EaseTo(request)
    }
}

impl From<SimulateToHalt> for AnimationRequest {
    fn from(request: SimulateToHalt) -> Self {
        AnimationRequest::SimulateToHalt(request)
    }
}

impl From<DirectInput> for AnimationRequest {
    fn from(request: DirectInput) -> Self {
        AnimationRequest::DirectInput(request)
    }
}

impl From<IndirectInput> for AnimationRequest {
    fn from(request: IndirectInput) -> Self {
        AnimationRequest::IndirectInput(request)
    }
}

/// Simulated channel whose first half step uses the model's own acceleration
fn simulated_channel(state: ChannelState, simulation: Simulation) -> Channel {
    let state = state.with_acceleration(simulation.model.acceleration(&state));
    Channel::new(state, Driver::Simulated(simulation))
}

pub(crate) fn finite(property: &str, field: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AnimationError::NonFinite {
            property: property.to_string(),
            field,
            value,
        })
    }
}

fn check_mass(property: &str, model: &PhysicalModel) -> Result<()> {
    let mass = model.mass();
    if mass.is_finite() && mass > 0.0 {
        Ok(())
    } else {
        Err(AnimationError::InvalidMass {
            property: property.to_string(),
            mass,
        })
    }
}

fn check_tolerance(property: &str, end_condition: &EndCondition) -> Result<()> {
    match end_condition.epsilon() {
        Some(epsilon) if !(epsilon >= 0.0) => Err(AnimationError::InvalidTolerance {
            property: property.to_string(),
            epsilon,
        }),
        _ => Ok(()),
    }
}
