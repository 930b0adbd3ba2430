//! Step-wise physical simulation
//!
//! Channels without a closed form are advanced with velocity Verlet. After
//! each integration step the simulation applies its constraints in order and
//! then evaluates its end condition.

use smallvec::SmallVec;

use crate::channel::ChannelState;
use crate::forces::PhysicalModel;

/// Default restitution of an elastic boundary
pub const DEFAULT_RESTITUTION: f64 = 0.8;

/// Rebound speed below which an elastic boundary brings motion to rest
pub const DEFAULT_REST_SPEED: f64 = 0.05;

/// One velocity Verlet step given the acceleration at the predicted state
///
/// `new_acceleration` must be evaluated at [`predict`] of the same inputs.
pub fn verlet_integrate(state: &ChannelState, new_acceleration: f64, dt: f64) -> ChannelState {
    let predicted = predict(state, dt);
    ChannelState {
        value: predicted.value,
        velocity: predicted.velocity + 0.5 * new_acceleration * dt,
        acceleration: new_acceleration,
        ..*state
    }
}

/// Position after `dt` and velocity after half a step
pub fn predict(state: &ChannelState, dt: f64) -> ChannelState {
    let half_velocity = state.velocity + 0.5 * state.acceleration * dt;
    ChannelState {
        value: state.value + half_velocity * dt,
        velocity: half_velocity,
        ..*state
    }
}

/// When a simulated channel is done
///
/// `Custom` conditions never compare equal.
#[derive(Clone, Copy, Debug)]
pub enum EndCondition {
    /// Settled at the target: value within `epsilon` of it and speed below `epsilon`
    ControlledStop { epsilon: f64 },
    /// Nearly stationary: speed and acceleration both below `epsilon`
    UncontrolledStop { epsilon: f64 },
    /// Runs until cancelled
    Never,
    Custom(fn(&ChannelState) -> bool),
}

impl EndCondition {
    pub fn is_met(&self, state: &ChannelState) -> bool {
        match *self {
            EndCondition::ControlledStop { epsilon } => state.target.is_some_and(|target| {
                (target - state.value).abs() < epsilon && state.velocity.abs() < epsilon
            }),
            EndCondition::UncontrolledStop { epsilon } => {
                state.velocity.abs() < epsilon && state.acceleration.abs() < epsilon
            }
            EndCondition::Never => false,
            EndCondition::Custom(f) => f(state),
        }
    }

    pub fn epsilon(&self) -> Option<f64> {
        match *self {
            EndCondition::ControlledStop { epsilon }
            | EndCondition::UncontrolledStop { epsilon } => Some(epsilon),
            EndCondition::Never | EndCondition::Custom(_) => None,
        }
    }
}

impl PartialEq for EndCondition {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                EndCondition::ControlledStop { epsilon: a },
                EndCondition::ControlledStop { epsilon: b },
            )
            | (
                EndCondition::UncontrolledStop { epsilon: a },
                EndCondition::UncontrolledStop { epsilon: b },
            ) => a == b,
            (EndCondition::Never, EndCondition::Never) => true,
            _ => false,
        }
    }
}

/// Bouncing walls at `lower` and `upper`
///
/// Motion that crosses a wall is reflected with `restitution`. Rebounds slower
/// than `rest_speed` (plus what the outward acceleration adds in a frame) stop
/// on the wall instead.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ElasticBoundary {
    pub lower: f64,
    pub upper: f64,
    pub restitution: f64,
    pub rest_speed: f64,
}

impl ElasticBoundary {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self {
            lower,
            upper,
            restitution: DEFAULT_RESTITUTION,
            rest_speed: DEFAULT_REST_SPEED,
        }
    }

    /// Floor only
    pub fn floor(lower: f64) -> Self {
        Self::new(lower, f64::INFINITY)
    }

    pub fn restitution(mut self, restitution: f64) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn rest_speed(mut self, rest_speed: f64) -> Self {
        self.rest_speed = rest_speed;
        self
    }

    pub fn resolve(&self, state: ChannelState, dt: f64) -> ChannelState {
        let (bound, outward) = if state.value < self.lower {
            (self.lower, -1.0)
        } else if state.value > self.upper {
            (self.upper, 1.0)
        } else {
            return state;
        };

        let speed = state.velocity * outward;
        if speed <= 0.0 {
            return ChannelState {
                value: bound,
                ..state
            };
        }

        let at_rest = ChannelState {
            value: bound,
            velocity: 0.0,
            acceleration: 0.0,
            ..state
        };

        // Time since the wall was crossed, at most one frame
        let depth = (state.value - bound) * outward;
        let elapsed = (depth / speed).min(dt);
        let impact = state.velocity - state.acceleration * elapsed;
        let rebound = -self.restitution * impact;
        let pull = (state.acceleration * outward).max(0.0);
        if rebound.abs() <= self.rest_speed + pull * dt {
            return at_rest;
        }

        let value = bound + rebound * elapsed + 0.5 * state.acceleration * elapsed * elapsed;
        if (value - bound) * outward > 0.0 {
            return at_rest;
        }
        ChannelState {
            value,
            velocity: rebound + state.acceleration * elapsed,
            ..state
        }
    }
}

/// Adjustment applied to the state after every integration step
///
/// `Custom` constraints never compare equal.
#[derive(Clone, Copy, Debug)]
pub enum Constraint {
    ElasticBoundary(ElasticBoundary),
    Custom(fn(ChannelState, f64) -> ChannelState),
}

impl Constraint {
    pub fn apply(&self, state: ChannelState, dt: f64) -> ChannelState {
        match self {
            Constraint::ElasticBoundary(boundary) => boundary.resolve(state, dt),
            Constraint::Custom(f) => f(state, dt),
        }
    }
}

impl PartialEq for Constraint {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Constraint::ElasticBoundary(a), Constraint::ElasticBoundary(b)) => a == b,
            _ => false,
        }
    }
}

impl From<ElasticBoundary> for Constraint {
    fn from(boundary: ElasticBoundary) -> Self {
        Constraint::ElasticBoundary(boundary)
    }
}

/// A physical model integrated frame by frame
#[derive(Clone, Debug, PartialEq)]
pub struct Simulation {
    pub model: PhysicalModel,
    pub constraints: SmallVec<[Constraint; 2]>,
    pub end_condition: EndCondition,
}

impl Simulation {
    pub fn new(model: PhysicalModel, end_condition: EndCondition) -> Self {
        Self {
            model,
            constraints: SmallVec::new(),
            end_condition,
        }
    }

    pub fn with_constraint(mut self, constraint: impl Into<Constraint>) -> Self {
        self.constraints.push(constraint.into());
        self
    }

    /// Advance `state` by `dt` seconds. Non-positive steps change nothing.
    pub fn step(&self, state: &ChannelState, dt: f64) -> ChannelState {
        if dt <= 0.0 {
            return *state;
        }

        let acceleration = self.model.acceleration(&predict(state, dt));
        let mut next = verlet_integrate(state, acceleration, dt);
        for constraint in &self.constraints {
            next = constraint.apply(next, dt);
        }

        if self.end_condition.is_met(&next) {
            next.finished = true;
            if let (EndCondition::ControlledStop { .. }, Some(target)) =
                (self.end_condition, next.target)
            {
                next.value = target;
            }
        }
        next
    }
}
