//! Animation error types

use thiserror::Error;

use crate::owner::OwnerId;

/// Errors raised while building or routing animation requests
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    /// The owner was never registered or has been removed
    #[error("Unknown animation owner: {0:?}")]
    UnknownOwner(OwnerId),

    /// No input channel is running for this property
    #[error("No input channel for property '{0}'")]
    NoInputChannel(String),

    /// A value that must be finite was NaN or infinite
    #[error("Non-finite {field} for property '{property}': {value}")]
    NonFinite {
        property: String,
        field: &'static str,
        value: f64,
    },

    /// Duration must be positive and finite
    #[error("Invalid duration for property '{property}': {duration}")]
    InvalidDuration { property: String, duration: f64 },

    /// Fade duration is a fraction of the new animation and must lie in (0, 1]
    #[error("Invalid fade fraction for property '{property}': {fraction}")]
    InvalidFade { property: String, fraction: f64 },

    /// Physical models need a positive mass
    #[error("Invalid mass for property '{property}': {mass}")]
    InvalidMass { property: String, mass: f64 },

    /// End-condition tolerances must be non-negative
    #[error("Invalid tolerance for property '{property}': {epsilon}")]
    InvalidTolerance { property: String, epsilon: f64 },

    /// A scheduler default is out of range
    #[error("Invalid scheduler config: {field} = {value}")]
    InvalidConfig { field: &'static str, value: f64 },

    /// Easing name not recognised
    #[error("Unknown easing: {0}")]
    UnknownEasing(String),
}

/// Result type for animation operations
pub type Result<T> = std::result::Result<T, AnimationError>;
