//! Scheduler configuration

use serde::{Deserialize, Serialize};

use crate::error::{AnimationError, Result};
use crate::forces::DEFAULT_FREQUENCY;

/// Defaults applied to requests that leave a parameter unset
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SchedulerConfig {
    /// Duration of an ease when none is given, in seconds
    #[serde(default = "default_duration")]
    pub default_duration: f64,
    /// Tolerance of the default end conditions
    #[serde(default = "default_epsilon")]
    pub default_epsilon: f64,
    /// Fade length as a fraction of the new ease
    #[serde(default = "default_fade_fraction")]
    pub default_fade_fraction: f64,
    /// Angular frequency of the default controlled model
    #[serde(default = "default_frequency")]
    pub default_frequency: f64,
    /// Upper bound on the time step of one frame, in seconds
    #[serde(default)]
    pub max_frame_delta: Option<f64>,
}

fn default_duration() -> f64 {
    1.0
}

fn default_epsilon() -> f64 {
    1e-4
}

fn default_fade_fraction() -> f64 {
    0.5
}

fn default_frequency() -> f64 {
    DEFAULT_FREQUENCY
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_duration: default_duration(),
            default_epsilon: default_epsilon(),
            default_fade_fraction: default_fade_fraction(),
            default_frequency: default_frequency(),
            max_frame_delta: None,
        }
    }
}

impl SchedulerConfig {
    /// Clamp each frame's time step to `max` seconds
    pub fn with_max_frame_delta(mut self, max: f64) -> Self {
        self.max_frame_delta = Some(max);
        self
    }

    /// Check that every default can drive a channel
    pub fn validate(&self) -> Result<()> {
        let positive = |value: f64| value.is_finite() && value > 0.0;
        let checks = [
            ("default_duration", self.default_duration, positive(self.default_duration)),
            (
                "default_epsilon",
                self.default_epsilon,
                self.default_epsilon.is_finite() && self.default_epsilon >= 0.0,
            ),
            (
                "default_fade_fraction",
                self.default_fade_fraction,
                self.default_fade_fraction > 0.0 && self.default_fade_fraction <= 1.0,
            ),
            ("default_frequency", self.default_frequency, positive(self.default_frequency)),
        ];
        for (field, value, ok) in checks {
            if !ok {
                return Err(AnimationError::InvalidConfig { field, value });
            }
        }
        match self.max_frame_delta {
            Some(max) if !(max > 0.0) => Err(AnimationError::InvalidConfig {
                field: "max_frame_delta",
                value: max,
            }),
            _ => Ok(()),
        }
    }

    /// Time step actually used for a frame `elapsed` seconds after the last
    pub fn frame_delta(&self, elapsed: f64) -> f64 {
        match self.max_frame_delta {
            Some(max) => elapsed.min(max),
            None => elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SchedulerConfig =
            toml::from_str("default_duration = 0.25\nmax_frame_delta = 0.1").unwrap();
        assert_eq!(config.default_duration, 0.25);
        assert_eq!(config.default_epsilon, 1e-4);
        assert_eq!(config.default_fade_fraction, 0.5);
        assert_eq!(config.max_frame_delta, Some(0.1));

        let empty: SchedulerConfig = toml::from_str("").unwrap();
        assert_eq!(empty, SchedulerConfig::default());
    }

    #[test]
    fn test_frame_delta_clamp() {
        assert_eq!(SchedulerConfig::default().frame_delta(2.0), 2.0);
        assert_eq!(
            SchedulerConfig::default()
                .with_max_frame_delta(0.1)
                .frame_delta(2.0),
            0.1
        );
    }

    #[test]
    fn test_validate_rejects_degenerate_defaults() {
        assert_eq!(SchedulerConfig::default().validate(), Ok(()));

        let zero_duration = SchedulerConfig {
            default_duration: 0.0,
            ..Default::default()
        };
        assert_eq!(
            zero_duration.validate(),
            Err(AnimationError::InvalidConfig {
                field: "default_duration",
                value: 0.0
            })
        );

        let zero_fade = SchedulerConfig {
            default_fade_fraction: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            zero_fade.validate(),
            Err(AnimationError::InvalidConfig {
                field: "default_fade_fraction",
                ..
            })
        ));

        let nan_frequency = SchedulerConfig {
            default_frequency: f64::NAN,
            ..Default::default()
        };
        assert!(nan_frequency.validate().is_err());
        assert!(SchedulerConfig::default()
            .with_max_frame_delta(0.0)
            .validate()
            .is_err());
    }
}
