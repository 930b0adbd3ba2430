//! Motor configuration file handling

use anyhow::{Context, Result};
use motor_animation::SchedulerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level configuration (motor.toml)
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct MotorConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Headless runtime configuration
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct RuntimeConfig {
    /// Logical milliseconds between frames
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Frame budget for `run_until_idle` steps
    #[serde(default = "default_max_frames")]
    pub max_frames: u32,
}

fn default_tick_ms() -> u64 {
    16
}

fn default_max_frames() -> u32 {
    10_000
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            max_frames: default_max_frames(),
        }
    }
}

impl MotorConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: MotorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the given file, or defaults when none is given
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.runtime.tick_ms == 0 {
            anyhow::bail!("runtime.tick_ms must be > 0");
        }
        if self.runtime.max_frames == 0 {
            anyhow::bail!("runtime.max_frames must be > 0");
        }
        self.scheduler.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sections() {
        let config = MotorConfig::from_toml(
            r#"
            [scheduler]
            default_duration = 0.4
            max_frame_delta = 0.05

            [runtime]
            tick_ms = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.scheduler.default_duration, 0.4);
        assert_eq!(config.scheduler.max_frame_delta, Some(0.05));
        assert_eq!(config.runtime.tick_ms, 8);
        assert_eq!(config.runtime.max_frames, 10_000);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = MotorConfig::from_toml("").unwrap();
        assert_eq!(config.scheduler, SchedulerConfig::default());
        assert_eq!(config.runtime.tick_ms, 16);
    }

    #[test]
    fn test_rejects_zero_tick() {
        assert!(MotorConfig::from_toml("[runtime]\ntick_ms = 0").is_err());
    }

    #[test]
    fn test_rejects_invalid_scheduler_defaults() {
        let err = MotorConfig::from_toml("[scheduler]\ndefault_fade_fraction = 0.0").unwrap_err();
        assert!(err.to_string().contains("default_fade_fraction"), "{err}");
        assert!(MotorConfig::from_toml("[scheduler]\ndefault_duration = 0.0").is_err());
    }
}
