//! Scenario definition for headless animation runs.

use anyhow::Result;
use indexmap::IndexMap;
use motor_animation::{DampedOscillator, PhysicalModel};
use serde::Deserialize;
use std::path::Path;

/// Owners with their initial values, and the steps to play against them.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub owners: IndexMap<String, IndexMap<String, f64>>,
    pub steps: Vec<ScenarioStep>,
}

impl Scenario {
    /// Load a scenario from JSON text.
    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Load a scenario from file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }
}

fn default_tolerance() -> f64 {
    1e-6
}

/// One scenario step.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioStep {
    EaseTo {
        owner: String,
        property: String,
        to: f64,
        #[serde(default)]
        from: Option<f64>,
        #[serde(default)]
        duration: Option<f64>,
        #[serde(default)]
        easing: Option<String>,
        #[serde(default)]
        oscillator: Option<OscillatorSpec>,
        #[serde(default)]
        decay: bool,
        #[serde(default)]
        fade: bool,
    },
    Simulate {
        owner: String,
        property: String,
        #[serde(default)]
        to: Option<f64>,
        #[serde(default)]
        model: ModelSpec,
        #[serde(default)]
        velocity: Option<f64>,
        #[serde(default)]
        bounds: Option<BoundsSpec>,
    },
    StartInput {
        owner: String,
        property: String,
        mode: InputSpec,
        #[serde(default)]
        value: Option<f64>,
        #[serde(default)]
        model: ModelSpec,
    },
    Input {
        owner: String,
        property: String,
        value: f64,
    },
    SetState {
        owner: String,
        values: IndexMap<String, f64>,
    },
    Cancel {
        owner: String,
        #[serde(default)]
        property: Option<String>,
    },
    SetVisible {
        visible: bool,
    },
    Tick {
        frames: u32,
    },
    Wait {
        ms: u64,
    },
    RunUntilIdle,
    AssertValue {
        owner: String,
        property: String,
        value: f64,
        #[serde(default = "default_tolerance")]
        tolerance: f64,
    },
    AssertIdle,
    AssertActive {
        owner: String,
        property: String,
    },
}

impl ScenarioStep {
    /// Step name as written in scenario files.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioStep::EaseTo { .. } => "ease_to",
            ScenarioStep::Simulate { .. } => "simulate",
            ScenarioStep::StartInput { .. } => "start_input",
            ScenarioStep::Input { .. } => "input",
            ScenarioStep::SetState { .. } => "set_state",
            ScenarioStep::Cancel { .. } => "cancel",
            ScenarioStep::SetVisible { .. } => "set_visible",
            ScenarioStep::Tick { .. } => "tick",
            ScenarioStep::Wait { .. } => "wait",
            ScenarioStep::RunUntilIdle => "run_until_idle",
            ScenarioStep::AssertValue { .. } => "assert_value",
            ScenarioStep::AssertIdle => "assert_idle",
            ScenarioStep::AssertActive { .. } => "assert_active",
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OscillatorSpec {
    pub frequency: f64,
    pub damping_ratio: f64,
}

impl From<OscillatorSpec> for DampedOscillator {
    fn from(spec: OscillatorSpec) -> Self {
        DampedOscillator::new(spec.frequency, spec.damping_ratio)
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BoundsSpec {
    #[serde(default = "neg_infinity")]
    pub lower: f64,
    #[serde(default = "infinity")]
    pub upper: f64,
    #[serde(default)]
    pub restitution: Option<f64>,
}

fn neg_infinity() -> f64 {
    f64::NEG_INFINITY
}

fn infinity() -> f64 {
    f64::INFINITY
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InputSpec {
    Direct,
    Indirect,
}

/// Physical model by name; `default` leaves the choice to the scheduler.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    #[default]
    Default,
    CriticallyDamped {
        frequency: f64,
    },
    UnderDamped,
    OverDamped,
    Oscillator {
        frequency: f64,
        damping_ratio: f64,
    },
    MassSpringDamper {
        mass: f64,
        stiffness: f64,
        damping: f64,
    },
    Gravity {
        g: f64,
    },
    AirDrag {
        k: f64,
    },
    FluidDrag {
        k: f64,
    },
    Damper {
        c: f64,
    },
    Free,
}

impl ModelSpec {
    pub fn build(self) -> Option<PhysicalModel> {
        let model = match self {
            ModelSpec::Default => return None,
            ModelSpec::CriticallyDamped { frequency } => {
                PhysicalModel::critically_damped(frequency)
            }
            ModelSpec::UnderDamped => PhysicalModel::under_damped(),
            ModelSpec::OverDamped => PhysicalModel::over_damped(),
            ModelSpec::Oscillator {
                frequency,
                damping_ratio,
            } => PhysicalModel::damped_harmonic_oscillator(frequency, damping_ratio),
            ModelSpec::MassSpringDamper {
                mass,
                stiffness,
                damping,
            } => PhysicalModel::mass_spring_damper(mass, stiffness, damping),
            ModelSpec::Gravity { g } => PhysicalModel::gravity(g),
            ModelSpec::AirDrag { k } => PhysicalModel::air_drag(k),
            ModelSpec::FluidDrag { k } => PhysicalModel::fluid_drag(k),
            ModelSpec::Damper { c } => PhysicalModel::damper(c),
            ModelSpec::Free => PhysicalModel::free(),
        };
        Some(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_steps() {
        let scenario = Scenario::from_json(
            r#"{
                "owners": { "box": { "x": 0.0, "opacity": 1.0 } },
                "steps": [
                    { "type": "ease_to", "owner": "box", "property": "x", "to": 10.0,
                      "easing": "quad_out" },
                    { "type": "simulate", "owner": "box", "property": "x",
                      "model": { "kind": "gravity", "g": 9.8 }, "bounds": { "lower": 0.0 } },
                    { "type": "run_until_idle" },
                    { "type": "assert_value", "owner": "box", "property": "x", "value": 0.0 }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(scenario.owners["box"]["opacity"], 1.0);
        assert_eq!(scenario.steps.len(), 4);
        assert_eq!(scenario.steps[2].name(), "run_until_idle");

        match &scenario.steps[1] {
            ScenarioStep::Simulate { model, bounds, .. } => {
                assert_eq!(model.build(), Some(PhysicalModel::gravity(9.8)));
                let bounds = bounds.unwrap();
                assert_eq!(bounds.lower, 0.0);
                assert_eq!(bounds.upper, f64::INFINITY);
            }
            other => panic!("unexpected step {other:?}"),
        }
        match &scenario.steps[3] {
            ScenarioStep::AssertValue { tolerance, .. } => assert_eq!(*tolerance, 1e-6),
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_unknown_step_is_rejected() {
        assert!(Scenario::from_json(r#"{ "steps": [ { "type": "explode" } ] }"#).is_err());
    }
}
