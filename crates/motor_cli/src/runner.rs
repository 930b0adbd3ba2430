//! Scenario runner that plays scripted requests against a scheduler.

use crate::config::{MotorConfig, RuntimeConfig};
use crate::report::{OwnerReport, RunReport};
use crate::scenario::{InputSpec, Scenario, ScenarioStep};
use anyhow::{anyhow, Result};
use indexmap::IndexMap;
use motor_animation::{
    AnimationOwner, AnimationScheduler, DirectInput, EaseTo, Easing, ElasticBoundary, Fade,
    IndirectInput, ManualFrameHost, OwnerId, SimulateToHalt, StateBag, SystemFrameHost,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// What an owner saw during the run.
#[derive(Debug, Default)]
struct OwnerLog {
    renders: u64,
    finished: Vec<String>,
    interrupted: Vec<String>,
}

/// Owner that only records what the scheduler tells it.
struct RecordingOwner {
    initial: StateBag,
    log: Rc<RefCell<OwnerLog>>,
}

impl AnimationOwner for RecordingOwner {
    fn initial_state(&mut self) -> StateBag {
        self.initial.clone()
    }

    fn perform_animation(&mut self, _state: &StateBag) {
        self.log.borrow_mut().renders += 1;
    }

    fn on_animation_end(&mut self, property: &str, finished: bool) {
        let mut log = self.log.borrow_mut();
        if finished {
            log.finished.push(property.to_string());
        } else {
            log.interrupted.push(property.to_string());
        }
    }
}

/// Where frame time comes from.
enum Clock {
    /// Logical time, advanced instantly
    Manual(ManualFrameHost),
    /// Wall-clock time; advancing sleeps
    Realtime,
}

/// Final outcome of a scenario run.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Passed { report: RunReport },
    Failed { report: RunReport },
}

impl RunOutcome {
    pub fn report(&self) -> &RunReport {
        match self {
            RunOutcome::Passed { report } => report,
            RunOutcome::Failed { report } => report,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RunOutcome::Failed { .. })
    }
}

/// Execute a pre-loaded scenario, on the wall clock when `realtime` is set.
pub fn run_loaded_scenario(
    scenario: &Scenario,
    config: &MotorConfig,
    realtime: bool,
) -> Result<RunOutcome> {
    let mut runner = ScenarioRunner::new(scenario, config, realtime)?;

    for (step_index, step) in scenario.steps.iter().enumerate() {
        if let Err(err) = runner.run_step(step) {
            tracing::warn!("Step {} ({}) failed: {:#}", step_index, step.name(), err);
            let report = runner.finish(RunReport::failed(
                step.name(),
                step_index,
                format!("{err:#}"),
                runner.elapsed_frames,
                runner.elapsed_ms,
            ));
            return Ok(RunOutcome::Failed { report });
        }
    }

    let report = runner.finish(RunReport::passed(runner.elapsed_frames, runner.elapsed_ms));
    Ok(RunOutcome::Passed { report })
}

struct ScenarioRunner {
    scheduler: AnimationScheduler,
    clock: Clock,
    runtime: RuntimeConfig,
    owners: IndexMap<String, (OwnerId, Rc<RefCell<OwnerLog>>)>,
    elapsed_frames: u64,
    elapsed_ms: u64,
}

impl ScenarioRunner {
    fn new(scenario: &Scenario, config: &MotorConfig, realtime: bool) -> Result<Self> {
        let (mut scheduler, clock) = if realtime {
            (
                AnimationScheduler::new(config.scheduler.clone(), SystemFrameHost::new())?,
                Clock::Realtime,
            )
        } else {
            let host = ManualFrameHost::new();
            (
                AnimationScheduler::new(config.scheduler.clone(), host.clone())?,
                Clock::Manual(host),
            )
        };

        let mut owners = IndexMap::new();
        for (name, values) in &scenario.owners {
            let log = Rc::new(RefCell::new(OwnerLog::default()));
            let id = scheduler.add_owner(RecordingOwner {
                initial: values.iter().map(|(k, v)| (k.as_str(), *v)).collect(),
                log: log.clone(),
            });
            owners.insert(name.clone(), (id, log));
        }

        Ok(Self {
            scheduler,
            clock,
            runtime: config.runtime,
            owners,
            elapsed_frames: 0,
            elapsed_ms: 0,
        })
    }

    fn owner(&self, name: &str) -> Result<OwnerId> {
        self.owners
            .get(name)
            .map(|(id, _)| *id)
            .ok_or_else(|| anyhow!("unknown owner '{name}'"))
    }

    fn run_step(&mut self, step: &ScenarioStep) -> Result<()> {
        match step {
            ScenarioStep::EaseTo {
                owner,
                property,
                to,
                from,
                duration,
                easing,
                oscillator,
                decay,
                fade,
            } => {
                let id = self.owner(owner)?;
                let mut request = EaseTo::new(*to);
                if let Some(easing) = easing {
                    request = request.easing(easing.parse::<Easing>()?);
                }
                if let Some(oscillator) = oscillator {
                    request = request.oscillator((*oscillator).into());
                }
                if *decay {
                    request = request.decay();
                }
                if let Some(duration) = duration {
                    request = request.duration(*duration);
                }
                if let Some(from) = from {
                    request = request.start_value(*from);
                }
                if *fade {
                    request = request.fade(Fade::default());
                }
                self.scheduler.ease_to(id, property, request)?;
            }
            ScenarioStep::Simulate {
                owner,
                property,
                to,
                model,
                velocity,
                bounds,
            } => {
                let id = self.owner(owner)?;
                let mut request = match to {
                    Some(to) => SimulateToHalt::controlled(*to),
                    None => SimulateToHalt::uncontrolled(),
                };
                if let Some(model) = model.build() {
                    request = request.model(model);
                }
                if let Some(velocity) = velocity {
                    request = request.start_velocity(*velocity);
                }
                if let Some(bounds) = bounds {
                    let mut boundary = ElasticBoundary::new(bounds.lower, bounds.upper);
                    if let Some(restitution) = bounds.restitution {
                        boundary = boundary.restitution(restitution);
                    }
                    request = request.constraint(boundary);
                }
                self.scheduler.simulate_to_halt(id, property, request)?;
            }
            ScenarioStep::StartInput {
                owner,
                property,
                mode,
                value,
                model,
            } => {
                let id = self.owner(owner)?;
                match mode {
                    InputSpec::Direct => {
                        let mut input = DirectInput::new();
                        if let Some(value) = value {
                            input = input.value(*value);
                        }
                        self.scheduler.start_direct_input(id, property, input)?;
                    }
                    InputSpec::Indirect => {
                        let target = match value {
                            Some(value) => *value,
                            None => self.scheduler.value(id, property).unwrap_or(0.0),
                        };
                        let mut input = IndirectInput::new(target);
                        if let Some(model) = model.build() {
                            input = input.model(model);
                        }
                        self.scheduler.start_indirect_input(id, property, input)?;
                    }
                }
            }
            ScenarioStep::Input { owner, property, value } => {
                let id = self.owner(owner)?;
                self.scheduler.user_input(id, property, *value)?;
            }
            ScenarioStep::SetState { owner, values } => {
                let id = self.owner(owner)?;
                self.scheduler
                    .set_state(id, values.iter().map(|(k, v)| (k.as_str(), *v)))?;
            }
            ScenarioStep::Cancel { owner, property } => {
                let id = self.owner(owner)?;
                match property {
                    Some(property) => {
                        self.scheduler.cancel(id, property);
                    }
                    None => self.scheduler.cancel_all(id, false),
                }
            }
            ScenarioStep::SetVisible { visible } => self.scheduler.set_visible(*visible),
            ScenarioStep::Tick { frames } => {
                for _ in 0..*frames {
                    self.advance(self.runtime.tick_ms);
                }
            }
            ScenarioStep::Wait { ms } => {
                let mut remaining = *ms;
                while remaining > 0 {
                    let step_ms = remaining.min(self.runtime.tick_ms);
                    remaining -= step_ms;
                    self.advance(step_ms);
                }
            }
            ScenarioStep::RunUntilIdle => {
                let mut frames = 0u32;
                while self.scheduler.is_running() {
                    if frames >= self.runtime.max_frames {
                        anyhow::bail!(
                            "still animating after {} frames ({} channels)",
                            frames,
                            self.scheduler.active_channels()
                        );
                    }
                    self.advance(self.runtime.tick_ms);
                    frames += 1;
                }
            }
            ScenarioStep::AssertValue {
                owner,
                property,
                value,
                tolerance,
            } => {
                let id = self.owner(owner)?;
                let actual = self
                    .scheduler
                    .value(id, property)
                    .ok_or_else(|| anyhow!("{owner}.{property}: no value"))?;
                if (actual - value).abs() > *tolerance {
                    anyhow::bail!("{owner}.{property}: expected {value}, got {actual}");
                }
            }
            ScenarioStep::AssertIdle => {
                if self.scheduler.is_running() {
                    anyhow::bail!(
                        "scheduler still running with {} channels",
                        self.scheduler.active_channels()
                    );
                }
            }
            ScenarioStep::AssertActive { owner, property } => {
                let id = self.owner(owner)?;
                if !self.scheduler.is_animating(id, property) {
                    anyhow::bail!("{owner}.{property}: no running channel");
                }
            }
        }
        Ok(())
    }

    /// Let `ms` milliseconds pass and run the outstanding frame.
    fn advance(&mut self, ms: u64) {
        match &self.clock {
            Clock::Manual(host) => host.advance(ms as f64 / 1000.0),
            Clock::Realtime => std::thread::sleep(Duration::from_millis(ms)),
        }
        self.elapsed_frames += 1;
        self.elapsed_ms += ms;
        self.scheduler.run_pending_frame();
    }

    fn finish(&mut self, mut report: RunReport) -> RunReport {
        report.animated_frames = self.scheduler.frame_count();
        for (name, (id, log)) in &self.owners {
            let log = log.borrow();
            let values: IndexMap<String, f64> = self
                .scheduler
                .state(*id)
                .map(|state| state.iter().map(|(k, v)| (k.to_string(), v)).collect())
                .unwrap_or_default();
            report.owners.insert(
                name.clone(),
                OwnerReport {
                    values,
                    renders: log.renders,
                    finished: log.finished.clone(),
                    interrupted: log.interrupted.clone(),
                },
            );
        }
        self.scheduler.shutdown();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_scenario(input: &str, config: &MotorConfig) -> Result<RunOutcome> {
        let scenario = Scenario::from_json(input)?;
        run_loaded_scenario(&scenario, config, false)
    }

    fn run(input: &str) -> RunOutcome {
        run_scenario(input, &MotorConfig::default()).unwrap()
    }

    #[test]
    fn test_bundled_scenarios_pass() {
        for (name, input) in [
            ("ease", include_str!("../scenarios/ease.json")),
            ("bounce", include_str!("../scenarios/bounce.json")),
            ("input_handoff", include_str!("../scenarios/input_handoff.json")),
        ] {
            let outcome = run(input);
            assert!(!outcome.is_failed(), "{name}: {:?}", outcome.report());
        }
    }

    #[test]
    fn test_failed_assertion_reports_step() {
        let outcome = run(r#"{
            "owners": { "box": { "x": 0.0 } },
            "steps": [
                { "type": "ease_to", "owner": "box", "property": "x", "to": 1.0, "duration": 0.5 },
                { "type": "run_until_idle" },
                { "type": "assert_value", "owner": "box", "property": "x", "value": 2.0 }
            ]
        }"#);

        assert!(outcome.is_failed());
        let report = outcome.report();
        assert_eq!(report.failed_step_index, Some(2));
        assert_eq!(report.step.as_deref(), Some("assert_value"));
        assert_eq!(report.owners["box"].values["x"], 1.0);
        assert_eq!(report.owners["box"].finished, vec!["x".to_string()]);
    }

    #[test]
    fn test_request_errors_fail_the_step() {
        let outcome = run(r#"{
            "owners": { "box": { "x": 0.0 } },
            "steps": [
                { "type": "ease_to", "owner": "box", "property": "x", "to": 1.0,
                  "easing": "wobbly" }
            ]
        }"#);
        assert!(outcome.is_failed());
        assert!(outcome.report().message.as_deref().unwrap_or("").contains("wobbly"));

        let outcome = run(r#"{
            "steps": [ { "type": "input", "owner": "ghost", "property": "x", "value": 1.0 } ]
        }"#);
        assert!(outcome.is_failed());
    }

    #[test]
    fn test_decay_continues_handed_over_motion() {
        let outcome = run(r#"{
            "owners": { "list": { "scroll": 0.0 } },
            "steps": [
                { "type": "start_input", "owner": "list", "property": "scroll",
                  "mode": "direct" },
                { "type": "tick", "frames": 1 },
                { "type": "input", "owner": "list", "property": "scroll", "value": 8.0 },
                { "type": "tick", "frames": 1 },
                { "type": "ease_to", "owner": "list", "property": "scroll", "to": 100.0,
                  "decay": true },
                { "type": "tick", "frames": 1 },
                { "type": "assert_active", "owner": "list", "property": "scroll" },
                { "type": "run_until_idle" },
                { "type": "assert_value", "owner": "list", "property": "scroll", "value": 100.0 }
            ]
        }"#);
        assert!(!outcome.is_failed(), "{:?}", outcome.report());
        let list = &outcome.report().owners["list"];
        assert_eq!(list.interrupted, vec!["scroll".to_string()]);
        assert_eq!(list.finished, vec!["scroll".to_string()]);
    }

    #[test]
    fn test_run_until_idle_respects_budget() {
        let config = MotorConfig::from_toml("[runtime]\nmax_frames = 5").unwrap();
        let outcome = run_scenario(
            r#"{
                "owners": { "box": { "x": 0.0 } },
                "steps": [
                    { "type": "start_input", "owner": "box", "property": "x", "mode": "direct" },
                    { "type": "run_until_idle" }
                ]
            }"#,
            &config,
        )
        .unwrap();

        assert!(outcome.is_failed());
        assert_eq!(outcome.report().elapsed_frames, 5);
    }

    #[test]
    fn test_wait_splits_into_ticks() {
        let outcome = run(r#"{ "steps": [ { "type": "wait", "ms": 40 } ] }"#);
        let report = outcome.report();
        assert_eq!(report.elapsed_frames, 3);
        assert_eq!(report.elapsed_ms, 40);
        assert_eq!(report.animated_frames, 0);
    }
}
