//! Animation scheduler
//!
//! Owns the animation owners and their channels, and drives them from frame
//! callbacks supplied by a [`FrameHost`]. The scheduler is idle while no
//! channel runs; registering the first channel requests a frame, and a frame
//! pass that leaves no channel running requests none.

use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::channel::{Channel, ChannelState, FrameStep, InputMode};
use crate::config::SchedulerConfig;
use crate::error::{AnimationError, Result};
use crate::host::{FrameHost, FrameToken};
use crate::owner::{AnimationOwner, OwnerId, StateBag};
use crate::registry::{CancelMode, ChannelRegistry};
use crate::request::{
    finite, AnimationRequest, DirectInput, EaseTo, Handoff, IndirectInput, SimulateToHalt,
};

struct OwnerEntry {
    owner: Box<dyn AnimationOwner>,
    state: StateBag,
}

/// Drives every running channel once per frame
pub struct AnimationScheduler {
    config: SchedulerConfig,
    host: Box<dyn FrameHost>,
    owners: SlotMap<OwnerId, OwnerEntry>,
    registry: ChannelRegistry,
    pending_frame: Option<FrameToken>,
    last_frame_time: f64,
    visible: bool,
    frame_count: u64,
}

impl AnimationScheduler {
    /// Scheduler with the given defaults, rejected when they are out of range
    pub fn new(config: SchedulerConfig, host: impl FrameHost + 'static) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, Box::new(host)))
    }

    /// Scheduler with the default configuration
    pub fn with_host(host: impl FrameHost + 'static) -> Self {
        Self::build(SchedulerConfig::default(), Box::new(host))
    }

    fn build(config: SchedulerConfig, host: Box<dyn FrameHost>) -> Self {
        let last_frame_time = host.now();
        Self {
            config,
            host,
            owners: SlotMap::with_key(),
            registry: ChannelRegistry::new(),
            pending_frame: None,
            last_frame_time,
            visible: true,
            frame_count: 0,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn now(&self) -> f64 {
        self.host.now()
    }

    /// Whether a frame callback is outstanding
    pub fn is_running(&self) -> bool {
        self.pending_frame.is_some()
    }

    pub fn pending_frame(&self) -> Option<FrameToken> {
        self.pending_frame
    }

    pub fn active_channels(&self) -> usize {
        self.registry.active_count()
    }

    /// Number of frame passes run so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    // ========================================================================
    // Owners
    // ========================================================================

    /// Register an owner and render its initial state once
    pub fn add_owner(&mut self, owner: impl AnimationOwner + 'static) -> OwnerId {
        let mut owner: Box<dyn AnimationOwner> = Box::new(owner);
        let state = owner.initial_state();
        owner.perform_animation(&state);
        let id = self.owners.insert(OwnerEntry { owner, state });
        tracing::debug!("Animation owner added: {:?}", id);
        id
    }

    /// Remove an owner, dropping its channels without notifications
    pub fn remove_owner(&mut self, id: OwnerId) -> Option<Box<dyn AnimationOwner>> {
        let entry = self.owners.remove(id)?;
        let dropped = self.registry.cancel_all(id, CancelMode::Silent);
        tracing::debug!("Animation owner removed: {:?} ({} channels dropped)", id, dropped.len());
        self.stop_if_idle();
        Some(entry.owner)
    }

    pub fn contains_owner(&self, id: OwnerId) -> bool {
        self.owners.contains_key(id)
    }

    /// Current property values of an owner
    pub fn state(&self, id: OwnerId) -> Option<&StateBag> {
        self.owners.get(id).map(|entry| &entry.state)
    }

    pub fn value(&self, id: OwnerId, property: &str) -> Option<f64> {
        self.state(id)?.get(property)
    }

    pub fn channel(&self, id: OwnerId, property: &str) -> Option<&Channel> {
        self.registry.get(id, property)
    }

    pub fn is_animating(&self, id: OwnerId, property: &str) -> bool {
        self.registry.get(id, property).is_some()
    }

    /// Properties of an owner with running channels
    pub fn animating_properties(&self, id: OwnerId) -> impl Iterator<Item = &str> {
        self.registry.properties(id)
    }

    /// Write property values without animating them
    ///
    /// Running channels of those properties are interrupted, and the owner is
    /// rendered right away.
    pub fn set_state<K, I>(&mut self, id: OwnerId, values: I) -> Result<()>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, f64)>,
    {
        let values: SmallVec<[(String, f64); 4]> = values
            .into_iter()
            .map(|(property, value)| (property.into(), value))
            .collect();
        for (property, value) in &values {
            finite(property, "value", *value)?;
        }

        let entry = self.owners.get_mut(id).ok_or(AnimationError::UnknownOwner(id))?;
        for (property, value) in values {
            if self.registry.cancel(id, &property, CancelMode::Interrupted).is_some() {
                entry.owner.on_animation_end(&property, false);
            }
            entry.state.set(property, value);
        }
        entry.owner.perform_animation(&entry.state);
        self.stop_if_idle();
        Ok(())
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Start a new channel for `property`, superseding the running one
    ///
    /// The running channel is left alone when the request fails.
    pub fn request(
        &mut self,
        id: OwnerId,
        property: &str,
        request: impl Into<AnimationRequest>,
    ) -> Result<()> {
        let request = request.into();
        request.validate(property)?;
        let channel = self.build_channel(id, property, request)?;
        self.install_channel(id, property, channel);
        self.ensure_running();
        Ok(())
    }

    /// Start channels for several properties of one owner
    ///
    /// Every channel is built before any running one is touched, so a failing
    /// request leaves the owner as it was.
    pub fn request_many<K, I>(&mut self, id: OwnerId, requests: I) -> Result<()>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, AnimationRequest)>,
    {
        let requests: SmallVec<[(String, AnimationRequest); 4]> = requests
            .into_iter()
            .map(|(property, request)| (property.into(), request))
            .collect();
        for (property, request) in &requests {
            request.validate(property)?;
        }

        let channels = requests
            .into_iter()
            .map(|(property, request)| -> Result<(String, Channel)> {
                let channel = self.build_channel(id, &property, request)?;
                Ok((property, channel))
            })
            .collect::<Result<SmallVec<[(String, Channel); 4]>>>()?;
        for (property, channel) in channels {
            self.install_channel(id, &property, channel);
        }
        self.ensure_running();
        Ok(())
    }

    pub fn ease_to(&mut self, id: OwnerId, property: &str, ease: EaseTo) -> Result<()> {
        self.request(id, property, ease)
    }

    pub fn simulate_to_halt(
        &mut self,
        id: OwnerId,
        property: &str,
        simulation: SimulateToHalt,
    ) -> Result<()> {
        self.request(id, property, simulation)
    }

    pub fn start_direct_input(
        &mut self,
        id: OwnerId,
        property: &str,
        input: DirectInput,
    ) -> Result<()> {
        self.request(id, property, input)
    }

    pub fn start_indirect_input(
        &mut self,
        id: OwnerId,
        property: &str,
        input: IndirectInput,
    ) -> Result<()> {
        self.request(id, property, input)
    }

    /// Feed a new input value to a running input channel
    ///
    /// Direct input lands on the property immediately; indirect input moves
    /// the simulation's target.
    pub fn user_input(&mut self, id: OwnerId, property: &str, value: f64) -> Result<()> {
        finite(property, "input value", value)?;
        let entry = self.owners.get_mut(id).ok_or(AnimationError::UnknownOwner(id))?;
        let channel = self
            .registry
            .get_mut(id, property)
            .filter(|channel| channel.input_mode().is_some())
            .ok_or_else(|| AnimationError::NoInputChannel(property.to_string()))?;

        channel.set_target(value);
        if channel.input_mode() == Some(InputMode::Direct) {
            entry.state.set(property, value);
        }
        Ok(())
    }

    /// Stop a property's channel, reporting it as unfinished
    pub fn cancel(&mut self, id: OwnerId, property: &str) -> Option<ChannelState> {
        let channel = self.registry.cancel(id, property, CancelMode::Interrupted)?;
        if let Some(entry) = self.owners.get_mut(id) {
            entry.owner.on_animation_end(property, false);
        }
        self.stop_if_idle();
        Some(*channel.state())
    }

    /// Stop every channel of an owner
    pub fn cancel_all(&mut self, id: OwnerId, suppress_callbacks: bool) {
        let mode = if suppress_callbacks {
            CancelMode::Silent
        } else {
            CancelMode::Interrupted
        };
        let cancelled = self.registry.cancel_all(id, mode);
        if mode.notifies() {
            if let Some(entry) = self.owners.get_mut(id) {
                for (property, _) in &cancelled {
                    entry.owner.on_animation_end(property, false);
                }
            }
        }
        self.stop_if_idle();
    }

    /// Build the channel for `request`, continuing from the property's current
    /// value and the running channel's velocity. Nothing is modified.
    fn build_channel(
        &self,
        id: OwnerId,
        property: &str,
        request: AnimationRequest,
    ) -> Result<Channel> {
        let entry = self.owners.get(id).ok_or(AnimationError::UnknownOwner(id))?;
        let value = entry.state.get(property).unwrap_or_else(|| {
            tracing::debug!("Property '{}' has no value yet, starting from 0", property);
            0.0
        });
        let velocity = self.registry.get(id, property).map_or(0.0, Channel::velocity);
        let handoff = Handoff {
            value,
            velocity,
            now: self.host.now(),
        };
        let kind = request.kind();
        let channel = request.into_channel(property, handoff, &self.config)?;
        tracing::trace!("Built {} channel for {:?}.{}", kind, id, property);
        Ok(channel)
    }

    /// Replace the property's running channel with `channel`
    fn install_channel(&mut self, id: OwnerId, property: &str, channel: Channel) {
        let Some(entry) = self.owners.get_mut(id) else {
            return;
        };
        if self
            .registry
            .cancel(id, property, CancelMode::Interrupted)
            .is_some()
        {
            entry.owner.on_animation_end(property, false);
        }
        if channel.input_mode() == Some(InputMode::Direct) {
            entry.state.set(property, channel.value());
        }
        self.registry.register(id, property, channel);
    }

    // ========================================================================
    // Frames
    // ========================================================================

    /// Run one frame pass for the callback identified by `token`
    ///
    /// Tokens other than the outstanding one are ignored.
    pub fn on_frame(&mut self, token: FrameToken) {
        if self.pending_frame != Some(token) {
            tracing::trace!("Ignoring stale frame callback {:?}", token);
            return;
        }
        self.pending_frame = None;

        let now = self.host.now();
        let step = FrameStep {
            dt: self.config.frame_delta(now - self.last_frame_time),
            now,
        };

        let owners: SmallVec<[OwnerId; 8]> = self.registry.owners().collect();
        for id in owners {
            let Some(entry) = self.owners.get_mut(id) else {
                tracing::warn!("Dropping channels of unknown owner {:?}", id);
                self.registry.cancel_all(id, CancelMode::Silent);
                continue;
            };

            let finished = self.registry.advance_owner(id, step, &mut entry.state);
            for property in &finished {
                if self.registry.cancel(id, property, CancelMode::Finished).is_some() {
                    entry.owner.on_animation_end(property, true);
                    tracing::trace!("Channel {:?}.{} finished", id, property);
                }
            }
            entry.owner.perform_animation(&entry.state);
        }

        self.last_frame_time = now;
        self.frame_count += 1;

        if self.registry.is_empty() {
            tracing::debug!("Animation scheduler idle after {} frames", self.frame_count);
        } else if self.visible {
            self.pending_frame = Some(self.host.request_frame());
        }
    }

    /// Run the outstanding frame, if any. Returns whether a frame ran.
    pub fn run_pending_frame(&mut self) -> bool {
        match self.pending_frame {
            Some(token) => {
                self.on_frame(token);
                true
            }
            None => false,
        }
    }

    /// Pause or resume frame requests, e.g. when the surface is hidden
    pub fn set_visible(&mut self, visible: bool) {
        if visible == self.visible {
            return;
        }
        self.visible = visible;

        if visible {
            // Time spent hidden must not show up as one huge step
            self.last_frame_time = self.host.now();
            self.ensure_running();
            tracing::debug!("Animation scheduler visible, frame clock reset");
        } else {
            if let Some(token) = self.pending_frame.take() {
                self.host.cancel_frame(token);
            }
            tracing::debug!("Animation scheduler hidden");
        }
    }

    /// Drop every channel and withdraw the outstanding frame
    pub fn shutdown(&mut self) {
        let owners: SmallVec<[OwnerId; 8]> = self.registry.owners().collect();
        for id in owners {
            self.registry.cancel_all(id, CancelMode::Silent);
        }
        self.stop_if_idle();
        tracing::debug!("Animation scheduler shut down");
    }

    fn ensure_running(&mut self) {
        if self.pending_frame.is_some() || !self.visible || self.registry.is_empty() {
            return;
        }
        self.last_frame_time = self.host.now();
        self.pending_frame = Some(self.host.request_frame());
        tracing::debug!("Animation scheduler running");
    }

    fn stop_if_idle(&mut self) {
        if !self.registry.is_empty() {
            return;
        }
        if let Some(token) = self.pending_frame.take() {
            self.host.cancel_frame(token);
            tracing::debug!("Animation scheduler idle");
        }
    }
}
