//! Channel registry
//!
//! Holds at most one [`Channel`] per (owner, property). Owners appear in the
//! registry only while they have running channels; the scheduler uses the
//! active count to decide whether it needs another frame.

use smallvec::SmallVec;

use crate::channel::{Channel, FrameStep};
use crate::owner::{FxIndexMap, OwnerId, StateBag};

/// How a cancelled channel reports its end
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelMode {
    /// The channel completed; callbacks see `finished = true`
    Finished,
    /// The channel was superseded or stopped early; callbacks see `finished = false`
    Interrupted,
    /// Drop the channel without firing its callback
    Silent,
}

impl CancelMode {
    pub fn notifies(self) -> bool {
        self != CancelMode::Silent
    }

    pub fn finished(self) -> bool {
        self == CancelMode::Finished
    }
}

/// All running channels, grouped by owner
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    groups: FxIndexMap<OwnerId, FxIndexMap<String, Channel>>,
    active: usize,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of running channels across all owners
    pub fn active_count(&self) -> usize {
        self.active
    }

    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    /// Owners with at least one running channel
    pub fn owners(&self) -> impl Iterator<Item = OwnerId> + '_ {
        self.groups.keys().copied()
    }

    /// Properties of `owner` with running channels
    pub fn properties(&self, owner: OwnerId) -> impl Iterator<Item = &str> {
        self.groups
            .get(&owner)
            .into_iter()
            .flat_map(|group| group.keys().map(String::as_str))
    }

    pub fn get(&self, owner: OwnerId, property: &str) -> Option<&Channel> {
        self.groups.get(&owner)?.get(property)
    }

    pub fn get_mut(&mut self, owner: OwnerId, property: &str) -> Option<&mut Channel> {
        self.groups.get_mut(&owner)?.get_mut(property)
    }

    /// Insert a channel. A channel already running for the same property is
    /// interrupted first.
    ///
    /// Returns `true` when this took the registry from empty to non-empty.
    pub fn register(
        &mut self,
        owner: OwnerId,
        property: impl Into<String>,
        channel: Channel,
    ) -> bool {
        let property = property.into();
        self.cancel(owner, &property, CancelMode::Interrupted);

        let was_empty = self.active == 0;
        self.groups.entry(owner).or_default().insert(property, channel);
        self.active += 1;
        was_empty
    }

    /// Remove a channel, firing its callback according to `mode`
    ///
    /// Cancelling a property with no channel does nothing.
    pub fn cancel(&mut self, owner: OwnerId, property: &str, mode: CancelMode) -> Option<Channel> {
        let group = self.groups.get_mut(&owner)?;
        let mut channel = group.shift_remove(property)?;
        if group.is_empty() {
            self.groups.shift_remove(&owner);
        }
        self.active -= 1;
        tracing::trace!("Channel {:?}.{} removed ({:?})", owner, property, mode);

        if mode.notifies() {
            channel.notify_end(mode.finished());
        } else {
            channel.discard_callback();
        }
        Some(channel)
    }

    /// Remove every channel of `owner`
    pub fn cancel_all(&mut self, owner: OwnerId, mode: CancelMode) -> Vec<(String, Channel)> {
        let Some(group) = self.groups.shift_remove(&owner) else {
            return Vec::new();
        };
        self.active -= group.len();

        group
            .into_iter()
            .map(|(property, mut channel)| {
                if mode.notifies() {
                    channel.notify_end(mode.finished());
                } else {
                    channel.discard_callback();
                }
                (property, channel)
            })
            .collect()
    }

    /// Advance every channel of `owner` by one frame, writing new values into
    /// `state`. Returns the properties whose channels finished.
    pub fn advance_owner(
        &mut self,
        owner: OwnerId,
        step: FrameStep,
        state: &mut StateBag,
    ) -> SmallVec<[String; 4]> {
        let mut finished = SmallVec::new();
        let Some(group) = self.groups.get_mut(&owner) else {
            return finished;
        };

        for (property, channel) in group.iter_mut() {
            let next = channel.advance(step);
            state.set(property.as_str(), next.value);
            if next.finished {
                finished.push(property.clone());
            }
        }
        finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{AnimationEnd, ChannelState, Driver};
    use slotmap::SlotMap;
    use std::cell::RefCell;
    use std::rc::Rc;

    type EndLog = Rc<RefCell<Vec<(&'static str, bool)>>>;

    fn owners(n: usize) -> Vec<OwnerId> {
        let mut map: SlotMap<OwnerId, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    fn logged(tag: &'static str, log: &EndLog, value: f64) -> Channel {
        let log = log.clone();
        Channel::new(ChannelState::at(value).with_target(value), Driver::Direct)
            .with_on_end(Some(Box::new(move |end: AnimationEnd| {
                log.borrow_mut().push((tag, end.finished));
            })))
    }

    #[test]
    fn test_register_replaces_and_interrupts() {
        let owner = owners(1)[0];
        let log = EndLog::default();
        let mut registry = ChannelRegistry::new();

        assert!(registry.register(owner, "x", logged("first", &log, 1.0)));
        assert!(!registry.register(owner, "x", logged("second", &log, 2.0)));

        assert_eq!(registry.active_count(), 1);
        assert_eq!(registry.get(owner, "x").map(Channel::value), Some(2.0));
        assert_eq!(*log.borrow(), vec![("first", false)]);
    }

    #[test]
    fn test_cancel_modes() {
        let owner = owners(1)[0];
        let log = EndLog::default();
        let mut registry = ChannelRegistry::new();

        registry.register(owner, "a", logged("a", &log, 0.0));
        registry.register(owner, "b", logged("b", &log, 0.0));
        registry.register(owner, "c", logged("c", &log, 0.0));

        assert!(registry.cancel(owner, "a", CancelMode::Finished).is_some());
        assert!(registry.cancel(owner, "b", CancelMode::Interrupted).is_some());
        assert!(registry.cancel(owner, "c", CancelMode::Silent).is_some());

        assert_eq!(*log.borrow(), vec![("a", true), ("b", false)]);
        assert!(registry.is_empty());
        assert_eq!(registry.owners().count(), 0);
    }

    #[test]
    fn test_double_cancel_is_noop() {
        let owner = owners(1)[0];
        let log = EndLog::default();
        let mut registry = ChannelRegistry::new();

        registry.register(owner, "x", logged("x", &log, 0.0));
        assert!(registry.cancel(owner, "x", CancelMode::Interrupted).is_some());
        assert!(registry.cancel(owner, "x", CancelMode::Interrupted).is_none());
        assert!(registry.cancel(owner, "missing", CancelMode::Finished).is_none());

        assert_eq!(log.borrow().len(), 1);
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn test_cancel_all_only_touches_one_owner() {
        let ids = owners(2);
        let log = EndLog::default();
        let mut registry = ChannelRegistry::new();

        registry.register(ids[0], "x", logged("x0", &log, 0.0));
        registry.register(ids[0], "y", logged("y0", &log, 0.0));
        registry.register(ids[1], "x", logged("x1", &log, 0.0));

        let removed = registry.cancel_all(ids[0], CancelMode::Silent);
        assert_eq!(removed.len(), 2);
        assert!(log.borrow().is_empty());
        assert_eq!(registry.active_count(), 1);
        assert_eq!(registry.owners().collect::<Vec<_>>(), vec![ids[1]]);
        assert_eq!(registry.properties(ids[1]).collect::<Vec<_>>(), vec!["x"]);
    }

    #[test]
    fn test_advance_owner_writes_state() {
        let owner = owners(1)[0];
        let log = EndLog::default();
        let mut registry = ChannelRegistry::new();
        let mut state = StateBag::new();

        registry.register(owner, "x", logged("x", &log, 4.0));
        let finished = registry.advance_owner(owner, FrameStep { dt: 0.1, now: 0.1 }, &mut state);

        assert!(finished.is_empty());
        assert_eq!(state.get("x"), Some(4.0));
    }
}
