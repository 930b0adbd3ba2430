//! Animation owners
//!
//! An owner is whatever renders animated properties: a widget, a sprite, a
//! test recorder. The scheduler keeps each owner's property values in a
//! [`StateBag`] and hands it to the owner's render hook once per frame.

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use slotmap::new_key_type;

new_key_type! {
    /// Handle to an owner registered with the scheduler
    pub struct OwnerId;
}

pub(crate) type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Property name to current value, in insertion order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StateBag {
    values: FxIndexMap<String, f64>,
}

impl StateBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, property: &str) -> Option<f64> {
        self.values.get(property).copied()
    }

    /// Set a property, returning the previous value
    pub fn set(&mut self, property: impl Into<String>, value: f64) -> Option<f64> {
        self.values.insert(property.into(), value)
    }

    pub fn contains(&self, property: &str) -> bool {
        self.values.contains_key(property)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for StateBag {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut bag = Self::new();
        bag.extend(iter);
        bag
    }
}

impl<K: Into<String>> Extend<(K, f64)> for StateBag {
    fn extend<I: IntoIterator<Item = (K, f64)>>(&mut self, iter: I) {
        for (property, value) in iter {
            self.set(property, value);
        }
    }
}

/// Something whose properties are animated
pub trait AnimationOwner {
    /// Property values before any animation runs
    fn initial_state(&mut self) -> StateBag;

    /// Render the current property values
    fn perform_animation(&mut self, state: &StateBag);

    /// A property's channel ended, either completing or being superseded
    fn on_animation_end(&mut self, _property: &str, _finished: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_bag_keeps_insertion_order() {
        let mut bag: StateBag = [("y", 2.0), ("x", 1.0)].into_iter().collect();
        assert_eq!(bag.set("y", 3.0), Some(2.0));
        bag.set("opacity", 0.5);

        let entries: Vec<_> = bag.iter().collect();
        assert_eq!(entries, vec![("y", 3.0), ("x", 1.0), ("opacity", 0.5)]);
        assert_eq!(bag.get("x"), Some(1.0));
        assert_eq!(bag.get("z"), None);
        assert!(bag.contains("opacity"));
        assert_eq!(bag.len(), 3);
    }
}
