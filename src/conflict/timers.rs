//! Capital hold timers
//!
//! A broken primary capital gets one timer keyed by its state. Cancelling
//! is idempotent and renames move the handle, so a timer can neither be
//! lost nor fire twice.

use ahash::AHashMap;

use crate::conflict::war::WarId;
use crate::core::types::{NameKey, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldTimer {
    pub war: WarId,
    pub fires_at: Timestamp,
}

#[derive(Debug, Clone, Default)]
pub struct HoldTimers {
    timers: AHashMap<NameKey, HoldTimer>,
}

impl HoldTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) the timer for `state`
    pub fn schedule(&mut self, state: NameKey, war: WarId, fires_at: Timestamp) {
        self.timers.insert(state, HoldTimer { war, fires_at });
    }

    pub fn cancel(&mut self, state: &NameKey) -> Option<HoldTimer> {
        self.timers.remove(state)
    }

    /// Cancel every timer belonging to `war`
    pub fn cancel_war(&mut self, war: WarId) {
        self.timers.retain(|_, t| t.war != war);
    }

    pub fn get(&self, state: &NameKey) -> Option<&HoldTimer> {
        self.timers.get(state)
    }

    pub fn rekey(&mut self, old: &NameKey, new: NameKey) {
        if let Some(timer) = self.timers.remove(old) {
            self.timers.insert(new, timer);
        }
    }

    /// Remove and return every timer due at `now`, ordered by fire time
    pub fn take_due(&mut self, now: Timestamp) -> Vec<(NameKey, HoldTimer)> {
        let mut due: Vec<(NameKey, HoldTimer)> = self
            .timers
            .iter()
            .filter(|(_, t)| t.fires_at <= now)
            .map(|(k, t)| (k.clone(), *t))
            .collect();
        for (key, _) in &due {
            self.timers.remove(key);
        }
        due.sort_by(|a, b| a.1.fires_at.cmp(&b.1.fires_at).then_with(|| a.0.cmp(&b.0)));
        due
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_due_timers_fire_once() {
        let mut timers = HoldTimers::new();
        timers.schedule(NameKey::new("rome"), 1, 100);
        timers.schedule(NameKey::new("carthage"), 2, 500);
        assert!(timers.take_due(99).is_empty());
        let due = timers.take_due(100);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].0, NameKey::new("rome"));
        assert!(timers.take_due(200).is_empty());
        assert_eq!(timers.len(), 1);
    }

    #[test]
    fn test_cancel_is_idempotent_and_rekey_moves_handle() {
        let mut timers = HoldTimers::new();
        timers.schedule(NameKey::new("rome"), 1, 100);
        timers.rekey(&NameKey::new("rome"), NameKey::new("byzantium"));
        assert!(timers.cancel(&NameKey::new("rome")).is_none());
        assert!(timers.cancel(&NameKey::new("byzantium")).is_some());
        assert!(timers.cancel(&NameKey::new("byzantium")).is_none());
    }
}
