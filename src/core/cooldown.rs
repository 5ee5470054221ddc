//! Monotonic cooldown tracking keyed by entity

use std::hash::Hash;

use ahash::AHashMap;

use crate::core::types::Timestamp;

/// Tracks until when each key is on cooldown.
///
/// Starting a cooldown never shortens one already running.
#[derive(Debug, Clone, PartialEq)]
pub struct CooldownMap<K: Eq + Hash> {
    until: AHashMap<K, Timestamp>,
}

impl<K: Eq + Hash> Default for CooldownMap<K> {
    fn default() -> Self {
        Self {
            until: AHashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone + Ord> CooldownMap<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Milliseconds left on `key`'s cooldown, or `None` if it has elapsed
    pub fn remaining(&self, key: &K, now: Timestamp) -> Option<Timestamp> {
        match self.until.get(key) {
            Some(&until) if until > now => Some(until - now),
            _ => None,
        }
    }

    pub fn is_active(&self, key: &K, now: Timestamp) -> bool {
        self.remaining(key, now).is_some()
    }

    /// Put `key` on cooldown for `duration` starting at `now`
    pub fn start(&mut self, key: K, now: Timestamp, duration: Timestamp) {
        let until = now.saturating_add(duration);
        let entry = self.until.entry(key).or_insert(until);
        *entry = (*entry).max(until);
    }

    pub fn clear(&mut self, key: &K) {
        self.until.remove(key);
    }

    /// Move an entry to a new key (renames)
    pub fn rekey(&mut self, old: &K, new: K) {
        if let Some(until) = self.until.remove(old) {
            self.until.insert(new, until);
        }
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) {
        self.until.retain(|k, _| keep(k));
    }

    /// Drop entries that have already elapsed
    pub fn prune(&mut self, now: Timestamp) {
        self.until.retain(|_, until| *until > now);
    }

    /// Entries sorted by key, for snapshots
    pub fn entries(&self) -> Vec<(K, Timestamp)> {
        let mut entries: Vec<(K, Timestamp)> =
            self.until.iter().map(|(k, v)| (k.clone(), *v)).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (K, Timestamp)>) -> Self {
        Self {
            until: entries.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.until.len()
    }

    pub fn is_empty(&self) -> bool {
        self.until.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_elapses() {
        let mut cd: CooldownMap<u32> = CooldownMap::new();
        cd.start(1, 1_000, 500);
        assert_eq!(cd.remaining(&1, 1_200), Some(300));
        assert!(cd.is_active(&1, 1_499));
        assert!(!cd.is_active(&1, 1_500));
        assert!(!cd.is_active(&2, 0));
    }

    #[test]
    fn test_cooldown_never_shortens() {
        let mut cd: CooldownMap<u32> = CooldownMap::new();
        cd.start(1, 0, 10_000);
        cd.start(1, 100, 50);
        assert_eq!(cd.remaining(&1, 100), Some(9_900));
    }

    #[test]
    fn test_rekey_moves_entry() {
        let mut cd: CooldownMap<String> = CooldownMap::new();
        cd.start("old".into(), 0, 100);
        cd.rekey(&"old".into(), "new".into());
        assert!(!cd.is_active(&"old".into(), 10));
        assert!(cd.is_active(&"new".into(), 10));
    }
}
