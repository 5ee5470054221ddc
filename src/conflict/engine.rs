//! Conflict engine - owns wars, condemnations, pending civil wars and the
//! timers that drive them
//!
//! Every mutating entry point takes the territory store explicitly and
//! returns a closed outcome enum. Nothing is consumed or moved until every
//! precondition has been checked.

use std::collections::BTreeMap;

use ahash::AHashMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::conflict::resolution::{EndReason, WarResolution};
use crate::conflict::timers::HoldTimers;
use crate::conflict::war::{Condemnation, PendingCivilWar, War, WarId};
use crate::core::config::FrontierConfig;
use crate::core::cooldown::CooldownMap;
use crate::core::types::{secs, vars, CampKey, NameKey, Timestamp, Vars};
use crate::ports::Ports;
use crate::requests::RequestBroker;
use crate::territory::store::TerritoryStore;

/// Cooldowns owned by the conflict layer, all per state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConflictCooldowns {
    pub condemn: CooldownMap<NameKey>,
    pub declare: CooldownMap<NameKey>,
    pub emergency_move: CooldownMap<NameKey>,
}

impl ConflictCooldowns {
    fn rekey(&mut self, old: &NameKey, new: NameKey) {
        self.condemn.rekey(old, new.clone());
        self.declare.rekey(old, new.clone());
        self.emergency_move.rekey(old, new);
    }

    fn clear(&mut self, state: &NameKey) {
        self.condemn.clear(state);
        self.declare.clear(state);
        self.emergency_move.clear(state);
    }
}

/// Surrender offers: recipient state, offering state, war
pub type SurrenderBroker = RequestBroker<NameKey, NameKey, WarId>;

/// What one conflict tick did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConflictTick {
    pub resolved: Vec<WarResolution>,
    pub raids: u32,
}

#[derive(Debug)]
pub struct ConflictEngine {
    pub(crate) wars: BTreeMap<WarId, War>,
    /// Keyed by the condemning state; a state condemns at most one target
    pub(crate) condemnations: AHashMap<NameKey, Condemnation>,
    /// Keyed by the rebel state
    pub(crate) civil_wars: AHashMap<NameKey, PendingCivilWar>,
    pub(crate) cooldowns: ConflictCooldowns,
    pub(crate) hold_timers: HoldTimers,
    pub(crate) surrenders: SurrenderBroker,
    pub(crate) next_war_id: WarId,
    pub(crate) rng: ChaCha8Rng,
}

impl ConflictEngine {
    pub fn new(config: &FrontierConfig) -> Self {
        Self {
            wars: BTreeMap::new(),
            condemnations: AHashMap::new(),
            civil_wars: AHashMap::new(),
            cooldowns: ConflictCooldowns::default(),
            hold_timers: HoldTimers::new(),
            surrenders: RequestBroker::new(secs(config.war.surrender_timeout_secs)),
            next_war_id: 1,
            rng: ChaCha8Rng::seed_from_u64(config.raids.seed),
        }
    }

    pub(crate) fn allocate_war_id(&mut self) -> WarId {
        let id = self.next_war_id;
        self.next_war_id += 1;
        id
    }

    // === QUERIES ===

    pub fn war(&self, id: WarId) -> Option<&War> {
        self.wars.get(&id)
    }

    pub fn wars(&self) -> impl Iterator<Item = &War> {
        self.wars.values()
    }

    pub fn war_count(&self) -> usize {
        self.wars.len()
    }

    /// The war `state` fights in, on either side
    pub fn war_of(&self, state: &NameKey) -> Option<&War> {
        self.wars.values().find(|w| w.involves(state))
    }

    pub fn war_between(&self, a: &NameKey, b: &NameKey) -> Option<&War> {
        self.wars.values().find(|w| w.is_between(a, b))
    }

    pub fn is_at_war(&self, state: &NameKey) -> bool {
        self.war_of(state).is_some()
    }

    /// True if `a` and `b` are on opposite sides of some war
    pub fn are_enemies(&self, a: &NameKey, b: &NameKey) -> bool {
        self.wars.values().any(|w| w.are_enemies(a, b))
    }

    pub fn condemnation_by(&self, state: &NameKey) -> Option<&Condemnation> {
        self.condemnations.get(state)
    }

    /// The pending civil war `state` takes part in, as origin or rebel
    pub fn civil_war_for(&self, state: &NameKey) -> Option<&PendingCivilWar> {
        self.civil_wars.values().find(|c| c.involves(state))
    }

    pub fn cooldowns(&self) -> &ConflictCooldowns {
        &self.cooldowns
    }

    pub fn hold_timers(&self) -> &HoldTimers {
        &self.hold_timers
    }

    pub fn next_war_id(&self) -> WarId {
        self.next_war_id
    }

    // === LIFECYCLE HOOKS ===

    /// Re-key every reference to a renamed state
    pub fn rename_state(&mut self, old: &NameKey, new: &NameKey) {
        for war in self.wars.values_mut() {
            war.rekey(old, new);
        }
        if let Some(mut condemnation) = self.condemnations.remove(old) {
            condemnation.attacker = new.clone();
            self.condemnations.insert(new.clone(), condemnation);
        }
        for condemnation in self.condemnations.values_mut() {
            if &condemnation.target == old {
                condemnation.target = new.clone();
            }
        }
        if let Some(mut civil) = self.civil_wars.remove(old) {
            civil.rebel = new.clone();
            self.civil_wars.insert(new.clone(), civil);
        }
        for civil in self.civil_wars.values_mut() {
            if &civil.origin == old {
                civil.origin = new.clone();
            }
        }
        self.cooldowns.rekey(old, new.clone());
        self.hold_timers.rekey(old, new.clone());
        self.surrenders.rekey_recipient(old, new.clone());
        self.surrenders.rekey_sender(old, new.clone());
    }

    /// Drop everything referencing a deleted state. Wars where it was a
    /// primary party end without transfers or rewards.
    pub fn remove_state(&mut self, state: &NameKey, store: &TerritoryStore, now: Timestamp, ports: &mut Ports) -> Vec<WarResolution> {
        let primary_wars: Vec<WarId> = self
            .wars
            .values()
            .filter(|w| w.is_primary(state))
            .map(|w| w.id)
            .collect();
        let mut ended = Vec::new();
        for id in primary_wars {
            if let Some(resolution) = self.cancel_war(id, EndReason::StateRemoved, store, now, ports) {
                ended.push(resolution);
            }
        }
        for war in self.wars.values_mut() {
            war.attacker_side.remove(state);
            war.defender_side.remove(state);
            war.emergency_move_used.remove(state);
            war.capital_broken_at.remove(state);
        }
        self.condemnations.remove(state);
        self.condemnations.retain(|_, c| &c.target != state);
        self.civil_wars.retain(|_, c| !c.involves(state));
        self.cooldowns.clear(state);
        self.hold_timers.cancel(state);
        self.surrenders.cancel_to(state);
        self.surrenders.cancel_from(state);
        ended
    }

    /// End a war with no winner, no transfers and no rewards
    pub fn cancel_war(
        &mut self,
        id: WarId,
        reason: EndReason,
        store: &TerritoryStore,
        _now: Timestamp,
        ports: &mut Ports,
    ) -> Option<WarResolution> {
        let war = self.wars.remove(&id)?;
        self.hold_timers.cancel_war(id);
        self.surrenders.cancel_where(|r| r.payload == id);
        info!(war = id, attacker = %war.attacker, defender = %war.defender, ?reason, "war cancelled");
        let message_vars = vars([
            ("attacker", display_state(store, &war.attacker)),
            ("defender", display_state(store, &war.defender)),
        ]);
        notify_states(store, ports, war.participants(), "war.cancelled", &message_vars);
        Some(WarResolution {
            war_id: id,
            winner: None,
            loser: None,
            reason,
            transfers: Vec::new(),
            reward_per_state: 0.0,
            loot_total: 0.0,
        })
    }

    /// Administrative stop: the war simply ends
    pub fn admin_stop_war(&mut self, id: WarId, store: &TerritoryStore, now: Timestamp, ports: &mut Ports) -> Option<WarResolution> {
        self.cancel_war(id, EndReason::AdminStop, store, now, ports)
    }

    // === TICK ===

    /// Fire due hold timers, send raider waves and sweep stale offers
    pub fn tick(&mut self, store: &mut TerritoryStore, now: Timestamp, config: &FrontierConfig, ports: &mut Ports) -> ConflictTick {
        let mut report = ConflictTick::default();
        for (state, timer) in self.hold_timers.take_due(now) {
            if let Some(resolution) = self.fire_hold_timer(store, &state, timer.war, now, config, ports) {
                report.resolved.push(resolution);
            }
        }
        report.raids = self.spawn_raids(store, now, config, ports);
        let swept = self.surrenders.sweep(now);
        if swept > 0 {
            debug!(swept, "expired surrender offers removed");
        }
        report
    }

    /// Hold timer expiry: if the capital is still broken its war is lost
    fn fire_hold_timer(
        &mut self,
        store: &mut TerritoryStore,
        state: &NameKey,
        war_id: WarId,
        now: Timestamp,
        config: &FrontierConfig,
        ports: &mut Ports,
    ) -> Option<WarResolution> {
        let war = self.wars.get(&war_id)?;
        let side = war.side_of(state)?;
        let still_broken = war.capital_broken_at.contains_key(state) && capital_is_broken(store, state);
        if !still_broken {
            if let Some(war) = self.wars.get_mut(&war_id) {
                war.capital_broken_at.remove(state);
            }
            return None;
        }
        info!(war = war_id, %state, "capital hold timer fired");
        self.end_war(store, war_id, side.opposite(), EndReason::CapitalHeld, now, config, ports)
    }

    /// Rebuild hold timers from the persisted capital-broken timestamps
    pub fn rebuild_hold_timers(&mut self, config: &FrontierConfig) {
        self.hold_timers = HoldTimers::new();
        let hold = secs(config.war.capital_hold_secs);
        for war in self.wars.values() {
            for (state, broken_at) in &war.capital_broken_at {
                if war.is_primary(state) {
                    self.hold_timers.schedule(state.clone(), war.id, broken_at.saturating_add(hold));
                }
            }
        }
    }
}

/// True if `state`'s capital camp is currently broken
pub(crate) fn capital_is_broken(store: &TerritoryStore, state: &NameKey) -> bool {
    let Some(capital) = store.state(state).and_then(|s| s.capital_key()) else {
        return false;
    };
    store
        .camp(&CampKey::from_keys(state.clone(), capital))
        .map_or(false, |c| c.is_broken())
}

pub(crate) fn display_state(store: &TerritoryStore, key: &NameKey) -> String {
    store.state(key).map_or_else(|| key.to_string(), |s| s.name.clone())
}

/// Send a message to every member of each listed state
pub(crate) fn notify_states<'a>(
    store: &TerritoryStore,
    ports: &mut Ports,
    states: impl IntoIterator<Item = &'a NameKey>,
    key: &str,
    vars: &Vars,
) {
    for state in states {
        if let Some(found) = store.state(state) {
            ports.notify_all(&found.members, key, vars);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::resolution::EndReason;
    use crate::conflict::testing::{arena, key};

    #[test]
    fn test_hold_timer_resolves_war_for_other_side() {
        let mut a = arena();
        a.start_war();
        a.break_camp("rome", "farms", "carthage", 650_000);
        a.break_camp("rome", "forum", "carthage", 700_000);

        let early = a.engine.tick(&mut a.store, 1_599_999, &a.config, &mut a.ports);
        assert!(early.resolved.is_empty());

        let report = a.engine.tick(&mut a.store, 1_600_000, &a.config, &mut a.ports);
        assert_eq!(report.resolved.len(), 1);
        let resolution = &report.resolved[0];
        assert_eq!(resolution.winner, Some(key("carthage")));
        assert_eq!(resolution.reason, EndReason::CapitalHeld);
        assert!(a.store.camp(&CampKey::new("carthage", "farms")).is_some());
        assert!(a.store.state(&key("rome")).unwrap().sectors.contains_key(&key("forum")));
        assert_eq!(a.engine.war_count(), 0);
    }

    #[test]
    fn test_hold_timer_ignored_after_recovery() {
        let mut a = arena();
        a.start_war();
        a.break_camp("rome", "forum", "carthage", 700_000);
        a.store
            .camp_mut(&CampKey::new("rome", "forum"))
            .unwrap()
            .repair(1e9, 0.5);
        let report = a.engine.tick(&mut a.store, 1_600_000, &a.config, &mut a.ports);
        assert!(report.resolved.is_empty());
        assert_eq!(a.engine.war_count(), 1);
        assert!(a.engine.war_of(&key("rome")).unwrap().capital_broken_at.is_empty());
    }

    #[test]
    fn test_rename_rekeys_war_and_timer() {
        let mut a = arena();
        a.start_war();
        a.break_camp("rome", "forum", "carthage", 700_000);
        let new_key = a.store.rename_state(&key("rome"), "Byzantium").unwrap();
        a.engine.rename_state(&key("rome"), &new_key);

        assert!(a.engine.war_between(&key("byzantium"), &key("carthage")).is_some());
        assert!(a.engine.hold_timers().get(&key("byzantium")).is_some());
        assert!(a.engine.cooldowns().declare.is_active(&key("byzantium"), 700_000));
        let report = a.engine.tick(&mut a.store, 1_600_000, &a.config, &mut a.ports);
        assert_eq!(report.resolved.len(), 1);
    }

    #[test]
    fn test_removed_primary_cancels_war() {
        let mut a = arena();
        a.start_war();
        let ended = a.engine.remove_state(&key("carthage"), &a.store, 700_000, &mut a.ports);
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].reason, EndReason::StateRemoved);
        assert!(!a.engine.is_at_war(&key("rome")));
    }

    #[test]
    fn test_rebuilt_timers_match_broken_capitals() {
        let mut a = arena();
        a.start_war();
        a.break_camp("carthage", "byrsa", "rome", 700_000);
        let before = *a.engine.hold_timers().get(&key("carthage")).unwrap();
        a.engine.rebuild_hold_timers(&a.config);
        assert_eq!(a.engine.hold_timers().get(&key("carthage")), Some(&before));
    }
}
