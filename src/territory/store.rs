//! Territory store - the source of truth for state, sector and camp existence
//!
//! States own their sectors directly; camps live in a separate arena keyed
//! by `(state, sector)`. Renames are always "remove old key, insert new
//! key", never pointer rewrites.

use ahash::AHashMap;
use tracing::{debug, info};

use crate::core::config::{PlacementConfig, StateConfig};
use crate::core::cooldown::CooldownMap;
use crate::core::types::{ActorId, CampKey, Location, NameKey};
use crate::ports::WorldPort;
use crate::territory::boundary::{compute_boundary, Neighbor, Rect};
use crate::territory::camp::Camp;
use crate::territory::placement::{PendingPlacement, PlacementKind};
use crate::territory::state::{Role, State};

/// Cooldowns owned by the territory layer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerritoryCooldowns {
    /// Per actor, between foundings
    pub founding: CooldownMap<ActorId>,
    /// Per state, between sector additions
    pub sector_add: CooldownMap<NameKey>,
    /// Per sector, between relocations
    pub sector_move: CooldownMap<CampKey>,
    /// Per state, between peacetime capital moves
    pub capital_move: CooldownMap<NameKey>,
}

/// Why a name cannot be used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameError {
    Invalid,
    Reserved,
    Taken,
}

/// Result of removing a member from a state
#[derive(Debug, Clone, PartialEq)]
pub enum MemberRemoval {
    NotMember,
    Removed,
    /// The captain left; `successor` now leads the state
    CaptainReplaced { successor: ActorId },
    /// The last member left and the state was deleted
    StateDeleted(Box<State>),
}

/// Why a sector could not change hands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferError {
    StateNotFound,
    SectorNotFound,
    SameState,
    IsCapital,
    InTransit,
}

/// Where a transferred sector ended up
#[derive(Debug, Clone, PartialEq)]
pub struct TransferResult {
    pub from: CampKey,
    pub to: CampKey,
    /// Final display name (suffixed if the original collided)
    pub sector_name: String,
}

#[derive(Debug, Default)]
pub struct TerritoryStore {
    pub(crate) states: AHashMap<NameKey, State>,
    pub(crate) camps: AHashMap<CampKey, Camp>,
    pub(crate) membership: AHashMap<ActorId, NameKey>,
    /// Names held by foundings whose first camp is not placed yet
    pub(crate) reserved: AHashMap<NameKey, ActorId>,
    pub(crate) pending: AHashMap<ActorId, PendingPlacement>,
    pub(crate) cooldowns: TerritoryCooldowns,
    dirty: bool,
}

impl TerritoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty() && self.camps.is_empty() && self.pending.is_empty() && self.reserved.is_empty()
    }

    // === DIRTY TRACKING ===

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Read and clear the dirty flag (the persistence layer calls this)
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    // === LOOKUPS ===

    pub fn state(&self, key: &NameKey) -> Option<&State> {
        self.states.get(key)
    }

    pub fn state_mut(&mut self, key: &NameKey) -> Option<&mut State> {
        self.states.get_mut(key)
    }

    pub fn state_by_name(&self, name: &str) -> Option<&State> {
        self.states.get(&NameKey::new(name))
    }

    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.states.values()
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn state_keys_sorted(&self) -> Vec<NameKey> {
        let mut keys: Vec<NameKey> = self.states.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// The state an actor belongs to
    pub fn state_of(&self, actor: ActorId) -> Option<&NameKey> {
        self.membership.get(&actor)
    }

    pub fn state_for(&self, actor: ActorId) -> Option<&State> {
        self.membership.get(&actor).and_then(|k| self.states.get(k))
    }

    pub fn role(&self, actor: ActorId, state: &NameKey) -> Role {
        self.states.get(state).map_or(Role::None, |s| s.role_of(actor))
    }

    pub fn camp(&self, key: &CampKey) -> Option<&Camp> {
        self.camps.get(key)
    }

    pub fn camp_mut(&mut self, key: &CampKey) -> Option<&mut Camp> {
        self.camps.get_mut(key)
    }

    pub fn camp_count(&self) -> usize {
        self.camps.len()
    }

    /// Snapshot of camp keys in a stable order; ticks iterate this instead
    /// of the live map
    pub fn camp_keys_sorted(&self) -> Vec<CampKey> {
        let mut keys: Vec<CampKey> = self.camps.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn sector_location(&self, key: &CampKey) -> Option<&Location> {
        self.states
            .get(&key.state)
            .and_then(|s| s.sectors.get(&key.sector))
            .and_then(|sec| sec.location.as_ref())
    }

    /// Display names `(state, sector)` for a camp key
    pub fn display_names(&self, key: &CampKey) -> (String, String) {
        self.states
            .get(&key.state)
            .and_then(|s| s.sectors.get(&key.sector).map(|sec| (s.name.clone(), sec.name.clone())))
            .unwrap_or_else(|| (key.state.to_string(), key.sector.to_string()))
    }

    pub fn pending_placement(&self, actor: ActorId) -> Option<&PendingPlacement> {
        self.pending.get(&actor)
    }

    /// Pending placements that will add a sector to `state`
    pub fn pending_sectors_for(&self, state: &NameKey) -> usize {
        self.pending
            .values()
            .filter(|p| matches!(&p.kind, PlacementKind::NewSector { state: s, .. } if s == state))
            .count()
    }

    /// Boundaries of every located camp
    pub fn claimed_rects(&self) -> Vec<(CampKey, Rect)> {
        let mut out = Vec::new();
        for key in self.camp_keys_sorted() {
            if let (Some(camp), Some(location)) = (self.camps.get(&key), self.sector_location(&key)) {
                out.push((key.clone(), camp.boundary.rect_at(location)));
            }
        }
        out
    }

    /// The camp whose boundary contains `location`
    pub fn camp_at(&self, location: &Location) -> Option<CampKey> {
        self.claimed_rects()
            .into_iter()
            .find(|(_, rect)| rect.contains(location))
            .map(|(key, _)| key)
    }

    // === NAMES ===

    /// Name shape check shared by states and sectors
    pub fn check_name(name: &str, config: &StateConfig) -> Result<(), NameError> {
        let trimmed = name.trim();
        let valid_chars = trimmed.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if trimmed.is_empty() || trimmed.len() > config.max_name_length || !valid_chars {
            return Err(NameError::Invalid);
        }
        if config.reserved_names.iter().any(|r| NameKey::new(r) == NameKey::new(trimmed)) {
            return Err(NameError::Reserved);
        }
        Ok(())
    }

    /// True if no state exists and no founding has reserved this name
    pub fn state_name_free(&self, key: &NameKey) -> bool {
        !self.states.contains_key(key) && !self.reserved.contains_key(key)
    }

    /// First free sector name in `state`: `base`, then `base-2`, `base-3`, ...
    pub fn unique_sector_name(&self, state: &NameKey, base: &str) -> String {
        let Some(target) = self.states.get(state) else {
            return base.to_string();
        };
        if !target.sectors.contains_key(&NameKey::new(base)) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{}-{}", base, n))
            .find(|candidate| !target.sectors.contains_key(&NameKey::new(candidate)))
            .unwrap_or_else(|| base.to_string())
    }

    // === INSERTION ===

    /// Insert a state and index its members
    pub fn insert_state(&mut self, state: State) {
        let key = state.key();
        for member in &state.members {
            self.membership.insert(*member, key.clone());
        }
        self.states.insert(key, state);
    }

    pub fn insert_camp(&mut self, key: CampKey, camp: Camp) {
        self.camps.insert(key, camp);
    }

    /// Recompute a camp's boundary from its radius and its neighbors
    pub fn refresh_boundary(&mut self, key: &CampKey, config: &PlacementConfig) {
        let Some(anchor) = self.sector_location(key).cloned() else {
            return;
        };
        let Some(radius) = self.camps.get(key).map(|c| c.stats.radius) else {
            return;
        };
        let neighbors: Vec<Neighbor> = self
            .claimed_rects()
            .into_iter()
            .filter(|(other, _)| other != key)
            .map(|(other, rect)| Neighbor {
                same_state: other.state == key.state,
                rect,
            })
            .collect();
        let boundary = compute_boundary(&anchor, radius, &neighbors, config.min_state_gap);
        if let Some(camp) = self.camps.get_mut(key) {
            camp.boundary = boundary;
        }
    }

    // === MEMBERSHIP ===

    /// Add `actor` to `state`; fails if they already belong somewhere
    pub fn add_member(&mut self, state: &NameKey, actor: ActorId) -> bool {
        if self.membership.contains_key(&actor) {
            return false;
        }
        let Some(target) = self.states.get_mut(state) else {
            return false;
        };
        target.members.insert(actor);
        self.membership.insert(actor, state.clone());
        self.dirty = true;
        true
    }

    /// Remove `actor` from `state`, promoting a successor when the captain
    /// leaves and deleting the state when nobody is left
    pub fn remove_member(&mut self, state: &NameKey, actor: ActorId, world: &mut dyn WorldPort) -> MemberRemoval {
        let Some(target) = self.states.get_mut(state) else {
            return MemberRemoval::NotMember;
        };
        if !target.members.contains(&actor) {
            return MemberRemoval::NotMember;
        }
        self.dirty = true;

        if target.members.len() == 1 {
            return match self.remove_state(state, world) {
                Some(removed) => MemberRemoval::StateDeleted(Box::new(removed)),
                None => MemberRemoval::NotMember,
            };
        }

        let was_captain = target.captain == actor;
        let successor = if was_captain { target.successor() } else { None };
        target.members.remove(&actor);
        for sector in target.sectors.values_mut() {
            if sector.governor == Some(actor) {
                sector.governor = None;
            }
        }
        self.membership.remove(&actor);

        let removal = match successor {
            Some(successor) => {
                target.captain = successor;
                // a captain is never also a governor
                for sector in target.sectors.values_mut() {
                    if sector.governor == Some(successor) {
                        sector.governor = None;
                    }
                }
                info!(state = %target.name, %successor, "captain replaced");
                MemberRemoval::CaptainReplaced { successor }
            }
            None => MemberRemoval::Removed,
        };
        let captain = target.captain;
        self.release_pending(actor, state, captain);
        removal
    }

    /// A departing member's pending placement for `state` does not leave
    /// with them: new sectors are dropped, a relocation goes to the captain.
    fn release_pending(&mut self, actor: ActorId, state: &NameKey, captain: ActorId) {
        let belongs = self.pending.get(&actor).map_or(false, |p| &p.state_key() == state);
        if !belongs {
            return;
        }
        let Some(mut pending) = self.pending.remove(&actor) else {
            return;
        };
        if matches!(pending.kind, PlacementKind::Relocation { .. }) && !self.pending.contains_key(&captain) {
            pending.actor = captain;
            self.pending.insert(captain, pending);
        }
    }

    /// Whether someone holds the pending placement that will re-anchor `key`
    pub fn relocation_pending(&self, key: &CampKey) -> bool {
        self.pending.values().any(|p| {
            matches!(&p.kind, PlacementKind::Relocation { state, sector } if state == &key.state && sector == &key.sector)
        })
    }

    /// Hand the captaincy to another member
    pub fn set_captain(&mut self, state: &NameKey, new_captain: ActorId) -> bool {
        let Some(target) = self.states.get_mut(state) else {
            return false;
        };
        if !target.members.contains(&new_captain) {
            return false;
        }
        target.captain = new_captain;
        for sector in target.sectors.values_mut() {
            if sector.governor == Some(new_captain) {
                sector.governor = None;
            }
        }
        self.dirty = true;
        true
    }

    // === RENAMES ===

    /// Re-key a state and everything that indexes it by name
    pub fn rename_state(&mut self, old: &NameKey, new_name: &str) -> Result<NameKey, NameError> {
        let new_key = NameKey::new(new_name);
        if &new_key != old && !self.state_name_free(&new_key) {
            return Err(NameError::Taken);
        }
        let Some(mut state) = self.states.remove(old) else {
            return Err(NameError::Invalid);
        };
        state.name = new_name.trim().to_string();

        for member in &state.members {
            self.membership.insert(*member, new_key.clone());
        }
        let old_camp_keys: Vec<CampKey> = self.camps.keys().filter(|k| &k.state == old).cloned().collect();
        for key in old_camp_keys {
            if let Some(camp) = self.camps.remove(&key) {
                let new_camp_key = CampKey::from_keys(new_key.clone(), key.sector.clone());
                self.cooldowns.sector_move.rekey(&key, new_camp_key.clone());
                self.camps.insert(new_camp_key, camp);
            }
        }
        for pending in self.pending.values_mut() {
            match &mut pending.kind {
                PlacementKind::NewSector { state, .. } | PlacementKind::Relocation { state, .. } if state == old => {
                    *state = new_key.clone();
                }
                _ => {}
            }
        }
        self.cooldowns.sector_add.rekey(old, new_key.clone());
        self.cooldowns.capital_move.rekey(old, new_key.clone());

        info!(old = %old, new = %state.name, "state renamed");
        self.states.insert(new_key.clone(), state);
        self.dirty = true;
        Ok(new_key)
    }

    /// Re-key a sector within its state
    pub fn rename_sector(&mut self, state_key: &NameKey, old: &NameKey, new_name: &str) -> Result<NameKey, NameError> {
        let new_key = NameKey::new(new_name);
        let Some(state) = self.states.get_mut(state_key) else {
            return Err(NameError::Invalid);
        };
        if &new_key != old && state.sectors.contains_key(&new_key) {
            return Err(NameError::Taken);
        }
        let Some(mut sector) = state.sectors.remove(old) else {
            return Err(NameError::Invalid);
        };
        let was_capital = state.is_capital(old);
        sector.name = new_name.trim().to_string();
        if was_capital {
            state.capital = Some(sector.name.clone());
        }
        state.sectors.insert(new_key.clone(), sector);

        let old_camp = CampKey::from_keys(state_key.clone(), old.clone());
        let new_camp = CampKey::from_keys(state_key.clone(), new_key.clone());
        if let Some(camp) = self.camps.remove(&old_camp) {
            self.camps.insert(new_camp.clone(), camp);
        }
        self.cooldowns.sector_move.rekey(&old_camp, new_camp);
        for pending in self.pending.values_mut() {
            if let PlacementKind::Relocation { state, sector } = &mut pending.kind {
                if state == state_key && sector == old {
                    *sector = new_key.clone();
                }
            }
        }
        self.dirty = true;
        Ok(new_key)
    }

    // === OWNERSHIP CHANGES ===

    /// Move a sector (and its camp) between states. Name collisions in the
    /// receiving state are resolved by suffixing. The governor is dropped.
    pub fn transfer_sector(&mut self, from: &NameKey, to: &NameKey, sector: &NameKey) -> Result<TransferResult, TransferError> {
        if from == to {
            return Err(TransferError::SameState);
        }
        if !self.states.contains_key(to) {
            return Err(TransferError::StateNotFound);
        }
        let source = self.states.get(from).ok_or(TransferError::StateNotFound)?;
        let existing = source.sectors.get(sector).ok_or(TransferError::SectorNotFound)?;
        if source.is_capital(sector) {
            return Err(TransferError::IsCapital);
        }
        if existing.in_transit() {
            return Err(TransferError::InTransit);
        }
        let base_name = existing.name.clone();
        let final_name = self.unique_sector_name(to, &base_name);

        let Some(mut moved) = self.states.get_mut(from).and_then(|s| s.sectors.remove(sector)) else {
            return Err(TransferError::SectorNotFound);
        };
        moved.name = final_name.clone();
        moved.governor = None;
        let new_sector_key = moved.key();
        if let Some(target) = self.states.get_mut(to) {
            target.sectors.insert(new_sector_key.clone(), moved);
            if target.capital.is_none() {
                target.capital = Some(final_name.clone());
            }
        }

        let from_key = CampKey::from_keys(from.clone(), sector.clone());
        let to_key = CampKey::from_keys(to.clone(), new_sector_key);
        if let Some(camp) = self.camps.remove(&from_key) {
            self.camps.insert(to_key.clone(), camp);
        }
        self.cooldowns.sector_move.clear(&from_key);
        debug!(from = %from_key, to = %to_key, "sector transferred");
        self.dirty = true;

        Ok(TransferResult {
            from: from_key,
            to: to_key,
            sector_name: final_name,
        })
    }

    /// Delete a state: evicts members, releases every camp structure and
    /// drops pending placements and cooldowns that reference it
    pub fn remove_state(&mut self, key: &NameKey, world: &mut dyn WorldPort) -> Option<State> {
        let state = self.states.remove(key)?;
        for member in &state.members {
            self.membership.remove(member);
        }
        for (sector_key, sector) in &state.sectors {
            let camp_key = CampKey::from_keys(key.clone(), sector_key.clone());
            if self.camps.remove(&camp_key).is_some() {
                if let Some(location) = &sector.location {
                    world.remove_camp_structure(&camp_key, location);
                }
            }
        }
        self.pending.retain(|_, p| match &p.kind {
            PlacementKind::NewSector { state, .. } | PlacementKind::Relocation { state, .. } => state != key,
            PlacementKind::NewState { .. } => true,
        });
        self.cooldowns.sector_add.clear(key);
        self.cooldowns.capital_move.clear(key);
        self.cooldowns.sector_move.retain(|k| &k.state != key);
        info!(state = %state.name, "state removed");
        self.dirty = true;
        Some(state)
    }

    /// Apply base stats for a freshly placed camp and size its boundary
    pub fn place_camp(&mut self, key: CampKey, camp: Camp, placement: &PlacementConfig) {
        self.camps.insert(key.clone(), camp);
        self.refresh_boundary(&key, placement);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::FrontierConfig;
    use crate::ports::MemoryWorld;
    use crate::territory::sector::Sector;

    fn store_with(state_name: &str, captain: ActorId, sectors: &[(&str, i32)]) -> TerritoryStore {
        let config = FrontierConfig::default();
        let mut store = TerritoryStore::new();
        let mut state = State::new(state_name, captain, 0);
        for (name, x) in sectors {
            let sector = Sector::new(name, Location::new("world", *x, 64, 0), 0);
            let key = CampKey::from_keys(state.key(), sector.key());
            state.sectors.insert(sector.key(), sector);
            store.camps.insert(key, Camp::new(&config.camps, 1000, 3600, 0));
        }
        state.capital = sectors.first().map(|(n, _)| n.to_string());
        store.insert_state(state);
        store
    }

    #[test]
    fn test_rename_state_rekeys_camps_and_membership() {
        let captain = ActorId::new();
        let mut store = store_with("Rome", captain, &[("Forum", 0)]);
        let new_key = store.rename_state(&NameKey::new("rome"), "Byzantium").unwrap();

        assert_eq!(store.state_of(captain), Some(&new_key));
        assert!(store.camp(&CampKey::new("Byzantium", "Forum")).is_some());
        assert!(store.camp(&CampKey::new("Rome", "Forum")).is_none());
        assert_eq!(store.state(&new_key).unwrap().name, "Byzantium");
    }

    #[test]
    fn test_rename_state_to_existing_fails() {
        let mut store = store_with("Rome", ActorId::new(), &[]);
        store.insert_state(State::new("Carthage", ActorId::new(), 0));
        assert_eq!(store.rename_state(&NameKey::new("rome"), "CARTHAGE"), Err(NameError::Taken));
        // case-only change of own name is allowed
        assert!(store.rename_state(&NameKey::new("rome"), "ROME").is_ok());
    }

    #[test]
    fn test_rename_capital_sector_updates_capital() {
        let mut store = store_with("Rome", ActorId::new(), &[("Forum", 0)]);
        store.rename_sector(&NameKey::new("rome"), &NameKey::new("forum"), "Palatine").unwrap();
        let state = store.state_by_name("rome").unwrap();
        assert_eq!(state.capital.as_deref(), Some("Palatine"));
        assert!(store.camp(&CampKey::new("rome", "palatine")).is_some());
    }

    #[test]
    fn test_transfer_resolves_name_collision() {
        let mut store = store_with("Rome", ActorId::new(), &[("Forum", 0), ("Hill", 100)]);
        let carthage = store_with("Carthage", ActorId::new(), &[("Hill", 500)]);
        for state in carthage.states.into_values() {
            store.insert_state(state);
        }
        let result = store
            .transfer_sector(&NameKey::new("rome"), &NameKey::new("carthage"), &NameKey::new("hill"))
            .unwrap();
        assert_eq!(result.sector_name, "Hill-2");
        assert!(store.camp(&CampKey::new("carthage", "hill-2")).is_some());
        assert!(store.state_by_name("rome").unwrap().sector("hill").is_none());
    }

    #[test]
    fn test_capital_cannot_be_transferred() {
        let mut store = store_with("Rome", ActorId::new(), &[("Forum", 0)]);
        store.insert_state(State::new("Carthage", ActorId::new(), 0));
        assert_eq!(
            store.transfer_sector(&NameKey::new("rome"), &NameKey::new("carthage"), &NameKey::new("forum")),
            Err(TransferError::IsCapital)
        );
    }

    #[test]
    fn test_captain_removal_promotes_successor() {
        let captain = ActorId::new();
        let member = ActorId::new();
        let mut store = store_with("Rome", captain, &[]);
        let key = NameKey::new("rome");
        assert!(store.add_member(&key, member));
        let mut world = MemoryWorld::new();

        assert_eq!(
            store.remove_member(&key, captain, &mut world),
            MemberRemoval::CaptainReplaced { successor: member }
        );
        let state = store.state(&key).unwrap();
        assert_eq!(state.captain, member);
        assert!(state.members.contains(&state.captain));
        assert!(store.state_of(captain).is_none());
    }

    #[test]
    fn test_last_member_removal_deletes_state() {
        let captain = ActorId::new();
        let mut store = store_with("Rome", captain, &[("Forum", 0)]);
        let mut world = MemoryWorld::new();
        let removal = store.remove_member(&NameKey::new("rome"), captain, &mut world);
        assert!(matches!(removal, MemberRemoval::StateDeleted(_)));
        assert_eq!(store.state_count(), 0);
        assert_eq!(store.camp_count(), 0);
        assert_eq!(world.removed_structures().len(), 1);
    }

    #[test]
    fn test_camp_at_finds_containing_boundary() {
        let store = store_with("Rome", ActorId::new(), &[("Forum", 0), ("Hill", 100)]);
        assert_eq!(store.camp_at(&Location::new("world", 105, 70, 3)), Some(CampKey::new("rome", "hill")));
        assert_eq!(store.camp_at(&Location::new("world", 50, 70, 0)), None);
    }

    #[test]
    fn test_unique_sector_name_suffixes() {
        let store = store_with("Rome", ActorId::new(), &[("Hill", 0), ("Hill-2", 100)]);
        assert_eq!(store.unique_sector_name(&NameKey::new("rome"), "Hill"), "Hill-3");
        assert_eq!(store.unique_sector_name(&NameKey::new("rome"), "Vale"), "Vale");
    }
}
