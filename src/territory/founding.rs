//! Founding states, adding sectors, relocating sectors and committing
//! pending placements
//!
//! Costs are checked when the request is made and charged (after a fresh
//! check) only when the placement commits, so an abandoned request costs
//! nothing and a failed charge leaves the request pending.

use tracing::info;

use crate::core::config::FrontierConfig;
use crate::core::types::{secs, vars, ActorId, CampKey, Location, NameKey, Timestamp, Vars};
use crate::ports::{PaymentError, Ports};
use crate::territory::camp::Camp;
use crate::territory::placement::{validate_placement, PendingPlacement, PlacementDenial, PlacementKind};
use crate::territory::sector::Sector;
use crate::territory::state::State;
use crate::territory::store::{NameError, TerritoryStore};

#[derive(Debug, Clone, PartialEq)]
pub enum FoundOutcome {
    /// Name reserved; waiting for the first camp location
    Success,
    AlreadyInState,
    PlacementPending,
    InvalidName,
    NameReserved,
    NameTaken,
    Cooldown { remaining_ms: Timestamp },
    MissingItems,
    InsufficientFunds,
    NoLedger,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectorOutcome {
    /// Waiting for the new sector's location
    Success,
    NotInState,
    NotCaptain,
    PlacementPending,
    InvalidName,
    NameTaken,
    SectorLimit { limit: usize },
    Cooldown { remaining_ms: Timestamp },
    MissingItems,
    InsufficientFunds,
    NoLedger,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// Sector is in transit; waiting for its new location
    Success,
    /// A sector left in transit by a departed mover is handed to this actor
    Resumed,
    NotInState,
    SectorNotFound,
    NotAuthorized,
    IsCapital,
    AtWar,
    PlacementPending,
    InTransit,
    Cooldown { remaining_ms: Timestamp },
    InsufficientFunds,
    NoLedger,
}

/// What a committed placement did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementCommit {
    Founded,
    SectorAdded,
    Relocated,
}

/// Committed placement, for the host to render
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementResult {
    pub kind: PlacementCommit,
    pub camp: CampKey,
    pub state_name: String,
    pub sector_name: String,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlacementOutcome {
    Committed(PlacementResult),
    NoPendingPlacement,
    Denied(PlacementDenial),
    /// The reserved or requested name was taken meanwhile; request dropped
    NameTaken,
    /// The actor joined another state meanwhile; request dropped
    AlreadyInState,
    /// The owning state no longer exists; request dropped
    StateNotFound,
    /// The actor lost the rights the request was made with; request dropped
    NotAuthorized,
    /// The state shrank below the sector ceiling meanwhile; request dropped
    SectorLimit { limit: usize },
    MissingItems,
    InsufficientFunds,
    NoLedger,
}

impl PlacementOutcome {
    pub fn message_key(&self) -> &'static str {
        match self {
            PlacementOutcome::Committed(result) => match result.kind {
                PlacementCommit::Founded => "placement.founded",
                PlacementCommit::SectorAdded => "placement.sector_added",
                PlacementCommit::Relocated => "placement.relocated",
            },
            PlacementOutcome::NoPendingPlacement => "placement.none_pending",
            PlacementOutcome::Denied(denial) => denial.reason.message_key(),
            PlacementOutcome::NameTaken => "placement.name_taken",
            PlacementOutcome::AlreadyInState => "placement.already_in_state",
            PlacementOutcome::StateNotFound => "placement.state_missing",
            PlacementOutcome::NotAuthorized => "common.not_authorized",
            PlacementOutcome::SectorLimit { .. } => "sector.limit",
            PlacementOutcome::MissingItems => "common.missing_items",
            PlacementOutcome::InsufficientFunds => "common.insufficient_funds",
            PlacementOutcome::NoLedger => "common.no_ledger",
        }
    }

    pub fn vars(&self) -> Vars {
        match self {
            PlacementOutcome::Denied(denial) => denial.vars.clone(),
            PlacementOutcome::SectorLimit { limit } => vars([("limit", limit.to_string())]),
            PlacementOutcome::Committed(result) => {
                let mut vars = result.location.vars();
                vars.push(("state".into(), result.state_name.clone()));
                vars.push(("sector".into(), result.sector_name.clone()));
                vars
            }
            _ => Vars::new(),
        }
    }
}

impl TerritoryStore {
    /// Reserve a state name and wait for the first camp location
    pub fn found_state(
        &mut self,
        actor: ActorId,
        state_name: &str,
        sector_name: &str,
        now: Timestamp,
        config: &FrontierConfig,
        ports: &Ports,
    ) -> FoundOutcome {
        if self.membership.contains_key(&actor) {
            return FoundOutcome::AlreadyInState;
        }
        if self.pending.contains_key(&actor) {
            return FoundOutcome::PlacementPending;
        }
        for name in [state_name, sector_name] {
            match Self::check_name(name, &config.states) {
                Ok(()) => {}
                Err(NameError::Reserved) => return FoundOutcome::NameReserved,
                Err(_) => return FoundOutcome::InvalidName,
            }
        }
        let key = NameKey::new(state_name);
        if !self.state_name_free(&key) {
            return FoundOutcome::NameTaken;
        }
        if let Some(remaining_ms) = self.cooldowns.founding.remaining(&actor, now) {
            return FoundOutcome::Cooldown { remaining_ms };
        }
        if !ports.has_items(actor, &config.states.creation_items) {
            return FoundOutcome::MissingItems;
        }
        match ports.can_afford(actor, config.states.creation_cost) {
            Ok(()) => {}
            Err(PaymentError::NoLedger) => return FoundOutcome::NoLedger,
            Err(PaymentError::InsufficientFunds) => return FoundOutcome::InsufficientFunds,
        }

        self.reserved.insert(key, actor);
        self.pending.insert(
            actor,
            PendingPlacement {
                actor,
                kind: PlacementKind::NewState {
                    state: state_name.trim().to_string(),
                    sector: sector_name.trim().to_string(),
                },
                created_at: now,
                cost: config.states.creation_cost,
                items: config.states.creation_items.clone(),
            },
        );
        self.mark_dirty();
        FoundOutcome::Success
    }

    /// Request an additional sector; captain only, at most `members + 1`
    pub fn add_sector(
        &mut self,
        actor: ActorId,
        sector_name: &str,
        now: Timestamp,
        config: &FrontierConfig,
        ports: &Ports,
    ) -> SectorOutcome {
        let Some(state_key) = self.membership.get(&actor).cloned() else {
            return SectorOutcome::NotInState;
        };
        let Some(state) = self.states.get(&state_key) else {
            return SectorOutcome::NotInState;
        };
        if state.captain != actor {
            return SectorOutcome::NotCaptain;
        }
        if self.pending.contains_key(&actor) {
            return SectorOutcome::PlacementPending;
        }
        if Self::check_name(sector_name, &config.states).is_err() {
            return SectorOutcome::InvalidName;
        }
        let sector_key = NameKey::new(sector_name);
        if state.sectors.contains_key(&sector_key) || self.sector_name_pending(&state_key, &sector_key) {
            return SectorOutcome::NameTaken;
        }
        let limit = state.members.len() + 1;
        if state.sectors.len() + self.pending_sectors_for(&state_key) >= limit {
            return SectorOutcome::SectorLimit { limit };
        }
        if let Some(remaining_ms) = self.cooldowns.sector_add.remaining(&state_key, now) {
            return SectorOutcome::Cooldown { remaining_ms };
        }
        if !ports.has_items(actor, &config.states.sector_items) {
            return SectorOutcome::MissingItems;
        }
        match ports.can_afford(actor, config.states.sector_cost) {
            Ok(()) => {}
            Err(PaymentError::NoLedger) => return SectorOutcome::NoLedger,
            Err(PaymentError::InsufficientFunds) => return SectorOutcome::InsufficientFunds,
        }

        self.pending.insert(
            actor,
            PendingPlacement {
                actor,
                kind: PlacementKind::NewSector {
                    state: state_key,
                    sector: sector_name.trim().to_string(),
                },
                created_at: now,
                cost: config.states.sector_cost,
                items: config.states.sector_items.clone(),
            },
        );
        self.mark_dirty();
        SectorOutcome::Success
    }

    /// Free first-camp placement for a state that has no sectors yet
    /// (seceding rebels)
    pub fn grant_first_placement(&mut self, actor: ActorId, state: &NameKey, sector_name: &str, now: Timestamp) {
        self.pending.insert(
            actor,
            PendingPlacement {
                actor,
                kind: PlacementKind::NewSector {
                    state: state.clone(),
                    sector: sector_name.trim().to_string(),
                },
                created_at: now,
                cost: 0.0,
                items: vec![],
            },
        );
        self.mark_dirty();
    }

    fn sector_name_pending(&self, state: &NameKey, sector: &NameKey) -> bool {
        self.pending.values().any(|p| {
            matches!(&p.kind, PlacementKind::NewSector { state: s, sector: n } if s == state && &NameKey::new(n) == sector)
        })
    }

    /// Put a sector in transit. The move cost is charged immediately since
    /// the sector cannot return to its old spot.
    pub fn begin_sector_move(
        &mut self,
        actor: ActorId,
        sector_name: &str,
        at_war: bool,
        now: Timestamp,
        config: &FrontierConfig,
        ports: &mut Ports,
    ) -> MoveOutcome {
        let Some(state_key) = self.membership.get(&actor).cloned() else {
            return MoveOutcome::NotInState;
        };
        let sector_key = NameKey::new(sector_name);
        let Some(state) = self.states.get(&state_key) else {
            return MoveOutcome::NotInState;
        };
        let Some(sector) = state.sectors.get(&sector_key) else {
            return MoveOutcome::SectorNotFound;
        };
        if !state.can_manage(actor, &sector_key) {
            return MoveOutcome::NotAuthorized;
        }
        if state.is_capital(&sector_key) {
            return MoveOutcome::IsCapital;
        }
        let camp_key = CampKey::from_keys(state_key.clone(), sector_key.clone());
        let orphaned = sector.in_transit() && !self.relocation_pending(&camp_key);
        if at_war && !orphaned {
            return MoveOutcome::AtWar;
        }
        if self.pending.contains_key(&actor) {
            return MoveOutcome::PlacementPending;
        }
        if orphaned {
            // already paid for; only the pending placement was lost
            self.pending
                .insert(actor, PendingPlacement::relocation(actor, state_key, sector_key, now));
            self.mark_dirty();
            return MoveOutcome::Resumed;
        }
        if sector.in_transit() {
            return MoveOutcome::InTransit;
        }
        if let Some(remaining_ms) = self.cooldowns.sector_move.remaining(&camp_key, now) {
            return MoveOutcome::Cooldown { remaining_ms };
        }
        match ports.charge(actor, config.camps.move_cost) {
            Ok(()) => {}
            Err(PaymentError::NoLedger) => return MoveOutcome::NoLedger,
            Err(PaymentError::InsufficientFunds) => return MoveOutcome::InsufficientFunds,
        }

        let old_location = self
            .states
            .get_mut(&state_key)
            .and_then(|s| s.sectors.get_mut(&sector_key))
            .and_then(|s| s.location.take());
        if let Some(location) = old_location {
            ports.world.remove_camp_structure(&camp_key, &location);
        }
        self.cooldowns
            .sector_move
            .start(camp_key, now, secs(config.camps.move_cooldown_secs));
        self.pending
            .insert(actor, PendingPlacement::relocation(actor, state_key, sector_key, now));
        self.mark_dirty();
        MoveOutcome::Success
    }

    /// Finalize the actor's pending placement at a confirmed location
    pub fn complete_pending_placement(
        &mut self,
        actor: ActorId,
        location: Location,
        now: Timestamp,
        config: &FrontierConfig,
        ports: &mut Ports,
    ) -> PlacementOutcome {
        let Some(pending) = self.pending.get(&actor).cloned() else {
            return PlacementOutcome::NoPendingPlacement;
        };

        // Ownership preconditions that can only have gone stale
        match &pending.kind {
            PlacementKind::NewState { state, .. } => {
                if self.membership.contains_key(&actor) {
                    self.drop_pending(actor);
                    return PlacementOutcome::AlreadyInState;
                }
                let key = NameKey::new(state);
                if self.states.contains_key(&key) || self.reserved.get(&key).map_or(false, |a| *a != actor) {
                    self.drop_pending(actor);
                    return PlacementOutcome::NameTaken;
                }
            }
            PlacementKind::NewSector { state, sector } => {
                let Some(owner) = self.states.get(state) else {
                    self.drop_pending(actor);
                    return PlacementOutcome::StateNotFound;
                };
                if self.membership.get(&actor) != Some(state) || owner.captain != actor {
                    self.drop_pending(actor);
                    return PlacementOutcome::NotAuthorized;
                }
                if owner.sectors.contains_key(&NameKey::new(sector)) {
                    self.drop_pending(actor);
                    return PlacementOutcome::NameTaken;
                }
                // this request is one of the pending sectors
                let limit = owner.members.len() + 1;
                if owner.sectors.len() + self.pending_sectors_for(state) > limit {
                    self.drop_pending(actor);
                    return PlacementOutcome::SectorLimit { limit };
                }
            }
            PlacementKind::Relocation { state, sector } => {
                let Some(owner) = self.states.get(state).filter(|s| s.sectors.contains_key(sector)) else {
                    self.drop_pending(actor);
                    return PlacementOutcome::StateNotFound;
                };
                if self.membership.get(&actor) != Some(state) || !owner.can_manage(actor, sector) {
                    // the sector stays in transit for a manager to resume
                    self.drop_pending(actor);
                    return PlacementOutcome::NotAuthorized;
                }
            }
        }

        let radius = match &pending.kind {
            PlacementKind::Relocation { state, sector } => self
                .camps
                .get(&CampKey::from_keys(state.clone(), sector.clone()))
                .map_or(config.camps.base_radius, |c| c.stats.radius),
            _ => config.camps.base_radius,
        };
        if let Err(denial) = validate_placement(
            self,
            &pending.state_key(),
            &location,
            radius,
            &config.placement,
            ports.world.as_ref(),
        ) {
            return PlacementOutcome::Denied(denial);
        }

        // Validate everything, then charge, then consume items
        if !ports.has_items(actor, &pending.items) {
            return PlacementOutcome::MissingItems;
        }
        match ports.charge(actor, pending.cost) {
            Ok(()) => {}
            Err(PaymentError::NoLedger) => return PlacementOutcome::NoLedger,
            Err(PaymentError::InsufficientFunds) => return PlacementOutcome::InsufficientFunds,
        }
        ports.consume_items(actor, &pending.items);
        self.pending.remove(&actor);

        let result = match pending.kind {
            PlacementKind::NewState { state, sector } => {
                let key = NameKey::new(&state);
                self.reserved.remove(&key);
                let mut new_state = State::new(&state, actor, now);
                let new_sector = Sector::new(&sector, location.clone(), now);
                let camp_key = CampKey::from_keys(key, new_sector.key());
                new_state.capital = Some(new_sector.name.clone());
                new_state.sectors.insert(new_sector.key(), new_sector);
                self.insert_state(new_state);
                let camp = self.fresh_camp(config, now);
                self.place_camp(camp_key.clone(), camp, &config.placement);
                self.cooldowns
                    .founding
                    .start(actor, now, secs(config.states.creation_cooldown_secs));
                info!(state = %state, %actor, "state founded");
                PlacementResult {
                    kind: PlacementCommit::Founded,
                    camp: camp_key,
                    state_name: state,
                    sector_name: sector,
                    location,
                }
            }
            PlacementKind::NewSector { state, sector } => {
                let new_sector = Sector::new(&sector, location.clone(), now);
                let camp_key = CampKey::from_keys(state.clone(), new_sector.key());
                let mut state_name = state.to_string();
                if let Some(owner) = self.states.get_mut(&state) {
                    state_name = owner.name.clone();
                    if owner.capital.is_none() {
                        owner.capital = Some(new_sector.name.clone());
                    }
                    owner.sectors.insert(new_sector.key(), new_sector);
                }
                let camp = self.fresh_camp(config, now);
                self.place_camp(camp_key.clone(), camp, &config.placement);
                if pending.cost > 0.0 || !pending.items.is_empty() {
                    self.cooldowns
                        .sector_add
                        .start(state.clone(), now, secs(config.states.sector_cooldown_secs));
                }
                PlacementResult {
                    kind: PlacementCommit::SectorAdded,
                    camp: camp_key,
                    state_name,
                    sector_name: sector,
                    location,
                }
            }
            PlacementKind::Relocation { state, sector } => {
                let camp_key = CampKey::from_keys(state.clone(), sector.clone());
                let (state_name, sector_name) = self.display_names(&camp_key);
                if let Some(moved) = self.states.get_mut(&state).and_then(|s| s.sectors.get_mut(&sector)) {
                    moved.location = Some(location.clone());
                }
                self.refresh_boundary(&camp_key, &config.placement);
                PlacementResult {
                    kind: PlacementCommit::Relocated,
                    camp: camp_key,
                    state_name,
                    sector_name,
                    location,
                }
            }
        };
        self.mark_dirty();
        PlacementOutcome::Committed(result)
    }

    fn fresh_camp(&self, config: &FrontierConfig, now: Timestamp) -> Camp {
        Camp::new(
            &config.camps,
            config.maintenance_interval(),
            config.production.interval_secs,
            now,
        )
    }

    /// Forget a pending placement, releasing a reserved name if it held one
    pub fn drop_pending(&mut self, actor: ActorId) -> Option<PendingPlacement> {
        let pending = self.pending.remove(&actor)?;
        if let PlacementKind::NewState { state, .. } = &pending.kind {
            let key = NameKey::new(state);
            if self.reserved.get(&key) == Some(&actor) {
                self.reserved.remove(&key);
            }
        }
        self.mark_dirty();
        Some(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ItemDescriptor;
    use crate::core::types::ItemStack;
    use crate::ports::{MemoryInventory, MemoryLedger, MemoryWorld, RecordingNotifier};

    struct Fixture {
        store: TerritoryStore,
        config: FrontierConfig,
        ports: Ports,
        ledger: MemoryLedger,
        inventory: MemoryInventory,
        world: MemoryWorld,
    }

    fn fixture() -> Fixture {
        let ledger = MemoryLedger::new();
        let inventory = MemoryInventory::new();
        let world = MemoryWorld::new();
        let ports = Ports::new(
            Some(Box::new(ledger.clone())),
            Box::new(inventory.clone()),
            Box::new(RecordingNotifier::new()),
            Box::new(world.clone()),
        );
        Fixture {
            store: TerritoryStore::new(),
            config: FrontierConfig::default(),
            ports,
            ledger,
            inventory,
            world,
        }
    }

    fn loc(x: i32) -> Location {
        Location::new("world", x, 64, 0)
    }

    #[test]
    fn test_found_then_commit_creates_state() {
        let mut f = fixture();
        let actor = ActorId::new();
        f.ledger.set_balance(actor, 5000.0);

        assert_eq!(f.store.found_state(actor, "Rome", "Forum", 0, &f.config, &f.ports), FoundOutcome::Success);
        assert!(f.store.state_by_name("rome").is_none());
        assert_eq!(f.ledger.balance(actor), 5000.0);

        let outcome = f.store.complete_pending_placement(actor, loc(0), 10, &f.config, &mut f.ports);
        assert!(matches!(outcome, PlacementOutcome::Committed(ref r) if r.kind == PlacementCommit::Founded));
        let state = f.store.state_by_name("ROME").unwrap();
        assert_eq!(state.captain, actor);
        assert_eq!(state.capital.as_deref(), Some("Forum"));
        assert!(f.store.camp(&CampKey::new("rome", "forum")).is_some());
        assert_eq!(f.ledger.balance(actor), 5000.0 - f.config.states.creation_cost);
    }

    #[test]
    fn test_reserved_name_blocks_second_founder() {
        let mut f = fixture();
        let first = ActorId::new();
        let second = ActorId::new();
        f.ledger.set_balance(first, 5000.0);
        f.ledger.set_balance(second, 5000.0);
        f.store.found_state(first, "Rome", "Forum", 0, &f.config, &f.ports);
        assert_eq!(f.store.found_state(second, "rome", "Hill", 0, &f.config, &f.ports), FoundOutcome::NameTaken);
        assert_eq!(f.store.found_state(second, "Admin", "Hill", 0, &f.config, &f.ports), FoundOutcome::NameReserved);
        assert_eq!(f.store.found_state(second, "bad name!", "Hill", 0, &f.config, &f.ports), FoundOutcome::InvalidName);
    }

    #[test]
    fn test_missing_creation_items_reported_before_funds() {
        let mut f = fixture();
        let actor = ActorId::new();
        let core = ItemDescriptor::custom("frontier", "camp_core");
        f.config.states.creation_items = vec![ItemStack::new(core.clone(), 1)];
        assert_eq!(f.store.found_state(actor, "Rome", "Forum", 0, &f.config, &f.ports), FoundOutcome::MissingItems);
        f.inventory.give(actor, core, 1);
        assert_eq!(
            f.store.found_state(actor, "Rome", "Forum", 0, &f.config, &f.ports),
            FoundOutcome::InsufficientFunds
        );
    }

    #[test]
    fn test_failed_charge_at_commit_keeps_items_and_pending() {
        let mut f = fixture();
        let actor = ActorId::new();
        let core = ItemDescriptor::custom("frontier", "camp_core");
        f.config.states.creation_items = vec![ItemStack::new(core.clone(), 1)];
        f.inventory.give(actor, core.clone(), 1);
        f.ledger.set_balance(actor, 5000.0);
        assert_eq!(f.store.found_state(actor, "Rome", "Forum", 0, &f.config, &f.ports), FoundOutcome::Success);

        f.ledger.fail_withdrawals(true);
        let outcome = f.store.complete_pending_placement(actor, loc(0), 10, &f.config, &mut f.ports);
        assert_eq!(outcome, PlacementOutcome::InsufficientFunds);
        assert_eq!(f.inventory.count(actor, &core), 1);
        assert!(f.store.pending_placement(actor).is_some());
        assert!(f.store.state_by_name("rome").is_none());
    }

    #[test]
    fn test_obstructed_placement_denied_with_reason() {
        let mut f = fixture();
        let actor = ActorId::new();
        f.ledger.set_balance(actor, 5000.0);
        f.store.found_state(actor, "Rome", "Forum", 0, &f.config, &f.ports);
        f.world.obstruct(loc(0));
        match f.store.complete_pending_placement(actor, loc(0), 10, &f.config, &mut f.ports) {
            PlacementOutcome::Denied(denial) => {
                assert_eq!(denial.reason, crate::territory::placement::DenialReason::Obstructed)
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_gap_required_only_between_states() {
        let mut f = fixture();
        let rome = ActorId::new();
        let carthage = ActorId::new();
        f.ledger.set_balance(rome, 50_000.0);
        f.ledger.set_balance(carthage, 50_000.0);
        f.store.found_state(rome, "Rome", "Forum", 0, &f.config, &f.ports);
        f.store.complete_pending_placement(rome, loc(0), 0, &f.config, &mut f.ports);

        // Another state 40 blocks away: rects -16..16 and 24..56 leave a 7 block gap < 8
        f.store.found_state(carthage, "Carthage", "Byrsa", 0, &f.config, &f.ports);
        let denied = f.store.complete_pending_placement(carthage, loc(40), 0, &f.config, &mut f.ports);
        assert!(matches!(denied, PlacementOutcome::Denied(ref d)
            if d.reason == crate::territory::placement::DenialReason::TooCloseToState));

        // Same state may sit right next to itself
        let member = ActorId::new();
        f.store.add_member(&NameKey::new("rome"), member);
        assert_eq!(f.store.add_sector(rome, "Hill", 0, &f.config, &f.ports), SectorOutcome::Success);
        let placed = f.store.complete_pending_placement(rome, loc(33), 0, &f.config, &mut f.ports);
        assert!(matches!(placed, PlacementOutcome::Committed(_)));
    }

    #[test]
    fn test_sector_limit_is_members_plus_one() {
        let mut f = fixture();
        let captain = ActorId::new();
        f.ledger.set_balance(captain, 50_000.0);
        f.store.found_state(captain, "Rome", "Forum", 0, &f.config, &f.ports);
        f.store.complete_pending_placement(captain, loc(0), 0, &f.config, &mut f.ports);

        assert_eq!(f.store.add_sector(captain, "Hill", 0, &f.config, &f.ports), SectorOutcome::Success);
        f.store.complete_pending_placement(captain, loc(100), 0, &f.config, &mut f.ports);
        assert_eq!(
            f.store.add_sector(captain, "Vale", secs(10_000), &f.config, &f.ports),
            SectorOutcome::SectorLimit { limit: 2 }
        );
    }

    #[test]
    fn test_relocation_keeps_levels_and_rejects_second_move() {
        let mut f = fixture();
        let captain = ActorId::new();
        f.ledger.set_balance(captain, 50_000.0);
        f.store.found_state(captain, "Rome", "Forum", 0, &f.config, &f.ports);
        f.store.complete_pending_placement(captain, loc(0), 0, &f.config, &mut f.ports);
        f.store.add_member(&NameKey::new("rome"), ActorId::new());
        f.store.add_sector(captain, "Hill", 0, &f.config, &f.ports);
        f.store.complete_pending_placement(captain, loc(100), 0, &f.config, &mut f.ports);

        let key = CampKey::new("rome", "hill");
        f.store
            .camp_mut(&key)
            .unwrap()
            .levels
            .insert(crate::upgrades::UpgradeTrack::Fuel, 2);

        assert_eq!(f.store.begin_sector_move(captain, "Forum", false, 0, &f.config, &mut f.ports), MoveOutcome::IsCapital);
        assert_eq!(f.store.begin_sector_move(captain, "Hill", true, 0, &f.config, &mut f.ports), MoveOutcome::AtWar);
        assert_eq!(f.store.begin_sector_move(captain, "Hill", false, 0, &f.config, &mut f.ports), MoveOutcome::Success);
        assert!(f.store.sector_location(&key).is_none());
        assert_eq!(
            f.store.begin_sector_move(captain, "Hill", false, 0, &f.config, &mut f.ports),
            MoveOutcome::PlacementPending
        );

        let outcome = f.store.complete_pending_placement(captain, loc(300), 5, &f.config, &mut f.ports);
        assert!(matches!(outcome, PlacementOutcome::Committed(ref r) if r.kind == PlacementCommit::Relocated));
        assert_eq!(f.store.sector_location(&key), Some(&loc(300)));
        assert_eq!(f.store.camp(&key).unwrap().level(crate::upgrades::UpgradeTrack::Fuel), 2);
    }
}
