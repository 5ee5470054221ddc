//! Frontier - the facade hosts talk to
//!
//! Owns the territory store, the conflict engine, the request brokers and
//! the ports. Every operation that touches more than one engine is
//! sequenced here: renames re-key pending requests, disbanded states end
//! their wars, committed placements may start a civil war, repaired camps
//! may lift a capital hold.

use std::path::Path;

use tracing::{debug, info};

use crate::conflict::{
    CivilWarOutcome, CondemnOutcome, ConflictEngine, ConflictTick, DamageOutcome, DeclareOutcome, EmergencyMoveOutcome,
    JoinWarOutcome, SurrenderOutcome, WarId, WarResolution,
};
use crate::core::clock::Clock;
use crate::core::config::FrontierConfig;
use crate::core::error::Result;
use crate::core::types::{secs, vars, ActorId, CampKey, Currency, Location, NameKey, Timestamp};
use crate::persistence::{LoadReport, Snapshot};
use crate::ports::Ports;
use crate::requests::{RequestBroker, RequestOutcome};
use crate::territory::{
    BankOutcome, CampModule, CapitalOutcome, FoundOutcome, MembershipOutcome, MoveOutcome, PlacementOutcome,
    PolicyOutcome, RenameOutcome, SectorOutcome, State, TerritoryStore, TransferError, TransferResult,
};
use crate::upgrades::{purchase_upgrade, UpgradeCatalog, UpgradeOutcome, UpgradeTrack};
use crate::upkeep::{
    claim_production, maintain_camp, refuel_camp, repair_camp, run_upkeep, toggle_module, unlock_module,
    ClaimOutcome, MaintenanceOutcome, ModuleOutcome, RefuelOutcome, RepairOutcome, UpkeepReport,
};

/// Result of a teleport request or answer
#[derive(Debug, Clone, PartialEq)]
pub enum TeleportOutcome {
    /// Waiting for `manager` to answer
    Requested { manager: ActorId },
    /// The host should move `traveller` to `location`
    Accepted { traveller: ActorId, location: Location },
    Denied,
    NotInState,
    SectorNotFound,
    InTransit,
    RequestFailed(RequestOutcome),
}

/// Result of a sector gift offer or answer
#[derive(Debug, Clone, PartialEq)]
pub enum GiftOutcome {
    Offered,
    Accepted(TransferResult),
    Denied,
    NotInState,
    NotCaptain,
    StateNotFound,
    SameState,
    SectorNotFound,
    IsCapital,
    InTransit,
    /// Either state is fighting a war
    AtWar,
    /// Either state is origin or rebel of a pending civil war
    CivilWarPending,
    RequestFailed(RequestOutcome),
}

/// What one scheduler tick did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontierTick {
    pub tick: u64,
    pub upkeep: UpkeepReport,
    pub conflict: ConflictTick,
    /// Expired requests removed this tick
    pub swept: usize,
}

/// The territory and conflict engine behind one host
pub struct Frontier {
    config: FrontierConfig,
    catalog: UpgradeCatalog,
    store: TerritoryStore,
    conflict: ConflictEngine,
    /// Invited actor <- inviting state
    invites: RequestBroker<ActorId, NameKey, ()>,
    /// State <- applicant
    joins: RequestBroker<NameKey, ActorId, ()>,
    /// Sector manager <- traveller, carrying the destination camp
    teleports: RequestBroker<ActorId, ActorId, CampKey>,
    /// Receiving state <- giving state, carrying the gifted sector
    gifts: RequestBroker<NameKey, NameKey, NameKey>,
    ports: Ports,
    clock: Box<dyn Clock>,
    ticks: u64,
}

impl Frontier {
    pub fn new(config: FrontierConfig, catalog: UpgradeCatalog, ports: Ports, clock: Box<dyn Clock>) -> Self {
        let states = &config.states;
        Self {
            invites: RequestBroker::new(secs(states.invite_timeout_secs)),
            joins: RequestBroker::new(secs(states.join_timeout_secs)),
            teleports: RequestBroker::new(secs(states.teleport_timeout_secs)),
            gifts: RequestBroker::new(secs(states.gift_timeout_secs)),
            conflict: ConflictEngine::new(&config),
            store: TerritoryStore::new(),
            config,
            catalog,
            ports,
            clock,
            ticks: 0,
        }
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn config(&self) -> &FrontierConfig {
        &self.config
    }

    pub fn catalog(&self) -> &UpgradeCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &TerritoryStore {
        &self.store
    }

    pub fn conflict(&self) -> &ConflictEngine {
        &self.conflict
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// True (and reset) if anything persisted changed since the last call
    pub fn take_dirty(&mut self) -> bool {
        self.store.take_dirty()
    }

    fn at_war(&self, actor: ActorId) -> bool {
        self.store.state_of(actor).map_or(false, |state| self.conflict.is_at_war(state))
    }

    // === FOUNDING & PLACEMENT ===

    pub fn found_state(&mut self, actor: ActorId, state_name: &str, sector_name: &str) -> FoundOutcome {
        let now = self.now();
        self.store.found_state(actor, state_name, sector_name, now, &self.config, &self.ports)
    }

    pub fn add_sector(&mut self, actor: ActorId, sector_name: &str) -> SectorOutcome {
        let now = self.now();
        self.store.add_sector(actor, sector_name, now, &self.config, &self.ports)
    }

    pub fn begin_sector_move(&mut self, actor: ActorId, sector_name: &str) -> MoveOutcome {
        let now = self.now();
        let at_war = self.at_war(actor);
        self.store
            .begin_sector_move(actor, sector_name, at_war, now, &self.config, &mut self.ports)
    }

    /// The host confirmed where the actor's pending camp goes. A rebel
    /// state's first camp turns its secession into a war.
    pub fn complete_placement(&mut self, actor: ActorId, location: Location) -> PlacementOutcome {
        let now = self.now();
        let outcome = self
            .store
            .complete_pending_placement(actor, location, now, &self.config, &mut self.ports);
        if let PlacementOutcome::Committed(result) = &outcome {
            let state = result.camp.state.clone();
            if let Some(war) = self
                .conflict
                .on_camp_placed(&mut self.store, &state, now, &self.config, &mut self.ports)
            {
                debug!(%state, ?war, "civil war started on first camp");
            }
        }
        outcome
    }

    // === GOVERNANCE ===

    pub fn rename_state(&mut self, actor: ActorId, new_name: &str) -> RenameOutcome {
        let outcome = self.store.rename_state_by(actor, new_name, &self.config);
        if let RenameOutcome::Renamed { old, new } = &outcome {
            self.conflict.rename_state(old, new);
            self.invites.rekey_sender(old, new.clone());
            self.joins.rekey_recipient(old, new.clone());
            self.gifts.rekey_recipient(old, new.clone());
            self.gifts.rekey_sender(old, new.clone());
            self.teleports.cancel_where(|r| &r.payload.state == old);
        }
        outcome
    }

    pub fn rename_sector(&mut self, actor: ActorId, sector_name: &str, new_name: &str) -> RenameOutcome {
        let outcome = self.store.rename_sector_by(actor, sector_name, new_name, &self.config);
        if let (RenameOutcome::Renamed { old, .. }, Some(state)) = (&outcome, self.store.state_of(actor).cloned()) {
            self.gifts.cancel_where(|r| r.from == state && &r.payload == old);
            self.teleports
                .cancel_where(|r| r.payload.state == state && &r.payload.sector == old);
        }
        outcome
    }

    pub fn set_capital(&mut self, actor: ActorId, sector_name: &str) -> CapitalOutcome {
        let now = self.now();
        let at_war = self.at_war(actor);
        self.store.set_capital(actor, sector_name, at_war, now, &self.config)
    }

    pub fn set_governor(&mut self, actor: ActorId, sector_name: &str, governor: Option<ActorId>) -> MembershipOutcome {
        self.store.set_governor(actor, sector_name, governor)
    }

    pub fn transfer_captaincy(&mut self, actor: ActorId, target: ActorId) -> MembershipOutcome {
        self.store.transfer_captaincy(actor, target)
    }

    pub fn leave_state(&mut self, actor: ActorId) -> MembershipOutcome {
        let outcome = self.store.leave_state(actor, self.ports.world.as_mut());
        self.after_removal(actor, &outcome);
        outcome
    }

    pub fn kick_member(&mut self, actor: ActorId, target: ActorId) -> MembershipOutcome {
        let outcome = self.store.kick_member(actor, target, self.ports.world.as_mut());
        self.after_removal(target, &outcome);
        if matches!(outcome, MembershipOutcome::Success) {
            let state = self.store.state_for(actor).map(|s| s.name.clone()).unwrap_or_default();
            self.ports.notify(target, "member.kicked", &vars([("state", state)]));
        }
        outcome
    }

    fn after_removal(&mut self, actor: ActorId, outcome: &MembershipOutcome) {
        match outcome {
            MembershipOutcome::Success | MembershipOutcome::CaptainReplaced { .. } => {
                self.teleports.cancel_from(&actor);
                self.teleports.cancel_to(&actor);
            }
            MembershipOutcome::StateDisbanded { state } => {
                self.teleports.cancel_from(&actor);
                self.teleports.cancel_to(&actor);
                let key = NameKey::new(state);
                self.forget_state(&key);
            }
            _ => {}
        }
    }

    /// Drop every reference to a state that no longer exists
    fn forget_state(&mut self, key: &NameKey) -> Vec<WarResolution> {
        let now = self.now();
        let ended = self.conflict.remove_state(key, &self.store, now, &mut self.ports);
        self.invites.cancel_from(key);
        self.joins.cancel_to(key);
        self.gifts.cancel_to(key);
        self.gifts.cancel_from(key);
        self.teleports.cancel_where(|r| &r.payload.state == key);
        self.store.mark_dirty();
        ended
    }

    /// Administrative delete. Wars the state fought as a primary party
    /// are cancelled.
    pub fn delete_state(&mut self, name: &str) -> Option<(State, Vec<WarResolution>)> {
        let key = NameKey::new(name);
        let state = self.store.remove_state(&key, self.ports.world.as_mut())?;
        for member in &state.members {
            self.teleports.cancel_from(member);
            self.teleports.cancel_to(member);
        }
        let ended = self.forget_state(&key);
        info!(state = %state.name, wars = ended.len(), "state deleted by admin");
        Some((state, ended))
    }

    pub fn deposit_to_bank(&mut self, actor: ActorId, amount: Currency) -> BankOutcome {
        let now = self.now();
        self.store
            .deposit_to_bank(actor, amount, now, &self.config, &mut self.ports)
    }

    pub fn withdraw_from_bank(&mut self, actor: ActorId, amount: Currency) -> BankOutcome {
        let now = self.now();
        self.store
            .withdraw_from_bank(actor, amount, now, &self.config, &mut self.ports)
    }

    pub fn set_tax_rate(&mut self, actor: ActorId, rate: f64) -> PolicyOutcome {
        self.store.set_tax_rate(actor, rate, &self.config)
    }

    pub fn set_ideology(&mut self, actor: ActorId, ideology: &str) -> PolicyOutcome {
        let now = self.now();
        self.store.set_ideology(actor, ideology, now, &self.config)
    }

    // === INVITES & JOIN REQUESTS ===

    /// Captain invites an actor who is in no state
    pub fn invite(&mut self, actor: ActorId, target: ActorId) -> MembershipOutcome {
        let state = match self.store.captained_state(actor) {
            Ok(key) => key,
            Err(true) => return MembershipOutcome::NotCaptain,
            Err(false) => return MembershipOutcome::NotInState,
        };
        if actor == target {
            return MembershipOutcome::CannotTargetSelf;
        }
        if self.store.state_of(target).is_some() {
            return MembershipOutcome::AlreadyInState;
        }
        let now = self.now();
        match self.invites.send(target, state.clone(), (), now) {
            RequestOutcome::Sent => {
                let name = self.state_display(&state);
                self.ports.notify(target, "invite.received", &vars([("state", name)]));
                MembershipOutcome::Success
            }
            other => MembershipOutcome::RequestFailed(other),
        }
    }

    pub fn accept_invite(&mut self, actor: ActorId) -> MembershipOutcome {
        let now = self.now();
        let Some(request) = self.invites.take(&actor, now) else {
            return MembershipOutcome::RequestFailed(RequestOutcome::NoRequest);
        };
        self.admit(request.from, actor)
    }

    pub fn deny_invite(&mut self, actor: ActorId) -> MembershipOutcome {
        let now = self.now();
        match self.invites.take(&actor, now) {
            Some(request) => {
                self.notify_captain(&request.from, "invite.denied");
                MembershipOutcome::RequestFailed(RequestOutcome::Denied)
            }
            None => MembershipOutcome::RequestFailed(RequestOutcome::NoRequest),
        }
    }

    /// Actor asks to join a state; its captain answers
    pub fn request_join(&mut self, actor: ActorId, state_name: &str) -> MembershipOutcome {
        if self.store.state_of(actor).is_some() {
            return MembershipOutcome::AlreadyInState;
        }
        let state = NameKey::new(state_name);
        let Some(captain) = self.store.state(&state).map(|s| s.captain) else {
            return MembershipOutcome::NotInState;
        };
        let now = self.now();
        match self.joins.send(state, actor, (), now) {
            RequestOutcome::Sent => {
                self.ports
                    .notify(captain, "join.requested", &vars([("applicant", actor.to_string())]));
                MembershipOutcome::Success
            }
            other => MembershipOutcome::RequestFailed(other),
        }
    }

    pub fn accept_join(&mut self, actor: ActorId) -> MembershipOutcome {
        let state = match self.store.captained_state(actor) {
            Ok(key) => key,
            Err(true) => return MembershipOutcome::NotCaptain,
            Err(false) => return MembershipOutcome::NotInState,
        };
        let now = self.now();
        let Some(request) = self.joins.take(&state, now) else {
            return MembershipOutcome::RequestFailed(RequestOutcome::NoRequest);
        };
        self.admit(state, request.from)
    }

    pub fn deny_join(&mut self, actor: ActorId) -> MembershipOutcome {
        let state = match self.store.captained_state(actor) {
            Ok(key) => key,
            Err(true) => return MembershipOutcome::NotCaptain,
            Err(false) => return MembershipOutcome::NotInState,
        };
        let now = self.now();
        match self.joins.take(&state, now) {
            Some(request) => {
                let name = self.state_display(&state);
                self.ports.notify(request.from, "join.denied", &vars([("state", name)]));
                MembershipOutcome::RequestFailed(RequestOutcome::Denied)
            }
            None => MembershipOutcome::RequestFailed(RequestOutcome::NoRequest),
        }
    }

    fn admit(&mut self, state: NameKey, actor: ActorId) -> MembershipOutcome {
        if self.store.state_of(actor).is_some() {
            return MembershipOutcome::AlreadyInState;
        }
        if !self.store.add_member(&state, actor) {
            return MembershipOutcome::NotInState;
        }
        info!(%state, %actor, "member joined");
        if let Some(state) = self.store.state(&state) {
            let message_vars = vars([("state", state.name.clone()), ("member", actor.to_string())]);
            let members: Vec<ActorId> = state.members.iter().copied().collect();
            self.ports.notify_all(&members, "member.joined", &message_vars);
        }
        MembershipOutcome::Success
    }

    fn state_display(&self, key: &NameKey) -> String {
        self.store
            .state(key)
            .map_or_else(|| key.to_string(), |s| s.name.clone())
    }

    fn notify_captain(&mut self, state: &NameKey, message_key: &str) {
        if let Some(state) = self.store.state(state) {
            let captain = state.captain;
            let message_vars = vars([("state", state.name.clone())]);
            self.ports.notify(captain, message_key, &message_vars);
        }
    }

    // === TELEPORTS ===

    /// Ask the sector's governor (or the captain) to let the actor travel
    /// there. Managers of the sector travel without asking.
    pub fn request_teleport(&mut self, actor: ActorId, sector_name: &str) -> TeleportOutcome {
        let Some(state) = self.store.state_for(actor) else {
            return TeleportOutcome::NotInState;
        };
        let sector_key = NameKey::new(sector_name);
        let Some(sector) = state.sectors.get(&sector_key) else {
            return TeleportOutcome::SectorNotFound;
        };
        let Some(location) = sector.location.clone() else {
            return TeleportOutcome::InTransit;
        };
        if state.can_manage(actor, &sector_key) {
            return TeleportOutcome::Accepted {
                traveller: actor,
                location,
            };
        }
        let manager = sector.governor.unwrap_or(state.captain);
        let camp = CampKey::from_keys(state.key(), sector_key);
        let message_vars = vars([("traveller", actor.to_string()), ("sector", sector.name.clone())]);

        let now = self.now();
        match self.teleports.send(manager, actor, camp, now) {
            RequestOutcome::Sent => {
                self.ports.notify(manager, "teleport.requested", &message_vars);
                TeleportOutcome::Requested { manager }
            }
            other => TeleportOutcome::RequestFailed(other),
        }
    }

    pub fn accept_teleport(&mut self, actor: ActorId) -> TeleportOutcome {
        let now = self.now();
        let Some(request) = self.teleports.take(&actor, now) else {
            return TeleportOutcome::RequestFailed(RequestOutcome::NoRequest);
        };
        if self.store.state_of(request.from) != Some(&request.payload.state) {
            return TeleportOutcome::NotInState;
        }
        let Some(location) = self.store.sector_location(&request.payload).cloned() else {
            return TeleportOutcome::InTransit;
        };
        self.ports
            .notify(request.from, "teleport.accepted", &vars([("manager", actor.to_string())]));
        TeleportOutcome::Accepted {
            traveller: request.from,
            location,
        }
    }

    pub fn deny_teleport(&mut self, actor: ActorId) -> TeleportOutcome {
        let now = self.now();
        match self.teleports.take(&actor, now) {
            Some(request) => {
                self.ports
                    .notify(request.from, "teleport.denied", &vars([("manager", actor.to_string())]));
                TeleportOutcome::Denied
            }
            None => TeleportOutcome::RequestFailed(RequestOutcome::NoRequest),
        }
    }

    // === SECTOR GIFTS ===

    fn gift_blocked(&self, a: &NameKey, b: &NameKey) -> Option<GiftOutcome> {
        if self.conflict.civil_war_for(a).is_some() || self.conflict.civil_war_for(b).is_some() {
            return Some(GiftOutcome::CivilWarPending);
        }
        if self.conflict.is_at_war(a) || self.conflict.is_at_war(b) {
            return Some(GiftOutcome::AtWar);
        }
        None
    }

    /// Captain offers one of their sectors to another state
    pub fn offer_gift(&mut self, actor: ActorId, sector_name: &str, recipient_name: &str) -> GiftOutcome {
        let giver = match self.store.captained_state(actor) {
            Ok(key) => key,
            Err(true) => return GiftOutcome::NotCaptain,
            Err(false) => return GiftOutcome::NotInState,
        };
        let recipient = NameKey::new(recipient_name);
        let Some(recipient_captain) = self.store.state(&recipient).map(|s| s.captain) else {
            return GiftOutcome::StateNotFound;
        };
        if recipient == giver {
            return GiftOutcome::SameState;
        }
        let sector_key = NameKey::new(sector_name);
        let Some(state) = self.store.state(&giver) else {
            return GiftOutcome::NotInState;
        };
        let Some(sector) = state.sectors.get(&sector_key) else {
            return GiftOutcome::SectorNotFound;
        };
        if state.is_capital(&sector_key) {
            return GiftOutcome::IsCapital;
        }
        if sector.in_transit() {
            return GiftOutcome::InTransit;
        }
        if let Some(blocked) = self.gift_blocked(&giver, &recipient) {
            return blocked;
        }
        let message_vars = vars([("state", state.name.clone()), ("sector", sector.name.clone())]);

        let now = self.now();
        match self.gifts.send(recipient, giver, sector_key, now) {
            RequestOutcome::Sent => {
                self.ports
                    .notify(recipient_captain, "gift.offered", &message_vars);
                GiftOutcome::Offered
            }
            other => GiftOutcome::RequestFailed(other),
        }
    }

    /// Recipient captain accepts the pending gift. Every precondition is
    /// checked again since the world may have moved on.
    pub fn accept_gift(&mut self, actor: ActorId) -> GiftOutcome {
        let recipient = match self.store.captained_state(actor) {
            Ok(key) => key,
            Err(true) => return GiftOutcome::NotCaptain,
            Err(false) => return GiftOutcome::NotInState,
        };
        let now = self.now();
        let Some(request) = self.gifts.take(&recipient, now) else {
            return GiftOutcome::RequestFailed(RequestOutcome::NoRequest);
        };
        if let Some(blocked) = self.gift_blocked(&request.from, &recipient) {
            return blocked;
        }
        match self.store.transfer_sector(&request.from, &recipient, &request.payload) {
            Ok(result) => {
                self.store.refresh_boundary(&result.to, &self.config.placement);
                info!(from = %result.from, to = %result.to, "sector gifted");
                self.notify_captain(&request.from, "gift.accepted");
                GiftOutcome::Accepted(result)
            }
            Err(TransferError::StateNotFound) => GiftOutcome::StateNotFound,
            Err(TransferError::SectorNotFound) => GiftOutcome::SectorNotFound,
            Err(TransferError::SameState) => GiftOutcome::SameState,
            Err(TransferError::IsCapital) => GiftOutcome::IsCapital,
            Err(TransferError::InTransit) => GiftOutcome::InTransit,
        }
    }

    pub fn deny_gift(&mut self, actor: ActorId) -> GiftOutcome {
        let recipient = match self.store.captained_state(actor) {
            Ok(key) => key,
            Err(true) => return GiftOutcome::NotCaptain,
            Err(false) => return GiftOutcome::NotInState,
        };
        let now = self.now();
        match self.gifts.take(&recipient, now) {
            Some(request) => {
                self.notify_captain(&request.from, "gift.denied");
                GiftOutcome::Denied
            }
            None => GiftOutcome::RequestFailed(RequestOutcome::NoRequest),
        }
    }

    // === CAMPS ===

    /// Repair a camp; a repair that lifts a broken capital cancels its
    /// hold timer
    pub fn repair_camp(&mut self, actor: ActorId, sector_name: &str) -> RepairOutcome {
        let now = self.now();
        let outcome = repair_camp(&mut self.store, actor, sector_name, now, &self.config, &mut self.ports);
        if let RepairOutcome::Success { recovered: true, .. } = outcome {
            if let Some(state) = self.store.state_of(actor).cloned() {
                let camp = CampKey::from_keys(state, NameKey::new(sector_name));
                self.conflict.on_camp_recovered(&self.store, &camp, &mut self.ports);
                self.store.mark_dirty();
            }
        }
        outcome
    }

    pub fn maintain_camp(&mut self, actor: ActorId, sector_name: &str) -> MaintenanceOutcome {
        let now = self.now();
        maintain_camp(&mut self.store, actor, sector_name, now, &self.config, &mut self.ports)
    }

    pub fn refuel_camp(&mut self, actor: ActorId, sector_name: &str, max_items: u32) -> RefuelOutcome {
        refuel_camp(&mut self.store, actor, sector_name, max_items, &self.config, &mut self.ports)
    }

    pub fn claim_production(&mut self, actor: ActorId, sector_name: &str) -> ClaimOutcome {
        let now = self.now();
        claim_production(&mut self.store, actor, sector_name, now, &self.config, &mut self.ports)
    }

    pub fn toggle_module(&mut self, actor: ActorId, sector_name: &str, module: CampModule, enabled: bool) -> ModuleOutcome {
        toggle_module(&mut self.store, actor, sector_name, module, enabled)
    }

    pub fn unlock_module(&mut self, actor: ActorId, sector_name: &str, module: CampModule) -> ModuleOutcome {
        let now = self.now();
        unlock_module(&mut self.store, actor, sector_name, module, now, &self.config, &mut self.ports)
    }

    pub fn purchase_upgrade(&mut self, actor: ActorId, sector_name: &str, track: UpgradeTrack) -> UpgradeOutcome {
        let now = self.now();
        purchase_upgrade(
            &mut self.store,
            &self.catalog,
            actor,
            sector_name,
            track,
            now,
            &self.config,
            &mut self.ports,
        )
    }

    // === CONFLICT ===

    pub fn condemn(&mut self, actor: ActorId, target_name: &str) -> CondemnOutcome {
        let now = self.now();
        let outcome = self
            .conflict
            .condemn(&self.store, actor, target_name, now, &self.config, &mut self.ports);
        if matches!(outcome, CondemnOutcome::Success { .. }) {
            self.store.mark_dirty();
        }
        outcome
    }

    pub fn declare_war(&mut self, actor: ActorId, target_name: &str) -> DeclareOutcome {
        let now = self.now();
        let outcome = self
            .conflict
            .declare_war(&mut self.store, actor, target_name, now, &self.config, &mut self.ports);
        if matches!(outcome, DeclareOutcome::Declared { .. } | DeclareOutcome::EndedImmediately(_)) {
            self.store.mark_dirty();
        }
        outcome
    }

    pub fn join_war(&mut self, actor: ActorId, ally_name: &str) -> JoinWarOutcome {
        let outcome = self.conflict.join_war(&self.store, actor, ally_name, &mut self.ports);
        if matches!(outcome, JoinWarOutcome::Joined { .. }) {
            self.store.mark_dirty();
        }
        outcome
    }

    /// A non-captain member breaks away with one of the sectors
    pub fn secede(&mut self, actor: ActorId, rebel_name: &str, sector_name: &str) -> CivilWarOutcome {
        let now = self.now();
        let outcome = self.conflict.secede(
            &mut self.store,
            actor,
            rebel_name,
            sector_name,
            now,
            &self.config,
            &mut self.ports,
        );
        if matches!(outcome, CivilWarOutcome::Success { .. }) {
            self.teleports.cancel_from(&actor);
            self.teleports.cancel_to(&actor);
            self.store.mark_dirty();
        }
        outcome
    }

    /// Combat hook: `attacker` hit a camp of `defender`
    pub fn damage_camp(&mut self, defender: &str, sector_name: &str, amount: f64, attacker: &str) -> DamageOutcome {
        let now = self.now();
        let outcome = self.conflict.damage_camp(
            &mut self.store,
            defender,
            sector_name,
            amount,
            attacker,
            now,
            &self.config,
            &mut self.ports,
        );
        if matches!(outcome, DamageOutcome::Damaged { .. } | DamageOutcome::Broken { .. }) {
            self.store.mark_dirty();
        }
        outcome
    }

    pub fn emergency_move(&mut self, actor: ActorId, sector_name: &str) -> EmergencyMoveOutcome {
        let now = self.now();
        let outcome = self
            .conflict
            .emergency_move(&mut self.store, actor, sector_name, now, &self.config, &mut self.ports);
        if matches!(outcome, EmergencyMoveOutcome::Success { .. }) {
            self.store.mark_dirty();
        }
        outcome
    }

    pub fn offer_surrender(&mut self, actor: ActorId) -> SurrenderOutcome {
        let now = self.now();
        self.conflict.offer_surrender(&self.store, actor, now, &mut self.ports)
    }

    pub fn accept_surrender(&mut self, actor: ActorId) -> SurrenderOutcome {
        let now = self.now();
        self.conflict
            .accept_surrender(&mut self.store, actor, now, &self.config, &mut self.ports)
    }

    pub fn deny_surrender(&mut self, actor: ActorId) -> SurrenderOutcome {
        let now = self.now();
        self.conflict.deny_surrender(&self.store, actor, now, &mut self.ports)
    }

    pub fn admin_stop_war(&mut self, war_id: WarId) -> Option<WarResolution> {
        let now = self.now();
        let resolution = self
            .conflict
            .admin_stop_war(war_id, &self.store, now, &mut self.ports)?;
        self.store.mark_dirty();
        Some(resolution)
    }

    /// Combat hook: a rebel captain killed by a member of the origin state
    /// ends the secession. Returns true if a civil war was crushed.
    pub fn on_actor_killed(&mut self, victim: ActorId, killer: ActorId) -> bool {
        let now = self.now();
        let crushed = self
            .conflict
            .on_actor_killed(&mut self.store, victim, killer, now, &mut self.ports);
        if crushed {
            self.store.mark_dirty();
        }
        crushed
    }

    // === SCHEDULER ===

    /// One scheduler pass: upkeep over every camp, then hold timers and
    /// raids, then a periodic sweep of expired requests
    pub fn tick(&mut self) -> FrontierTick {
        let now = self.now();
        self.ticks += 1;
        let upkeep = run_upkeep(&mut self.store, &self.config, &mut self.ports, now);
        let conflict = self.conflict.tick(&mut self.store, now, &self.config, &mut self.ports);
        if !conflict.resolved.is_empty() || conflict.raids > 0 {
            self.store.mark_dirty();
        }

        let mut swept = 0;
        let every = self.config.upkeep.sweep_every_ticks.max(1);
        if self.ticks % every == 0 {
            swept += self.invites.sweep(now);
            swept += self.joins.sweep(now);
            swept += self.teleports.sweep(now);
            swept += self.gifts.sweep(now);
        }

        debug!(
            tick = self.ticks,
            camps = upkeep.camps_visited,
            wars_resolved = conflict.resolved.len(),
            raids = conflict.raids,
            swept,
            "frontier tick"
        );
        FrontierTick {
            tick: self.ticks,
            upkeep,
            conflict,
            swept,
        }
    }

    // === PERSISTENCE ===

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.store, &self.conflict)
    }

    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        self.snapshot().save(path)
    }

    /// Load persisted state into this (empty) frontier
    pub fn load_snapshot(&mut self, json: &str) -> Result<LoadReport> {
        Snapshot::load_into(json, &mut self.store, &mut self.conflict, &self.catalog, &self.config)
    }

    pub fn load_snapshot_file(&mut self, path: &Path) -> Result<LoadReport> {
        Snapshot::load_file(path, &mut self.store, &mut self.conflict, &self.catalog, &self.config)
    }
}

impl std::fmt::Debug for Frontier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frontier")
            .field("states", &self.store.state_count())
            .field("camps", &self.store.camp_count())
            .field("wars", &self.conflict.war_count())
            .field("ticks", &self.ticks)
            .finish()
    }
}
