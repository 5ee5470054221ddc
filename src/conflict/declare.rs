//! Condemnation, war declaration, allies and civil war

use tracing::info;

use crate::conflict::engine::{capital_is_broken, display_state, notify_states, ConflictEngine};
use crate::conflict::resolution::{EndReason, WarResolution};
use crate::conflict::war::{Condemnation, PendingCivilWar, Side, War, WarId};
use crate::core::config::FrontierConfig;
use crate::core::types::{secs, vars, ActorId, ItemStack, NameKey, Timestamp};
use crate::ports::Ports;
use crate::territory::state::State;
use crate::territory::store::{NameError, TerritoryStore};

#[derive(Debug, Clone, PartialEq)]
pub enum CondemnOutcome {
    Success { matures_at: Timestamp },
    NotInState,
    NotCaptain,
    TargetNotFound,
    SelfTarget,
    AlreadyAtWar,
    CivilWarPending,
    Cooldown { remaining_ms: Timestamp },
    /// A state condemns one target at a time
    AlreadyCondemning { target: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclareOutcome {
    Declared { war_id: WarId },
    /// A capital was already broken; the war was decided on the spot
    EndedImmediately(WarResolution),
    NotInState,
    NotCaptain,
    TargetNotFound,
    SelfTarget,
    AlreadyAtWar,
    TargetAtWar,
    CivilWarPending,
    NoCondemnation,
    CondemnationPending { remaining_ms: Timestamp },
    Cooldown { remaining_ms: Timestamp },
    NotEnoughMembers { required: usize },
    NotEnoughSectors { required: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinWarOutcome {
    Joined { war_id: WarId, side: Side },
    NotInState,
    NotCaptain,
    StateNotFound,
    SameState,
    /// The named state is not fighting
    NotAtWar,
    AlreadyAtWar,
    CivilWarPending,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CivilWarOutcome {
    /// Rebel state created; waiting for its first camp
    Success { rebel: NameKey },
    NotInState,
    IsCaptain,
    OriginAtWar,
    AlreadyPending,
    PlacementPending,
    InvalidName,
    NameReserved,
    NameTaken,
    MissingItems,
}

impl ConflictEngine {
    /// Start the maturation clock for an attack on `target_name`
    pub fn condemn(
        &mut self,
        store: &TerritoryStore,
        actor: ActorId,
        target_name: &str,
        now: Timestamp,
        config: &FrontierConfig,
        ports: &mut Ports,
    ) -> CondemnOutcome {
        let attacker = match store.captained_state(actor) {
            Ok(key) => key,
            Err(true) => return CondemnOutcome::NotCaptain,
            Err(false) => return CondemnOutcome::NotInState,
        };
        let target = NameKey::new(target_name);
        if store.state(&target).is_none() {
            return CondemnOutcome::TargetNotFound;
        }
        if target == attacker {
            return CondemnOutcome::SelfTarget;
        }
        if self.is_at_war(&attacker) {
            return CondemnOutcome::AlreadyAtWar;
        }
        if self.civil_war_for(&attacker).is_some() {
            return CondemnOutcome::CivilWarPending;
        }
        if let Some(remaining_ms) = self.cooldowns.condemn.remaining(&attacker, now) {
            return CondemnOutcome::Cooldown { remaining_ms };
        }
        if let Some(existing) = self.condemnations.get(&attacker) {
            return CondemnOutcome::AlreadyCondemning {
                target: display_state(store, &existing.target),
            };
        }

        let condemnation = Condemnation {
            attacker: attacker.clone(),
            target: target.clone(),
            started_at: now,
            delay: secs(config.war.condemnation_delay_secs),
        };
        let matures_at = condemnation.matures_at();
        self.condemnations.insert(attacker.clone(), condemnation);
        self.cooldowns
            .condemn
            .start(attacker.clone(), now, secs(config.war.condemn_cooldown_secs));
        info!(%attacker, %target, matures_at, "condemnation issued");

        let message_vars = vars([
            ("attacker", display_state(store, &attacker)),
            ("target", display_state(store, &target)),
            ("delay", config.war.condemnation_delay_secs.to_string()),
        ]);
        notify_states(store, ports, [&attacker, &target], "war.condemned", &message_vars);
        CondemnOutcome::Success { matures_at }
    }

    /// Turn a matured condemnation into a war
    pub fn declare_war(
        &mut self,
        store: &mut TerritoryStore,
        actor: ActorId,
        target_name: &str,
        now: Timestamp,
        config: &FrontierConfig,
        ports: &mut Ports,
    ) -> DeclareOutcome {
        let attacker = match store.captained_state(actor) {
            Ok(key) => key,
            Err(true) => return DeclareOutcome::NotCaptain,
            Err(false) => return DeclareOutcome::NotInState,
        };
        let target = NameKey::new(target_name);
        if store.state(&target).is_none() {
            return DeclareOutcome::TargetNotFound;
        }
        if target == attacker {
            return DeclareOutcome::SelfTarget;
        }
        if self.is_at_war(&attacker) {
            return DeclareOutcome::AlreadyAtWar;
        }
        if self.is_at_war(&target) {
            return DeclareOutcome::TargetAtWar;
        }
        if self.civil_war_for(&attacker).is_some() || self.civil_war_for(&target).is_some() {
            return DeclareOutcome::CivilWarPending;
        }
        let Some(condemnation) = self.condemnations.get(&attacker).filter(|c| c.target == target) else {
            return DeclareOutcome::NoCondemnation;
        };
        if !condemnation.is_mature(now) {
            return DeclareOutcome::CondemnationPending {
                remaining_ms: condemnation.matures_at() - now,
            };
        }
        if let Some(remaining_ms) = self.cooldowns.declare.remaining(&attacker, now) {
            return DeclareOutcome::Cooldown { remaining_ms };
        }
        let Some(state) = store.state(&attacker) else {
            return DeclareOutcome::NotInState;
        };
        if state.members.len() < config.war.min_members {
            return DeclareOutcome::NotEnoughMembers {
                required: config.war.min_members,
            };
        }
        if state.sectors.len() < config.war.min_sectors {
            return DeclareOutcome::NotEnoughSectors {
                required: config.war.min_sectors,
            };
        }

        self.condemnations.remove(&attacker);
        self.cooldowns
            .declare
            .start(attacker.clone(), now, secs(config.war.declare_cooldown_secs));
        let war_id = self.start_war(store, attacker, target, now, ports);
        match self.resolve_if_capital_broken(store, war_id, now, config, ports) {
            Some(resolution) => DeclareOutcome::EndedImmediately(resolution),
            None => DeclareOutcome::Declared { war_id },
        }
    }

    /// Create the war record, announce it and reveal every camp location to
    /// the other side
    pub(crate) fn start_war(
        &mut self,
        store: &TerritoryStore,
        attacker: NameKey,
        defender: NameKey,
        now: Timestamp,
        ports: &mut Ports,
    ) -> WarId {
        let id = self.allocate_war_id();
        let war = War::new(id, attacker.clone(), defender.clone(), now);
        info!(war = id, %attacker, %defender, "war declared");

        let message_vars = vars([
            ("attacker", display_state(store, &attacker)),
            ("defender", display_state(store, &defender)),
        ]);
        notify_states(store, ports, war.participants(), "war.declared", &message_vars);
        reveal_camps(store, ports, &attacker, &defender);
        reveal_camps(store, ports, &defender, &attacker);
        self.wars.insert(id, war);
        id
    }

    /// A war that starts with a broken capital is decided immediately; the
    /// attacker's capital is checked first
    fn resolve_if_capital_broken(
        &mut self,
        store: &mut TerritoryStore,
        war_id: WarId,
        now: Timestamp,
        config: &FrontierConfig,
        ports: &mut Ports,
    ) -> Option<WarResolution> {
        let war = self.wars.get(&war_id)?;
        let winner = if capital_is_broken(store, &war.attacker) {
            Side::Defender
        } else if capital_is_broken(store, &war.defender) {
            Side::Attacker
        } else {
            return None;
        };
        self.end_war(store, war_id, winner, EndReason::CapitalAlreadyBroken, now, config, ports)
    }

    /// Captain brings their state into the war on `ally_name`'s side
    pub fn join_war(&mut self, store: &TerritoryStore, actor: ActorId, ally_name: &str, ports: &mut Ports) -> JoinWarOutcome {
        let own = match store.captained_state(actor) {
            Ok(key) => key,
            Err(true) => return JoinWarOutcome::NotCaptain,
            Err(false) => return JoinWarOutcome::NotInState,
        };
        let ally = NameKey::new(ally_name);
        if store.state(&ally).is_none() {
            return JoinWarOutcome::StateNotFound;
        }
        if ally == own {
            return JoinWarOutcome::SameState;
        }
        if self.is_at_war(&own) {
            return JoinWarOutcome::AlreadyAtWar;
        }
        if self.civil_war_for(&own).is_some() {
            return JoinWarOutcome::CivilWarPending;
        }
        let Some((war_id, side)) = self
            .war_of(&ally)
            .and_then(|w| w.side_of(&ally).map(|side| (w.id, side)))
        else {
            return JoinWarOutcome::NotAtWar;
        };
        let Some(war) = self.wars.get_mut(&war_id) else {
            return JoinWarOutcome::NotAtWar;
        };
        war.side_mut(side).insert(own.clone());
        let enemy = war.primary(side.opposite()).clone();
        let enemies: Vec<NameKey> = war.side(side.opposite()).iter().cloned().collect();
        info!(war = war_id, state = %own, ?side, "ally joined war");

        let message_vars = vars([
            ("state", display_state(store, &own)),
            ("ally", display_state(store, &ally)),
            ("enemy", display_state(store, &enemy)),
        ]);
        if let Some(war) = self.wars.get(&war_id) {
            notify_states(store, ports, war.participants(), "war.ally_joined", &message_vars);
        }
        for enemy in &enemies {
            reveal_camps(store, ports, &own, enemy);
        }
        JoinWarOutcome::Joined { war_id, side }
    }

    /// A non-captain member breaks away, founding a rebel state that is at
    /// civil war with its origin once its first camp stands
    #[allow(clippy::too_many_arguments)]
    pub fn secede(
        &mut self,
        store: &mut TerritoryStore,
        actor: ActorId,
        rebel_name: &str,
        sector_name: &str,
        now: Timestamp,
        config: &FrontierConfig,
        ports: &mut Ports,
    ) -> CivilWarOutcome {
        let Some(origin) = store.state_of(actor).cloned() else {
            return CivilWarOutcome::NotInState;
        };
        if store.state(&origin).map_or(false, |s| s.captain == actor) {
            return CivilWarOutcome::IsCaptain;
        }
        if self.is_at_war(&origin) {
            return CivilWarOutcome::OriginAtWar;
        }
        if self.civil_war_for(&origin).is_some() {
            return CivilWarOutcome::AlreadyPending;
        }
        if store.pending_placement(actor).is_some() {
            return CivilWarOutcome::PlacementPending;
        }
        for name in [rebel_name, sector_name] {
            match TerritoryStore::check_name(name, &config.states) {
                Ok(()) => {}
                Err(NameError::Reserved) => return CivilWarOutcome::NameReserved,
                Err(_) => return CivilWarOutcome::InvalidName,
            }
        }
        let rebel = NameKey::new(rebel_name);
        if !store.state_name_free(&rebel) {
            return CivilWarOutcome::NameTaken;
        }
        let item = [ItemStack::new(config.war.civil_war_item.clone(), 1)];
        if !ports.has_items(actor, &item) {
            return CivilWarOutcome::MissingItems;
        }

        ports.consume_items(actor, &item);
        store.remove_member(&origin, actor, ports.world.as_mut());
        store.insert_state(State::new(rebel_name.trim(), actor, now));
        store.grant_first_placement(actor, &rebel, sector_name, now);
        self.condemnations.insert(
            rebel.clone(),
            Condemnation {
                attacker: rebel.clone(),
                target: origin.clone(),
                started_at: now,
                delay: 0,
            },
        );
        self.civil_wars.insert(
            rebel.clone(),
            PendingCivilWar {
                rebel: rebel.clone(),
                origin: origin.clone(),
                seceder: actor,
                started_at: now,
            },
        );
        info!(%rebel, %origin, %actor, "secession started");

        let message_vars = vars([
            ("rebel", rebel_name.trim().to_string()),
            ("origin", display_state(store, &origin)),
        ]);
        notify_states(store, ports, [&origin, &rebel], "civil_war.seceded", &message_vars);
        CivilWarOutcome::Success { rebel }
    }

    /// Called after a camp was placed for `state`; turns a pending civil war
    /// into a real one once the rebel has its first camp
    pub fn on_camp_placed(
        &mut self,
        store: &mut TerritoryStore,
        state: &NameKey,
        now: Timestamp,
        config: &FrontierConfig,
        ports: &mut Ports,
    ) -> Option<DeclareOutcome> {
        let civil = self.civil_wars.get(state)?;
        if store.state(state).map_or(true, |s| s.sectors.is_empty()) {
            return None;
        }
        let (rebel, origin) = (civil.rebel.clone(), civil.origin.clone());
        self.civil_wars.remove(state);
        self.condemnations.remove(&rebel);
        if store.state(&origin).is_none() {
            return None;
        }
        info!(%rebel, %origin, "civil war begins");
        let war_id = self.start_war(store, rebel, origin, now, ports);
        Some(match self.resolve_if_capital_broken(store, war_id, now, config, ports) {
            Some(resolution) => DeclareOutcome::EndedImmediately(resolution),
            None => DeclareOutcome::Declared { war_id },
        })
    }

    /// A seceder killed by their origin's members before the rebel camp
    /// stands ends the rebellion. Returns true if one was aborted.
    pub fn on_actor_killed(
        &mut self,
        store: &mut TerritoryStore,
        victim: ActorId,
        killer: ActorId,
        now: Timestamp,
        ports: &mut Ports,
    ) -> bool {
        let killer_state = store.state_of(killer).cloned();
        let Some(rebel) = self
            .civil_wars
            .values()
            .find(|c| c.seceder == victim && Some(&c.origin) == killer_state.as_ref())
            .map(|c| c.rebel.clone())
        else {
            return false;
        };
        if store.state(&rebel).map_or(false, |s| !s.sectors.is_empty()) {
            return false;
        }
        let Some(civil) = self.civil_wars.remove(&rebel) else {
            return false;
        };
        let message_vars = vars([
            ("rebel", display_state(store, &rebel)),
            ("origin", display_state(store, &civil.origin)),
        ]);
        notify_states(store, ports, [&civil.origin, &rebel], "civil_war.aborted", &message_vars);

        self.remove_state(&rebel, store, now, ports);
        store.drop_pending(victim);
        store.remove_state(&rebel, ports.world.as_mut());
        info!(%rebel, origin = %civil.origin, "secession crushed");
        true
    }
}

/// Send every located camp of `owner` to the members of `viewer`
fn reveal_camps(store: &TerritoryStore, ports: &mut Ports, owner: &NameKey, viewer: &NameKey) {
    let (Some(owner), Some(viewer)) = (store.state(owner), store.state(viewer)) else {
        return;
    };
    for sector in owner.sectors.values() {
        let Some(location) = &sector.location else {
            continue;
        };
        let mut message_vars = location.vars();
        message_vars.push(("state".into(), owner.name.clone()));
        message_vars.push(("sector".into(), sector.name.clone()));
        ports.notify_all(&viewer.members, "war.camp_revealed", &message_vars);
    }
}
