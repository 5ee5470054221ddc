//! Camp damage, capital recovery, emergency relocation and surrender

use tracing::{debug, info};

use crate::conflict::engine::{display_state, notify_states, ConflictEngine};
use crate::conflict::resolution::{EndReason, WarResolution};
use crate::conflict::war::WarId;
use crate::core::config::FrontierConfig;
use crate::core::types::{secs, vars, ActorId, CampKey, NameKey, Timestamp};
use crate::ports::Ports;
use crate::requests::RequestOutcome;
use crate::territory::camp::DamageEffect;
use crate::territory::store::TerritoryStore;

#[derive(Debug, Clone, PartialEq)]
pub enum DamageOutcome {
    /// The two states are not enemies
    NotAtWar,
    /// No camp there, or its sector is in transit
    CampNotFound,
    /// Camp was already broken
    Inert,
    Damaged { hp: f64 },
    Broken { capital: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub enum EmergencyMoveOutcome {
    Success { capital: String },
    NotInState,
    NotCaptain,
    NotAtWar,
    AlreadyUsed,
    Cooldown { remaining_ms: Timestamp },
    SectorNotFound,
    AlreadyCapital,
    InTransit,
    TargetBroken,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurrenderOutcome {
    Offered,
    Accepted(WarResolution),
    Denied,
    NotInState,
    NotCaptain,
    NotAtWar,
    NotPrimary,
    AlreadyOffered,
    NoOffer,
}

impl ConflictEngine {
    /// Apply combat damage from `attacker_name` to a camp of `defender_name`
    #[allow(clippy::too_many_arguments)]
    pub fn damage_camp(
        &mut self,
        store: &mut TerritoryStore,
        defender_name: &str,
        sector_name: &str,
        amount: f64,
        attacker_name: &str,
        now: Timestamp,
        config: &FrontierConfig,
        ports: &mut Ports,
    ) -> DamageOutcome {
        let defender = NameKey::new(defender_name);
        let attacker = NameKey::new(attacker_name);
        let Some(war_id) = self
            .wars
            .values()
            .find(|w| w.are_enemies(&attacker, &defender))
            .map(|w| w.id)
        else {
            return DamageOutcome::NotAtWar;
        };
        let camp_key = CampKey::new(defender_name, sector_name);
        let Some(location) = store.sector_location(&camp_key).cloned() else {
            return DamageOutcome::CampNotFound;
        };
        let Some(camp) = store.camp_mut(&camp_key) else {
            return DamageOutcome::CampNotFound;
        };

        match camp.apply_damage(amount, now) {
            DamageEffect::Inert => {
                ports.world.clear_camp_effects(&camp_key, &location);
                DamageOutcome::Inert
            }
            DamageEffect::Damaged { hp } => {
                store.mark_dirty();
                DamageOutcome::Damaged { hp }
            }
            DamageEffect::Broken => {
                store.mark_dirty();
                ports.world.clear_camp_effects(&camp_key, &location);
                let capital = store.state(&defender).map_or(false, |s| s.is_capital(&camp_key.sector));
                let hold = secs(config.war.capital_hold_secs);
                if let Some(war) = self.wars.get_mut(&war_id) {
                    if capital {
                        war.capital_broken_at.insert(defender.clone(), now);
                        if war.is_primary(&defender) {
                            self.hold_timers
                                .schedule(defender.clone(), war_id, now.saturating_add(hold));
                        }
                    }
                }
                info!(war = war_id, camp = %camp_key, capital, "camp broken");

                let (state_name, sector) = store.display_names(&camp_key);
                let message_vars = vars([
                    ("state", state_name),
                    ("sector", sector),
                    ("attacker", display_state(store, &attacker)),
                    ("hold", config.war.capital_hold_secs.to_string()),
                ]);
                let key = if capital { "war.capital_broken" } else { "war.camp_broken" };
                if let Some(war) = self.wars.get(&war_id) {
                    notify_states(store, ports, war.participants(), key, &message_vars);
                }
                DamageOutcome::Broken { capital }
            }
        }
    }

    /// A repaired camp came back from broken. If it is a capital under a
    /// hold timer the timer is cancelled. Returns true if one was.
    pub fn on_camp_recovered(&mut self, store: &TerritoryStore, camp: &CampKey, ports: &mut Ports) -> bool {
        let is_capital = store.state(&camp.state).map_or(false, |s| s.is_capital(&camp.sector));
        if !is_capital {
            return false;
        }
        let Some(war) = self
            .wars
            .values_mut()
            .find(|w| w.capital_broken_at.contains_key(&camp.state))
        else {
            return false;
        };
        war.capital_broken_at.remove(&camp.state);
        self.hold_timers.cancel(&camp.state);
        debug!(state = %camp.state, "capital recovered, hold timer cancelled");

        let message_vars = vars([("state", display_state(store, &camp.state))]);
        if let Some(war) = self.war_of(&camp.state) {
            notify_states(store, ports, war.participants(), "war.capital_recovered", &message_vars);
        }
        true
    }

    /// Wartime capital relocation, once per state per war
    pub fn emergency_move(
        &mut self,
        store: &mut TerritoryStore,
        actor: ActorId,
        sector_name: &str,
        now: Timestamp,
        config: &FrontierConfig,
        ports: &mut Ports,
    ) -> EmergencyMoveOutcome {
        let state_key = match store.captained_state(actor) {
            Ok(key) => key,
            Err(true) => return EmergencyMoveOutcome::NotCaptain,
            Err(false) => return EmergencyMoveOutcome::NotInState,
        };
        let Some(war) = self.war_of(&state_key) else {
            return EmergencyMoveOutcome::NotAtWar;
        };
        let war_id = war.id;
        if war.emergency_move_used.contains(&state_key) {
            return EmergencyMoveOutcome::AlreadyUsed;
        }
        if let Some(remaining_ms) = self.cooldowns.emergency_move.remaining(&state_key, now) {
            return EmergencyMoveOutcome::Cooldown { remaining_ms };
        }
        let sector_key = NameKey::new(sector_name);
        let Some(state) = store.state(&state_key) else {
            return EmergencyMoveOutcome::NotInState;
        };
        let Some(sector) = state.sectors.get(&sector_key) else {
            return EmergencyMoveOutcome::SectorNotFound;
        };
        if state.is_capital(&sector_key) {
            return EmergencyMoveOutcome::AlreadyCapital;
        }
        if sector.in_transit() {
            return EmergencyMoveOutcome::InTransit;
        }
        let camp_key = CampKey::from_keys(state_key.clone(), sector_key);
        if store.camp(&camp_key).map_or(true, |c| c.is_broken()) {
            return EmergencyMoveOutcome::TargetBroken;
        }

        let capital = sector.name.clone();
        if let Some(state) = store.state_mut(&state_key) {
            state.capital = Some(capital.clone());
        }
        store.mark_dirty();
        if let Some(war) = self.wars.get_mut(&war_id) {
            war.emergency_move_used.insert(state_key.clone());
            war.capital_broken_at.remove(&state_key);
        }
        self.hold_timers.cancel(&state_key);
        self.cooldowns.emergency_move.start(
            state_key.clone(),
            now,
            secs(config.war.emergency_move_cooldown_secs),
        );
        info!(war = war_id, state = %state_key, %capital, "emergency capital move");

        let message_vars = vars([
            ("state", display_state(store, &state_key)),
            ("sector", capital.clone()),
        ]);
        if let Some(war) = self.wars.get(&war_id) {
            notify_states(store, ports, war.participants(), "war.emergency_move", &message_vars);
        }
        EmergencyMoveOutcome::Success { capital }
    }

    /// The captain of a primary party offers surrender to the other
    pub fn offer_surrender(&mut self, store: &TerritoryStore, actor: ActorId, now: Timestamp, ports: &mut Ports) -> SurrenderOutcome {
        let own = match store.captained_state(actor) {
            Ok(key) => key,
            Err(true) => return SurrenderOutcome::NotCaptain,
            Err(false) => return SurrenderOutcome::NotInState,
        };
        let Some(war) = self.war_of(&own) else {
            return SurrenderOutcome::NotAtWar;
        };
        if !war.is_primary(&own) {
            return SurrenderOutcome::NotPrimary;
        }
        let war_id = war.id;
        let Some(opponent) = war.side_of(&own).map(|side| war.primary(side.opposite()).clone()) else {
            return SurrenderOutcome::NotAtWar;
        };
        let live = |to: &NameKey| self.surrenders.pending(to, now).map_or(false, |r| r.payload == war_id);
        if live(&own) || live(&opponent) {
            return SurrenderOutcome::AlreadyOffered;
        }
        match self.surrenders.send(opponent.clone(), own.clone(), war_id, now) {
            RequestOutcome::Sent => {}
            _ => return SurrenderOutcome::AlreadyOffered,
        }
        info!(war = war_id, from = %own, "surrender offered");
        let message_vars = vars([("state", display_state(store, &own))]);
        notify_states(store, ports, [&opponent], "war.surrender_offered", &message_vars);
        SurrenderOutcome::Offered
    }

    /// Accepting a surrender wins the war for the acceptor's side
    pub fn accept_surrender(
        &mut self,
        store: &mut TerritoryStore,
        actor: ActorId,
        now: Timestamp,
        config: &FrontierConfig,
        ports: &mut Ports,
    ) -> SurrenderOutcome {
        let own = match store.captained_state(actor) {
            Ok(key) => key,
            Err(true) => return SurrenderOutcome::NotCaptain,
            Err(false) => return SurrenderOutcome::NotInState,
        };
        let Some((war_id, side)) = self
            .war_of(&own)
            .and_then(|w| w.side_of(&own).map(|side| (w.id, side)))
        else {
            return SurrenderOutcome::NotAtWar;
        };
        let offered = self.surrenders.pending(&own, now).map_or(false, |r| r.payload == war_id);
        if !offered {
            return SurrenderOutcome::NoOffer;
        }
        self.surrenders.take(&own, now);
        match self.end_war(store, war_id, side, EndReason::Surrender, now, config, ports) {
            Some(resolution) => SurrenderOutcome::Accepted(resolution),
            None => SurrenderOutcome::NotAtWar,
        }
    }

    pub fn deny_surrender(&mut self, store: &TerritoryStore, actor: ActorId, now: Timestamp, ports: &mut Ports) -> SurrenderOutcome {
        let own = match store.captained_state(actor) {
            Ok(key) => key,
            Err(true) => return SurrenderOutcome::NotCaptain,
            Err(false) => return SurrenderOutcome::NotInState,
        };
        let Some(offer) = self.surrenders.take(&own, now) else {
            return SurrenderOutcome::NoOffer;
        };
        let message_vars = vars([("state", display_state(store, &own))]);
        notify_states(store, ports, [&offer.from], "war.surrender_denied", &message_vars);
        SurrenderOutcome::Denied
    }

    /// Live surrender offer addressed to `state`, if any
    pub fn surrender_offer_for(&self, state: &NameKey, now: Timestamp) -> Option<(NameKey, WarId)> {
        self.surrenders
            .pending(state, now)
            .map(|r| (r.from.clone(), r.payload))
    }
}
