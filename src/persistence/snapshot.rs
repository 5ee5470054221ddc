//! Snapshot save/load
//!
//! Saving writes one typed [`Snapshot`]. Loading reads every entity as raw
//! JSON first and decodes it on its own, so a malformed or inconsistent
//! entry is skipped with a warning instead of failing the whole load.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::conflict::{ConflictEngine, Condemnation, PendingCivilWar, War, WarId};
use crate::core::config::FrontierConfig;
use crate::core::cooldown::CooldownMap;
use crate::core::error::{FrontierError, Result};
use crate::core::types::{ActorId, CampKey, NameKey, Timestamp};
use crate::territory::camp::Camp;
use crate::territory::placement::{PendingPlacement, PlacementKind};
use crate::territory::state::State;
use crate::territory::store::TerritoryStore;
use crate::upgrades::{reapply_all, UpgradeCatalog};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampEntry {
    pub key: CampKey,
    pub camp: Camp,
}

/// Everything needed to rebuild the store and the conflict engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub next_war_id: WarId,
    pub states: Vec<State>,
    pub camps: Vec<CampEntry>,
    pub pending: Vec<PendingPlacement>,
    pub reserved: Vec<(NameKey, ActorId)>,
    pub wars: Vec<War>,
    pub condemnations: Vec<Condemnation>,
    pub civil_wars: Vec<PendingCivilWar>,
    pub cooldowns: CooldownSnapshot,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownSnapshot {
    pub founding: Vec<(ActorId, Timestamp)>,
    pub sector_add: Vec<(NameKey, Timestamp)>,
    pub sector_move: Vec<(CampKey, Timestamp)>,
    pub capital_move: Vec<(NameKey, Timestamp)>,
    pub condemn: Vec<(NameKey, Timestamp)>,
    pub declare: Vec<(NameKey, Timestamp)>,
    pub emergency_move: Vec<(NameKey, Timestamp)>,
}

/// Load-side mirror of [`Snapshot`] with every entity left undecoded
#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawSnapshot {
    version: u32,
    next_war_id: WarId,
    states: Vec<Value>,
    camps: Vec<Value>,
    pending: Vec<Value>,
    reserved: Vec<Value>,
    wars: Vec<Value>,
    condemnations: Vec<Value>,
    civil_wars: Vec<Value>,
    cooldowns: Value,
}

impl Default for RawSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            next_war_id: 1,
            states: Vec::new(),
            camps: Vec::new(),
            pending: Vec::new(),
            reserved: Vec::new(),
            wars: Vec::new(),
            condemnations: Vec::new(),
            civil_wars: Vec::new(),
            cooldowns: Value::Null,
        }
    }
}

/// What a load restored
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub states: usize,
    pub camps: usize,
    pub wars: usize,
    /// Entries dropped as malformed or inconsistent
    pub skipped: usize,
}

impl Snapshot {
    /// Capture the current store and conflict state, sorted for stable output
    pub fn capture(store: &TerritoryStore, conflict: &ConflictEngine) -> Self {
        let mut states: Vec<State> = store.states.values().cloned().collect();
        states.sort_by_key(|s| s.key());

        let camps = store
            .camp_keys_sorted()
            .into_iter()
            .filter_map(|key| store.camps.get(&key).cloned().map(|camp| CampEntry { key, camp }))
            .collect();

        let mut pending: Vec<PendingPlacement> = store.pending.values().cloned().collect();
        pending.sort_by_key(|p| p.actor);

        let mut reserved: Vec<(NameKey, ActorId)> = store.reserved.iter().map(|(k, a)| (k.clone(), *a)).collect();
        reserved.sort();

        let mut condemnations: Vec<Condemnation> = conflict.condemnations.values().cloned().collect();
        condemnations.sort_by(|a, b| a.attacker.cmp(&b.attacker));

        let mut civil_wars: Vec<PendingCivilWar> = conflict.civil_wars.values().cloned().collect();
        civil_wars.sort_by(|a, b| a.rebel.cmp(&b.rebel));

        Self {
            version: SNAPSHOT_VERSION,
            next_war_id: conflict.next_war_id,
            states,
            camps,
            pending,
            reserved,
            wars: conflict.wars.values().cloned().collect(),
            condemnations,
            civil_wars,
            cooldowns: CooldownSnapshot {
                founding: store.cooldowns.founding.entries(),
                sector_add: store.cooldowns.sector_add.entries(),
                sector_move: store.cooldowns.sector_move.entries(),
                capital_move: store.cooldowns.capital_move.entries(),
                condemn: conflict.cooldowns.condemn.entries(),
                declare: conflict.cooldowns.declare.entries(),
                emergency_move: conflict.cooldowns.emergency_move.entries(),
            },
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write to `path` through a temporary file so a crash never leaves a
    /// half-written snapshot behind
    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, self.to_json()?)?;
        fs::rename(&tmp, path)?;
        info!(path = %path.display(), states = self.states.len(), "snapshot saved");
        Ok(())
    }

    pub fn load_file(
        path: &Path,
        store: &mut TerritoryStore,
        conflict: &mut ConflictEngine,
        catalog: &UpgradeCatalog,
        config: &FrontierConfig,
    ) -> Result<LoadReport> {
        let json = fs::read_to_string(path)?;
        Self::load_into(&json, store, conflict, catalog, config)
    }

    /// Load a snapshot into an empty store and a fresh conflict engine.
    /// Hold timers are rebuilt and upgrade stats re-derived afterwards.
    pub fn load_into(
        json: &str,
        store: &mut TerritoryStore,
        conflict: &mut ConflictEngine,
        catalog: &UpgradeCatalog,
        config: &FrontierConfig,
    ) -> Result<LoadReport> {
        if !store.is_empty() || conflict.war_count() > 0 {
            return Err(FrontierError::StoreNotEmpty);
        }
        let raw: RawSnapshot = serde_json::from_str(json)?;
        if raw.version > SNAPSHOT_VERSION {
            return Err(FrontierError::UnsupportedSnapshot {
                found: raw.version,
                supported: SNAPSHOT_VERSION,
            });
        }

        let mut report = LoadReport::default();
        load_states(store, decode_each("state", raw.states, &mut report.skipped), &mut report);
        load_camps(store, decode_each("camp", raw.camps, &mut report.skipped), &mut report);
        let recreated = fill_missing_camps(store, config);

        for pending in decode_each::<PendingPlacement>("pending placement", raw.pending, &mut report.skipped) {
            let member_of = store.membership.get(&pending.actor);
            let foreign = match &pending.kind {
                PlacementKind::NewState { .. } => member_of.is_some(),
                _ => member_of != Some(&pending.state_key()),
            };
            if foreign {
                warn!(actor = %pending.actor, "skipping pending placement for a foreign state");
                report.skipped += 1;
                continue;
            }
            store.pending.insert(pending.actor, pending);
        }
        for (name, actor) in decode_each::<(NameKey, ActorId)>("reservation", raw.reserved, &mut report.skipped) {
            if store.states.contains_key(&name) {
                report.skipped += 1;
                continue;
            }
            store.reserved.insert(name, actor);
        }

        let cooldowns: CooldownSnapshot = if raw.cooldowns.is_null() {
            CooldownSnapshot::default()
        } else {
            match serde_json::from_value(raw.cooldowns) {
                Ok(cooldowns) => cooldowns,
                Err(err) => {
                    warn!(%err, "skipping malformed cooldown table");
                    report.skipped += 1;
                    CooldownSnapshot::default()
                }
            }
        };
        store.cooldowns.founding = CooldownMap::from_entries(cooldowns.founding);
        store.cooldowns.sector_add = CooldownMap::from_entries(cooldowns.sector_add);
        store.cooldowns.sector_move = CooldownMap::from_entries(cooldowns.sector_move);
        store.cooldowns.capital_move = CooldownMap::from_entries(cooldowns.capital_move);
        conflict.cooldowns.condemn = CooldownMap::from_entries(cooldowns.condemn);
        conflict.cooldowns.declare = CooldownMap::from_entries(cooldowns.declare);
        conflict.cooldowns.emergency_move = CooldownMap::from_entries(cooldowns.emergency_move);

        let mut next_war_id = raw.next_war_id.max(1);
        for war in decode_each::<War>("war", raw.wars, &mut report.skipped) {
            let parties_exist = store.states.contains_key(&war.attacker) && store.states.contains_key(&war.defender);
            if !parties_exist || conflict.wars.contains_key(&war.id) {
                warn!(war = war.id, "skipping war with missing parties or duplicate id");
                report.skipped += 1;
                continue;
            }
            let mut war = war;
            war.attacker_side.retain(|s| store.states.contains_key(s));
            war.defender_side.retain(|s| store.states.contains_key(s));
            next_war_id = next_war_id.max(war.id + 1);
            conflict.wars.insert(war.id, war);
            report.wars += 1;
        }
        conflict.next_war_id = next_war_id;

        for condemnation in decode_each::<Condemnation>("condemnation", raw.condemnations, &mut report.skipped) {
            if !store.states.contains_key(&condemnation.attacker) || !store.states.contains_key(&condemnation.target) {
                report.skipped += 1;
                continue;
            }
            conflict.condemnations.insert(condemnation.attacker.clone(), condemnation);
        }
        for civil in decode_each::<PendingCivilWar>("civil war", raw.civil_wars, &mut report.skipped) {
            if !store.states.contains_key(&civil.rebel) || !store.states.contains_key(&civil.origin) {
                report.skipped += 1;
                continue;
            }
            conflict.civil_wars.insert(civil.rebel.clone(), civil);
        }

        conflict.rebuild_hold_timers(config);
        reapply_all(store, catalog, config);
        for key in &recreated {
            store.refresh_boundary(key, &config.placement);
        }
        store.take_dirty();

        if report.skipped > 0 {
            warn!(skipped = report.skipped, "snapshot loaded with skipped entries");
        }
        info!(states = report.states, camps = report.camps, wars = report.wars, "snapshot loaded");
        Ok(report)
    }
}

fn decode_each<T: DeserializeOwned>(kind: &'static str, raw: Vec<Value>, skipped: &mut usize) -> Vec<T> {
    raw.into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(entity) => Some(entity),
            Err(err) => {
                warn!(kind, index, %err, "skipping malformed snapshot entry");
                *skipped += 1;
                None
            }
        })
        .collect()
}

/// States need a captain among their members and members that belong
/// nowhere else
fn load_states(store: &mut TerritoryStore, states: Vec<State>, report: &mut LoadReport) {
    for state in states {
        let key = state.key();
        let consistent = state.members.contains(&state.captain)
            && !store.states.contains_key(&key)
            && state.members.iter().all(|m| !store.membership.contains_key(m));
        if !consistent {
            warn!(state = %state.name, "skipping inconsistent state");
            report.skipped += 1;
            continue;
        }
        store.insert_state(state);
        report.states += 1;
    }
}

fn load_camps(store: &mut TerritoryStore, camps: Vec<CampEntry>, report: &mut LoadReport) {
    for CampEntry { key, mut camp } in camps {
        let owned = store
            .states
            .get(&key.state)
            .map_or(false, |s| s.sectors.contains_key(&key.sector));
        if !owned || store.camps.contains_key(&key) {
            warn!(camp = %key, "skipping camp without a sector");
            report.skipped += 1;
            continue;
        }
        camp.clamp_to_stats();
        store.camps.insert(key, camp);
        report.camps += 1;
    }
}

/// Every sector is bound to a camp; a sector that lost its camp gets a
/// fresh one
/// Give every sector without a camp a fresh one; returns the new keys
fn fill_missing_camps(store: &mut TerritoryStore, config: &FrontierConfig) -> Vec<CampKey> {
    let missing: Vec<(CampKey, Timestamp)> = store
        .states
        .iter()
        .flat_map(|(state_key, state)| {
            state
                .sectors
                .iter()
                .map(move |(sector_key, sector)| (CampKey::from_keys(state_key.clone(), sector_key.clone()), sector.created_at))
        })
        .filter(|(key, _)| !store.camps.contains_key(key))
        .collect();
    let mut created = Vec::with_capacity(missing.len());
    for (key, created_at) in missing {
        warn!(camp = %key, "sector had no camp, creating a fresh one");
        let camp = Camp::new(
            &config.camps,
            config.maintenance_interval(),
            config.production.interval_secs,
            created_at,
        );
        store.camps.insert(key.clone(), camp);
        created.push(key);
    }
    created
}
