//! Upkeep tick - periodic fuel drain, decay, healing and production
//!
//! One pass visits every camp once, in key order, over a snapshot of the
//! camp keys taken at the start of the pass. Timestamps advance by whole
//! intervals only so fractional remainders carry into the next tick.

use tracing::debug;

use crate::core::config::{DamageStacking, FrontierConfig};
use crate::core::types::{secs, vars, CampKey, ItemStack, Timestamp, Vars};
use crate::ports::Ports;
use crate::territory::camp::{Camp, CampModule};
use crate::territory::store::TerritoryStore;

/// What one upkeep pass did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpkeepReport {
    pub camps_visited: usize,
    pub fuel_drained: u32,
    /// Camps hit by zero-fuel damage
    pub starving: usize,
    pub warnings_sent: usize,
    pub overdue_sent: usize,
    pub decayed: usize,
    pub healed: usize,
    pub production_steps: u64,
    /// Idle camps whose production clock was moved up to now
    pub idle_clocks: usize,
}

impl UpkeepReport {
    pub fn changed_anything(&self) -> bool {
        self.fuel_drained > 0
            || self.starving > 0
            || self.warnings_sent > 0
            || self.overdue_sent > 0
            || self.decayed > 0
            || self.healed > 0
            || self.production_steps > 0
            || self.idle_clocks > 0
    }
}

/// Drain fuel for every whole interval elapsed since the last check.
/// Returns the fuel actually removed.
pub fn drain_fuel(camp: &mut Camp, interval: Timestamp, amount: u32, now: Timestamp) -> u32 {
    if interval == 0 || now <= camp.last_fuel_check_at {
        return 0;
    }
    let steps = (now - camp.last_fuel_check_at) / interval;
    if steps == 0 {
        return 0;
    }
    camp.last_fuel_check_at += steps * interval;
    let wanted = steps.saturating_mul(amount as u64).min(u32::MAX as u64) as u32;
    let drained = wanted.min(camp.fuel);
    camp.fuel -= drained;
    drained
}

/// Accrue whole production steps into storage. Returns the step count.
///
/// An idle camp (no fuel, module off) keeps its clock at `now` so it never
/// produces retroactively for time it spent idle.
pub fn accrue_production(camp: &mut Camp, config: &FrontierConfig, now: Timestamp) -> u64 {
    let producing = config.production.enabled
        && camp.production_interval_secs > 0
        && camp.fuel > 0
        && !camp.is_broken()
        && camp.modules.is_enabled(CampModule::Production);
    if !producing {
        camp.last_production_at = now.max(camp.last_production_at);
        return 0;
    }
    let interval = secs(camp.production_interval_secs);
    if now <= camp.last_production_at {
        return 0;
    }
    let steps = (now - camp.last_production_at) / interval;
    if steps == 0 {
        return 0;
    }
    camp.last_production_at += steps * interval;

    let efficiency = camp.stats.efficiency;
    let currency = config.production.currency_per_step * steps as f64 * efficiency;
    camp.storage.add_currency(currency, camp.stats.currency_cap);
    for stack in &config.production.items_per_step {
        let amount = (stack.amount as f64 * steps as f64 * efficiency).floor();
        let scaled = ItemStack::new(stack.item.clone(), amount.min(u32::MAX as f64) as u32);
        camp.storage.add_items(&scaled, camp.stats.storage_slots);
    }
    steps
}

/// Run one upkeep pass over every camp. Marks the store dirty at most once.
pub fn run_upkeep(store: &mut TerritoryStore, config: &FrontierConfig, ports: &mut Ports, now: Timestamp) -> UpkeepReport {
    let mut report = UpkeepReport::default();
    let drain_interval = config.fuel_drain_interval();
    let warning_window = secs(config.maintenance.warning_secs);

    for key in store.camp_keys_sorted() {
        let mut notices: Vec<(&'static str, Vars)> = Vec::new();
        {
            let Some(camp) = store.camp_mut(&key) else {
                continue;
            };
            report.camps_visited += 1;

            report.fuel_drained += drain_fuel(camp, drain_interval, config.camps.fuel_drain_amount, now);

            let mut starved = false;
            if camp.fuel == 0 && !camp.is_broken() {
                starved = true;
                let dealt = camp.apply_attrition(config.camps.zero_fuel_damage);
                report.starving += 1;
                notices.push(("camp.no_fuel", vars([("hp", format!("{:.0}", camp.hp)), ("damage", format!("{:.0}", dealt))])));
            }

            if !camp.maintenance_warned && now.saturating_add(warning_window) >= camp.next_maintenance_at {
                camp.maintenance_warned = true;
                report.warnings_sent += 1;
                notices.push((
                    "maintenance.warning",
                    vars([("due_in", ((camp.next_maintenance_at.saturating_sub(now)) / 1000).to_string())]),
                ));
            }
            if !camp.maintenance_overdue && now >= camp.next_maintenance_at {
                camp.maintenance_overdue = true;
                report.overdue_sent += 1;
                notices.push(("maintenance.overdue", Vars::new()));
            }
            let decay_allowed = match config.maintenance.damage_stacking {
                DamageStacking::Stack => true,
                DamageStacking::Exclusive => !starved,
            };
            if camp.maintenance_overdue && decay_allowed && camp.apply_attrition(config.maintenance.decay_damage) > 0.0 {
                report.decayed += 1;
            }

            let can_heal = camp.modules.is_enabled(CampModule::Healing)
                && camp.fuel > 0
                && camp.hp < camp.stats.max_hp
                && camp.is_rested(now);
            if can_heal && camp.heal(camp.stats.heal_rate) > 0.0 {
                report.healed += 1;
            }

            let production_clock = camp.last_production_at;
            let steps = accrue_production(camp, config, now);
            report.production_steps += steps;
            if steps == 0 && camp.last_production_at != production_clock {
                report.idle_clocks += 1;
            }
        }
        notify_managers(store, ports, &key, &notices);
    }

    if report.changed_anything() {
        store.mark_dirty();
    }
    debug!(
        camps = report.camps_visited,
        drained = report.fuel_drained,
        starving = report.starving,
        decayed = report.decayed,
        "upkeep pass"
    );
    report
}

fn notify_managers(store: &TerritoryStore, ports: &mut Ports, key: &CampKey, notices: &[(&'static str, Vars)]) {
    if notices.is_empty() {
        return;
    }
    let Some(state) = store.state(&key.state) else {
        return;
    };
    let managers = state.managers_of(&key.sector);
    let (state_name, sector_name) = store.display_names(key);
    for (message_key, extra) in notices {
        let mut all = vars([("state", state_name.clone()), ("sector", sector_name.clone())]);
        all.extend(extra.iter().cloned());
        ports.notify_all(&managers, message_key, &all);
    }
}
