//! Camp - the defended structure and resource tracker bound to a sector

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::core::config::CampConfig;
use crate::core::types::{secs, Currency, ItemStack, Timestamp};
use crate::territory::boundary::Boundary;
use crate::upgrades::UpgradeTrack;

/// Statistics derived from base configuration and upgrade levels.
///
/// Only `apply_camp_upgrades` writes these after placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampStats {
    pub max_hp: f64,
    pub max_fuel: u32,
    pub heal_rate: f64,
    pub fatigue_secs: u64,
    pub storage_slots: u32,
    pub currency_cap: Currency,
    pub efficiency: f64,
    pub radius: i32,
}

impl CampStats {
    pub fn base(config: &CampConfig) -> Self {
        Self {
            max_hp: config.base_max_hp,
            max_fuel: config.base_max_fuel,
            heal_rate: config.base_heal_rate,
            fatigue_secs: config.base_fatigue_secs,
            storage_slots: config.base_storage_slots,
            currency_cap: config.base_storage_slots as f64 * config.currency_per_storage_slot,
            efficiency: config.base_efficiency,
            radius: config.base_radius,
        }
    }
}

/// Optional camp modules
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampModule {
    /// Natural hit point regeneration
    Healing,
    /// Currency and item accrual into storage
    Production,
    /// Protective effect on members near the camp
    Ward,
}

impl CampModule {
    pub const ALL: [CampModule; 3] = [CampModule::Healing, CampModule::Production, CampModule::Ward];

    /// Modules every new camp starts with
    pub fn default_unlocked() -> BTreeSet<CampModule> {
        [CampModule::Healing, CampModule::Production].into_iter().collect()
    }

    pub fn key(self) -> &'static str {
        match self {
            CampModule::Healing => "healing",
            CampModule::Production => "production",
            CampModule::Ward => "ward",
        }
    }
}

/// Unlock and enable flags for modules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleFlags {
    pub unlocked: BTreeSet<CampModule>,
    pub enabled: BTreeSet<CampModule>,
}

impl Default for ModuleFlags {
    fn default() -> Self {
        let unlocked = CampModule::default_unlocked();
        Self {
            enabled: unlocked.clone(),
            unlocked,
        }
    }
}

impl ModuleFlags {
    pub fn is_enabled(&self, module: CampModule) -> bool {
        self.unlocked.contains(&module) && self.enabled.contains(&module)
    }
}

/// Capped production storage.
///
/// Items keep insertion order; when the item cap is hit the remainder of
/// the incoming stack is dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampStorage {
    pub currency: Currency,
    pub items: Vec<ItemStack>,
}

impl CampStorage {
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|s| s.amount).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.currency <= 0.0 && self.item_count() == 0
    }

    /// Add currency up to `cap`, returns amount actually stored
    pub fn add_currency(&mut self, amount: Currency, cap: Currency) -> Currency {
        let space = (cap - self.currency).max(0.0);
        let added = amount.max(0.0).min(space);
        self.currency += added;
        added
    }

    /// Add items up to `slot_cap` total items, returns amount actually stored
    pub fn add_items(&mut self, stack: &ItemStack, slot_cap: u32) -> u32 {
        let space = slot_cap.saturating_sub(self.item_count());
        let added = stack.amount.min(space);
        if added == 0 {
            return 0;
        }
        match self.items.iter_mut().find(|s| s.item == stack.item) {
            Some(existing) => existing.amount += added,
            None => self.items.push(ItemStack::new(stack.item.clone(), added)),
        }
        added
    }

    /// Trim contents to new caps, keeping the oldest entries first
    pub fn clamp(&mut self, currency_cap: Currency, slot_cap: u32) {
        self.currency = self.currency.min(currency_cap).max(0.0);
        let mut remaining = slot_cap;
        for stack in &mut self.items {
            stack.amount = stack.amount.min(remaining);
            remaining -= stack.amount;
        }
        self.items.retain(|s| s.amount > 0);
    }

    /// Empty the storage, returning what it held
    pub fn take_all(&mut self) -> (Currency, Vec<ItemStack>) {
        let currency = std::mem::take(&mut self.currency);
        let items = std::mem::take(&mut self.items);
        (currency, items)
    }
}

/// Effect of a single damage application
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageEffect {
    /// Camp was already broken; nothing changed
    Inert,
    Damaged { hp: f64 },
    /// This hit broke the camp
    Broken,
}

/// The defended structure bound 1:1 to a sector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camp {
    pub hp: f64,
    pub stats: CampStats,
    pub broken_since: Option<Timestamp>,
    pub last_damaged_at: Option<Timestamp>,
    pub last_maintained_at: Timestamp,
    pub next_maintenance_at: Timestamp,
    pub maintenance_warned: bool,
    pub maintenance_overdue: bool,
    pub fuel: u32,
    pub last_fuel_check_at: Timestamp,
    pub levels: BTreeMap<UpgradeTrack, u32>,
    pub boundary: Boundary,
    pub storage: CampStorage,
    pub production_interval_secs: u64,
    pub last_production_at: Timestamp,
    pub modules: ModuleFlags,
    pub placed_at: Timestamp,
}

impl Camp {
    /// New camp at full health and fuel with base statistics
    pub fn new(config: &CampConfig, maintenance_interval: Timestamp, production_interval_secs: u64, now: Timestamp) -> Self {
        let stats = CampStats::base(config);
        Self {
            hp: stats.max_hp,
            fuel: stats.max_fuel,
            boundary: Boundary::uniform(stats.radius),
            stats,
            broken_since: None,
            last_damaged_at: None,
            last_maintained_at: now,
            next_maintenance_at: now.saturating_add(maintenance_interval),
            maintenance_warned: false,
            maintenance_overdue: false,
            last_fuel_check_at: now,
            levels: BTreeMap::new(),
            storage: CampStorage::default(),
            production_interval_secs,
            last_production_at: now,
            modules: ModuleFlags::default(),
            placed_at: now,
        }
    }

    pub fn level(&self, track: UpgradeTrack) -> u32 {
        self.levels.get(&track).copied().unwrap_or(0)
    }

    pub fn is_broken(&self) -> bool {
        self.broken_since.is_some()
    }

    /// Apply combat damage. A broken camp is never touched again.
    pub fn apply_damage(&mut self, amount: f64, now: Timestamp) -> DamageEffect {
        if self.is_broken() {
            return DamageEffect::Inert;
        }
        self.last_damaged_at = Some(now);
        self.hp = (self.hp - amount.max(0.0)).max(0.0);
        if self.hp <= 0.0 {
            self.hp = 0.0;
            self.broken_since = Some(now);
            DamageEffect::Broken
        } else {
            DamageEffect::Damaged { hp: self.hp }
        }
    }

    /// Upkeep damage that can never take the camp below 1 hp.
    /// Returns the damage actually dealt.
    pub fn apply_attrition(&mut self, amount: f64) -> f64 {
        if self.is_broken() || self.hp <= 1.0 {
            return 0.0;
        }
        let dealt = amount.max(0.0).min(self.hp - 1.0);
        self.hp -= dealt;
        dealt
    }

    /// Natural healing; broken camps do not heal on their own
    pub fn heal(&mut self, amount: f64) -> f64 {
        if self.is_broken() {
            return 0.0;
        }
        let before = self.hp;
        self.hp = (self.hp + amount.max(0.0)).min(self.stats.max_hp);
        self.hp - before
    }

    /// True once the fatigue window after the last hit has passed
    pub fn is_rested(&self, now: Timestamp) -> bool {
        match self.last_damaged_at {
            Some(at) => now >= at.saturating_add(secs(self.stats.fatigue_secs)),
            None => true,
        }
    }

    /// Restore hit points from a repair. Returns true if this repair brought
    /// a broken camp back past the recovery threshold.
    pub fn repair(&mut self, amount: f64, recovery_threshold: f64) -> bool {
        self.hp = (self.hp + amount.max(0.0)).min(self.stats.max_hp);
        if self.is_broken() && self.hp >= self.stats.max_hp * recovery_threshold {
            self.broken_since = None;
            return true;
        }
        false
    }

    /// Add fuel units up to capacity, returns units accepted
    pub fn add_fuel(&mut self, units: u32) -> u32 {
        let space = self.stats.max_fuel.saturating_sub(self.fuel);
        let added = units.min(space);
        self.fuel += added;
        added
    }

    pub fn reset_maintenance(&mut self, now: Timestamp, interval: Timestamp) {
        self.last_maintained_at = now;
        self.next_maintenance_at = now.saturating_add(interval);
        self.maintenance_warned = false;
        self.maintenance_overdue = false;
    }

    /// Full restore used when a camp changes hands through capture
    pub fn restore_after_capture(&mut self, now: Timestamp, maintenance_interval: Timestamp) {
        self.hp = self.stats.max_hp;
        self.broken_since = None;
        self.last_damaged_at = None;
        self.reset_maintenance(now, maintenance_interval);
    }

    /// Re-establish `hp <= max_hp`, `fuel <= max_fuel` and storage caps
    pub fn clamp_to_stats(&mut self) {
        self.hp = self.hp.clamp(0.0, self.stats.max_hp);
        self.fuel = self.fuel.min(self.stats.max_fuel);
        self.storage.clamp(self.stats.currency_cap, self.stats.storage_slots);
    }

    /// Ward and other protective effects are live only on intact, fueled camps
    pub fn effects_active(&self) -> bool {
        !self.is_broken() && self.fuel > 0 && self.modules.is_enabled(CampModule::Ward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ItemDescriptor;

    fn camp() -> Camp {
        Camp::new(&CampConfig::default(), 1_000_000, 3600, 0)
    }

    #[test]
    fn test_damage_breaks_at_zero_and_stays_inert() {
        let mut camp = camp();
        assert_eq!(camp.apply_damage(40.0, 10), DamageEffect::Damaged { hp: 60.0 });
        assert_eq!(camp.apply_damage(100.0, 20), DamageEffect::Broken);
        assert_eq!(camp.hp, 0.0);
        assert_eq!(camp.broken_since, Some(20));
        assert_eq!(camp.apply_damage(5.0, 30), DamageEffect::Inert);
        assert_eq!(camp.broken_since, Some(20));
    }

    #[test]
    fn test_attrition_floors_at_one() {
        let mut camp = camp();
        camp.hp = 3.0;
        assert_eq!(camp.apply_attrition(10.0), 2.0);
        assert_eq!(camp.hp, 1.0);
        assert_eq!(camp.apply_attrition(10.0), 0.0);
    }

    #[test]
    fn test_repair_recovers_past_threshold() {
        let mut camp = camp();
        camp.apply_damage(200.0, 5);
        assert!(!camp.repair(25.0, 0.5));
        assert!(camp.is_broken());
        assert!(camp.repair(25.0, 0.5));
        assert!(!camp.is_broken());
        assert_eq!(camp.hp, 50.0);
    }

    #[test]
    fn test_broken_camp_does_not_heal() {
        let mut camp = camp();
        camp.apply_damage(200.0, 5);
        assert_eq!(camp.heal(10.0), 0.0);
    }

    #[test]
    fn test_storage_drops_excess_items() {
        let mut storage = CampStorage::default();
        let iron = ItemStack::new(ItemDescriptor::material("iron_ingot"), 6);
        let gold = ItemStack::new(ItemDescriptor::material("gold_ingot"), 6);
        assert_eq!(storage.add_items(&iron, 10), 6);
        assert_eq!(storage.add_items(&gold, 10), 4);
        assert_eq!(storage.add_items(&gold, 10), 0);
        assert_eq!(storage.item_count(), 10);

        storage.clamp(0.0, 7);
        assert_eq!(storage.items[0].amount, 6);
        assert_eq!(storage.items[1].amount, 1);
    }

    #[test]
    fn test_storage_currency_cap() {
        let mut storage = CampStorage::default();
        assert_eq!(storage.add_currency(80.0, 100.0), 80.0);
        assert_eq!(storage.add_currency(80.0, 100.0), 20.0);
        assert_eq!(storage.currency, 100.0);
    }

    #[test]
    fn test_fatigue_window() {
        let mut camp = camp();
        camp.stats.fatigue_secs = 10;
        camp.apply_damage(1.0, 1_000);
        assert!(!camp.is_rested(5_000));
        assert!(camp.is_rested(11_000));
    }
}
