//! Engine configuration with documented defaults
//!
//! Every tunable lives here, grouped by the subsystem that reads it.
//! Durations are given in seconds and converted with [`secs`] at the point
//! of use so the TOML stays human-readable.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;
use crate::core::types::{secs, Currency, ItemDescriptor, ItemStack, Timestamp};

/// Top-level configuration for the frontier engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontierConfig {
    pub states: StateConfig,
    pub camps: CampConfig,
    pub maintenance: MaintenanceConfig,
    pub production: ProductionConfig,
    pub placement: PlacementConfig,
    pub war: WarConfig,
    pub raids: RaidConfig,
    pub upkeep: UpkeepConfig,
}

/// Founding, membership and request timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Personal funds charged when a new state's first camp is committed
    pub creation_cost: Currency,
    /// Items consumed alongside the creation cost
    pub creation_items: Vec<ItemStack>,
    /// Per-actor cooldown between two foundings
    pub creation_cooldown_secs: u64,
    /// Cost of each additional sector
    pub sector_cost: Currency,
    pub sector_items: Vec<ItemStack>,
    /// Per-state cooldown between sector additions
    pub sector_cooldown_secs: u64,
    /// Names nobody may found or rename to (compared case-insensitively)
    pub reserved_names: Vec<String>,
    pub max_name_length: usize,
    /// Transaction log entries kept per state (newest first)
    pub transaction_log_cap: usize,
    pub max_tax_rate: f64,
    pub ideology_cooldown_secs: u64,
    /// Cooldown between peacetime capital moves
    pub capital_move_cooldown_secs: u64,
    pub invite_timeout_secs: u64,
    pub join_timeout_secs: u64,
    pub teleport_timeout_secs: u64,
    pub gift_timeout_secs: u64,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            creation_cost: 1000.0,
            creation_items: vec![],
            creation_cooldown_secs: 3600,
            sector_cost: 500.0,
            sector_items: vec![],
            sector_cooldown_secs: 1800,
            reserved_names: vec!["admin".into(), "server".into(), "wilderness".into()],
            max_name_length: 24,
            transaction_log_cap: 50,
            max_tax_rate: 0.5,
            ideology_cooldown_secs: 86_400,
            capital_move_cooldown_secs: 86_400,
            invite_timeout_secs: 120,
            join_timeout_secs: 120,
            teleport_timeout_secs: 60,
            gift_timeout_secs: 120,
        }
    }
}

/// Base camp statistics before upgrades, plus camp actions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CampConfig {
    pub base_max_hp: f64,
    pub base_max_fuel: u32,
    /// Hit points restored per upkeep tick while fueled and not fatigued
    pub base_heal_rate: f64,
    /// Seconds after taking damage before natural healing resumes
    pub base_fatigue_secs: u64,
    /// Item slots of production storage
    pub base_storage_slots: u32,
    /// Currency capacity granted per storage slot
    pub currency_per_storage_slot: Currency,
    /// Production multiplier
    pub base_efficiency: f64,
    /// Boundary radius in blocks, before neighbor clamping
    pub base_radius: i32,

    /// Fuel drain cadence and amount
    pub fuel_drain_interval_secs: u64,
    pub fuel_drain_amount: u32,
    /// Item that refuels a camp and how many fuel units one item yields
    pub fuel_item: ItemDescriptor,
    pub fuel_per_item: u32,
    /// Damage applied per tick while a camp has no fuel (never below 1 hp)
    pub zero_fuel_damage: f64,

    /// Fraction of max hp restored by one repair action
    pub repair_fraction: f64,
    /// A broken camp recovers once hp reaches this fraction of max hp
    pub recovery_threshold: f64,
    pub repair_cost: Currency,
    pub repair_items: Vec<ItemStack>,

    /// Cooldown between relocations of the same sector
    pub move_cooldown_secs: u64,
    pub move_cost: Currency,

    /// Price to unlock an optional camp module
    pub module_unlock_cost: Currency,
}

impl Default for CampConfig {
    fn default() -> Self {
        Self {
            base_max_hp: 100.0,
            base_max_fuel: 100,
            base_heal_rate: 1.0,
            base_fatigue_secs: 300,
            base_storage_slots: 64,
            currency_per_storage_slot: 100.0,
            base_efficiency: 1.0,
            base_radius: 16,
            fuel_drain_interval_secs: 600,
            fuel_drain_amount: 1,
            fuel_item: ItemDescriptor::material("coal"),
            fuel_per_item: 5,
            zero_fuel_damage: 2.0,
            repair_fraction: 0.25,
            recovery_threshold: 0.5,
            repair_cost: 100.0,
            repair_items: vec![],
            move_cooldown_secs: 3600,
            move_cost: 250.0,
            module_unlock_cost: 750.0,
        }
    }
}

/// How zero-fuel damage and overdue-maintenance decay combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageStacking {
    /// Both causes apply in the same tick
    Stack,
    /// Overdue decay is skipped for a camp that took zero-fuel damage this tick
    Exclusive,
}

/// Maintenance schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    pub interval_secs: u64,
    /// Warning is sent once this close to the deadline
    pub warning_secs: u64,
    pub cost: Currency,
    pub items: Vec<ItemStack>,
    /// Damage applied per tick while maintenance is overdue (never below 1 hp)
    pub decay_damage: f64,
    pub damage_stacking: DamageStacking,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            interval_secs: 7 * 86_400,
            warning_secs: 86_400,
            cost: 200.0,
            items: vec![],
            decay_damage: 1.0,
            damage_stacking: DamageStacking::Exclusive,
        }
    }
}

/// Camp production accrual
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductionConfig {
    pub enabled: bool,
    /// Default production interval for newly placed camps
    pub interval_secs: u64,
    pub currency_per_step: Currency,
    pub items_per_step: Vec<ItemStack>,
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 3600,
            currency_per_step: 10.0,
            items_per_step: vec![],
        }
    }
}

/// Placement validation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Blocks above the anchor that must be clear
    pub clearance_height: i32,
    /// Horizontal radius of the clearance column
    pub clearance_radius: i32,
    /// Minimum gap between boundaries of different states
    pub min_state_gap: i32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            clearance_height: 3,
            clearance_radius: 1,
            min_state_gap: 8,
        }
    }
}

/// Condemnation, war and reward tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarConfig {
    pub condemn_cooldown_secs: u64,
    /// How long a condemnation must age before war may be declared
    pub condemnation_delay_secs: u64,
    pub declare_cooldown_secs: u64,
    pub min_members: usize,
    pub min_sectors: usize,
    /// Seconds a broken capital must stay broken before the war is lost
    pub capital_hold_secs: u64,
    pub emergency_move_cooldown_secs: u64,
    pub surrender_timeout_secs: u64,
    /// Server-funded payout split across the winning side
    pub reward_flat: Currency,
    /// Percentage of each losing state's bank looted for the winners
    pub loot_percent: f64,
    /// Item a member must hold to secede
    pub civil_war_item: ItemDescriptor,
}

impl Default for WarConfig {
    fn default() -> Self {
        Self {
            condemn_cooldown_secs: 86_400,
            condemnation_delay_secs: 600,
            declare_cooldown_secs: 86_400,
            min_members: 1,
            min_sectors: 1,
            capital_hold_secs: 900,
            emergency_move_cooldown_secs: 1800,
            surrender_timeout_secs: 120,
            reward_flat: 5000.0,
            loot_percent: 25.0,
            civil_war_item: ItemDescriptor::custom("frontier", "rebel_banner"),
        }
    }
}

/// Raider waves sent against defenders during a war
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RaidConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub min_wave: u32,
    pub max_wave: u32,
    pub seed: u64,
}

impl Default for RaidConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 300,
            min_wave: 2,
            max_wave: 6,
            seed: 0x1f0e_7a11,
        }
    }
}

/// Scheduler cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpkeepConfig {
    pub tick_interval_secs: u64,
    /// Expired broker entries are swept every this many ticks
    pub sweep_every_ticks: u64,
}

impl Default for UpkeepConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 20,
            sweep_every_ticks: 30,
        }
    }
}

impl FrontierConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn load_from_toml(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string and validate it
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FrontierConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camps.fuel_drain_interval_secs == 0 {
            return Err(ConfigError::invalid("camps.fuel_drain_interval_secs", "must be positive"));
        }
        if self.camps.base_max_hp <= 0.0 {
            return Err(ConfigError::invalid("camps.base_max_hp", "must be positive"));
        }
        if !(self.camps.recovery_threshold > 0.0 && self.camps.recovery_threshold <= 1.0) {
            return Err(ConfigError::invalid(
                "camps.recovery_threshold",
                format!("{} is outside (0, 1]", self.camps.recovery_threshold),
            ));
        }
        if self.camps.repair_fraction <= 0.0 {
            return Err(ConfigError::invalid("camps.repair_fraction", "must be positive"));
        }
        if self.maintenance.warning_secs > self.maintenance.interval_secs {
            return Err(ConfigError::invalid(
                "maintenance.warning_secs",
                format!(
                    "warning window ({}) exceeds interval ({})",
                    self.maintenance.warning_secs, self.maintenance.interval_secs
                ),
            ));
        }
        if !(0.0..=100.0).contains(&self.war.loot_percent) {
            return Err(ConfigError::invalid(
                "war.loot_percent",
                format!("{} is outside [0, 100]", self.war.loot_percent),
            ));
        }
        if !(0.0..=1.0).contains(&self.states.max_tax_rate) {
            return Err(ConfigError::invalid("states.max_tax_rate", "must be within [0, 1]"));
        }
        if self.raids.min_wave > self.raids.max_wave {
            return Err(ConfigError::invalid("raids.min_wave", "greater than raids.max_wave"));
        }
        if self.placement.min_state_gap < 0 || self.camps.base_radius < 0 {
            return Err(ConfigError::invalid("placement", "radii and gaps must be non-negative"));
        }
        Ok(())
    }

    pub fn fuel_drain_interval(&self) -> Timestamp {
        secs(self.camps.fuel_drain_interval_secs)
    }

    pub fn maintenance_interval(&self) -> Timestamp {
        secs(self.maintenance.interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(FrontierConfig::default().validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml_keeps_defaults() {
        let toml = r#"
            [war]
            condemnation_delay_secs = 60
            loot_percent = 10.0

            [maintenance]
            damage_stacking = "stack"

            [camps]
            fuel_item = "frontier:fuel_cell"
        "#;
        let config = FrontierConfig::parse_toml(toml).unwrap();
        assert_eq!(config.war.condemnation_delay_secs, 60);
        assert_eq!(config.war.loot_percent, 10.0);
        assert_eq!(config.maintenance.damage_stacking, DamageStacking::Stack);
        assert_eq!(config.camps.fuel_item, ItemDescriptor::custom("frontier", "fuel_cell"));
        assert_eq!(config.states.max_name_length, 24);
    }

    #[test]
    fn test_invalid_loot_percent_rejected() {
        let toml = "[war]\nloot_percent = 150.0\n";
        let err = FrontierConfig::parse_toml(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "war.loot_percent", .. }));
    }

    #[test]
    fn test_warning_window_must_fit_interval() {
        let mut config = FrontierConfig::default();
        config.maintenance.warning_secs = config.maintenance.interval_secs + 1;
        assert!(config.validate().is_err());
    }
}
