//! Upkeep - the periodic cost of holding territory, and the actions that
//! pay it

pub mod actions;
pub mod tick;

pub use actions::{
    claim_production, maintain_camp, refuel_camp, repair_camp, toggle_module, unlock_module, ClaimOutcome,
    MaintenanceOutcome, ModuleOutcome, RefuelOutcome, RepairOutcome,
};
pub use tick::{accrue_production, drain_fuel, run_upkeep, UpkeepReport};
