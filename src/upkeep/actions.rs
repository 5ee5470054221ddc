//! Player actions on a camp: repair, maintenance, refueling, production
//! claims and module management

use tracing::debug;

use crate::core::config::FrontierConfig;
use crate::core::types::{secs, ActorId, CampKey, Currency, ItemStack, NameKey, Timestamp};
use crate::ports::{PaymentError, Ports};
use crate::territory::camp::CampModule;
use crate::territory::governance::PaidFrom;
use crate::territory::state::{Transaction, TransactionKind};
use crate::territory::store::TerritoryStore;

#[derive(Debug, Clone, PartialEq)]
pub enum RepairOutcome {
    Success { hp: f64, recovered: bool },
    NotInState,
    SectorNotFound,
    NotAuthorized,
    AtFullHealth,
    MissingItems,
    InsufficientFunds,
    NoLedger,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MaintenanceOutcome {
    Success { next_due: Timestamp },
    NotInState,
    SectorNotFound,
    NotAuthorized,
    NotDue { remaining_ms: Timestamp },
    MissingItems,
    InsufficientFunds,
    NoLedger,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefuelOutcome {
    Success { added: u32, fuel: u32, items_used: u32 },
    NotInState,
    SectorNotFound,
    FuelFull,
    MissingItems,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClaimOutcome {
    Success {
        currency: Currency,
        /// Share kept by the state bank
        taxed: Currency,
        items: Vec<ItemStack>,
    },
    NotInState,
    SectorNotFound,
    NotAuthorized,
    StorageEmpty,
    NoLedger,
    /// The ledger refused the payout; storage is untouched
    PayoutRejected,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModuleOutcome {
    Enabled,
    Disabled,
    Unlocked { paid_from: PaidFrom },
    NotInState,
    SectorNotFound,
    NotAuthorized,
    Locked,
    AlreadyUnlocked,
    Unchanged,
    InsufficientFunds,
    NoLedger,
}

/// Why an actor cannot act on a camp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Denied {
    NotInState,
    SectorNotFound,
    NotAuthorized,
}

macro_rules! impl_from_denied {
    ($($outcome:ident),*) => {
        $(impl From<Denied> for $outcome {
            fn from(denied: Denied) -> Self {
                match denied {
                    Denied::NotInState => $outcome::NotInState,
                    Denied::SectorNotFound => $outcome::SectorNotFound,
                    Denied::NotAuthorized => $outcome::NotAuthorized,
                }
            }
        })*
    };
}

impl_from_denied!(RepairOutcome, MaintenanceOutcome, ClaimOutcome, ModuleOutcome);

/// Resolve the actor's camp; `manage` requires captain or sector governor
fn camp_access(store: &TerritoryStore, actor: ActorId, sector: &str, manage: bool) -> Result<(NameKey, CampKey), Denied> {
    let state_key = store.state_of(actor).cloned().ok_or(Denied::NotInState)?;
    let state = store.state(&state_key).ok_or(Denied::NotInState)?;
    let sector_key = NameKey::new(sector);
    if !state.sectors.contains_key(&sector_key) {
        return Err(Denied::SectorNotFound);
    }
    if manage && !state.can_manage(actor, &sector_key) {
        return Err(Denied::NotAuthorized);
    }
    let camp_key = CampKey::from_keys(state_key.clone(), sector_key);
    if store.camp(&camp_key).is_none() {
        return Err(Denied::SectorNotFound);
    }
    Ok((state_key, camp_key))
}

/// Restore `repair_fraction` of max hp. A broken camp recovers once it
/// passes the recovery threshold.
pub fn repair_camp(
    store: &mut TerritoryStore,
    actor: ActorId,
    sector: &str,
    now: Timestamp,
    config: &FrontierConfig,
    ports: &mut Ports,
) -> RepairOutcome {
    let (state_key, camp_key) = match camp_access(store, actor, sector, true) {
        Ok(found) => found,
        Err(denied) => return denied.into(),
    };
    let Some(camp) = store.camp(&camp_key) else {
        return RepairOutcome::SectorNotFound;
    };
    if camp.hp >= camp.stats.max_hp {
        return RepairOutcome::AtFullHealth;
    }
    if !ports.has_items(actor, &config.camps.repair_items) {
        return RepairOutcome::MissingItems;
    }
    match store.settle_cost(&state_key, actor, config.camps.repair_cost, TransactionKind::Repair, now, config, ports) {
        Ok(_) => {}
        Err(PaymentError::NoLedger) => return RepairOutcome::NoLedger,
        Err(PaymentError::InsufficientFunds) => return RepairOutcome::InsufficientFunds,
    }
    ports.consume_items(actor, &config.camps.repair_items);

    let Some(camp) = store.camp_mut(&camp_key) else {
        return RepairOutcome::SectorNotFound;
    };
    let amount = camp.stats.max_hp * config.camps.repair_fraction;
    let recovered = camp.repair(amount, config.camps.recovery_threshold);
    let hp = camp.hp;
    store.mark_dirty();
    debug!(camp = %camp_key, hp, recovered, "camp repaired");
    RepairOutcome::Success { hp, recovered }
}

/// Pay the maintenance cost and reset the schedule. Allowed once the
/// warning window has opened.
pub fn maintain_camp(
    store: &mut TerritoryStore,
    actor: ActorId,
    sector: &str,
    now: Timestamp,
    config: &FrontierConfig,
    ports: &mut Ports,
) -> MaintenanceOutcome {
    let (state_key, camp_key) = match camp_access(store, actor, sector, true) {
        Ok(found) => found,
        Err(denied) => return denied.into(),
    };
    let Some(camp) = store.camp(&camp_key) else {
        return MaintenanceOutcome::SectorNotFound;
    };
    let opens_at = camp
        .next_maintenance_at
        .saturating_sub(secs(config.maintenance.warning_secs));
    if now < opens_at {
        return MaintenanceOutcome::NotDue {
            remaining_ms: opens_at - now,
        };
    }
    if !ports.has_items(actor, &config.maintenance.items) {
        return MaintenanceOutcome::MissingItems;
    }
    match store.settle_cost(&state_key, actor, config.maintenance.cost, TransactionKind::Maintenance, now, config, ports) {
        Ok(_) => {}
        Err(PaymentError::NoLedger) => return MaintenanceOutcome::NoLedger,
        Err(PaymentError::InsufficientFunds) => return MaintenanceOutcome::InsufficientFunds,
    }
    ports.consume_items(actor, &config.maintenance.items);

    let Some(camp) = store.camp_mut(&camp_key) else {
        return MaintenanceOutcome::SectorNotFound;
    };
    camp.reset_maintenance(now, config.maintenance_interval());
    let next_due = camp.next_maintenance_at;
    store.mark_dirty();
    MaintenanceOutcome::Success { next_due }
}

/// Feed up to `max_items` fuel items into a camp of the actor's state.
/// Only as many items as needed to fill the tank are consumed.
pub fn refuel_camp(
    store: &mut TerritoryStore,
    actor: ActorId,
    sector: &str,
    max_items: u32,
    config: &FrontierConfig,
    ports: &mut Ports,
) -> RefuelOutcome {
    let camp_key = match camp_access(store, actor, sector, false) {
        Ok((_, key)) => key,
        Err(Denied::NotInState) => return RefuelOutcome::NotInState,
        Err(_) => return RefuelOutcome::SectorNotFound,
    };
    let Some(camp) = store.camp(&camp_key) else {
        return RefuelOutcome::SectorNotFound;
    };
    let space = camp.stats.max_fuel.saturating_sub(camp.fuel);
    if space == 0 {
        return RefuelOutcome::FuelFull;
    }
    let per_item = config.camps.fuel_per_item.max(1);
    let held = ports.inventory.count_matching(actor, &config.camps.fuel_item);
    let items_used = max_items.min(held).min(space.div_ceil(per_item));
    if items_used == 0 {
        return RefuelOutcome::MissingItems;
    }
    ports.consume_items(actor, &[ItemStack::new(config.camps.fuel_item.clone(), items_used)]);

    let Some(camp) = store.camp_mut(&camp_key) else {
        return RefuelOutcome::SectorNotFound;
    };
    let added = camp.add_fuel(items_used.saturating_mul(per_item));
    let fuel = camp.fuel;
    store.mark_dirty();
    RefuelOutcome::Success {
        added,
        fuel,
        items_used,
    }
}

/// Pay out stored production. The state's tax share goes to its bank; the
/// rest goes to the actor through the ledger, items go to their inventory.
pub fn claim_production(
    store: &mut TerritoryStore,
    actor: ActorId,
    sector: &str,
    now: Timestamp,
    config: &FrontierConfig,
    ports: &mut Ports,
) -> ClaimOutcome {
    let (state_key, camp_key) = match camp_access(store, actor, sector, true) {
        Ok(found) => found,
        Err(denied) => return denied.into(),
    };
    let Some(camp) = store.camp(&camp_key) else {
        return ClaimOutcome::SectorNotFound;
    };
    if camp.storage.is_empty() {
        return ClaimOutcome::StorageEmpty;
    }
    let stored = camp.storage.currency;
    let tax_rate = store.state(&state_key).map_or(0.0, |s| s.tax_rate);
    let taxed = stored * tax_rate;
    let payout = stored - taxed;
    match ports.pay(actor, payout) {
        Ok(()) => {}
        Err(PaymentError::NoLedger) => return ClaimOutcome::NoLedger,
        Err(PaymentError::InsufficientFunds) => return ClaimOutcome::PayoutRejected,
    }

    let Some(camp) = store.camp_mut(&camp_key) else {
        return ClaimOutcome::SectorNotFound;
    };
    let (_, items) = camp.storage.take_all();
    for stack in &items {
        ports.inventory.grant(actor, stack.clone());
    }
    if taxed > 0.0 {
        if let Some(state) = store.state_mut(&state_key) {
            state.deposit(taxed);
            state.record(
                Transaction {
                    at: now,
                    kind: TransactionKind::Deposit,
                    amount: taxed,
                    actor: Some(actor),
                },
                config.states.transaction_log_cap,
            );
        }
    }
    store.mark_dirty();
    ClaimOutcome::Success {
        currency: payout,
        taxed,
        items,
    }
}

pub fn toggle_module(
    store: &mut TerritoryStore,
    actor: ActorId,
    sector: &str,
    module: CampModule,
    enabled: bool,
) -> ModuleOutcome {
    let camp_key = match camp_access(store, actor, sector, true) {
        Ok((_, key)) => key,
        Err(denied) => return denied.into(),
    };
    let Some(camp) = store.camp_mut(&camp_key) else {
        return ModuleOutcome::SectorNotFound;
    };
    if !camp.modules.unlocked.contains(&module) {
        return ModuleOutcome::Locked;
    }
    let changed = if enabled {
        camp.modules.enabled.insert(module)
    } else {
        camp.modules.enabled.remove(&module)
    };
    if !changed {
        return ModuleOutcome::Unchanged;
    }
    store.mark_dirty();
    if enabled {
        ModuleOutcome::Enabled
    } else {
        ModuleOutcome::Disabled
    }
}

/// Buy a locked module; it starts enabled
pub fn unlock_module(
    store: &mut TerritoryStore,
    actor: ActorId,
    sector: &str,
    module: CampModule,
    now: Timestamp,
    config: &FrontierConfig,
    ports: &mut Ports,
) -> ModuleOutcome {
    let (state_key, camp_key) = match camp_access(store, actor, sector, true) {
        Ok(found) => found,
        Err(denied) => return denied.into(),
    };
    if store.camp(&camp_key).map_or(false, |c| c.modules.unlocked.contains(&module)) {
        return ModuleOutcome::AlreadyUnlocked;
    }
    let paid_from = match store.settle_cost(
        &state_key,
        actor,
        config.camps.module_unlock_cost,
        TransactionKind::ModuleUnlock,
        now,
        config,
        ports,
    ) {
        Ok(paid_from) => paid_from,
        Err(PaymentError::NoLedger) => return ModuleOutcome::NoLedger,
        Err(PaymentError::InsufficientFunds) => return ModuleOutcome::InsufficientFunds,
    };
    if let Some(camp) = store.camp_mut(&camp_key) {
        camp.modules.unlocked.insert(module);
        camp.modules.enabled.insert(module);
    }
    store.mark_dirty();
    ModuleOutcome::Unlocked { paid_from }
}
