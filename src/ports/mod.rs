//! Boundary contracts to the host
//!
//! The engine decides; collaborators behind these traits move money, items,
//! blocks and chat messages. Nothing here contains game rules beyond the
//! validate-then-commit helpers on [`Ports`].

pub mod memory;

use thiserror::Error;

use crate::core::types::{ActorId, CampKey, Currency, ItemDescriptor, ItemStack, Location, Vars};

pub use memory::{MemoryInventory, MemoryLedger, MemoryWorld, Notice, NoticeChannel, RecordingNotifier};

/// Failure reported by a ledger call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("insufficient funds: needed {needed}")]
    InsufficientFunds { needed: Currency },
    #[error("ledger rejected the transaction: {0}")]
    Rejected(String),
}

/// Personal currency accounts of actors
pub trait Ledger: Send {
    fn has_funds(&self, actor: ActorId, amount: Currency) -> bool;
    fn withdraw(&mut self, actor: ActorId, amount: Currency) -> Result<(), LedgerError>;
    fn deposit(&mut self, actor: ActorId, amount: Currency) -> Result<(), LedgerError>;
}

/// Item possession of actors
pub trait Inventory: Send {
    fn count_matching(&self, actor: ActorId, item: &ItemDescriptor) -> u32;
    fn consume(&mut self, actor: ActorId, item: &ItemDescriptor, amount: u32);
    fn grant(&mut self, actor: ActorId, stack: ItemStack);
}

/// Message delivery; templating and localization happen on the other side
pub trait Notifier: Send {
    fn send_to_actor(&mut self, actor: ActorId, key: &str, vars: &Vars);
    fn send_action_bar(&mut self, actor: ActorId, key: &str, vars: &Vars);
    fn broadcast(&mut self, key: &str, vars: &Vars);
}

/// Raw world access: obstruction probes, effect cleanup, raider spawns
pub trait WorldPort: Send {
    /// True if any solid block sits in the column `height` blocks above the
    /// anchor and `radius` blocks around it
    fn is_obstructed(&self, anchor: &Location, height: i32, radius: i32) -> bool;
    fn clear_camp_effects(&mut self, camp: &CampKey, location: &Location);
    fn remove_camp_structure(&mut self, camp: &CampKey, location: &Location);
    fn spawn_raiders(&mut self, target: &Location, count: u32, war_id: u64);
}

/// Why a charge could not be settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentError {
    NoLedger,
    InsufficientFunds,
}

/// All collaborators the engine talks to
pub struct Ports {
    pub ledger: Option<Box<dyn Ledger>>,
    pub inventory: Box<dyn Inventory>,
    pub notifier: Box<dyn Notifier>,
    pub world: Box<dyn WorldPort>,
}

impl Ports {
    pub fn new(
        ledger: Option<Box<dyn Ledger>>,
        inventory: Box<dyn Inventory>,
        notifier: Box<dyn Notifier>,
        world: Box<dyn WorldPort>,
    ) -> Self {
        Self {
            ledger,
            inventory,
            notifier,
            world,
        }
    }

    /// Check, without moving money, that `actor` could pay `amount`
    pub fn can_afford(&self, actor: ActorId, amount: Currency) -> Result<(), PaymentError> {
        if amount <= 0.0 {
            return Ok(());
        }
        match &self.ledger {
            None => Err(PaymentError::NoLedger),
            Some(ledger) if ledger.has_funds(actor, amount) => Ok(()),
            Some(_) => Err(PaymentError::InsufficientFunds),
        }
    }

    /// Withdraw `amount` from `actor`. Re-checks funds immediately before the
    /// withdraw; a failed withdraw counts as insufficient funds.
    pub fn charge(&mut self, actor: ActorId, amount: Currency) -> Result<(), PaymentError> {
        if amount <= 0.0 {
            return Ok(());
        }
        let ledger = self.ledger.as_mut().ok_or(PaymentError::NoLedger)?;
        if !ledger.has_funds(actor, amount) {
            return Err(PaymentError::InsufficientFunds);
        }
        ledger
            .withdraw(actor, amount)
            .map_err(|_| PaymentError::InsufficientFunds)
    }

    /// Deposit `amount` to `actor`
    pub fn pay(&mut self, actor: ActorId, amount: Currency) -> Result<(), PaymentError> {
        if amount <= 0.0 {
            return Ok(());
        }
        let ledger = self.ledger.as_mut().ok_or(PaymentError::NoLedger)?;
        ledger
            .deposit(actor, amount)
            .map_err(|_| PaymentError::InsufficientFunds)
    }

    /// True if `actor` holds every stack in `items`. Repeated descriptors are
    /// summed before comparison.
    pub fn has_items(&self, actor: ActorId, items: &[ItemStack]) -> bool {
        let mut needed: Vec<(&ItemDescriptor, u32)> = Vec::new();
        for stack in items {
            match needed.iter_mut().find(|(item, _)| *item == &stack.item) {
                Some(entry) => entry.1 += stack.amount,
                None => needed.push((&stack.item, stack.amount)),
            }
        }
        needed
            .iter()
            .all(|(item, amount)| self.inventory.count_matching(actor, item) >= *amount)
    }

    /// Consume previously validated items
    pub fn consume_items(&mut self, actor: ActorId, items: &[ItemStack]) {
        for stack in items {
            if stack.amount > 0 {
                self.inventory.consume(actor, &stack.item, stack.amount);
            }
        }
    }

    pub fn notify(&mut self, actor: ActorId, key: &str, vars: &Vars) {
        self.notifier.send_to_actor(actor, key, vars);
    }

    pub fn notify_all<'a>(&mut self, actors: impl IntoIterator<Item = &'a ActorId>, key: &str, vars: &Vars) {
        for actor in actors {
            self.notifier.send_to_actor(*actor, key, vars);
        }
    }
}

impl std::fmt::Debug for Ports {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ports")
            .field("ledger", &self.ledger.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ports_with(ledger: &MemoryLedger, inventory: &MemoryInventory) -> Ports {
        Ports::new(
            Some(Box::new(ledger.clone())),
            Box::new(inventory.clone()),
            Box::new(RecordingNotifier::new()),
            Box::new(MemoryWorld::new()),
        )
    }

    #[test]
    fn test_charge_rechecks_and_withdraws() {
        let ledger = MemoryLedger::new();
        let inventory = MemoryInventory::new();
        let actor = ActorId::new();
        ledger.set_balance(actor, 50.0);
        let mut ports = ports_with(&ledger, &inventory);

        assert_eq!(ports.charge(actor, 80.0), Err(PaymentError::InsufficientFunds));
        assert_eq!(ledger.balance(actor), 50.0);
        assert_eq!(ports.charge(actor, 20.0), Ok(()));
        assert_eq!(ledger.balance(actor), 30.0);
    }

    #[test]
    fn test_failed_withdraw_counts_as_insufficient() {
        let ledger = MemoryLedger::new();
        let inventory = MemoryInventory::new();
        let actor = ActorId::new();
        ledger.set_balance(actor, 500.0);
        ledger.fail_withdrawals(true);
        let mut ports = ports_with(&ledger, &inventory);

        assert_eq!(ports.charge(actor, 10.0), Err(PaymentError::InsufficientFunds));
        assert_eq!(ledger.balance(actor), 500.0);
    }

    #[test]
    fn test_missing_ledger_only_matters_for_nonzero_amounts() {
        let mut ports = Ports::new(
            None,
            Box::new(MemoryInventory::new()),
            Box::new(RecordingNotifier::new()),
            Box::new(MemoryWorld::new()),
        );
        let actor = ActorId::new();
        assert_eq!(ports.charge(actor, 0.0), Ok(()));
        assert_eq!(ports.charge(actor, 1.0), Err(PaymentError::NoLedger));
    }

    #[test]
    fn test_has_items_sums_repeated_descriptors() {
        let ledger = MemoryLedger::new();
        let inventory = MemoryInventory::new();
        let actor = ActorId::new();
        let iron = ItemDescriptor::material("iron_ingot");
        inventory.give(actor, iron.clone(), 5);
        let ports = ports_with(&ledger, &inventory);

        let split = vec![ItemStack::new(iron.clone(), 3), ItemStack::new(iron.clone(), 2)];
        assert!(ports.has_items(actor, &split));
        let too_many = vec![ItemStack::new(iron.clone(), 3), ItemStack::new(iron, 3)];
        assert!(!ports.has_items(actor, &too_many));
    }
}
