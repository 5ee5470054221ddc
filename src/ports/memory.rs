//! In-memory port implementations
//!
//! Used by tests and by hosts that keep balances and inventories in
//! process. Every type is a cheap handle over shared state, so a clone kept
//! by the host observes what the engine did through its boxed copy.

use std::sync::{Arc, Mutex, MutexGuard};

use ahash::{AHashMap, AHashSet};

use super::{Inventory, Ledger, LedgerError, Notifier, WorldPort};
use crate::core::types::{ActorId, CampKey, Currency, ItemDescriptor, ItemStack, Location, Vars};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A poisoned lock only means another test thread panicked mid-update
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct LedgerInner {
    balances: AHashMap<ActorId, Currency>,
    fail_withdrawals: bool,
    fail_deposits: bool,
}

/// Ledger keeping balances in a shared map
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    inner: Arc<Mutex<LedgerInner>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&self, actor: ActorId, amount: Currency) {
        lock(&self.inner).balances.insert(actor, amount);
    }

    pub fn balance(&self, actor: ActorId) -> Currency {
        lock(&self.inner).balances.get(&actor).copied().unwrap_or(0.0)
    }

    /// Make every withdraw fail even when funds are present
    pub fn fail_withdrawals(&self, fail: bool) {
        lock(&self.inner).fail_withdrawals = fail;
    }

    pub fn fail_deposits(&self, fail: bool) {
        lock(&self.inner).fail_deposits = fail;
    }
}

impl Ledger for MemoryLedger {
    fn has_funds(&self, actor: ActorId, amount: Currency) -> bool {
        self.balance(actor) >= amount
    }

    fn withdraw(&mut self, actor: ActorId, amount: Currency) -> Result<(), LedgerError> {
        let mut inner = lock(&self.inner);
        if inner.fail_withdrawals {
            return Err(LedgerError::Rejected("withdrawals disabled".into()));
        }
        let balance = inner.balances.entry(actor).or_insert(0.0);
        if *balance < amount {
            return Err(LedgerError::InsufficientFunds { needed: amount });
        }
        *balance -= amount;
        Ok(())
    }

    fn deposit(&mut self, actor: ActorId, amount: Currency) -> Result<(), LedgerError> {
        let mut inner = lock(&self.inner);
        if inner.fail_deposits {
            return Err(LedgerError::Rejected("deposits disabled".into()));
        }
        *inner.balances.entry(actor).or_insert(0.0) += amount;
        Ok(())
    }
}

/// Inventory keeping item counts per actor
#[derive(Debug, Clone, Default)]
pub struct MemoryInventory {
    items: Arc<Mutex<AHashMap<(ActorId, ItemDescriptor), u32>>>,
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn give(&self, actor: ActorId, item: ItemDescriptor, amount: u32) {
        *lock(&self.items).entry((actor, item)).or_insert(0) += amount;
    }

    pub fn count(&self, actor: ActorId, item: &ItemDescriptor) -> u32 {
        lock(&self.items).get(&(actor, item.clone())).copied().unwrap_or(0)
    }
}

impl Inventory for MemoryInventory {
    fn count_matching(&self, actor: ActorId, item: &ItemDescriptor) -> u32 {
        self.count(actor, item)
    }

    fn consume(&mut self, actor: ActorId, item: &ItemDescriptor, amount: u32) {
        let mut items = lock(&self.items);
        if let Some(count) = items.get_mut(&(actor, item.clone())) {
            *count = count.saturating_sub(amount);
        }
    }

    fn grant(&mut self, actor: ActorId, stack: ItemStack) {
        self.give(actor, stack.item, stack.amount);
    }
}

/// Where a recorded notice was sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeChannel {
    Chat(ActorId),
    ActionBar(ActorId),
    Broadcast,
}

/// One recorded notification
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub channel: NoticeChannel,
    pub key: String,
    pub vars: Vars,
}

impl Notice {
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Notifier that records everything it is asked to deliver
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        lock(&self.notices).clone()
    }

    pub fn with_key(&self, key: &str) -> Vec<Notice> {
        lock(&self.notices)
            .iter()
            .filter(|n| n.key == key)
            .cloned()
            .collect()
    }

    pub fn count(&self, key: &str) -> usize {
        lock(&self.notices).iter().filter(|n| n.key == key).count()
    }

    pub fn clear(&self) {
        lock(&self.notices).clear();
    }

    fn push(&self, channel: NoticeChannel, key: &str, vars: &Vars) {
        lock(&self.notices).push(Notice {
            channel,
            key: key.to_string(),
            vars: vars.clone(),
        });
    }
}

impl Notifier for RecordingNotifier {
    fn send_to_actor(&mut self, actor: ActorId, key: &str, vars: &Vars) {
        self.push(NoticeChannel::Chat(actor), key, vars);
    }

    fn send_action_bar(&mut self, actor: ActorId, key: &str, vars: &Vars) {
        self.push(NoticeChannel::ActionBar(actor), key, vars);
    }

    fn broadcast(&mut self, key: &str, vars: &Vars) {
        self.push(NoticeChannel::Broadcast, key, vars);
    }
}

#[derive(Debug, Default)]
struct WorldInner {
    obstructed: AHashSet<Location>,
    effects_cleared: Vec<CampKey>,
    removed: Vec<Location>,
    raids: Vec<(Location, u32, u64)>,
}

/// World stub: obstruction is looked up by exact anchor location
#[derive(Debug, Clone, Default)]
pub struct MemoryWorld {
    inner: Arc<Mutex<WorldInner>>,
}

impl MemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn obstruct(&self, anchor: Location) {
        lock(&self.inner).obstructed.insert(anchor);
    }

    pub fn effects_cleared(&self) -> Vec<CampKey> {
        lock(&self.inner).effects_cleared.clone()
    }

    pub fn removed_structures(&self) -> Vec<Location> {
        lock(&self.inner).removed.clone()
    }

    pub fn raids(&self) -> Vec<(Location, u32, u64)> {
        lock(&self.inner).raids.clone()
    }
}

impl WorldPort for MemoryWorld {
    fn is_obstructed(&self, anchor: &Location, _height: i32, _radius: i32) -> bool {
        lock(&self.inner).obstructed.contains(anchor)
    }

    fn clear_camp_effects(&mut self, camp: &CampKey, _location: &Location) {
        lock(&self.inner).effects_cleared.push(camp.clone());
    }

    fn remove_camp_structure(&mut self, _camp: &CampKey, location: &Location) {
        lock(&self.inner).removed.push(location.clone());
    }

    fn spawn_raiders(&mut self, target: &Location, count: u32, war_id: u64) {
        lock(&self.inner).raids.push((target.clone(), count, war_id));
    }
}
