//! State - a player-formed political entity owning sectors

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::core::types::{ActorId, Currency, NameKey, Timestamp};
use crate::territory::sector::Sector;

/// Authority of an actor within a state, strongest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    None,
    Member,
    /// Member governing at least one sector
    Governor,
    Captain,
}

/// What moved money in or out of a state bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Upgrade,
    Maintenance,
    Repair,
    ModuleUnlock,
    WarReward,
    WarLootGained,
    WarLootLost,
}

/// One bank log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub at: Timestamp,
    pub kind: TransactionKind,
    pub amount: Currency,
    pub actor: Option<ActorId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub name: String,
    pub captain: ActorId,
    pub members: BTreeSet<ActorId>,
    /// Display name of the capital sector
    pub capital: Option<String>,
    pub sectors: BTreeMap<NameKey, Sector>,
    pub bank: Currency,
    pub tax_rate: f64,
    pub ideology: Option<String>,
    pub ideology_changed_at: Option<Timestamp>,
    /// Newest first
    pub transactions: VecDeque<Transaction>,
    pub founded_at: Timestamp,
}

impl State {
    pub fn new(name: &str, captain: ActorId, now: Timestamp) -> Self {
        let mut members = BTreeSet::new();
        members.insert(captain);
        Self {
            name: name.to_string(),
            captain,
            members,
            capital: None,
            sectors: BTreeMap::new(),
            bank: 0.0,
            tax_rate: 0.0,
            ideology: None,
            ideology_changed_at: None,
            transactions: VecDeque::new(),
            founded_at: now,
        }
    }

    pub fn key(&self) -> NameKey {
        NameKey::new(&self.name)
    }

    pub fn is_member(&self, actor: ActorId) -> bool {
        self.members.contains(&actor)
    }

    /// Computed on demand, never cached
    pub fn role_of(&self, actor: ActorId) -> Role {
        if self.captain == actor {
            Role::Captain
        } else if self.sectors.values().any(|s| s.governor == Some(actor)) {
            Role::Governor
        } else if self.members.contains(&actor) {
            Role::Member
        } else {
            Role::None
        }
    }

    /// Captain, or the governor of `sector`
    pub fn can_manage(&self, actor: ActorId, sector: &NameKey) -> bool {
        self.captain == actor
            || self
                .sectors
                .get(sector)
                .map_or(false, |s| s.governor == Some(actor))
    }

    pub fn sector(&self, name: &str) -> Option<&Sector> {
        self.sectors.get(&NameKey::new(name))
    }

    pub fn capital_key(&self) -> Option<NameKey> {
        self.capital.as_deref().map(NameKey::new)
    }

    pub fn is_capital(&self, sector: &NameKey) -> bool {
        self.capital_key().as_ref() == Some(sector)
    }

    /// Actors who should hear about something happening to `sector`
    pub fn managers_of(&self, sector: &NameKey) -> Vec<ActorId> {
        let mut out = vec![self.captain];
        if let Some(gov) = self.sectors.get(sector).and_then(|s| s.governor) {
            if gov != self.captain {
                out.push(gov);
            }
        }
        out
    }

    /// Who takes over if the captain leaves: the first governor in sector
    /// order, otherwise the lowest remaining member id
    pub fn successor(&self) -> Option<ActorId> {
        self.sectors
            .values()
            .filter_map(|s| s.governor)
            .find(|g| *g != self.captain && self.members.contains(g))
            .or_else(|| self.members.iter().copied().find(|m| *m != self.captain))
    }

    pub fn record(&mut self, transaction: Transaction, cap: usize) {
        self.transactions.push_front(transaction);
        self.transactions.truncate(cap);
    }

    pub fn deposit(&mut self, amount: Currency) {
        self.bank += amount.max(0.0);
    }

    /// Take `amount` from the bank if it is covered
    pub fn withdraw(&mut self, amount: Currency) -> bool {
        if amount < 0.0 || self.bank < amount {
            return false;
        }
        self.bank -= amount;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Location;

    #[test]
    fn test_roles_are_ordered() {
        assert!(Role::Captain > Role::Governor);
        assert!(Role::Governor > Role::Member);
        assert!(Role::Member > Role::None);
    }

    #[test]
    fn test_role_resolution() {
        let captain = ActorId::new();
        let governor = ActorId::new();
        let member = ActorId::new();
        let mut state = State::new("Rome", captain, 0);
        state.members.insert(governor);
        state.members.insert(member);
        let mut sector = Sector::new("Forum", Location::new("world", 0, 64, 0), 0);
        sector.governor = Some(governor);
        state.sectors.insert(sector.key(), sector);

        assert_eq!(state.role_of(captain), Role::Captain);
        assert_eq!(state.role_of(governor), Role::Governor);
        assert_eq!(state.role_of(member), Role::Member);
        assert_eq!(state.role_of(ActorId::new()), Role::None);
        assert!(state.can_manage(governor, &NameKey::new("forum")));
        assert!(!state.can_manage(member, &NameKey::new("forum")));
    }

    #[test]
    fn test_successor_prefers_governor() {
        let captain = ActorId::new();
        let governor = ActorId::new();
        let mut state = State::new("Rome", captain, 0);
        for _ in 0..3 {
            state.members.insert(ActorId::new());
        }
        state.members.insert(governor);
        let mut sector = Sector::new("Forum", Location::new("world", 0, 64, 0), 0);
        sector.governor = Some(governor);
        state.sectors.insert(sector.key(), sector);
        assert_eq!(state.successor(), Some(governor));
    }

    #[test]
    fn test_transaction_log_is_capped_newest_first() {
        let mut state = State::new("Rome", ActorId::new(), 0);
        for i in 0..5 {
            state.record(
                Transaction {
                    at: i,
                    kind: TransactionKind::Deposit,
                    amount: 1.0,
                    actor: None,
                },
                3,
            );
        }
        assert_eq!(state.transactions.len(), 3);
        assert_eq!(state.transactions[0].at, 4);
        assert_eq!(state.transactions[2].at, 2);
    }
}
