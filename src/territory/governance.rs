//! Authority-checked political actions: renames, capital moves, governors,
//! membership changes, the state bank and state policy

use tracing::info;

use crate::core::config::FrontierConfig;
use crate::core::types::{secs, ActorId, CampKey, Currency, NameKey, Timestamp};
use crate::ports::{PaymentError, Ports, WorldPort};
use crate::territory::state::{Transaction, TransactionKind};
use crate::territory::store::{MemberRemoval, NameError, TerritoryStore};

#[derive(Debug, Clone, PartialEq)]
pub enum RenameOutcome {
    Renamed { old: NameKey, new: NameKey },
    NotInState,
    NotAuthorized,
    SectorNotFound,
    InvalidName,
    NameReserved,
    NameTaken,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CapitalOutcome {
    Success { previous: Option<String> },
    NotInState,
    NotCaptain,
    SectorNotFound,
    AlreadyCapital,
    InTransit,
    Broken,
    AtWar,
    Cooldown { remaining_ms: Timestamp },
}

#[derive(Debug, Clone, PartialEq)]
pub enum MembershipOutcome {
    Success,
    CaptainReplaced { successor: ActorId },
    /// The last member left; the state no longer exists
    StateDisbanded { state: String },
    NotInState,
    NotCaptain,
    TargetNotMember,
    CannotTargetSelf,
    AlreadyInState,
    SectorNotFound,
    /// Invite, join and gift flows
    RequestFailed(crate::requests::RequestOutcome),
}

#[derive(Debug, Clone, PartialEq)]
pub enum BankOutcome {
    Success { balance: Currency },
    NotInState,
    NotCaptain,
    InvalidAmount,
    InsufficientFunds,
    /// The bank holds less than requested
    BankInsufficient { balance: Currency },
    /// The ledger refused to credit the actor; the bank is untouched
    DepositRejected,
    NoLedger,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PolicyOutcome {
    Success,
    NotInState,
    NotCaptain,
    InvalidRate { max: f64 },
    Unchanged,
    Cooldown { remaining_ms: Timestamp },
}

/// Where a state expense was paid from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaidFrom {
    StateBank,
    Personal,
}

fn name_error_outcome(err: NameError) -> RenameOutcome {
    match err {
        NameError::Invalid => RenameOutcome::InvalidName,
        NameError::Reserved => RenameOutcome::NameReserved,
        NameError::Taken => RenameOutcome::NameTaken,
    }
}

impl TerritoryStore {
    /// The state `actor` captains
    pub(crate) fn captained_state(&self, actor: ActorId) -> Result<NameKey, bool> {
        let key = self.membership.get(&actor).cloned().ok_or(false)?;
        match self.states.get(&key) {
            Some(state) if state.captain == actor => Ok(key),
            Some(_) => Err(true),
            None => Err(false),
        }
    }

    /// Pay a state expense, preferring the state bank and falling back to
    /// the actor's personal funds. Nothing moves on failure.
    #[allow(clippy::too_many_arguments)]
    pub fn settle_cost(
        &mut self,
        state_key: &NameKey,
        actor: ActorId,
        cost: Currency,
        kind: TransactionKind,
        now: Timestamp,
        config: &FrontierConfig,
        ports: &mut Ports,
    ) -> Result<PaidFrom, PaymentError> {
        let bank = self.states.get(state_key).map_or(0.0, |s| s.bank);
        if cost <= 0.0 {
            return Ok(PaidFrom::StateBank);
        }
        if bank < cost {
            ports.charge(actor, cost)?;
            return Ok(PaidFrom::Personal);
        }
        if let Some(state) = self.states.get_mut(state_key) {
            state.withdraw(cost);
            state.record(
                Transaction {
                    at: now,
                    kind,
                    amount: cost,
                    actor: Some(actor),
                },
                config.states.transaction_log_cap,
            );
        }
        self.mark_dirty();
        Ok(PaidFrom::StateBank)
    }

    /// Captain renames their state
    pub fn rename_state_by(&mut self, actor: ActorId, new_name: &str, config: &FrontierConfig) -> RenameOutcome {
        let old = match self.captained_state(actor) {
            Ok(key) => key,
            Err(true) => return RenameOutcome::NotAuthorized,
            Err(false) => return RenameOutcome::NotInState,
        };
        if let Err(err) = Self::check_name(new_name, &config.states) {
            return name_error_outcome(err);
        }
        match self.rename_state(&old, new_name) {
            Ok(new) => RenameOutcome::Renamed { old, new },
            Err(err) => name_error_outcome(err),
        }
    }

    /// Captain or the sector's governor renames a sector
    pub fn rename_sector_by(
        &mut self,
        actor: ActorId,
        sector_name: &str,
        new_name: &str,
        config: &FrontierConfig,
    ) -> RenameOutcome {
        let Some(state_key) = self.membership.get(&actor).cloned() else {
            return RenameOutcome::NotInState;
        };
        let sector_key = NameKey::new(sector_name);
        let Some(state) = self.states.get(&state_key) else {
            return RenameOutcome::NotInState;
        };
        if !state.sectors.contains_key(&sector_key) {
            return RenameOutcome::SectorNotFound;
        }
        if !state.can_manage(actor, &sector_key) {
            return RenameOutcome::NotAuthorized;
        }
        if let Err(err) = Self::check_name(new_name, &config.states) {
            return name_error_outcome(err);
        }
        match self.rename_sector(&state_key, &sector_key, new_name) {
            Ok(new) => RenameOutcome::Renamed { old: sector_key, new },
            Err(err) => name_error_outcome(err),
        }
    }

    /// Peacetime capital move to another located, intact sector
    pub fn set_capital(
        &mut self,
        actor: ActorId,
        sector_name: &str,
        at_war: bool,
        now: Timestamp,
        config: &FrontierConfig,
    ) -> CapitalOutcome {
        let state_key = match self.captained_state(actor) {
            Ok(key) => key,
            Err(true) => return CapitalOutcome::NotCaptain,
            Err(false) => return CapitalOutcome::NotInState,
        };
        let sector_key = NameKey::new(sector_name);
        let Some(state) = self.states.get(&state_key) else {
            return CapitalOutcome::NotInState;
        };
        let Some(sector) = state.sectors.get(&sector_key) else {
            return CapitalOutcome::SectorNotFound;
        };
        if state.is_capital(&sector_key) {
            return CapitalOutcome::AlreadyCapital;
        }
        if sector.in_transit() {
            return CapitalOutcome::InTransit;
        }
        let camp_key = CampKey::from_keys(state_key.clone(), sector_key);
        if self.camps.get(&camp_key).map_or(true, |c| c.is_broken()) {
            return CapitalOutcome::Broken;
        }
        if at_war {
            return CapitalOutcome::AtWar;
        }
        if let Some(remaining_ms) = self.cooldowns.capital_move.remaining(&state_key, now) {
            return CapitalOutcome::Cooldown { remaining_ms };
        }

        let new_capital = sector.name.clone();
        let Some(state) = self.states.get_mut(&state_key) else {
            return CapitalOutcome::NotInState;
        };
        let previous = state.capital.replace(new_capital);
        self.cooldowns
            .capital_move
            .start(state_key, now, secs(config.states.capital_move_cooldown_secs));
        self.mark_dirty();
        CapitalOutcome::Success { previous }
    }

    /// Captain assigns (or clears, with `None`) a sector's governor
    pub fn set_governor(&mut self, actor: ActorId, sector_name: &str, governor: Option<ActorId>) -> MembershipOutcome {
        let state_key = match self.captained_state(actor) {
            Ok(key) => key,
            Err(true) => return MembershipOutcome::NotCaptain,
            Err(false) => return MembershipOutcome::NotInState,
        };
        let Some(state) = self.states.get_mut(&state_key) else {
            return MembershipOutcome::NotInState;
        };
        if let Some(target) = governor {
            if target == state.captain {
                return MembershipOutcome::CannotTargetSelf;
            }
            if !state.members.contains(&target) {
                return MembershipOutcome::TargetNotMember;
            }
        }
        let Some(sector) = state.sectors.get_mut(&NameKey::new(sector_name)) else {
            return MembershipOutcome::SectorNotFound;
        };
        sector.governor = governor;
        self.mark_dirty();
        MembershipOutcome::Success
    }

    /// Actor leaves their state; a departing captain is succeeded
    pub fn leave_state(&mut self, actor: ActorId, world: &mut dyn WorldPort) -> MembershipOutcome {
        let Some(state_key) = self.membership.get(&actor).cloned() else {
            return MembershipOutcome::NotInState;
        };
        removal_outcome(self.remove_member(&state_key, actor, world))
    }

    /// Captain removes another member
    pub fn kick_member(&mut self, actor: ActorId, target: ActorId, world: &mut dyn WorldPort) -> MembershipOutcome {
        let state_key = match self.captained_state(actor) {
            Ok(key) => key,
            Err(true) => return MembershipOutcome::NotCaptain,
            Err(false) => return MembershipOutcome::NotInState,
        };
        if actor == target {
            return MembershipOutcome::CannotTargetSelf;
        }
        removal_outcome(self.remove_member(&state_key, target, world))
    }

    pub fn transfer_captaincy(&mut self, actor: ActorId, target: ActorId) -> MembershipOutcome {
        let state_key = match self.captained_state(actor) {
            Ok(key) => key,
            Err(true) => return MembershipOutcome::NotCaptain,
            Err(false) => return MembershipOutcome::NotInState,
        };
        if actor == target {
            return MembershipOutcome::CannotTargetSelf;
        }
        if self.set_captain(&state_key, target) {
            info!(state = %state_key, captain = %target, "captaincy transferred");
            MembershipOutcome::Success
        } else {
            MembershipOutcome::TargetNotMember
        }
    }

    /// Any member pays into the state bank from personal funds
    pub fn deposit_to_bank(
        &mut self,
        actor: ActorId,
        amount: Currency,
        now: Timestamp,
        config: &FrontierConfig,
        ports: &mut Ports,
    ) -> BankOutcome {
        if !(amount > 0.0) || !amount.is_finite() {
            return BankOutcome::InvalidAmount;
        }
        let Some(state_key) = self.membership.get(&actor).cloned() else {
            return BankOutcome::NotInState;
        };
        if !self.states.contains_key(&state_key) {
            return BankOutcome::NotInState;
        }
        match ports.charge(actor, amount) {
            Ok(()) => {}
            Err(PaymentError::NoLedger) => return BankOutcome::NoLedger,
            Err(PaymentError::InsufficientFunds) => return BankOutcome::InsufficientFunds,
        }
        let Some(state) = self.states.get_mut(&state_key) else {
            return BankOutcome::NotInState;
        };
        state.deposit(amount);
        state.record(
            Transaction {
                at: now,
                kind: TransactionKind::Deposit,
                amount,
                actor: Some(actor),
            },
            config.states.transaction_log_cap,
        );
        let balance = state.bank;
        self.mark_dirty();
        BankOutcome::Success { balance }
    }

    /// Captain pays out of the state bank into personal funds
    pub fn withdraw_from_bank(
        &mut self,
        actor: ActorId,
        amount: Currency,
        now: Timestamp,
        config: &FrontierConfig,
        ports: &mut Ports,
    ) -> BankOutcome {
        if !(amount > 0.0) || !amount.is_finite() {
            return BankOutcome::InvalidAmount;
        }
        let state_key = match self.captained_state(actor) {
            Ok(key) => key,
            Err(true) => return BankOutcome::NotCaptain,
            Err(false) => return BankOutcome::NotInState,
        };
        let Some(balance) = self.states.get(&state_key).map(|s| s.bank) else {
            return BankOutcome::NotInState;
        };
        if balance < amount {
            return BankOutcome::BankInsufficient { balance };
        }
        match ports.pay(actor, amount) {
            Ok(()) => {}
            Err(PaymentError::NoLedger) => return BankOutcome::NoLedger,
            Err(PaymentError::InsufficientFunds) => return BankOutcome::DepositRejected,
        }
        let Some(state) = self.states.get_mut(&state_key) else {
            return BankOutcome::NotInState;
        };
        state.withdraw(amount);
        state.record(
            Transaction {
                at: now,
                kind: TransactionKind::Withdrawal,
                amount,
                actor: Some(actor),
            },
            config.states.transaction_log_cap,
        );
        let balance = state.bank;
        self.mark_dirty();
        BankOutcome::Success { balance }
    }

    /// Share of claimed production kept by the state bank
    pub fn set_tax_rate(&mut self, actor: ActorId, rate: f64, config: &FrontierConfig) -> PolicyOutcome {
        let state_key = match self.captained_state(actor) {
            Ok(key) => key,
            Err(true) => return PolicyOutcome::NotCaptain,
            Err(false) => return PolicyOutcome::NotInState,
        };
        let max = config.states.max_tax_rate;
        if !(0.0..=max).contains(&rate) {
            return PolicyOutcome::InvalidRate { max };
        }
        if let Some(state) = self.states.get_mut(&state_key) {
            state.tax_rate = rate;
            self.mark_dirty();
        }
        PolicyOutcome::Success
    }

    pub fn set_ideology(
        &mut self,
        actor: ActorId,
        ideology: &str,
        now: Timestamp,
        config: &FrontierConfig,
    ) -> PolicyOutcome {
        let state_key = match self.captained_state(actor) {
            Ok(key) => key,
            Err(true) => return PolicyOutcome::NotCaptain,
            Err(false) => return PolicyOutcome::NotInState,
        };
        let Some(state) = self.states.get_mut(&state_key) else {
            return PolicyOutcome::NotInState;
        };
        if state.ideology.as_deref() == Some(ideology) {
            return PolicyOutcome::Unchanged;
        }
        if let Some(changed_at) = state.ideology_changed_at {
            let ready_at = changed_at.saturating_add(secs(config.states.ideology_cooldown_secs));
            if now < ready_at {
                return PolicyOutcome::Cooldown {
                    remaining_ms: ready_at - now,
                };
            }
        }
        state.ideology = Some(ideology.to_string());
        state.ideology_changed_at = Some(now);
        self.mark_dirty();
        PolicyOutcome::Success
    }
}

fn removal_outcome(removal: MemberRemoval) -> MembershipOutcome {
    match removal {
        MemberRemoval::NotMember => MembershipOutcome::TargetNotMember,
        MemberRemoval::Removed => MembershipOutcome::Success,
        MemberRemoval::CaptainReplaced { successor } => MembershipOutcome::CaptainReplaced { successor },
        MemberRemoval::StateDeleted(state) => MembershipOutcome::StateDisbanded { state: state.name },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Location;
    use crate::ports::{MemoryInventory, MemoryLedger, MemoryWorld, RecordingNotifier};
    use crate::territory::camp::Camp;
    use crate::territory::sector::Sector;
    use crate::territory::state::State;

    fn setup() -> (TerritoryStore, FrontierConfig, ActorId, ActorId) {
        let config = FrontierConfig::default();
        let captain = ActorId::new();
        let member = ActorId::new();
        let mut store = TerritoryStore::new();
        let mut state = State::new("Rome", captain, 0);
        for (name, x) in [("Forum", 0), ("Hill", 100)] {
            let sector = Sector::new(name, Location::new("world", x, 64, 0), 0);
            let key = CampKey::from_keys(state.key(), sector.key());
            state.sectors.insert(sector.key(), sector);
            store.insert_camp(key, Camp::new(&config.camps, 1000, 3600, 0));
        }
        state.capital = Some("Forum".into());
        store.insert_state(state);
        store.add_member(&NameKey::new("rome"), member);
        (store, config, captain, member)
    }

    fn ports(ledger: &MemoryLedger) -> Ports {
        Ports::new(
            Some(Box::new(ledger.clone())),
            Box::new(MemoryInventory::new()),
            Box::new(RecordingNotifier::new()),
            Box::new(MemoryWorld::new()),
        )
    }

    #[test]
    fn test_only_captain_renames_state() {
        let (mut store, config, captain, member) = setup();
        assert_eq!(store.rename_state_by(member, "Byzantium", &config), RenameOutcome::NotAuthorized);
        assert_eq!(store.rename_state_by(captain, "server", &config), RenameOutcome::NameReserved);
        assert!(matches!(
            store.rename_state_by(captain, "Byzantium", &config),
            RenameOutcome::Renamed { .. }
        ));
        assert_eq!(store.state_of(member), Some(&NameKey::new("byzantium")));
    }

    #[test]
    fn test_governor_can_rename_own_sector() {
        let (mut store, config, captain, member) = setup();
        assert_eq!(store.set_governor(captain, "Hill", Some(member)), MembershipOutcome::Success);
        assert!(matches!(
            store.rename_sector_by(member, "hill", "Aventine", &config),
            RenameOutcome::Renamed { .. }
        ));
        assert_eq!(store.rename_sector_by(member, "forum", "Agora", &config), RenameOutcome::NotAuthorized);
    }

    #[test]
    fn test_capital_move_gates() {
        let (mut store, config, captain, _) = setup();
        assert_eq!(store.set_capital(captain, "Forum", false, 0, &config), CapitalOutcome::AlreadyCapital);
        assert_eq!(store.set_capital(captain, "Hill", true, 0, &config), CapitalOutcome::AtWar);
        assert_eq!(
            store.set_capital(captain, "Hill", false, 0, &config),
            CapitalOutcome::Success {
                previous: Some("Forum".into())
            }
        );
        assert!(matches!(
            store.set_capital(captain, "Forum", false, 1, &config),
            CapitalOutcome::Cooldown { .. }
        ));
    }

    #[test]
    fn test_broken_sector_cannot_become_capital() {
        let (mut store, config, captain, _) = setup();
        store.camp_mut(&CampKey::new("rome", "hill")).unwrap().apply_damage(1000.0, 0);
        assert_eq!(store.set_capital(captain, "Hill", false, 0, &config), CapitalOutcome::Broken);
    }

    #[test]
    fn test_bank_deposit_and_captain_withdraw() {
        let (mut store, config, captain, member) = setup();
        let ledger = MemoryLedger::new();
        ledger.set_balance(member, 300.0);
        let mut ports = ports(&ledger);

        assert_eq!(
            store.deposit_to_bank(member, 200.0, 5, &config, &mut ports),
            BankOutcome::Success { balance: 200.0 }
        );
        assert_eq!(ledger.balance(member), 100.0);
        assert_eq!(
            store.withdraw_from_bank(member, 50.0, 6, &config, &mut ports),
            BankOutcome::NotCaptain
        );
        assert_eq!(
            store.withdraw_from_bank(captain, 500.0, 6, &config, &mut ports),
            BankOutcome::BankInsufficient { balance: 200.0 }
        );
        assert_eq!(
            store.withdraw_from_bank(captain, 50.0, 7, &config, &mut ports),
            BankOutcome::Success { balance: 150.0 }
        );
        let state = store.state_by_name("rome").unwrap();
        assert_eq!(state.transactions.len(), 2);
        assert_eq!(state.transactions[0].kind, TransactionKind::Withdrawal);
    }

    #[test]
    fn test_rejected_payout_leaves_bank_untouched() {
        let (mut store, config, captain, _) = setup();
        let ledger = MemoryLedger::new();
        let mut ports = ports(&ledger);
        store.state_mut(&NameKey::new("rome")).unwrap().bank = 100.0;
        ledger.fail_deposits(true);
        assert_eq!(
            store.withdraw_from_bank(captain, 50.0, 0, &config, &mut ports),
            BankOutcome::DepositRejected
        );
        assert_eq!(store.state_by_name("rome").unwrap().bank, 100.0);
    }

    #[test]
    fn test_tax_rate_bounded_and_ideology_cooldown() {
        let (mut store, config, captain, _) = setup();
        assert_eq!(
            store.set_tax_rate(captain, 0.9, &config),
            PolicyOutcome::InvalidRate {
                max: config.states.max_tax_rate
            }
        );
        assert_eq!(store.set_tax_rate(captain, 0.1, &config), PolicyOutcome::Success);
        assert_eq!(store.set_ideology(captain, "republic", 0, &config), PolicyOutcome::Success);
        assert_eq!(store.set_ideology(captain, "republic", 1, &config), PolicyOutcome::Unchanged);
        assert!(matches!(
            store.set_ideology(captain, "empire", 1, &config),
            PolicyOutcome::Cooldown { .. }
        ));
    }

    #[test]
    fn test_kick_and_leave() {
        let (mut store, _, captain, member) = setup();
        let mut world = MemoryWorld::new();
        assert_eq!(store.kick_member(member, captain, &mut world), MembershipOutcome::NotCaptain);
        assert_eq!(store.kick_member(captain, captain, &mut world), MembershipOutcome::CannotTargetSelf);
        assert_eq!(store.kick_member(captain, member, &mut world), MembershipOutcome::Success);
        assert_eq!(
            store.leave_state(captain, &mut world),
            MembershipOutcome::StateDisbanded { state: "Rome".into() }
        );
        assert_eq!(store.state_count(), 0);
    }

    #[test]
    fn test_transfer_captaincy_clears_governorship() {
        let (mut store, _, captain, member) = setup();
        store.set_governor(captain, "Hill", Some(member));
        assert_eq!(store.transfer_captaincy(captain, member), MembershipOutcome::Success);
        let state = store.state_by_name("rome").unwrap();
        assert_eq!(state.captain, member);
        assert_eq!(state.sector("hill").unwrap().governor, None);
    }
}
