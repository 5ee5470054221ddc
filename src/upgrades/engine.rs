//! Upgrade purchases and derived camp statistics

use tracing::debug;

use crate::core::config::{CampConfig, FrontierConfig};
use crate::core::types::{vars, ActorId, CampKey, Currency, NameKey, Timestamp};
use crate::ports::{PaymentError, Ports};
use crate::territory::camp::{Camp, CampStats};
use crate::territory::governance::PaidFrom;
use crate::territory::state::TransactionKind;
use crate::territory::store::TerritoryStore;
use crate::upgrades::catalog::UpgradeCatalog;
use crate::upgrades::track::UpgradeTrack;

#[derive(Debug, Clone, PartialEq)]
pub enum UpgradeOutcome {
    Success {
        track: UpgradeTrack,
        level: u32,
        cost: Currency,
        paid_from: PaidFrom,
    },
    NotInState,
    SectorNotFound,
    NotAuthorized,
    TrackDisabled,
    MaxLevel,
    MissingItems,
    InsufficientFunds,
    NoLedger,
}

/// Recompute every derived statistic of `camp` from its levels.
///
/// Each track takes its tier value at the current level, or the base value
/// when the track is disabled or at level 0. Running it twice without a
/// level change yields identical stats.
pub fn apply_camp_upgrades(camp: &mut Camp, catalog: &UpgradeCatalog, config: &CampConfig) {
    let mut stats = CampStats::base(config);
    for track in UpgradeTrack::ALL {
        let value = if catalog.is_disabled(track) {
            track.base_value(config)
        } else {
            catalog
                .tier(track, camp.level(track))
                .map_or_else(|| track.base_value(config), |tier| tier.value)
        };
        track.write(&mut stats, value, config);
    }
    camp.stats = stats;
    camp.clamp_to_stats();
}

/// Re-run `apply_camp_upgrades` for every camp, used after loading a
/// snapshot. Boundaries are left alone: they were sized against the
/// neighbours present when each camp last changed, not the current ones.
pub fn reapply_all(store: &mut TerritoryStore, catalog: &UpgradeCatalog, config: &FrontierConfig) {
    for key in store.camp_keys_sorted() {
        if let Some(camp) = store.camp_mut(&key) {
            apply_camp_upgrades(camp, catalog, &config.camps);
        }
    }
}

/// Buy the next tier of `track` for one of the actor's sectors.
///
/// Order: permission, items, payment (state bank first, personal funds
/// otherwise), item consumption, level change, stat recompute.
#[allow(clippy::too_many_arguments)]
pub fn purchase_upgrade(
    store: &mut TerritoryStore,
    catalog: &UpgradeCatalog,
    actor: ActorId,
    sector_name: &str,
    track: UpgradeTrack,
    now: Timestamp,
    config: &FrontierConfig,
    ports: &mut Ports,
) -> UpgradeOutcome {
    let Some(state_key) = store.state_of(actor).cloned() else {
        return UpgradeOutcome::NotInState;
    };
    let sector_key = NameKey::new(sector_name);
    let camp_key = CampKey::from_keys(state_key.clone(), sector_key.clone());
    let Some(state) = store.state(&state_key) else {
        return UpgradeOutcome::NotInState;
    };
    if !state.sectors.contains_key(&sector_key) {
        return UpgradeOutcome::SectorNotFound;
    }
    if !state.can_manage(actor, &sector_key) {
        return UpgradeOutcome::NotAuthorized;
    }
    let Some(current) = store.camp(&camp_key).map(|c| c.level(track)) else {
        return UpgradeOutcome::SectorNotFound;
    };
    if catalog.is_disabled(track) {
        return UpgradeOutcome::TrackDisabled;
    }
    let Some(tier) = catalog.next_tier(track, current) else {
        return UpgradeOutcome::MaxLevel;
    };
    if !ports.has_items(actor, &tier.items) {
        return UpgradeOutcome::MissingItems;
    }

    let (level, cost, items) = (tier.level, tier.cost, tier.items.clone());
    let paid_from = match store.settle_cost(&state_key, actor, cost, TransactionKind::Upgrade, now, config, ports) {
        Ok(paid_from) => paid_from,
        Err(PaymentError::NoLedger) => return UpgradeOutcome::NoLedger,
        Err(PaymentError::InsufficientFunds) => return UpgradeOutcome::InsufficientFunds,
    };
    ports.consume_items(actor, &items);

    if let Some(camp) = store.camp_mut(&camp_key) {
        camp.levels.insert(track, level);
        apply_camp_upgrades(camp, catalog, &config.camps);
    }
    if track == UpgradeTrack::Boundary {
        store.refresh_boundary(&camp_key, &config.placement);
    }
    store.mark_dirty();

    let (state_name, sector_display) = store.display_names(&camp_key);
    ports.notify(
        actor,
        "upgrade.purchased",
        &vars([
            ("state", state_name),
            ("sector", sector_display),
            ("track", track.to_string()),
            ("level", level.to_string()),
        ]),
    );
    debug!(camp = %camp_key, %track, level, "upgrade purchased");
    UpgradeOutcome::Success {
        track,
        level,
        cost,
        paid_from,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ItemDescriptor, Location};
    use crate::ports::{MemoryInventory, MemoryLedger, MemoryWorld, RecordingNotifier};
    use crate::territory::sector::Sector;
    use crate::territory::state::State;
    use proptest::prelude::*;

    struct Fixture {
        store: TerritoryStore,
        catalog: UpgradeCatalog,
        config: FrontierConfig,
        ports: Ports,
        ledger: MemoryLedger,
        inventory: MemoryInventory,
        captain: ActorId,
    }

    fn fixture() -> Fixture {
        let config = FrontierConfig::default();
        let captain = ActorId::new();
        let mut store = TerritoryStore::new();
        let mut state = State::new("Rome", captain, 0);
        let sector = Sector::new("Forum", Location::new("world", 0, 64, 0), 0);
        state.capital = Some(sector.name.clone());
        let key = CampKey::from_keys(state.key(), sector.key());
        state.sectors.insert(sector.key(), sector);
        store.insert_state(state);
        store.insert_camp(key, Camp::new(&config.camps, 1000, 3600, 0));

        let ledger = MemoryLedger::new();
        let inventory = MemoryInventory::new();
        let ports = Ports::new(
            Some(Box::new(ledger.clone())),
            Box::new(inventory.clone()),
            Box::new(RecordingNotifier::new()),
            Box::new(MemoryWorld::new()),
        );
        Fixture {
            store,
            catalog: UpgradeCatalog::with_defaults(),
            config,
            ports,
            ledger,
            inventory,
            captain,
        }
    }

    fn iron() -> ItemDescriptor {
        ItemDescriptor::material("iron_ingot")
    }

    fn buy(f: &mut Fixture, track: UpgradeTrack) -> UpgradeOutcome {
        purchase_upgrade(
            &mut f.store,
            &f.catalog,
            f.captain,
            "forum",
            track,
            0,
            &f.config,
            &mut f.ports,
        )
    }

    #[test]
    fn test_bank_pays_when_it_can() {
        let mut f = fixture();
        f.inventory.give(f.captain, iron(), 8);
        f.store.state_mut(&NameKey::new("rome")).unwrap().bank = 5000.0;
        f.ledger.set_balance(f.captain, 5000.0);

        let outcome = buy(&mut f, UpgradeTrack::HitPoints);
        assert!(matches!(outcome, UpgradeOutcome::Success { paid_from: PaidFrom::StateBank, level: 1, .. }));
        assert_eq!(f.store.state_by_name("rome").unwrap().bank, 4000.0);
        assert_eq!(f.ledger.balance(f.captain), 5000.0);
        assert_eq!(f.inventory.count(f.captain, &iron()), 0);
        let camp = f.store.camp(&CampKey::new("rome", "forum")).unwrap();
        assert_eq!(camp.stats.max_hp, 150.0);
    }

    #[test]
    fn test_personal_funds_used_when_bank_short() {
        let mut f = fixture();
        f.inventory.give(f.captain, iron(), 8);
        f.store.state_mut(&NameKey::new("rome")).unwrap().bank = 10.0;
        f.ledger.set_balance(f.captain, 1500.0);

        let outcome = buy(&mut f, UpgradeTrack::Fuel);
        assert!(matches!(outcome, UpgradeOutcome::Success { paid_from: PaidFrom::Personal, .. }));
        assert_eq!(f.store.state_by_name("rome").unwrap().bank, 10.0);
        assert_eq!(f.ledger.balance(f.captain), 500.0);
    }

    #[test]
    fn test_insufficient_everywhere_changes_nothing() {
        let mut f = fixture();
        f.inventory.give(f.captain, iron(), 8);
        f.ledger.set_balance(f.captain, 10.0);

        assert_eq!(buy(&mut f, UpgradeTrack::Storage), UpgradeOutcome::InsufficientFunds);
        let camp = f.store.camp(&CampKey::new("rome", "forum")).unwrap();
        assert_eq!(camp.level(UpgradeTrack::Storage), 0);
        assert_eq!(f.inventory.count(f.captain, &iron()), 8);
    }

    #[test]
    fn test_missing_items_checked_before_payment() {
        let mut f = fixture();
        f.ledger.set_balance(f.captain, 5000.0);
        assert_eq!(buy(&mut f, UpgradeTrack::Storage), UpgradeOutcome::MissingItems);
        assert_eq!(f.ledger.balance(f.captain), 5000.0);
    }

    #[test]
    fn test_disabled_and_maxed_tracks() {
        let mut f = fixture();
        f.catalog.disable(UpgradeTrack::Efficiency);
        assert_eq!(buy(&mut f, UpgradeTrack::Efficiency), UpgradeOutcome::TrackDisabled);

        f.store
            .camp_mut(&CampKey::new("rome", "forum"))
            .unwrap()
            .levels
            .insert(UpgradeTrack::Boundary, 3);
        assert_eq!(buy(&mut f, UpgradeTrack::Boundary), UpgradeOutcome::MaxLevel);
    }

    #[test]
    fn test_member_without_sector_cannot_upgrade() {
        let mut f = fixture();
        let member = ActorId::new();
        f.store.add_member(&NameKey::new("rome"), member);
        let outcome = purchase_upgrade(
            &mut f.store,
            &f.catalog,
            member,
            "forum",
            UpgradeTrack::Fuel,
            0,
            &f.config,
            &mut f.ports,
        );
        assert_eq!(outcome, UpgradeOutcome::NotAuthorized);
    }

    #[test]
    fn test_disabling_a_track_restores_base_value() {
        let config = FrontierConfig::default();
        let mut catalog = UpgradeCatalog::with_defaults();
        let mut camp = Camp::new(&config.camps, 1000, 3600, 0);
        camp.levels.insert(UpgradeTrack::HitPoints, 2);
        apply_camp_upgrades(&mut camp, &catalog, &config.camps);
        assert_eq!(camp.stats.max_hp, 225.0);

        catalog.disable(UpgradeTrack::HitPoints);
        apply_camp_upgrades(&mut camp, &catalog, &config.camps);
        assert_eq!(camp.stats.max_hp, config.camps.base_max_hp);
        assert!(camp.hp <= camp.stats.max_hp);
    }

    proptest! {
        #[test]
        fn prop_apply_camp_upgrades_is_idempotent(levels in proptest::collection::vec(0u32..5, 7), hp in 0.0f64..1000.0) {
            let config = FrontierConfig::default();
            let catalog = UpgradeCatalog::with_defaults();
            let mut camp = Camp::new(&config.camps, 1000, 3600, 0);
            for (track, level) in UpgradeTrack::ALL.into_iter().zip(levels) {
                camp.levels.insert(track, level);
            }
            camp.hp = hp;
            apply_camp_upgrades(&mut camp, &catalog, &config.camps);
            let once = camp.clone();
            apply_camp_upgrades(&mut camp, &catalog, &config.camps);
            prop_assert_eq!(&once, &camp);
            prop_assert!(camp.hp >= 0.0 && camp.hp <= camp.stats.max_hp);
            prop_assert!(camp.fuel <= camp.stats.max_fuel);
        }
    }
}
