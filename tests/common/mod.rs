//! Shared fixtures: a frontier over in-memory ports and a manual clock

#![allow(dead_code)]

use iron_frontier::core::clock::ManualClock;
use iron_frontier::core::config::FrontierConfig;
use iron_frontier::core::types::{ActorId, Location, NameKey};
use iron_frontier::ports::{MemoryInventory, MemoryLedger, MemoryWorld, Ports, RecordingNotifier};
use iron_frontier::territory::{FoundOutcome, PlacementOutcome, SectorOutcome};
use iron_frontier::upgrades::UpgradeCatalog;
use iron_frontier::Frontier;

pub struct World {
    pub frontier: Frontier,
    pub clock: ManualClock,
    pub ledger: MemoryLedger,
    pub inventory: MemoryInventory,
    pub notifier: RecordingNotifier,
    pub world: MemoryWorld,
}

pub fn world() -> World {
    world_with(FrontierConfig::default())
}

pub fn world_with(config: FrontierConfig) -> World {
    let clock = ManualClock::new(0);
    let ledger = MemoryLedger::new();
    let inventory = MemoryInventory::new();
    let notifier = RecordingNotifier::new();
    let world = MemoryWorld::new();
    let ports = Ports::new(
        Some(Box::new(ledger.clone())),
        Box::new(inventory.clone()),
        Box::new(notifier.clone()),
        Box::new(world.clone()),
    );
    let frontier = Frontier::new(config, UpgradeCatalog::with_defaults(), ports, Box::new(clock.clone()));
    World {
        frontier,
        clock,
        ledger,
        inventory,
        notifier,
        world,
    }
}

pub fn at(x: i32) -> Location {
    Location::new("world", x, 64, 0)
}

pub fn key(name: &str) -> NameKey {
    NameKey::new(name)
}

impl World {
    /// Found a state with its capital at `x`; the captain keeps 10000 after
    /// paying the creation cost
    pub fn found(&mut self, state: &str, capital: &str, x: i32) -> ActorId {
        let captain = ActorId::new();
        let cost = self.frontier.config().states.creation_cost;
        self.ledger.set_balance(captain, 10_000.0 + cost);
        assert_eq!(self.frontier.found_state(captain, state, capital), FoundOutcome::Success);
        let placed = self.frontier.complete_placement(captain, at(x));
        assert!(matches!(placed, PlacementOutcome::Committed(_)), "{:?}", placed);
        captain
    }

    /// Add a sector at `x`, waiting out the sector cooldown first
    pub fn add_sector(&mut self, captain: ActorId, sector: &str, x: i32) {
        self.clock.advance_secs(self.frontier.config().states.sector_cooldown_secs);
        assert_eq!(self.frontier.add_sector(captain, sector), SectorOutcome::Success);
        let placed = self.frontier.complete_placement(captain, at(x));
        assert!(matches!(placed, PlacementOutcome::Committed(_)), "{:?}", placed);
    }

    /// A fresh member admitted through an invite
    pub fn recruit(&mut self, captain: ActorId) -> ActorId {
        let member = ActorId::new();
        self.frontier.invite(captain, member);
        self.frontier.accept_invite(member);
        member
    }

    pub fn advance_secs(&self, seconds: u64) {
        self.clock.advance_secs(seconds);
    }
}
