//! Conflict layer - condemnation, war, civil war and their resolution
//!
//! Per (attacker, target) pair the lifecycle is
//! none -> condemned -> matured -> war -> (capital broken -> hold) -> resolved.

pub mod combat;
pub mod declare;
pub mod engine;
pub mod raids;
pub mod resolution;
pub mod timers;
pub mod war;

pub use combat::{DamageOutcome, EmergencyMoveOutcome, SurrenderOutcome};
pub use declare::{CivilWarOutcome, CondemnOutcome, DeclareOutcome, JoinWarOutcome};
pub use engine::{ConflictCooldowns, ConflictEngine, ConflictTick};
pub use resolution::{EndReason, WarResolution};
pub use timers::{HoldTimer, HoldTimers};
pub use war::{Condemnation, PendingCivilWar, Side, War, WarId};

#[cfg(test)]
pub(crate) mod testing {
    use crate::conflict::engine::ConflictEngine;
    use crate::core::config::FrontierConfig;
    use crate::core::types::{ActorId, CampKey, Location, NameKey};
    use crate::ports::{MemoryInventory, MemoryLedger, MemoryWorld, Ports, RecordingNotifier};
    use crate::territory::camp::Camp;
    use crate::territory::sector::Sector;
    use crate::territory::state::State;
    use crate::territory::store::TerritoryStore;

    pub struct Arena {
        pub store: TerritoryStore,
        pub engine: ConflictEngine,
        pub config: FrontierConfig,
        pub ports: Ports,
        pub inventory: MemoryInventory,
        pub notifier: RecordingNotifier,
        pub world: MemoryWorld,
        pub rome: ActorId,
        pub carthage: ActorId,
    }

    /// Rome (forum capital + farms) and Carthage (byrsa capital + harbor),
    /// each with a captain and a bank of 1000
    pub fn arena() -> Arena {
        let config = FrontierConfig::default();
        let mut store = TerritoryStore::new();
        let rome = ActorId::new();
        let carthage = ActorId::new();
        add_state(&mut store, &config, "Rome", rome, &[("Forum", 0), ("Farms", 200)]);
        add_state(&mut store, &config, "Carthage", carthage, &[("Byrsa", 1000), ("Harbor", 1200)]);

        let inventory = MemoryInventory::new();
        let notifier = RecordingNotifier::new();
        let world = MemoryWorld::new();
        let ports = Ports::new(
            Some(Box::new(MemoryLedger::new())),
            Box::new(inventory.clone()),
            Box::new(notifier.clone()),
            Box::new(world.clone()),
        );
        Arena {
            store,
            engine: ConflictEngine::new(&config),
            config,
            ports,
            inventory,
            notifier,
            world,
            rome,
            carthage,
        }
    }

    pub fn add_state(store: &mut TerritoryStore, config: &FrontierConfig, name: &str, captain: ActorId, sectors: &[(&str, i32)]) {
        let mut state = State::new(name, captain, 0);
        state.bank = 1000.0;
        for (sector_name, x) in sectors {
            let sector = Sector::new(sector_name, Location::new("world", *x, 64, 0), 0);
            let key = CampKey::from_keys(state.key(), sector.key());
            state.sectors.insert(sector.key(), sector);
            store.insert_camp(key, Camp::new(&config.camps, config.maintenance_interval(), 3600, 0));
        }
        state.capital = sectors.first().map(|(n, _)| n.to_string());
        store.insert_state(state);
    }

    pub fn key(name: &str) -> NameKey {
        NameKey::new(name)
    }

    impl Arena {
        /// Condemn at t=0 and declare once matured; returns the war id
        pub fn start_war(&mut self) -> u64 {
            self.engine
                .condemn(&self.store, self.rome, "carthage", 0, &self.config, &mut self.ports);
            let at = crate::core::types::secs(self.config.war.condemnation_delay_secs);
            match self
                .engine
                .declare_war(&mut self.store, self.rome, "carthage", at, &self.config, &mut self.ports)
            {
                crate::conflict::DeclareOutcome::Declared { war_id } => war_id,
                other => panic!("war not declared: {:?}", other),
            }
        }

        pub fn break_camp(&mut self, state: &str, sector: &str, attacker: &str, now: u64) -> crate::conflict::DamageOutcome {
            self.engine.damage_camp(
                &mut self.store,
                state,
                sector,
                1_000_000.0,
                attacker,
                now,
                &self.config,
                &mut self.ports,
            )
        }
    }
}
