//! Raider waves sent against defender-side camps during a war

use rand::Rng;
use tracing::debug;

use crate::conflict::engine::ConflictEngine;
use crate::conflict::war::WarId;
use crate::core::config::FrontierConfig;
use crate::core::types::{secs, CampKey, Location, Timestamp};
use crate::ports::Ports;
use crate::territory::store::TerritoryStore;

impl ConflictEngine {
    /// One wave per war per raid interval, aimed at a random located and
    /// intact camp of the defending side. Returns the number of waves sent.
    pub(crate) fn spawn_raids(
        &mut self,
        store: &TerritoryStore,
        now: Timestamp,
        config: &FrontierConfig,
        ports: &mut Ports,
    ) -> u32 {
        if !config.raids.enabled {
            return 0;
        }
        let interval = secs(config.raids.interval_secs).max(1);
        let due: Vec<WarId> = self
            .wars
            .values()
            .filter(|w| now >= w.last_raid_at.saturating_add(interval))
            .map(|w| w.id)
            .collect();

        let mut waves = 0;
        for war_id in due {
            let Some(war) = self.wars.get_mut(&war_id) else {
                continue;
            };
            war.last_raid_at = now;
            let targets: Vec<(CampKey, Location)> = war
                .defender_side
                .iter()
                .filter_map(|state| store.state(state).map(|s| (state, s)))
                .flat_map(|(state_key, state)| {
                    state.sectors.iter().filter_map(move |(sector_key, sector)| {
                        let location = sector.location.clone()?;
                        Some((CampKey::from_keys(state_key.clone(), sector_key.clone()), location))
                    })
                })
                .filter(|(key, _)| store.camp(key).map_or(false, |c| !c.is_broken()))
                .collect();
            if targets.is_empty() {
                continue;
            }

            let max = config.raids.max_wave;
            let min = config.raids.min_wave.min(max);
            let (camp, location) = &targets[self.rng.gen_range(0..targets.len())];
            let count = self.rng.gen_range(min..=max);
            if count == 0 {
                continue;
            }
            ports.world.spawn_raiders(location, count, war_id);
            debug!(war = war_id, %camp, count, "raider wave sent");
            waves += 1;
        }
        waves
    }
}

#[cfg(test)]
mod tests {
    use crate::conflict::testing::arena;

    #[test]
    fn test_waves_follow_interval_and_target_defenders() {
        let mut a = arena();
        a.config.raids.enabled = true;
        let war_id = a.start_war();

        let report = a.engine.tick(&mut a.store, 600_000 + 299_000, &a.config, &mut a.ports);
        assert_eq!(report.raids, 0);
        let report = a.engine.tick(&mut a.store, 600_000 + 300_000, &a.config, &mut a.ports);
        assert_eq!(report.raids, 1);

        let raids = a.world.raids();
        assert_eq!(raids.len(), 1);
        let (location, count, id) = &raids[0];
        assert_eq!(*id, war_id);
        assert!((2..=6).contains(count));
        assert!(location.x >= 1000);
    }

    #[test]
    fn test_disabled_raids_send_nothing() {
        let mut a = arena();
        a.start_war();
        let report = a.engine.tick(&mut a.store, 10_000_000, &a.config, &mut a.ports);
        assert_eq!(report.raids, 0);
        assert!(a.world.raids().is_empty());
    }
}
