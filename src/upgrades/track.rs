//! Upgrade tracks and the camp statistic each one drives

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::config::CampConfig;
use crate::territory::camp::CampStats;

/// One of the seven independent progression lines of a camp
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeTrack {
    HitPoints,
    Fuel,
    HealRate,
    Fatigue,
    Storage,
    Efficiency,
    Boundary,
}

impl UpgradeTrack {
    pub const ALL: [UpgradeTrack; 7] = [
        UpgradeTrack::HitPoints,
        UpgradeTrack::Fuel,
        UpgradeTrack::HealRate,
        UpgradeTrack::Fatigue,
        UpgradeTrack::Storage,
        UpgradeTrack::Efficiency,
        UpgradeTrack::Boundary,
    ];

    pub fn key(self) -> &'static str {
        match self {
            UpgradeTrack::HitPoints => "hit_points",
            UpgradeTrack::Fuel => "fuel",
            UpgradeTrack::HealRate => "heal_rate",
            UpgradeTrack::Fatigue => "fatigue",
            UpgradeTrack::Storage => "storage",
            UpgradeTrack::Efficiency => "efficiency",
            UpgradeTrack::Boundary => "boundary",
        }
    }

    /// Value of this track's statistic with no upgrade applied
    pub fn base_value(self, config: &CampConfig) -> f64 {
        match self {
            UpgradeTrack::HitPoints => config.base_max_hp,
            UpgradeTrack::Fuel => config.base_max_fuel as f64,
            UpgradeTrack::HealRate => config.base_heal_rate,
            UpgradeTrack::Fatigue => config.base_fatigue_secs as f64,
            UpgradeTrack::Storage => config.base_storage_slots as f64,
            UpgradeTrack::Efficiency => config.base_efficiency,
            UpgradeTrack::Boundary => config.base_radius as f64,
        }
    }

    /// Current value of this track's statistic
    pub fn read(self, stats: &CampStats) -> f64 {
        match self {
            UpgradeTrack::HitPoints => stats.max_hp,
            UpgradeTrack::Fuel => stats.max_fuel as f64,
            UpgradeTrack::HealRate => stats.heal_rate,
            UpgradeTrack::Fatigue => stats.fatigue_secs as f64,
            UpgradeTrack::Storage => stats.storage_slots as f64,
            UpgradeTrack::Efficiency => stats.efficiency,
            UpgradeTrack::Boundary => stats.radius as f64,
        }
    }

    /// Overwrite this track's statistic
    pub fn write(self, stats: &mut CampStats, value: f64, config: &CampConfig) {
        let value = value.max(0.0);
        match self {
            UpgradeTrack::HitPoints => stats.max_hp = value.max(1.0),
            UpgradeTrack::Fuel => stats.max_fuel = value.round() as u32,
            UpgradeTrack::HealRate => stats.heal_rate = value,
            UpgradeTrack::Fatigue => stats.fatigue_secs = value.round() as u64,
            UpgradeTrack::Storage => {
                stats.storage_slots = value.round() as u32;
                stats.currency_cap = stats.storage_slots as f64 * config.currency_per_storage_slot;
            }
            UpgradeTrack::Efficiency => stats.efficiency = value,
            UpgradeTrack::Boundary => stats.radius = value.round() as i32,
        }
    }
}

impl fmt::Display for UpgradeTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for UpgradeTrack {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase().replace(['-', ' '], "_");
        UpgradeTrack::ALL
            .into_iter()
            .find(|t| t.key() == lowered)
            .ok_or_else(|| format!("unknown upgrade track: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_round_trips_through_key() {
        for track in UpgradeTrack::ALL {
            assert_eq!(track.key().parse::<UpgradeTrack>().unwrap(), track);
        }
        assert_eq!("Heal-Rate".parse::<UpgradeTrack>().unwrap(), UpgradeTrack::HealRate);
        assert!("armor".parse::<UpgradeTrack>().is_err());
    }

    #[test]
    fn test_write_then_read_matches() {
        let config = CampConfig::default();
        let mut stats = CampStats::base(&config);
        UpgradeTrack::Storage.write(&mut stats, 10.0, &config);
        assert_eq!(UpgradeTrack::Storage.read(&stats), 10.0);
        assert_eq!(stats.currency_cap, 10.0 * config.currency_per_storage_slot);
        UpgradeTrack::Boundary.write(&mut stats, 24.0, &config);
        assert_eq!(stats.radius, 24);
    }
}
