//! Upgrade tiers - what each level of each track costs and grants
//!
//! Tiers are immutable configuration. A track's levels run 1..=max without
//! gaps; the absence of a tier at `level + 1` means the track is maxed.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use crate::core::error::ConfigError;
use crate::core::types::{Currency, ItemDescriptor, ItemStack};
use crate::upgrades::track::UpgradeTrack;

/// One purchasable level of a track
#[derive(Debug, Clone, PartialEq)]
pub struct UpgradeTier {
    pub level: u32,
    pub cost: Currency,
    pub items: Vec<ItemStack>,
    /// Statistic value while the camp sits at this level
    pub value: f64,
}

/// Catalog of every upgrade tier
#[derive(Debug, Clone, Default)]
pub struct UpgradeCatalog {
    tiers: BTreeMap<UpgradeTrack, Vec<UpgradeTier>>,
    disabled: BTreeSet<UpgradeTrack>,
}

impl UpgradeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in progression used when no catalog file is configured
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        let iron = ItemDescriptor::material("iron_ingot");
        let gold = ItemDescriptor::material("gold_ingot");
        let diamond = ItemDescriptor::material("diamond");

        let ladder: [(UpgradeTrack, [f64; 3]); 7] = [
            (UpgradeTrack::HitPoints, [150.0, 225.0, 325.0]),
            (UpgradeTrack::Fuel, [150.0, 200.0, 300.0]),
            (UpgradeTrack::HealRate, [1.5, 2.0, 3.0]),
            // fatigue counts down: a better tier heals sooner after a hit
            (UpgradeTrack::Fatigue, [240.0, 180.0, 120.0]),
            (UpgradeTrack::Storage, [96.0, 128.0, 192.0]),
            (UpgradeTrack::Efficiency, [1.25, 1.5, 2.0]),
            (UpgradeTrack::Boundary, [20.0, 24.0, 32.0]),
        ];
        for (track, values) in ladder {
            for (idx, value) in values.into_iter().enumerate() {
                let level = idx as u32 + 1;
                let items = match level {
                    1 => vec![ItemStack::new(iron.clone(), 8)],
                    2 => vec![ItemStack::new(gold.clone(), 8)],
                    _ => vec![ItemStack::new(diamond.clone(), 4)],
                };
                catalog.add(
                    track,
                    UpgradeTier {
                        level,
                        cost: 1000.0 * level as f64 * level as f64,
                        items,
                        value,
                    },
                );
            }
        }
        catalog
    }

    /// Append a tier; tiers must be added in level order
    pub fn add(&mut self, track: UpgradeTrack, tier: UpgradeTier) {
        self.tiers.entry(track).or_default().push(tier);
    }

    pub fn disable(&mut self, track: UpgradeTrack) {
        self.disabled.insert(track);
    }

    pub fn is_disabled(&self, track: UpgradeTrack) -> bool {
        self.disabled.contains(&track)
    }

    /// Tier granting `level` of `track`, regardless of administrative state
    pub fn tier(&self, track: UpgradeTrack, level: u32) -> Option<&UpgradeTier> {
        if level == 0 {
            return None;
        }
        self.tiers.get(&track).and_then(|t| t.get(level as usize - 1))
    }

    /// The tier purchasable from `current_level`; `None` when the track is
    /// maxed or disabled
    pub fn next_tier(&self, track: UpgradeTrack, current_level: u32) -> Option<&UpgradeTier> {
        if self.is_disabled(track) {
            return None;
        }
        self.tier(track, current_level + 1)
    }

    pub fn max_level(&self, track: UpgradeTrack) -> u32 {
        self.tiers.get(&track).map_or(0, |t| t.len() as u32)
    }

    /// Load a catalog from a TOML file
    pub fn load_from_toml(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse a catalog from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let data: TomlCatalog = toml::from_str(content)?;

        let mut grouped: BTreeMap<UpgradeTrack, Vec<TomlTier>> = BTreeMap::new();
        for tier in data.tiers {
            let track: UpgradeTrack = tier
                .track
                .parse()
                .map_err(|e: String| ConfigError::invalid("tiers.track", e))?;
            grouped.entry(track).or_default().push(tier);
        }

        let mut catalog = Self::new();
        for (track, mut tiers) in grouped {
            tiers.sort_by_key(|t| t.level);
            for (idx, tier) in tiers.into_iter().enumerate() {
                if tier.level != idx as u32 + 1 {
                    return Err(ConfigError::TierOrder {
                        track: track.to_string(),
                        level: tier.level,
                    });
                }
                if tier.cost < 0.0 {
                    return Err(ConfigError::invalid("tiers.cost", "must be non-negative"));
                }
                catalog.add(
                    track,
                    UpgradeTier {
                        level: tier.level,
                        cost: tier.cost,
                        items: tier.items,
                        value: tier.value,
                    },
                );
            }
        }
        for name in data.disabled {
            let track: UpgradeTrack = name
                .parse()
                .map_err(|e: String| ConfigError::invalid("disabled", e))?;
            catalog.disable(track);
        }
        Ok(catalog)
    }
}

/// TOML representation of a catalog file
#[derive(Debug, Deserialize)]
struct TomlCatalog {
    #[serde(default)]
    disabled: Vec<String>,
    #[serde(default)]
    tiers: Vec<TomlTier>,
}

#[derive(Debug, Deserialize)]
struct TomlTier {
    track: String,
    level: u32,
    #[serde(default)]
    cost: Currency,
    #[serde(default)]
    items: Vec<ItemStack>,
    value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_every_track() {
        let catalog = UpgradeCatalog::with_defaults();
        for track in UpgradeTrack::ALL {
            assert_eq!(catalog.max_level(track), 3);
            assert!(catalog.next_tier(track, 0).is_some());
            assert!(catalog.next_tier(track, 3).is_none());
        }
    }

    #[test]
    fn test_disabled_track_has_no_next_tier() {
        let mut catalog = UpgradeCatalog::with_defaults();
        catalog.disable(UpgradeTrack::Boundary);
        assert!(catalog.next_tier(UpgradeTrack::Boundary, 0).is_none());
        assert!(catalog.tier(UpgradeTrack::Boundary, 1).is_some());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            disabled = ["efficiency"]

            [[tiers]]
            track = "hit_points"
            level = 2
            cost = 900.0
            value = 200.0

            [[tiers]]
            track = "hit_points"
            level = 1
            cost = 400.0
            value = 150.0
            items = [{ item = "iron_ingot", amount = 4 }, { item = "frontier:core", amount = 1 }]
        "#;
        let catalog = UpgradeCatalog::parse_toml(toml).unwrap();
        let first = catalog.next_tier(UpgradeTrack::HitPoints, 0).unwrap();
        assert_eq!(first.cost, 400.0);
        assert_eq!(first.items[1].item, ItemDescriptor::custom("frontier", "core"));
        assert_eq!(catalog.max_level(UpgradeTrack::HitPoints), 2);
        assert!(catalog.is_disabled(UpgradeTrack::Efficiency));
    }

    #[test]
    fn test_gap_in_levels_rejected() {
        let toml = r#"
            [[tiers]]
            track = "fuel"
            level = 2
            value = 10.0
        "#;
        assert!(matches!(
            UpgradeCatalog::parse_toml(toml),
            Err(ConfigError::TierOrder { level: 2, .. })
        ));
    }

    #[test]
    fn test_unknown_track_rejected() {
        let toml = "[[tiers]]\ntrack = \"armor\"\nlevel = 1\nvalue = 1.0\n";
        assert!(matches!(UpgradeCatalog::parse_toml(toml), Err(ConfigError::Invalid { .. })));
    }
}
