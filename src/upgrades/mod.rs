//! Upgrade progression - tracks, tiers and purchases

pub mod catalog;
pub mod engine;
pub mod track;

pub use catalog::{UpgradeCatalog, UpgradeTier};
pub use engine::{apply_camp_upgrades, purchase_upgrade, reapply_all, UpgradeOutcome};
pub use track::UpgradeTrack;
