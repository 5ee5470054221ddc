//! Iron Frontier - Territory, Upkeep and War Engine for Player-Run States

pub mod conflict;
pub mod core;
pub mod frontier;
pub mod persistence;
pub mod ports;
pub mod requests;
pub mod runtime;
pub mod territory;
pub mod upgrades;
pub mod upkeep;

pub use frontier::{Frontier, FrontierTick, GiftOutcome, TeleportOutcome};
