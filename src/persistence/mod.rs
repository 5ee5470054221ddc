//! Persistence - JSON snapshots of the territory and conflict state

pub mod snapshot;

pub use snapshot::{LoadReport, Snapshot, SNAPSHOT_VERSION};
