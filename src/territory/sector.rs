//! Sector - a named, located claim belonging to a state

use serde::{Deserialize, Serialize};

use crate::core::types::{ActorId, Location, NameKey, Timestamp};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sector {
    /// Display name, original casing
    pub name: String,
    /// `None` while the sector is in transit during a relocation
    pub location: Option<Location>,
    pub governor: Option<ActorId>,
    pub created_at: Timestamp,
}

impl Sector {
    pub fn new(name: &str, location: Location, now: Timestamp) -> Self {
        Self {
            name: name.to_string(),
            location: Some(location),
            governor: None,
            created_at: now,
        }
    }

    pub fn key(&self) -> NameKey {
        NameKey::new(&self.name)
    }

    pub fn in_transit(&self) -> bool {
        self.location.is_none()
    }
}
