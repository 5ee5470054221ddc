//! Core type definitions used throughout the codebase

use std::fmt;
use std::str::FromStr;

use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier for a player or other acting party
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[display(fmt = "{}", _0)]
pub struct ActorId(pub Uuid);

impl ActorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

/// Wall-clock time in milliseconds
pub type Timestamp = u64;

/// Currency amount (always non-negative when stored)
pub type Currency = f64;

/// Convert a configured number of seconds into a timestamp delta
pub fn secs(seconds: u64) -> Timestamp {
    seconds.saturating_mul(1000)
}

/// Case-folded lookup key for state and sector names.
///
/// Entities keep their original casing for display; every map is keyed by
/// the folded form so `Rome` and `rome` collide.
#[derive(Debug, Display, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[display(fmt = "{}", _0)]
pub struct NameKey(String);

impl NameKey {
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NameKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<&String> for NameKey {
    fn from(name: &String) -> Self {
        Self::new(name)
    }
}

/// Composite key binding a camp to its sector: `(state, sector)`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CampKey {
    pub state: NameKey,
    pub sector: NameKey,
}

impl CampKey {
    pub fn new(state: &str, sector: &str) -> Self {
        Self {
            state: NameKey::new(state),
            sector: NameKey::new(sector),
        }
    }

    pub fn from_keys(state: NameKey, sector: NameKey) -> Self {
        Self { state, sector }
    }
}

impl fmt::Display for CampKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.state, self.sector)
    }
}

/// Block position in a named world
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub world: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Location {
    pub fn new(world: impl Into<String>, x: i32, y: i32, z: i32) -> Self {
        Self { world: world.into(), x, y, z }
    }

    /// Flat variable map used by notification templates
    pub fn vars(&self) -> Vec<(String, String)> {
        vec![
            ("world".into(), self.world.clone()),
            ("x".into(), self.x.to_string()),
            ("y".into(), self.y.to_string()),
            ("z".into(), self.z.to_string()),
        ]
    }
}

/// Matches either a built-in material kind or a namespaced custom item.
///
/// Serialized as a plain string: `"iron_ingot"` is a material,
/// `"frontier:camp_core"` is a custom item id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ItemDescriptor {
    Material(String),
    Custom { namespace: String, id: String },
}

impl ItemDescriptor {
    pub fn material(name: &str) -> Self {
        Self::Material(name.to_lowercase())
    }

    pub fn custom(namespace: &str, id: &str) -> Self {
        Self::Custom {
            namespace: namespace.to_lowercase(),
            id: id.to_lowercase(),
        }
    }
}

impl fmt::Display for ItemDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemDescriptor::Material(name) => write!(f, "{}", name),
            ItemDescriptor::Custom { namespace, id } => write!(f, "{}:{}", namespace, id),
        }
    }
}

impl FromStr for ItemDescriptor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty item descriptor".into());
        }
        match s.split_once(':') {
            Some((ns, id)) if !ns.is_empty() && !id.is_empty() => Ok(Self::custom(ns, id)),
            Some(_) => Err(format!("malformed item descriptor: {}", s)),
            None => Ok(Self::material(s)),
        }
    }
}

impl TryFrom<String> for ItemDescriptor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ItemDescriptor> for String {
    fn from(value: ItemDescriptor) -> Self {
        value.to_string()
    }
}

/// An amount of one item kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: ItemDescriptor,
    pub amount: u32,
}

impl ItemStack {
    pub fn new(item: ItemDescriptor, amount: u32) -> Self {
        Self { item, amount }
    }
}

/// Flat key/value variables handed to the notification port
pub type Vars = Vec<(String, String)>;

/// Build a `Vars` list from string pairs
pub fn vars<const N: usize>(pairs: [(&str, String); N]) -> Vars {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_key_folds_case() {
        assert_eq!(NameKey::new("Rome"), NameKey::new("rOME"));
        assert_eq!(NameKey::new("  Rome "), NameKey::new("rome"));
        assert_ne!(NameKey::new("Rome"), NameKey::new("Roma"));
    }

    #[test]
    fn test_item_descriptor_parsing() {
        let material: ItemDescriptor = "IRON_INGOT".parse().unwrap();
        assert_eq!(material, ItemDescriptor::material("iron_ingot"));

        let custom: ItemDescriptor = "frontier:camp_core".parse().unwrap();
        assert_eq!(custom, ItemDescriptor::custom("frontier", "camp_core"));
        assert_eq!(custom.to_string(), "frontier:camp_core");

        assert!("frontier:".parse::<ItemDescriptor>().is_err());
        assert!("".parse::<ItemDescriptor>().is_err());
    }

    #[test]
    fn test_item_descriptor_serializes_as_string() {
        let stack = ItemStack::new(ItemDescriptor::custom("frontier", "fuel_cell"), 3);
        let json = serde_json::to_string(&stack).unwrap();
        assert!(json.contains("\"frontier:fuel_cell\""));
        let back: ItemStack = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stack);
    }

    #[test]
    fn test_secs_conversion() {
        assert_eq!(secs(600), 600_000);
    }
}
