//! War, condemnation and civil-war records

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::core::types::{ActorId, NameKey, Timestamp};

pub type WarId = u64;

/// Which side of a war a state fights on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Attacker,
    Defender,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Attacker => Side::Defender,
            Side::Defender => Side::Attacker,
        }
    }
}

/// Active conflict between two primary states and their allies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct War {
    pub id: WarId,
    pub attacker: NameKey,
    pub defender: NameKey,
    pub started_at: Timestamp,
    /// Primary attacker plus allies
    pub attacker_side: BTreeSet<NameKey>,
    /// Primary defender plus allies
    pub defender_side: BTreeSet<NameKey>,
    /// States that already used their emergency capital relocation
    pub emergency_move_used: BTreeSet<NameKey>,
    /// When each state's capital broke, while it stays broken
    pub capital_broken_at: BTreeMap<NameKey, Timestamp>,
    pub last_raid_at: Timestamp,
}

impl War {
    pub fn new(id: WarId, attacker: NameKey, defender: NameKey, now: Timestamp) -> Self {
        Self {
            id,
            attacker_side: [attacker.clone()].into_iter().collect(),
            defender_side: [defender.clone()].into_iter().collect(),
            attacker,
            defender,
            started_at: now,
            emergency_move_used: BTreeSet::new(),
            capital_broken_at: BTreeMap::new(),
            last_raid_at: now,
        }
    }

    pub fn side_of(&self, state: &NameKey) -> Option<Side> {
        if self.attacker_side.contains(state) {
            Some(Side::Attacker)
        } else if self.defender_side.contains(state) {
            Some(Side::Defender)
        } else {
            None
        }
    }

    pub fn involves(&self, state: &NameKey) -> bool {
        self.side_of(state).is_some()
    }

    pub fn is_primary(&self, state: &NameKey) -> bool {
        &self.attacker == state || &self.defender == state
    }

    /// True if the pair is this war's primary pair, in either order
    pub fn is_between(&self, a: &NameKey, b: &NameKey) -> bool {
        (&self.attacker == a && &self.defender == b) || (&self.attacker == b && &self.defender == a)
    }

    /// True if `a` and `b` fight on opposite sides
    pub fn are_enemies(&self, a: &NameKey, b: &NameKey) -> bool {
        matches!((self.side_of(a), self.side_of(b)), (Some(x), Some(y)) if x != y)
    }

    pub fn primary(&self, side: Side) -> &NameKey {
        match side {
            Side::Attacker => &self.attacker,
            Side::Defender => &self.defender,
        }
    }

    pub fn side(&self, side: Side) -> &BTreeSet<NameKey> {
        match side {
            Side::Attacker => &self.attacker_side,
            Side::Defender => &self.defender_side,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut BTreeSet<NameKey> {
        match side {
            Side::Attacker => &mut self.attacker_side,
            Side::Defender => &mut self.defender_side,
        }
    }

    /// Every participating state, attackers first
    pub fn participants(&self) -> impl Iterator<Item = &NameKey> {
        self.attacker_side.iter().chain(self.defender_side.iter())
    }

    pub fn rekey(&mut self, old: &NameKey, new: &NameKey) {
        if &self.attacker == old {
            self.attacker = new.clone();
        }
        if &self.defender == old {
            self.defender = new.clone();
        }
        for set in [
            &mut self.attacker_side,
            &mut self.defender_side,
            &mut self.emergency_move_used,
        ] {
            if set.remove(old) {
                set.insert(new.clone());
            }
        }
        if let Some(at) = self.capital_broken_at.remove(old) {
            self.capital_broken_at.insert(new.clone(), at);
        }
    }
}

/// Declared intent of `attacker` to attack `target`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condemnation {
    pub attacker: NameKey,
    pub target: NameKey,
    pub started_at: Timestamp,
    /// Maturation delay in ms
    pub delay: Timestamp,
}

impl Condemnation {
    pub fn matures_at(&self) -> Timestamp {
        self.started_at.saturating_add(self.delay)
    }

    pub fn is_mature(&self, now: Timestamp) -> bool {
        now >= self.matures_at()
    }
}

/// A secession waiting for the rebel's first camp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingCivilWar {
    pub rebel: NameKey,
    pub origin: NameKey,
    pub seceder: ActorId,
    pub started_at: Timestamp,
}

impl PendingCivilWar {
    pub fn involves(&self, state: &NameKey) -> bool {
        &self.rebel == state || &self.origin == state
    }
}
