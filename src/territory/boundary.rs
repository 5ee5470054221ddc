//! Boundary calculator - rectangular claim regions around camp anchors
//!
//! A boundary is four directional radii measured from the anchor block on
//! the x/z plane. North is -z, south is +z, west is -x, east is +x. All
//! bounds are inclusive.

use serde::{Deserialize, Serialize};

use crate::core::types::Location;

/// Directional radii of a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Boundary {
    pub north: i32,
    pub south: i32,
    pub east: i32,
    pub west: i32,
}

impl Boundary {
    pub fn uniform(radius: i32) -> Self {
        let r = radius.max(0);
        Self {
            north: r,
            south: r,
            east: r,
            west: r,
        }
    }

    /// World-space rectangle of this boundary around `anchor`
    pub fn rect_at(&self, anchor: &Location) -> Rect {
        Rect {
            world: anchor.world.clone(),
            min_x: anchor.x - self.west,
            max_x: anchor.x + self.east,
            min_z: anchor.z - self.north,
            max_z: anchor.z + self.south,
        }
    }
}

/// Axis-aligned inclusive rectangle in one world
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub world: String,
    pub min_x: i32,
    pub max_x: i32,
    pub min_z: i32,
    pub max_z: i32,
}

impl Rect {
    pub fn intersects(&self, other: &Rect) -> bool {
        self.world == other.world
            && self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_z <= other.max_z
            && other.min_z <= self.max_z
    }

    /// Grow the rectangle by `gap` blocks on every side
    pub fn expand(&self, gap: i32) -> Rect {
        Rect {
            world: self.world.clone(),
            min_x: self.min_x - gap,
            max_x: self.max_x + gap,
            min_z: self.min_z - gap,
            max_z: self.max_z + gap,
        }
    }

    pub fn contains(&self, location: &Location) -> bool {
        self.world == location.world
            && (self.min_x..=self.max_x).contains(&location.x)
            && (self.min_z..=self.max_z).contains(&location.z)
    }
}

/// An existing claim near a camp being sized
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub rect: Rect,
    /// Claims of the same state may touch; other states keep `min_gap`
    pub same_state: bool,
}

/// Derive a non-overlapping boundary for a camp at `anchor`.
///
/// Starts from a uniform `radius` and, for each neighbor it would overlap,
/// pulls in whichever single side loses the fewest blocks while clearing
/// the neighbor. Shrinking never creates a new overlap, so one pass is
/// enough. If the anchor itself lies inside a neighbor's zone the
/// boundary collapses to the anchor block.
pub fn compute_boundary(anchor: &Location, radius: i32, neighbors: &[Neighbor], min_gap: i32) -> Boundary {
    let mut boundary = Boundary::uniform(radius);

    for neighbor in neighbors {
        let zone = if neighbor.same_state {
            neighbor.rect.clone()
        } else {
            neighbor.rect.expand(min_gap.max(0))
        };
        if !boundary.rect_at(anchor).intersects(&zone) {
            continue;
        }

        // Largest radius on each side that stays clear of the zone; negative means impossible
        let candidates = [
            (Side::East, zone.min_x - anchor.x - 1),
            (Side::West, anchor.x - zone.max_x - 1),
            (Side::South, zone.min_z - anchor.z - 1),
            (Side::North, anchor.z - zone.max_z - 1),
        ];

        let best = candidates
            .iter()
            .filter(|(_, r)| *r >= 0)
            .map(|(side, r)| (*side, (*r).min(side.get(&boundary))))
            .min_by_key(|(side, r)| side.get(&boundary) - r);

        match best {
            Some((side, r)) => side.set(&mut boundary, r),
            None => {
                boundary = Boundary::uniform(0);
                break;
            }
        }
    }

    boundary
}

#[derive(Debug, Clone, Copy)]
enum Side {
    North,
    South,
    East,
    West,
}

impl Side {
    fn get(self, b: &Boundary) -> i32 {
        match self {
            Side::North => b.north,
            Side::South => b.south,
            Side::East => b.east,
            Side::West => b.west,
        }
    }

    fn set(self, b: &mut Boundary, value: i32) {
        match self {
            Side::North => b.north = value,
            Side::South => b.south = value,
            Side::East => b.east = value,
            Side::West => b.west = value,
        }
    }
}
