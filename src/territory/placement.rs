//! Pending placements and placement validation
//!
//! A camp only materializes once the host confirms a real location. Until
//! then the actor holds exactly one pending placement describing what the
//! location will be used for.

use serde::{Deserialize, Serialize};

use crate::core::config::PlacementConfig;
use crate::core::types::{vars, ActorId, CampKey, Currency, ItemStack, Location, NameKey, Timestamp, Vars};
use crate::ports::WorldPort;
use crate::territory::boundary::Boundary;
use crate::territory::store::TerritoryStore;

/// What a pending placement will create once committed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlacementKind {
    /// First camp of a state that does not exist yet (its name is reserved)
    NewState { state: String, sector: String },
    /// Additional sector for an existing state
    NewSector { state: NameKey, sector: String },
    /// Existing sector currently in transit
    Relocation { state: NameKey, sector: NameKey },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingPlacement {
    pub actor: ActorId,
    pub kind: PlacementKind,
    pub created_at: Timestamp,
    /// Charged from the actor when the placement commits
    pub cost: Currency,
    pub items: Vec<ItemStack>,
}

impl PendingPlacement {
    /// Move of an existing sector; the move cost is paid up front
    pub fn relocation(actor: ActorId, state: NameKey, sector: NameKey, now: Timestamp) -> Self {
        PendingPlacement {
            actor,
            kind: PlacementKind::Relocation { state, sector },
            created_at: now,
            cost: 0.0,
            items: vec![],
        }
    }

    /// State the placement belongs to
    pub fn state_key(&self) -> NameKey {
        match &self.kind {
            PlacementKind::NewState { state, .. } => NameKey::new(state),
            PlacementKind::NewSector { state, .. } => state.clone(),
            PlacementKind::Relocation { state, .. } => state.clone(),
        }
    }
}

/// Why a location was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// Solid blocks in the clearance column above the anchor
    Obstructed,
    /// The new boundary would intersect an existing camp's boundary
    OverlapsCamp,
    /// Too close to another state's boundary
    TooCloseToState,
}

impl DenialReason {
    pub fn message_key(self) -> &'static str {
        match self {
            DenialReason::Obstructed => "placement.denied.obstructed",
            DenialReason::OverlapsCamp => "placement.denied.overlap",
            DenialReason::TooCloseToState => "placement.denied.too_close",
        }
    }
}

/// Structured refusal with substitution data for display
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementDenial {
    pub reason: DenialReason,
    pub vars: Vars,
}

/// Check that a camp with `radius` can be anchored at `anchor` for `owner`.
///
/// Same-state camps may sit next to each other without a gap, but no two
/// boundaries may ever intersect.
pub fn validate_placement(
    store: &TerritoryStore,
    owner: &NameKey,
    anchor: &Location,
    radius: i32,
    config: &PlacementConfig,
    world: &dyn WorldPort,
) -> Result<(), PlacementDenial> {
    if world.is_obstructed(anchor, config.clearance_height, config.clearance_radius) {
        return Err(PlacementDenial {
            reason: DenialReason::Obstructed,
            vars: vars([
                ("height", config.clearance_height.to_string()),
                ("radius", config.clearance_radius.to_string()),
            ]),
        });
    }

    let candidate = Boundary::uniform(radius).rect_at(anchor);
    for (key, rect) in store.claimed_rects() {
        if rect.intersects(&candidate) {
            return Err(PlacementDenial {
                reason: DenialReason::OverlapsCamp,
                vars: denial_vars(store, &key),
            });
        }
        if &key.state != owner && rect.expand(config.min_state_gap).intersects(&candidate) {
            let mut vars = denial_vars(store, &key);
            vars.push(("gap".into(), config.min_state_gap.to_string()));
            return Err(PlacementDenial {
                reason: DenialReason::TooCloseToState,
                vars,
            });
        }
    }
    Ok(())
}

fn denial_vars(store: &TerritoryStore, key: &CampKey) -> Vars {
    let (state, sector) = store
        .state(&key.state)
        .and_then(|s| s.sectors.get(&key.sector).map(|sec| (s.name.clone(), sec.name.clone())))
        .unwrap_or_else(|| (key.state.to_string(), key.sector.to_string()));
    vars([("state", state), ("sector", sector)])
}
