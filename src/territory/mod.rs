//! Territory layer - states, sectors, camps and who owns what

pub mod boundary;
pub mod camp;
pub mod founding;
pub mod governance;
pub mod placement;
pub mod sector;
pub mod state;
pub mod store;

pub use boundary::{compute_boundary, Boundary, Rect};
pub use camp::{Camp, CampModule, CampStats, CampStorage, DamageEffect};
pub use founding::{FoundOutcome, MoveOutcome, PlacementCommit, PlacementOutcome, PlacementResult, SectorOutcome};
pub use governance::{BankOutcome, CapitalOutcome, MembershipOutcome, PaidFrom, PolicyOutcome, RenameOutcome};
pub use placement::{DenialReason, PendingPlacement, PlacementDenial, PlacementKind};
pub use sector::Sector;
pub use state::{Role, State, Transaction, TransactionKind};
pub use store::{MemberRemoval, TerritoryStore, TransferError, TransferResult};
