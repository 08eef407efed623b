//! Core domain entities
//!
//! Pure data structures with validation logic - no I/O or external dependencies.

mod account;
mod card;
mod encryption;
pub mod result;
pub mod rotation;
mod secret;

pub use account::PatronAccount;
pub use card::LibraryCard;
pub use encryption::{
    Argon2Params, EncryptionSettings, EncryptionSpec, EncryptionStatus, DEFAULT_ALGORITHM,
    NO_ENCRYPTION,
};
pub use rotation::{
    CollectionCounts, PlanDecision, RecordFailure, RecordKind, RotationOutcome, RotationPlan,
    RotationReport,
};
pub use secret::SecretBearing;
