//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod logging;
pub mod migration;
pub mod rotation;
mod status;

pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use rotation::{CipherPair, KeyRotationService, RotationRequest};
pub use status::{StatusService, StatusSummary};
