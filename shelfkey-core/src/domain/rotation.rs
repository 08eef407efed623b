//! Rotation plan and report models

use serde::Serialize;

use super::encryption::EncryptionSpec;

/// The old and new sides of a rotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPlan {
    pub old: EncryptionSpec,
    pub new: EncryptionSpec,
}

/// Outcome of comparing the requested parameters with those on file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanDecision {
    /// Parameters differ, secrets must be re-encrypted
    Rotate(RotationPlan),
    /// Requested algorithm and key are already in effect
    NoChange,
}

/// The two record collections, in processing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Account,
    Card,
}

impl RecordKind {
    pub fn plural(&self) -> &'static str {
        match self {
            RecordKind::Account => "user(s)",
            RecordKind::Card => "card(s)",
        }
    }
}

/// A record that could not be rotated
#[derive(Debug, Clone, Serialize)]
pub struct RecordFailure {
    pub kind: RecordKind,
    pub label: String,
    pub error: String,
}

/// Per-collection counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectionCounts {
    /// Records the engine attempted
    pub processed: usize,
    /// Records rotated and persisted
    pub rotated: usize,
}

/// Summary of a rotation batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct RotationReport {
    pub accounts: CollectionCounts,
    pub cards: CollectionCounts,
    pub failures: Vec<RecordFailure>,
}

impl RotationReport {
    pub fn counts_mut(&mut self, kind: RecordKind) -> &mut CollectionCounts {
        match kind {
            RecordKind::Account => &mut self.accounts,
            RecordKind::Card => &mut self.cards,
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn total_rotated(&self) -> usize {
        self.accounts.rotated + self.cards.rotated
    }
}

/// Final outcome of a rotation run
#[derive(Debug, Clone)]
pub enum RotationOutcome {
    NoChange,
    Rotated {
        plan: RotationPlan,
        report: RotationReport,
    },
}
