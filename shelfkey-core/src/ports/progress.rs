//! Progress reporting for a rotation batch

use crate::domain::result::Error;
use crate::domain::RecordKind;

/// Observer notified while records are rotated
///
/// Every method has an empty default so callers only implement what they
/// display.
pub trait RotationProgress {
    /// A collection with `count` records is about to be processed
    fn phase_started(&mut self, _kind: RecordKind, _count: usize) {}

    fn record_rotated(&mut self, _kind: RecordKind, _label: &str) {}

    fn record_failed(&mut self, _kind: RecordKind, _label: &str, _error: &Error) {}

    fn phase_finished(&mut self, _kind: RecordKind) {}
}

/// Progress observer that ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl RotationProgress for NoProgress {}
