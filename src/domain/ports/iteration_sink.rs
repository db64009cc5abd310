//! Port for the per-iteration audit trail.

use crate::domain::models::IterationRecord;

/// Consumer of per-iteration records.
///
/// Recording is best-effort; a sink failure must never interrupt the loop, so
/// the method is infallible from the caller's point of view and
/// implementations log their own errors.
pub trait IterationSink: Send + Sync {
    /// Persist one iteration record.
    fn record(&self, record: &IterationRecord);
}
