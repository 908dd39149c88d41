use chrono::NaiveDate;
use thiserror::Error;

/// Failures reported by the scheduler to its immediate caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("interval must be at least 1 day, got {0}")]
    InvalidInterval(u32),

    #[error("window end {end} precedes window start {start}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },

    #[error("last served member is not part of the rotation")]
    NotInRotation,

    #[error("rotation has no members")]
    EmptyRotation,

    #[error("date arithmetic left the supported calendar range")]
    DateOutOfRange,
}
