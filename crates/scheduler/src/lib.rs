//! Recurring-task occurrence scheduling.
//!
//! Turns a [`TaskDefinition`](household_core::TaskDefinition) into dated,
//! assigned occurrences, buckets them into ISO weeks, and provides the
//! round-robin chooser used for container turns. Everything here is pure:
//! no clock, no I/O, no shared state. Callers pass explicit windows.

pub mod calendar;
pub mod error;
pub mod occurrence;
pub mod overview;
pub mod rotation;
pub mod week;

#[cfg(test)]
mod tests;

pub use calendar::{add_days, days_between, iso_week_key, WeekKey};
pub use error::ScheduleError;
pub use occurrence::{occurrences_for_weeks, occurrences_in_window, Occurrence, Occurrences};
pub use overview::{house_overview, task_schedule, user_overview};
pub use rotation::{member_at, next_in_rotation, Rotation};
pub use week::{group_by_week, WeekGroup};
