//! Week-grouped schedules for one task, a whole house, or a single user.
//!
//! Every view delegates to [`occurrences_for_weeks`] so the inclusive
//! "today counts as upcoming" boundary is identical across them.

use chrono::NaiveDate;
use household_core::{TaskDefinition, UserId};

use crate::error::ScheduleError;
use crate::occurrence::{occurrences_for_weeks, Occurrence};
use crate::week::{group_by_week, WeekGroup};

/// `weeks` of one task starting at `from`, grouped by ISO week.
pub fn task_schedule(
    task: &TaskDefinition,
    from: NaiveDate,
    weeks: u32,
) -> Result<Vec<WeekGroup>, ScheduleError> {
    Ok(group_by_week(occurrences_for_weeks(task, from, weeks)?))
}

/// All tasks of a house merged into one timeline. Occurrences on the same
/// date keep the order of `tasks`.
pub fn house_overview(
    tasks: &[TaskDefinition],
    from: NaiveDate,
    weeks: u32,
) -> Result<Vec<WeekGroup>, ScheduleError> {
    let merged = merged_occurrences(tasks, from, weeks, |_| true)?;
    Ok(group_by_week(merged))
}

/// Like [`house_overview`], restricted to occurrences assigned to `user`.
pub fn user_overview(
    tasks: &[TaskDefinition],
    user: UserId,
    from: NaiveDate,
    weeks: u32,
) -> Result<Vec<WeekGroup>, ScheduleError> {
    let merged = merged_occurrences(tasks, from, weeks, |o| o.assignee == Some(user))?;
    Ok(group_by_week(merged))
}

fn merged_occurrences<F>(
    tasks: &[TaskDefinition],
    from: NaiveDate,
    weeks: u32,
    keep: F,
) -> Result<Vec<Occurrence>, ScheduleError>
where
    F: Fn(&Occurrence) -> bool,
{
    let mut merged = Vec::new();
    for task in tasks {
        merged.extend(occurrences_for_weeks(task, from, weeks)?.filter(|o| keep(o)));
    }
    // Stable: ties keep task order.
    merged.sort_by_key(|o| o.date);
    Ok(merged)
}
