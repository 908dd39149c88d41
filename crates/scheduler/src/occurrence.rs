//! Expansion of a task definition into dated, assigned occurrences.

use std::iter::FusedIterator;

use chrono::NaiveDate;
use household_core::{TaskDefinition, TaskId, UserId};
use serde::Serialize;
use tracing::debug;

use crate::calendar::{add_days, days_between};
use crate::error::ScheduleError;
use crate::rotation::member_at;

/// One concrete instance of a recurring task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    pub task_id: TaskId,
    /// Periods since the start date; 0 is the occurrence on the start date itself.
    pub index: u64,
    pub date: NaiveDate,
    /// `None` when the task has nobody assigned.
    pub assignee: Option<UserId>,
}

/// Lazy, finite, date-ascending sequence of occurrences of a single task.
#[derive(Debug, Clone)]
pub struct Occurrences<'a> {
    task: &'a TaskDefinition,
    next_index: u64,
    window_end: NaiveDate,
    exhausted: bool,
}

impl<'a> Occurrences<'a> {
    fn empty(task: &'a TaskDefinition) -> Self {
        Self {
            task,
            next_index: 0,
            window_end: task.start_date,
            exhausted: true,
        }
    }

    fn date_of(&self, index: u64) -> Option<NaiveDate> {
        let offset = index.checked_mul(u64::from(self.task.interval_days))?;
        add_days(self.task.start_date, i64::try_from(offset).ok()?)
    }
}

impl Iterator for Occurrences<'_> {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Occurrence> {
        if self.exhausted {
            return None;
        }
        let date = match self.date_of(self.next_index) {
            Some(date) if date <= self.window_end => date,
            _ => {
                self.exhausted = true;
                return None;
            }
        };
        let index = self.next_index;
        self.next_index += 1;
        Some(Occurrence {
            task_id: self.task.id,
            index,
            date,
            assignee: member_at(&self.task.assignees, index).copied(),
        })
    }
}

impl FusedIterator for Occurrences<'_> {}

fn check_interval(task: &TaskDefinition) -> Result<u64, ScheduleError> {
    if task.interval_days < 1 {
        return Err(ScheduleError::InvalidInterval(task.interval_days));
    }
    Ok(u64::from(task.interval_days))
}

/// Occurrences of `task` dated within the closed window `[window_start, window_end]`.
///
/// Nothing exists before the start date: the sequence never begins below index 0.
pub fn occurrences_in_window(
    task: &TaskDefinition,
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Result<Occurrences<'_>, ScheduleError> {
    let interval = check_interval(task)?;
    if window_end < window_start {
        return Err(ScheduleError::InvalidWindow {
            start: window_start,
            end: window_end,
        });
    }

    let offset = days_between(task.start_date, window_start);
    let first_index = if offset <= 0 {
        0
    } else {
        (offset as u64).div_ceil(interval)
    };
    debug!(
        task_id = %task.id,
        %window_start,
        %window_end,
        first_index,
        "expanding task occurrences"
    );

    Ok(Occurrences {
        task,
        next_index: first_index,
        window_end,
        exhausted: false,
    })
}

/// Occurrences in the `weeks * 7` days starting at (and including) `from`.
///
/// Zero weeks is an empty schedule, not an invalid window.
pub fn occurrences_for_weeks(
    task: &TaskDefinition,
    from: NaiveDate,
    weeks: u32,
) -> Result<Occurrences<'_>, ScheduleError> {
    check_interval(task)?;
    if weeks == 0 {
        return Ok(Occurrences::empty(task));
    }
    let window_end =
        add_days(from, i64::from(weeks) * 7 - 1).ok_or(ScheduleError::DateOutOfRange)?;
    occurrences_in_window(task, from, window_end)
}
