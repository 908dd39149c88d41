//! Behavioural tests for occurrence expansion and the schedule views.

use chrono::NaiveDate;
use household_core::TaskDefinition;
use uuid::Uuid;

use crate::calendar::add_days;
use crate::error::ScheduleError;
use crate::occurrence::{occurrences_for_weeks, occurrences_in_window, Occurrence};
use crate::overview::{house_overview, task_schedule, user_overview};
use crate::week::group_by_week;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Helper to build a minimal task for testing.
fn make_task(name: &str, start: NaiveDate, interval_days: u32, assignees: Vec<Uuid>) -> TaskDefinition {
    TaskDefinition {
        id: Uuid::new_v4(),
        house_id: Uuid::new_v4(),
        name: name.to_string(),
        description: String::new(),
        start_date: start,
        interval_days,
        assignees,
        reminder: false,
        mark_complete: false,
    }
}

fn window(task: &TaskDefinition, start: NaiveDate, end: NaiveDate) -> Vec<Occurrence> {
    occurrences_in_window(task, start, end).unwrap().collect()
}

// ── Boundaries ──────────────────────────────────────────────────────

#[test]
fn start_date_is_included() {
    let task = make_task("Trash", d(2024, 1, 1), 7, vec![Uuid::new_v4()]);
    let occs = window(&task, d(2024, 1, 1), d(2024, 1, 1));
    assert_eq!(occs.len(), 1);
    assert_eq!(occs[0].index, 0);
    assert_eq!(occs[0].date, d(2024, 1, 1));
}

#[test]
fn nothing_before_start_date() {
    let task = make_task("Trash", d(2024, 1, 1), 7, vec![Uuid::new_v4()]);
    assert!(window(&task, d(2023, 12, 31), d(2023, 12, 31)).is_empty());
    // A window reaching back past the start still begins at index 0.
    let occs = window(&task, d(2023, 11, 1), d(2024, 1, 8));
    assert_eq!(occs.iter().map(|o| o.index).collect::<Vec<_>>(), [0, 1]);
}

#[test]
fn window_starting_mid_interval_rounds_up() {
    let task = make_task("Floors", d(2024, 1, 1), 3, vec![]);
    // Occurrences fall on Jan 1, 4, 7, 10 ...
    let occs = window(&task, d(2024, 1, 5), d(2024, 1, 10));
    assert_eq!(occs.iter().map(|o| o.date).collect::<Vec<_>>(), [d(2024, 1, 7), d(2024, 1, 10)]);
    assert_eq!(occs[0].index, 2);
}

#[test]
fn invalid_window_fails_fast() {
    let task = make_task("Trash", d(2024, 1, 1), 7, vec![]);
    let err = occurrences_in_window(&task, d(2024, 1, 2), d(2024, 1, 1)).unwrap_err();
    assert_eq!(
        err,
        ScheduleError::InvalidWindow { start: d(2024, 1, 2), end: d(2024, 1, 1) }
    );
}

#[test]
fn zero_interval_is_rejected() {
    let task = make_task("Broken", d(2024, 1, 1), 0, vec![]);
    assert_eq!(
        occurrences_in_window(&task, d(2024, 1, 1), d(2024, 2, 1)).unwrap_err(),
        ScheduleError::InvalidInterval(0)
    );
    assert_eq!(
        occurrences_for_weeks(&task, d(2024, 1, 1), 2).unwrap_err(),
        ScheduleError::InvalidInterval(0)
    );
}

#[test]
fn zero_weeks_is_empty() {
    let task = make_task("Trash", d(2024, 1, 1), 1, vec![]);
    assert_eq!(occurrences_for_weeks(&task, d(2024, 1, 1), 0).unwrap().count(), 0);
}

#[test]
fn window_at_end_of_calendar_terminates() {
    let task = make_task("Forever", NaiveDate::MAX, 1, vec![]);
    let occs = window(&task, NaiveDate::MAX, NaiveDate::MAX);
    assert_eq!(occs.len(), 1);
}

// ── Properties ──────────────────────────────────────────────────────

#[test]
fn expansion_is_deterministic() {
    let task = make_task("Bathroom", d(2023, 11, 14), 5, vec![Uuid::new_v4(), Uuid::new_v4()]);
    let a = window(&task, d(2024, 1, 1), d(2024, 3, 1));
    let b = window(&task, d(2024, 1, 1), d(2024, 3, 1));
    assert_eq!(a, b);
}

#[test]
fn index_date_bijection() {
    let task = make_task("Bathroom", d(2023, 11, 14), 5, vec![]);
    let start = d(2024, 1, 1);
    let end = d(2024, 3, 1);
    let occs = window(&task, start, end);

    for k in 0..40u64 {
        let date = add_days(task.start_date, (k * 5) as i64).unwrap();
        let inside = date >= start && date <= end;
        let present = occs.iter().any(|o| o.index == k && o.date == date);
        assert_eq!(inside, present, "index {k} date {date}");
    }
    assert!(occs.windows(2).all(|w| w[0].date < w[1].date));
}

#[test]
fn assignees_rotate_by_index() {
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let task = make_task("Dishes", d(2024, 1, 1), 1, vec![a, b, c]);
    let occs = window(&task, d(2024, 1, 1), d(2024, 1, 5));
    let assigned: Vec<_> = occs.iter().map(|o| o.assignee.unwrap()).collect();
    assert_eq!(assigned, [a, b, c, a, b]);
}

#[test]
fn week_grouping_preserves_every_occurrence() {
    let task = make_task("Plants", d(2024, 2, 20), 2, vec![Uuid::new_v4()]);
    let occs: Vec<_> = occurrences_for_weeks(&task, d(2024, 2, 22), 6).unwrap().collect();
    let groups = group_by_week(occs.clone());
    let flattened: Vec<_> = groups.into_iter().flat_map(|g| g.occurrences).collect();
    assert_eq!(flattened, occs);
}

// ── Scenarios ───────────────────────────────────────────────────────

#[test]
fn three_weeks_for_alice_and_bob() {
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
    let task = make_task("Trash", d(2024, 1, 1), 7, vec![alice, bob]);

    let groups = task_schedule(&task, d(2024, 1, 1), 3).unwrap();
    let weeks: Vec<_> = groups.iter().map(|g| g.week.to_string()).collect();
    assert_eq!(weeks, ["2024-W01", "2024-W02", "2024-W03"]);

    let occs: Vec<_> = groups.iter().flat_map(|g| g.occurrences.iter()).collect();
    assert_eq!(occs.len(), 3);
    assert_eq!((occs[0].date, occs[0].assignee), (d(2024, 1, 1), Some(alice)));
    assert_eq!((occs[1].date, occs[1].assignee), (d(2024, 1, 8), Some(bob)));
    assert_eq!((occs[2].date, occs[2].assignee), (d(2024, 1, 15), Some(alice)));
}

#[test]
fn unassigned_task_still_produces_occurrences() {
    let task = make_task("Trash", d(2024, 1, 1), 7, vec![]);
    let occs: Vec<_> = occurrences_for_weeks(&task, d(2024, 1, 1), 3).unwrap().collect();
    assert_eq!(occs.len(), 3);
    assert!(occs.iter().all(|o| o.assignee.is_none()));
}

#[test]
fn house_overview_merges_tasks_by_date() {
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
    let weekly = make_task("Trash", d(2024, 1, 1), 7, vec![alice, bob]);
    let every_other_day = make_task("Dishes", d(2024, 1, 3), 2, vec![bob]);
    let tasks = vec![weekly.clone(), every_other_day.clone()];

    let groups = house_overview(&tasks, d(2024, 1, 1), 2).unwrap();
    let flat: Vec<_> = groups.iter().flat_map(|g| g.occurrences.iter()).collect();

    assert!(flat.windows(2).all(|w| w[0].date <= w[1].date));
    // 2 weekly + Jan 3,5,7,9,11,13 for dishes.
    assert_eq!(flat.len(), 8);
    assert_eq!(groups.len(), 2);
    assert_eq!(flat[0].task_id, weekly.id);
    assert_eq!(flat[1].task_id, every_other_day.id);
}

#[test]
fn same_day_ties_keep_task_order() {
    let first = make_task("A", d(2024, 1, 1), 1, vec![]);
    let second = make_task("B", d(2024, 1, 1), 1, vec![]);
    let groups = house_overview(&[second.clone(), first.clone()], d(2024, 1, 1), 1).unwrap();
    let flat: Vec<_> = groups.iter().flat_map(|g| g.occurrences.iter()).collect();
    assert_eq!(flat[0].task_id, second.id);
    assert_eq!(flat[1].task_id, first.id);
}

#[test]
fn user_overview_keeps_only_their_turns() {
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
    let trash = make_task("Trash", d(2024, 1, 1), 7, vec![alice, bob]);
    let dishes = make_task("Dishes", d(2024, 1, 1), 1, vec![bob]);

    let groups = user_overview(&[trash, dishes], alice, d(2024, 1, 1), 4).unwrap();
    let dates: Vec<_> = groups
        .iter()
        .flat_map(|g| g.occurrences.iter())
        .map(|o| o.date)
        .collect();
    assert_eq!(dates, [d(2024, 1, 1), d(2024, 1, 15)]);
}

#[test]
fn house_overview_of_no_tasks_is_empty() {
    assert!(house_overview(&[], d(2024, 1, 1), 4).unwrap().is_empty());
}
