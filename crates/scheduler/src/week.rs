//! Grouping of date-ordered occurrences into ISO weeks.

use serde::Serialize;

use crate::calendar::{iso_week_key, WeekKey};
use crate::occurrence::Occurrence;

/// A run of occurrences that share one ISO week, in ascending date order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekGroup {
    pub week: WeekKey,
    pub occurrences: Vec<Occurrence>,
}

/// Split an ascending sequence of occurrences into consecutive week groups.
///
/// The input must already be sorted by date; unsorted input is a caller bug.
/// Empty input yields no groups.
pub fn group_by_week<I>(occurrences: I) -> Vec<WeekGroup>
where
    I: IntoIterator<Item = Occurrence>,
{
    let mut groups: Vec<WeekGroup> = Vec::new();
    let mut previous = None;

    for occurrence in occurrences {
        if let Some(prev) = previous {
            debug_assert!(prev <= occurrence.date, "occurrences must be sorted by date");
        }
        previous = Some(occurrence.date);

        let key = iso_week_key(occurrence.date);
        match groups.last_mut() {
            Some(group) if group.week == key => group.occurrences.push(occurrence),
            _ => groups.push(WeekGroup {
                week: key,
                occurrences: vec![occurrence],
            }),
        }
    }

    groups
}
