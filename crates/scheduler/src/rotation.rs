//! Round-robin selection over an ordered member list.
//!
//! Task assignees rotate by plain modulo indexing ([`member_at`]); container
//! turns rotate relative to whoever was served last ([`next_in_rotation`]).

use crate::error::ScheduleError;

/// The member responsible for the `index`-th turn, wrapping around. `None` for an empty list.
pub fn member_at<T>(members: &[T], index: u64) -> Option<&T> {
    if members.is_empty() {
        return None;
    }
    let len = members.len() as u64;
    members.get((index % len) as usize)
}

/// The member after `last_served`, wrapping to the front; the first member when nobody was served yet.
pub fn next_in_rotation<'a, T: PartialEq>(
    members: &'a [T],
    last_served: Option<&T>,
) -> Result<&'a T, ScheduleError> {
    let first = members.first().ok_or(ScheduleError::EmptyRotation)?;
    let Some(last) = last_served else {
        return Ok(first);
    };
    let position = members
        .iter()
        .position(|m| m == last)
        .ok_or(ScheduleError::NotInRotation)?;
    Ok(&members[(position + 1) % members.len()])
}

/// A turn ledger over a fixed member order. It cycles forever; `advance`
/// is driven by whoever records a completed turn.
#[derive(Debug, Clone)]
pub struct Rotation<T> {
    members: Vec<T>,
    upcoming: usize,
}

impl<T: PartialEq> Rotation<T> {
    /// Start a rotation that continues after `last_served`.
    pub fn resume(members: Vec<T>, last_served: Option<&T>) -> Result<Self, ScheduleError> {
        let next = next_in_rotation(&members, last_served)?;
        let upcoming = members
            .iter()
            .position(|m| m == next)
            .ok_or(ScheduleError::NotInRotation)?;
        Ok(Self { members, upcoming })
    }

    /// Member whose turn is awaited.
    pub fn upcoming(&self) -> &T {
        &self.members[self.upcoming]
    }

    /// Record the awaited turn as done and return the member who served it.
    pub fn advance(&mut self) -> &T {
        let served = self.upcoming;
        self.upcoming = (self.upcoming + 1) % self.members.len();
        &self.members[served]
    }

    pub fn members(&self) -> &[T] {
        &self.members
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_at_wraps() {
        let members = ["A", "B", "C"];
        let picked: Vec<_> = (0..5).map(|i| *member_at(&members, i).unwrap()).collect();
        assert_eq!(picked, ["A", "B", "C", "A", "B"]);
        assert_eq!(member_at::<&str>(&[], 3), None);
    }

    #[test]
    fn next_in_rotation_cases() {
        let members = ["U1", "U2", "U3"];
        assert_eq!(next_in_rotation(&members, Some(&"U3")), Ok(&"U1"));
        assert_eq!(next_in_rotation(&members, Some(&"U1")), Ok(&"U2"));
        assert_eq!(next_in_rotation(&members, None), Ok(&"U1"));
        assert_eq!(
            next_in_rotation(&members, Some(&"U9")),
            Err(ScheduleError::NotInRotation)
        );
        assert_eq!(
            next_in_rotation::<&str>(&[], None),
            Err(ScheduleError::EmptyRotation)
        );
    }

    #[test]
    fn single_member_serves_every_turn() {
        assert_eq!(next_in_rotation(&["solo"], Some(&"solo")), Ok(&"solo"));
    }

    #[test]
    fn rotation_cycles_indefinitely() {
        let mut rotation = Rotation::resume(vec![1, 2, 3], Some(&2)).unwrap();
        assert_eq!(*rotation.upcoming(), 3);
        let served: Vec<i32> = (0..4).map(|_| *rotation.advance()).collect();
        assert_eq!(served, [3, 1, 2, 3]);
        assert_eq!(*rotation.upcoming(), 1);
    }

    #[test]
    fn rotation_rejects_unknown_last_served() {
        assert!(matches!(
            Rotation::resume(vec![1, 2], Some(&7)),
            Err(ScheduleError::NotInRotation)
        ));
        assert!(matches!(
            Rotation::<i32>::resume(vec![], None),
            Err(ScheduleError::EmptyRotation)
        ));
    }
}
