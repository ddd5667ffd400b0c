//! Playlist entity and position arithmetic
//!
//! Track positions inside a playlist are always the integers `1..=N`. The
//! helpers here compute how a reorder moves the neighbouring rows so the
//! repository can apply it as two range updates.

use crate::shared::error::Result;
use crate::shared::validation::{validate_description, validate_title};
use crate::user::entity::User;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub cover_src: String,
}

/// Name and description as entered by a user.
#[derive(Debug, Clone)]
pub struct PlaylistInfo {
    pub name: String,
    pub description: Option<String>,
}

impl PlaylistInfo {
    pub fn validate(&self) -> Result<()> {
        validate_title("name", &self.name)?;
        validate_description(self.description.as_deref())
    }
}

/// A playlist as presented to a caller, with its owners resolved.
#[derive(Debug, Clone)]
pub struct PlaylistDetails {
    pub playlist: Playlist,
    pub owners: Vec<User>,
    pub is_liked: bool,
}

/// Clamp a requested position into `[1, len]`. An empty playlist yields 1.
pub fn clamp_position(requested: i64, len: i64) -> i32 {
    requested.clamp(1, len.max(1)) as i32
}

/// Rows to move when one track goes from `from` to `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionShift {
    /// Inclusive range of positions held by the other tracks that move.
    pub low: i32,
    pub high: i32,
    /// +1 when the moved track goes up the list, -1 when it goes down.
    pub delta: i32,
}

/// `None` when the track stays where it is.
pub fn reorder_shift(from: i32, to: i32) -> Option<PositionShift> {
    use std::cmp::Ordering;

    match to.cmp(&from) {
        Ordering::Equal => None,
        Ordering::Less => Some(PositionShift {
            low: to,
            high: from - 1,
            delta: 1,
        }),
        Ordering::Greater => Some(PositionShift {
            low: from + 1,
            high: to,
            delta: -1,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Apply a reorder to `(track, position)` pairs the way the repository does.
    fn apply(rows: &mut [(i64, i32)], track: i64, requested: i64) {
        let len = rows.len() as i64;
        let to = clamp_position(requested, len);
        let from = rows.iter().find(|(t, _)| *t == track).map(|(_, p)| *p).unwrap();
        if let Some(shift) = reorder_shift(from, to) {
            for row in rows.iter_mut() {
                if row.0 != track && row.1 >= shift.low && row.1 <= shift.high {
                    row.1 += shift.delta;
                }
            }
        }
        for row in rows.iter_mut() {
            if row.0 == track {
                row.1 = to;
            }
        }
    }

    fn positions(rows: &[(i64, i32)]) -> Vec<i32> {
        let mut p: Vec<i32> = rows.iter().map(|(_, p)| *p).collect();
        p.sort_unstable();
        p
    }

    #[test]
    fn test_clamp_position() {
        assert_eq!(clamp_position(0, 3), 1);
        assert_eq!(clamp_position(-5, 3), 1);
        assert_eq!(clamp_position(2, 3), 2);
        assert_eq!(clamp_position(99, 3), 3);
        assert_eq!(clamp_position(4, 0), 1);
    }

    #[test]
    fn test_reorder_shift_directions() {
        assert_eq!(reorder_shift(3, 3), None);
        assert_eq!(reorder_shift(3, 1), Some(PositionShift { low: 1, high: 2, delta: 1 }));
        assert_eq!(reorder_shift(1, 3), Some(PositionShift { low: 2, high: 3, delta: -1 }));
    }

    #[test]
    fn test_move_to_front() {
        let mut rows = vec![(5, 1), (6, 2)];
        apply(&mut rows, 6, 1);
        assert_eq!(rows, vec![(5, 2), (6, 1)]);
    }

    #[test]
    fn test_every_reorder_keeps_positions_dense() {
        let n = 6;
        for track in 0..n {
            for requested in -1..=(n + 2) {
                let mut rows: Vec<(i64, i32)> = (0..n).map(|t| (t, t as i32 + 1)).collect();
                apply(&mut rows, track, requested);
                assert_eq!(positions(&rows), (1..=n as i32).collect::<Vec<_>>());
                let expected = clamp_position(requested, n);
                assert!(rows.contains(&(track, expected)));
            }
        }
    }

    #[test]
    fn test_info_validation() {
        let info = PlaylistInfo {
            name: "p".into(),
            description: None,
        };
        assert!(info.validate().is_ok());
        let info = PlaylistInfo {
            name: "".into(),
            description: None,
        };
        assert!(info.validate().is_err());
    }
}
