use std::cmp::Ordering;
use std::fmt;

use super::row::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    pub fn flipped(self) -> Self {
        match self {
            Direction::Ascending => Direction::Descending,
            Direction::Descending => Direction::Ascending,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Ascending => f.write_str("▲"),
            Direction::Descending => f.write_str("▼"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortState {
    pub key: String,
    pub direction: Direction,
}

impl SortState {
    pub fn ascending(key: impl Into<String>) -> Self {
        SortState {
            key: key.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn descending(key: impl Into<String>) -> Self {
        SortState {
            key: key.into(),
            direction: Direction::Descending,
        }
    }
}

/// Compare two rows on the cell at `field`.
///
/// Missing values order before present ones. Descending is the reversed ascending
/// result, so equal keys stay `Equal` either way.
pub fn compare(a: &Row, b: &Row, field: Option<usize>, direction: Direction) -> Ordering {
    let ascending = match field {
        Some(idx) => match (a.get(idx), b.get(idx)) {
            (Some(va), Some(vb)) => va.native_cmp(vb),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        None => Ordering::Equal,
    };
    match direction {
        Direction::Ascending => ascending,
        Direction::Descending => ascending.reverse(),
    }
}

/// Stable in-place sort of row indices.
pub fn sort_indices(indices: &mut [usize], rows: &[Row], field: Option<usize>, direction: Direction) {
    indices.sort_by(|&a, &b| compare(&rows[a], &rows[b], field, direction));
}
