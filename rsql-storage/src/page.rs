//! Paging and sorting

use crate::record::{Filterable, StoreValue};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// Sort by a store column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub column: String,
    pub direction: Direction,
}

impl SortKey {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Desc,
        }
    }

    /// Parse `column` or `column:asc|desc`.
    pub fn parse(text: &str) -> Option<Self> {
        let (column, direction) = match text.split_once(':') {
            Some((column, dir)) if dir.eq_ignore_ascii_case("asc") => (column, Direction::Asc),
            Some((column, dir)) if dir.eq_ignore_ascii_case("desc") => (column, Direction::Desc),
            Some(_) => return None,
            None => (text, Direction::Asc),
        };
        let column = column.trim();
        if column.is_empty() {
            return None;
        }
        Some(Self {
            column: column.to_string(),
            direction,
        })
    }
}

/// Requested window of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
    #[serde(default)]
    pub sort: Vec<SortKey>,
}

impl PageRequest {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit,
            sort: Vec::new(),
        }
    }

    pub fn unpaged() -> Self {
        Self::new(0, usize::MAX)
    }

    pub fn sorted_by(mut self, key: SortKey) -> Self {
        self.sort.push(key);
        self
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::unpaged()
    }
}

/// One page of results with the total number of matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total: usize,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            content: Vec::new(),
            total: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

fn rank(value: &StoreValue<'_>) -> u8 {
    match value {
        StoreValue::Bool(_) => 0,
        StoreValue::Number(_) => 1,
        StoreValue::Timestamp(_) => 2,
        StoreValue::Text(_) => 3,
        StoreValue::Null => 4,
    }
}

fn cmp_store(a: StoreValue<'_>, b: StoreValue<'_>) -> Ordering {
    match (a, b) {
        (StoreValue::Text(a), StoreValue::Text(b)) => a.cmp(b),
        (StoreValue::Number(a), StoreValue::Number(b)) => a.cmp(&b),
        (StoreValue::Timestamp(a), StoreValue::Timestamp(b)) => a.cmp(&b),
        (StoreValue::Bool(a), StoreValue::Bool(b)) => a.cmp(&b),
        (a, b) => rank(&a).cmp(&rank(&b)),
    }
}

/// Compare two entities by `keys`. Nulls sort last in either direction.
pub fn compare_by<T: Filterable>(a: &T, b: &T, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let (va, vb) = (a.column(&key.column), b.column(&key.column));
        let ord = match (va.is_null(), vb.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => match key.direction {
                Direction::Asc => cmp_store(va, vb),
                Direction::Desc => cmp_store(vb, va),
            },
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}
