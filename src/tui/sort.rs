// SPDX-FileCopyrightText: 2025 The tidemark Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::fmt;

use crate::client::{Record, Value};
use crate::config::SortDirection;

/// Pluggable sort order for a list view: a record field plus a direction.
/// Swappable at runtime; the view keeps its original sorter for reset.
#[derive(Debug, Clone, PartialEq)]
pub struct Sorter {
    field: String,
    direction: SortDirection,
}

impl Sorter {
    /// The sort a freshly opened torrent list starts with.
    pub const DEFAULT_FIELD: &'static str = "name";

    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    pub fn is_default(&self) -> bool {
        self.field == Self::DEFAULT_FIELD && self.direction == SortDirection::Ascending
    }

    /// Re-order `items` in place. The sort is stable, so equal keys keep
    /// their current relative order.
    pub fn apply<T, F>(&self, items: &mut [T], record_of: F)
    where
        F: Fn(&T) -> &Record,
    {
        items.sort_by(|a, b| {
            let va = record_of(a).get(&self.field).unwrap_or(&Value::None);
            let vb = record_of(b).get(&self.field).unwrap_or(&Value::None);
            let ordering = va.compare(vb);
            match self.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
    }
}

impl Default for Sorter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FIELD, SortDirection::Ascending)
    }
}

impl fmt::Display for Sorter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            SortDirection::Ascending => f.write_str(&self.field),
            SortDirection::Descending => write!(f, "!{}", self.field),
        }
    }
}
