// SPDX-FileCopyrightText: 2025 The tidemark Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! One displayed row: a raw record plus its rendered cells. Row identity
//! is stable across data refreshes; only cell contents change.

use crate::client::{ItemId, Record, Value};
use crate::tui::columns::{ColumnSpec, FormatCache};

/// A single rendered cell. Keeps the last extracted value so an update
/// with an equal value skips re-formatting entirely.
#[derive(Debug, Default)]
pub struct CellWidget {
    value: Option<Value>,
    text: String,
}

impl CellWidget {
    fn update(&mut self, column: &ColumnSpec, record: &Record, cache: &mut FormatCache) {
        let new_value = column.value(record);
        if self.value.as_ref() != Some(&new_value) {
            self.text = cache.render(column, &new_value);
            self.value = Some(new_value);
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[derive(Debug)]
pub struct RowWidget {
    id: ItemId,
    torrent_id: ItemId,
    record: Record,
    cells: Vec<CellWidget>,
    marked: bool,
    // Bumped on every in-place update; tests use it to tell an updated
    // row from a recreated one.
    #[cfg(test)]
    pub(crate) revision: u64,
}

impl RowWidget {
    pub fn new(
        id: ItemId,
        record: Record,
        columns: &[ColumnSpec],
        cache: &mut FormatCache,
    ) -> Self {
        let mut row = Self {
            torrent_id: Self::torrent_id_of(&id, &record),
            id,
            record: Record::new(),
            cells: columns.iter().map(|_| CellWidget::default()).collect(),
            marked: false,
            #[cfg(test)]
            revision: 0,
        };
        row.apply(record, columns, cache);
        row
    }

    /// Files and peers carry a "tid" field pointing at their parent
    /// torrent; torrent rows are their own torrent.
    fn torrent_id_of(id: &ItemId, record: &Record) -> ItemId {
        record
            .get("tid")
            .and_then(Value::as_id)
            .unwrap_or_else(|| id.clone())
    }

    /// Push new field values into every cell; each cell decides for
    /// itself whether its text changes.
    pub fn update(&mut self, record: Record, columns: &[ColumnSpec], cache: &mut FormatCache) {
        self.apply(record, columns, cache);
        #[cfg(test)]
        {
            self.revision += 1;
        }
    }

    fn apply(&mut self, record: Record, columns: &[ColumnSpec], cache: &mut FormatCache) {
        for (cell, column) in self.cells.iter_mut().zip(columns) {
            if !column.is_marker() {
                cell.update(column, &record, cache);
            }
        }
        self.torrent_id = Self::torrent_id_of(&self.id, &record);
        self.record = record;
    }

    pub fn id(&self) -> &ItemId {
        &self.id
    }

    pub fn torrent_id(&self) -> &ItemId {
        &self.torrent_id
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn cells(&self) -> &[CellWidget] {
        &self.cells
    }

    pub fn is_marked(&self) -> bool {
        self.marked
    }

    /// Set the mark flag and refresh the mark-indicator cell, if the
    /// column table has one.
    pub fn set_marked(&mut self, marked: bool, columns: &[ColumnSpec], symbol: &str) {
        self.marked = marked;
        if let Some(pos) = columns.iter().position(|c| c.is_marker()) {
            self.cells[pos].text = if marked {
                symbol.to_string()
            } else {
                " ".to_string()
            };
        }
    }
}
