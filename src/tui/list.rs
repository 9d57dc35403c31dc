// SPDX-FileCopyrightText: 2025 The tidemark Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! The reconciling list model: keeps an ordered, identity-stable set of
//! row widgets in sync with periodically replaced full snapshots, with
//! minimal visual disruption.
//!
//! Refreshes run on the single UI event loop and complete without
//! preemption, so no locking guards the rows or the marked set.

use std::collections::HashSet;
use std::time::Duration;

use crate::client::{ItemId, Snapshot};
use crate::tui::columns::{ColumnSpec, FormatCache};
use crate::tui::row::RowWidget;
use crate::tui::sort::Sorter;

pub struct ListView {
    title: String,
    columns: Vec<ColumnSpec>,
    rows: Vec<RowWidget>,
    marked: HashSet<ItemId>,
    sort: Option<Sorter>,
    sort_orig: Option<Sorter>,
    focus: usize,
    mark_symbol: String,
    cache: FormatCache,
}

impl ListView {
    pub fn new(title: impl Into<String>, columns: Vec<ColumnSpec>, sort: Option<Sorter>) -> Self {
        Self {
            title: title.into(),
            columns,
            rows: Vec::new(),
            marked: HashSet::new(),
            sort: sort.clone(),
            sort_orig: sort,
            focus: 0,
            mark_symbol: "*".to_string(),
            cache: FormatCache::default(),
        }
    }

    pub fn with_cache_policy(mut self, ttl: Duration, prune_interval: Duration) -> Self {
        self.cache = FormatCache::new(ttl, prune_interval);
        self
    }

    pub fn with_mark_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.mark_symbol = symbol.into();
        self
    }

    /// Reconcile the displayed rows against a complete new snapshot.
    ///
    /// Rows whose id survives are updated in place (their widget identity
    /// is preserved, so marks stick); rows whose id vanished are removed
    /// and unmarked; remaining snapshot entries become new rows. Finally
    /// the active sort is re-applied and focus follows the previously
    /// focused id to its new position.
    pub fn update_items(&mut self, snapshot: Snapshot) {
        let focused_id = self.focused_id().cloned();
        let mut pending = snapshot;

        let Self {
            rows,
            marked,
            columns,
            cache,
            mark_symbol,
            ..
        } = self;

        rows.retain_mut(|row| match pending.remove(row.id()) {
            Some(record) => {
                row.update(record, columns, cache);
                true
            }
            None => {
                // A vanished id is a deletion, not an error.
                marked.remove(row.id());
                false
            }
        });

        for (id, record) in pending {
            let mut row = RowWidget::new(id, record, columns, cache);
            row.set_marked(false, columns, mark_symbol);
            rows.push(row);
        }

        if let Some(sort) = &self.sort {
            sort.apply(&mut self.rows, |row| row.record());
        }

        if let Some(focused_id) = focused_id {
            if let Some(pos) = self.rows.iter().position(|row| row.id() == &focused_id) {
                self.focus = pos;
            }
        }
        self.focus = self.focus.min(self.rows.len().saturating_sub(1));
    }

    /// Remove all rows and marks.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.marked.clear();
        self.focus = 0;
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[RowWidget] {
        &self.rows
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Base title plus the sort spec when a non-default sort is active.
    /// The item count is appended by the renderer.
    pub fn title(&self) -> String {
        match &self.sort {
            Some(sort) if !sort.is_default() => format!("{} {{{}}}", self.title, sort),
            _ => self.title.clone(),
        }
    }

    pub fn sort(&self) -> Option<&Sorter> {
        self.sort.as_ref()
    }

    pub fn set_sort(&mut self, sort: Option<Sorter>) {
        self.sort = sort;
        if let Some(sort) = &self.sort {
            sort.apply(&mut self.rows, |row| row.record());
        }
    }

    /// Restore the sort the view was created with.
    pub fn reset_sort(&mut self) {
        self.set_sort(self.sort_orig.clone());
    }

    /// Mark the currently focused row, or all rows.
    pub fn mark(&mut self, toggle: bool, all: bool) {
        self.set_mark(true, toggle, all);
    }

    /// Unmark the currently focused row, or all rows.
    pub fn unmark(&mut self, toggle: bool, all: bool) {
        self.set_mark(false, toggle, all);
    }

    fn set_mark(&mut self, mark: bool, toggle: bool, all: bool) {
        if self.rows.is_empty() {
            return;
        }
        let mark = if toggle {
            !self.rows[self.focus].is_marked()
        } else {
            mark
        };

        let range = if all {
            0..self.rows.len()
        } else {
            self.focus..self.focus + 1
        };
        for row in &mut self.rows[range] {
            row.set_marked(mark, &self.columns, &self.mark_symbol);
            if mark {
                self.marked.insert(row.id().clone());
            } else {
                self.marked.remove(row.id());
            }
        }
    }

    pub fn marked_ids(&self) -> impl Iterator<Item = &ItemId> {
        self.marked.iter()
    }

    pub fn marked_count(&self) -> usize {
        self.marked.len()
    }

    /// Re-push each row's current mark state through the mark cell.
    /// Only needed after the mark symbol was reconfigured.
    pub fn refresh_marks(&mut self) {
        let Self {
            rows,
            columns,
            mark_symbol,
            ..
        } = self;
        for row in rows.iter_mut() {
            row.set_marked(row.is_marked(), columns, mark_symbol);
        }
    }

    pub fn set_mark_symbol(&mut self, symbol: impl Into<String>) {
        self.mark_symbol = symbol.into();
        self.refresh_marks();
    }

    pub fn focused_row(&self) -> Option<&RowWidget> {
        self.rows.get(self.focus)
    }

    pub fn focused_id(&self) -> Option<&ItemId> {
        self.focused_row().map(RowWidget::id)
    }

    pub fn focused_torrent_id(&self) -> Option<&ItemId> {
        self.focused_row().map(RowWidget::torrent_id)
    }

    pub fn focus_position(&self) -> usize {
        self.focus
    }

    pub fn set_focus_position(&mut self, position: usize) {
        self.focus = position.min(self.rows.len().saturating_sub(1));
    }

    pub fn focus_next(&mut self) {
        self.set_focus_position(self.focus.saturating_add(1));
    }

    pub fn focus_prev(&mut self) {
        self.set_focus_position(self.focus.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Record, Value};
    use crate::config::SortDirection;
    use crate::tui::columns::torrent_columns;

    fn record(name: &str, size: i64) -> Record {
        let mut r = Record::new();
        r.insert("name".to_string(), Value::Text(name.to_string()));
        r.insert("size".to_string(), Value::Int(size));
        r
    }

    fn snapshot(entries: &[(i64, &str, i64)]) -> Snapshot {
        entries
            .iter()
            .map(|(id, name, size)| (ItemId::Int(*id), record(name, *size)))
            .collect()
    }

    fn view() -> ListView {
        ListView::new(
            "Torrents",
            torrent_columns(),
            Some(Sorter::new("name", SortDirection::Ascending)),
        )
    }

    fn displayed_ids(view: &ListView) -> Vec<i64> {
        view.rows()
            .iter()
            .map(|row| match row.id() {
                ItemId::Int(i) => *i,
                ItemId::Text(_) => panic!("expected integer ids"),
            })
            .collect()
    }

    #[test]
    fn test_refresh_adds_updates_and_removes() {
        let mut v = view();
        v.update_items(snapshot(&[(1, "alpha", 10), (2, "beta", 20)]));
        assert_eq!(displayed_ids(&v), [1, 2]);

        v.update_items(snapshot(&[(2, "beta", 25), (3, "gamma", 30)]));
        assert_eq!(displayed_ids(&v), [2, 3]);

        let beta = &v.rows()[0];
        assert_eq!(beta.record()["size"], Value::Int(25));
    }

    #[test]
    fn test_displayed_ids_always_match_last_snapshot() {
        let mut v = view();
        let snapshots = [
            snapshot(&[(1, "a", 1), (2, "b", 2), (3, "c", 3)]),
            snapshot(&[(3, "c", 3)]),
            snapshot(&[]),
            snapshot(&[(4, "d", 4), (5, "e", 5)]),
        ];
        for snap in snapshots {
            let expected: HashSet<ItemId> = snap.keys().cloned().collect();
            v.update_items(snap);
            let displayed: HashSet<ItemId> = v.rows().iter().map(|r| r.id().clone()).collect();
            assert_eq!(displayed, expected);
        }
    }

    #[test]
    fn test_surviving_rows_keep_widget_identity() {
        let mut v = view();
        v.update_items(snapshot(&[(1, "a", 1)]));
        assert_eq!(v.rows()[0].revision, 0);

        // Same id across the transition: the row is updated, not rebuilt.
        v.update_items(snapshot(&[(1, "a", 999)]));
        assert_eq!(v.rows()[0].revision, 1);

        // Removed and re-introduced: a fresh widget.
        v.update_items(snapshot(&[]));
        v.update_items(snapshot(&[(1, "a", 1)]));
        assert_eq!(v.rows()[0].revision, 0);
    }

    #[test]
    fn test_marks_survive_refresh_while_id_persists() {
        let mut v = view();
        v.update_items(snapshot(&[(1, "a", 1), (2, "b", 2)]));
        v.mark(false, false); // focus is on row 0 (id 1)
        assert_eq!(v.marked_count(), 1);

        v.update_items(snapshot(&[(1, "a", 5), (2, "b", 2)]));
        assert!(v.rows()[0].is_marked());
        assert_eq!(v.marked_count(), 1);
    }

    #[test]
    fn test_vanished_id_is_dropped_from_marked_set() {
        let mut v = view();
        v.update_items(snapshot(&[(1, "a", 1), (2, "b", 2)]));
        v.mark(false, true); // mark all
        assert_eq!(v.marked_count(), 2);

        v.update_items(snapshot(&[(2, "b", 2)]));
        assert_eq!(v.marked_count(), 1);
        assert_eq!(v.marked_ids().next(), Some(&ItemId::Int(2)));

        // Re-introduced ids come back unmarked.
        v.update_items(snapshot(&[(1, "a", 1), (2, "b", 2)]));
        assert_eq!(v.marked_count(), 1);
        let one = v.rows().iter().find(|r| r.id() == &ItemId::Int(1)).unwrap();
        assert!(!one.is_marked());
    }

    #[test]
    fn test_mark_toggle_applies_inverted_focus_state_to_all() {
        let mut v = view();
        v.update_items(snapshot(&[(1, "a", 1), (2, "b", 2), (3, "c", 3)]));
        v.mark(false, false); // mark focused row only
        assert!(v.rows()[0].is_marked());

        // Toggle-all inverts the focused row's state (marked -> unmark all).
        v.mark(true, true);
        assert_eq!(v.marked_count(), 0);

        // And again: focused now unmarked -> mark all.
        v.mark(true, true);
        assert_eq!(v.marked_count(), 3);
    }

    #[test]
    fn test_focus_follows_id_through_sorting() {
        let mut v = view();
        v.update_items(snapshot(&[(1, "b", 1), (2, "c", 2), (3, "d", 3)]));
        v.set_focus_position(1); // id 2, "c"
        assert_eq!(v.focused_id(), Some(&ItemId::Int(2)));

        // A new item sorts before the focused one; focus follows the id.
        v.update_items(snapshot(&[(1, "b", 1), (2, "c", 2), (3, "d", 3), (4, "a", 4)]));
        assert_eq!(v.focused_id(), Some(&ItemId::Int(2)));
        assert_eq!(v.focus_position(), 2);
    }

    #[test]
    fn test_focus_clamped_when_focused_id_vanishes() {
        let mut v = view();
        v.update_items(snapshot(&[(1, "a", 1), (2, "b", 2), (3, "c", 3)]));
        v.set_focus_position(2);
        v.update_items(snapshot(&[(1, "a", 1)]));
        assert_eq!(v.focus_position(), 0);
    }

    #[test]
    fn test_unsorted_view_appends_new_rows() {
        let mut v = ListView::new("Torrents", torrent_columns(), None);
        v.update_items(snapshot(&[(2, "b", 2)]));
        v.update_items(snapshot(&[(2, "b", 2), (1, "a", 1)]));
        // Without a sorter the existing row keeps its position.
        assert_eq!(displayed_ids(&v)[0], 2);
    }

    #[test]
    fn test_sort_swap_and_reset() {
        let mut v = view();
        v.update_items(snapshot(&[(1, "a", 30), (2, "b", 10), (3, "c", 20)]));
        assert_eq!(displayed_ids(&v), [1, 2, 3]);
        assert_eq!(v.title(), "Torrents");

        v.set_sort(Some(Sorter::new("size", SortDirection::Descending)));
        assert_eq!(displayed_ids(&v), [1, 3, 2]);
        assert_eq!(v.title(), "Torrents {!size}");

        v.reset_sort();
        v.update_items(snapshot(&[(1, "a", 30), (2, "b", 10), (3, "c", 20)]));
        assert_eq!(displayed_ids(&v), [1, 2, 3]);
        assert_eq!(v.title(), "Torrents");
    }

    #[test]
    fn test_refresh_marks_redraws_symbol() {
        let mut v = view();
        v.update_items(snapshot(&[(1, "a", 1)]));
        v.mark(false, false);
        let marker_idx = v.columns().iter().position(|c| c.is_marker()).unwrap();
        assert_eq!(v.rows()[0].cells()[marker_idx].text(), "*");

        v.set_mark_symbol("#");
        assert_eq!(v.rows()[0].cells()[marker_idx].text(), "#");
        assert_eq!(v.marked_count(), 1);
    }

    #[test]
    fn test_clear() {
        let mut v = view();
        v.update_items(snapshot(&[(1, "a", 1), (2, "b", 2)]));
        v.mark(false, true);
        v.clear();
        assert!(v.is_empty());
        assert_eq!(v.marked_count(), 0);
        assert_eq!(v.focused_id(), None);
    }
}
