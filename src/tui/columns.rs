// SPDX-FileCopyrightText: 2025 The tidemark Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Column descriptors for the torrent/file/peer lists and the cache that
//! memoizes formatted cell text.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use ratatui::layout::{Alignment, Constraint};

use crate::client::{Record, Value};
use crate::tui::formatters::format_eta;
use crate::units::pretty_float;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnWidth {
    Fixed(u16),
    Weight(u16),
}

impl ColumnWidth {
    pub fn constraint(self) -> Constraint {
        match self {
            ColumnWidth::Fixed(w) => Constraint::Length(w),
            ColumnWidth::Weight(w) => Constraint::Fill(w),
        }
    }
}

/// One column of a list: the record field it reads, how wide it is, how
/// its cells are aligned and how a value becomes text.
#[derive(Clone)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub header: &'static str,
    pub width: ColumnWidth,
    pub align: Alignment,
    pub extract: Option<fn(&Record) -> Value>,
    pub format: Option<fn(&Value) -> String>,
}

impl ColumnSpec {
    pub fn new(
        name: &'static str,
        header: &'static str,
        width: ColumnWidth,
        align: Alignment,
    ) -> Self {
        Self {
            name,
            header,
            width,
            align,
            extract: None,
            format: None,
        }
    }

    pub fn with_format(mut self, format: fn(&Value) -> String) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_extract(mut self, extract: fn(&Record) -> Value) -> Self {
        self.extract = Some(extract);
        self
    }

    pub fn value(&self, record: &Record) -> Value {
        match self.extract {
            Some(extract) => extract(record),
            None => record.get(self.name).cloned().unwrap_or(Value::None),
        }
    }

    pub fn format_value(&self, value: &Value) -> String {
        match self.format {
            Some(format) => format(value),
            None => value.to_string(),
        }
    }

    /// The mark-indicator column renders mark state, not record data.
    pub fn is_marker(&self) -> bool {
        self.name == "marked"
    }
}

fn fmt_percent(value: &Value) -> String {
    match value {
        Value::Int(p) => format!("{}%", p),
        Value::Float(p) => format!("{}%", pretty_float(*p)),
        other => other.to_string(),
    }
}

fn fmt_eta(value: &Value) -> String {
    match value {
        Value::Int(secs) => format_eta(*secs),
        _ => String::new(),
    }
}

fn marker_column() -> ColumnSpec {
    ColumnSpec::new("marked", " ", ColumnWidth::Fixed(1), Alignment::Left)
        .with_extract(|_| Value::None)
}

pub fn torrent_columns() -> Vec<ColumnSpec> {
    vec![
        marker_column(),
        ColumnSpec::new("name", "Name", ColumnWidth::Weight(100), Alignment::Left),
        ColumnSpec::new("size", "Size", ColumnWidth::Fixed(8), Alignment::Right),
        ColumnSpec::new("progress", "Done", ColumnWidth::Fixed(5), Alignment::Right)
            .with_format(fmt_percent),
        ColumnSpec::new("rate-up", "Up", ColumnWidth::Fixed(8), Alignment::Right),
        ColumnSpec::new("rate-down", "Down", ColumnWidth::Fixed(8), Alignment::Right),
        ColumnSpec::new("eta", "ETA", ColumnWidth::Fixed(7), Alignment::Right)
            .with_format(fmt_eta),
    ]
}

pub fn file_columns() -> Vec<ColumnSpec> {
    vec![
        marker_column(),
        ColumnSpec::new("name", "Name", ColumnWidth::Weight(100), Alignment::Left),
        ColumnSpec::new("progress", "Done", ColumnWidth::Fixed(5), Alignment::Right)
            .with_format(fmt_percent),
        ColumnSpec::new("size", "Size", ColumnWidth::Fixed(8), Alignment::Right),
    ]
}

pub fn peer_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new(
            "address",
            "Address",
            ColumnWidth::Weight(100),
            Alignment::Left,
        ),
        ColumnSpec::new("client", "Client", ColumnWidth::Weight(60), Alignment::Left),
        ColumnSpec::new("progress", "Done", ColumnWidth::Fixed(5), Alignment::Right)
            .with_format(fmt_percent),
        ColumnSpec::new("rate-up", "Up", ColumnWidth::Fixed(8), Alignment::Right),
        ColumnSpec::new("rate-down", "Down", ColumnWidth::Fixed(8), Alignment::Right),
    ]
}

/// Hashable stand-in for a Value used as a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ValueKey {
    None,
    Bool(bool),
    Int(i64),
    Float(u64),
    Text(String),
    Data(u64, Option<String>, bool),
}

fn value_key(value: &Value) -> ValueKey {
    match value {
        Value::None => ValueKey::None,
        Value::Bool(b) => ValueKey::Bool(*b),
        Value::Int(i) => ValueKey::Int(*i),
        Value::Float(f) => ValueKey::Float(f.to_bits()),
        Value::Text(s) => ValueKey::Text(s.clone()),
        Value::Data(n) => ValueKey::Data(
            n.as_f64().to_bits(),
            n.unit().map(str::to_string),
            n.prefix() == crate::units::PrefixFamily::Binary,
        ),
    }
}

struct CacheEntry {
    text: String,
    last_hit: Instant,
}

/// Memoizes formatted cell text per (column, value). Entries idle for
/// longer than `ttl` are dropped; pruning runs at most once per
/// `prune_interval`. Owned by the list view that uses it.
pub struct FormatCache {
    entries: HashMap<(&'static str, ValueKey), CacheEntry>,
    ttl: Duration,
    prune_interval: Duration,
    last_prune: Instant,
}

impl Default for FormatCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(600), Duration::from_secs(60))
    }
}

impl FormatCache {
    pub fn new(ttl: Duration, prune_interval: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            prune_interval,
            last_prune: Instant::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render(&mut self, column: &ColumnSpec, value: &Value) -> String {
        self.maybe_prune();
        let key = (column.name, value_key(value));
        let entry = self
            .entries
            .entry(key)
            .and_modify(|e| e.last_hit = Instant::now())
            .or_insert_with(|| CacheEntry {
                text: column.format_value(value),
                last_hit: Instant::now(),
            });
        entry.text.clone()
    }

    fn maybe_prune(&mut self) {
        let now = Instant::now();
        if now.duration_since(self.last_prune) < self.prune_interval {
            return;
        }
        self.last_prune = now;
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| now.duration_since(entry.last_hit) <= ttl);
    }
}
