// SPDX-FileCopyrightText: 2025 The tidemark Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Paints a [`ListView`] as a ratatui table: header row, one row per
//! widget, focused-row highlight and marked-row accent.

use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Text};
use ratatui::widgets::{Block, Borders, Cell, Row, Table, TableState};
use ratatui::Frame;

use crate::theme;
use crate::tui::list::ListView;

pub fn draw_list(frame: &mut Frame, area: Rect, view: &ListView, pane_focused: bool) {
    let header_cells = view.columns().iter().map(|column| {
        Cell::from(
            Text::from(Line::from(column.header).alignment(column.align))
                .style(Style::default().fg(theme::LAVENDER)),
        )
    });
    let header = Row::new(header_cells).height(1);

    let rows = view.rows().iter().map(|row| {
        let cells = row
            .cells()
            .iter()
            .zip(view.columns())
            .map(|(cell, column)| {
                Cell::from(Text::from(
                    Line::from(cell.text().to_string()).alignment(column.align),
                ))
            });
        let style = if row.is_marked() {
            Style::default().fg(theme::YELLOW)
        } else {
            Style::default().fg(theme::TEXT)
        };
        Row::new(cells).style(style)
    });

    let constraints: Vec<Constraint> = view
        .columns()
        .iter()
        .map(|column| column.width.constraint())
        .collect();

    let border_style = if pane_focused {
        Style::default().fg(theme::LAVENDER)
    } else {
        Style::default().fg(theme::SUBTEXT0)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(format!(" {} [{}] ", view.title(), view.len()));

    let table = Table::new(rows, constraints)
        .header(header)
        .row_highlight_style(
            Style::default()
                .bg(theme::SURFACE0)
                .add_modifier(Modifier::BOLD),
        )
        .block(block);

    let mut state = TableState::default();
    if !view.is_empty() {
        state.select(Some(view.focus_position()));
    }
    frame.render_stateful_widget(table, area, &mut state);
}
