// SPDX-FileCopyrightText: 2025 The tidemark Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Catppuccin Mocha palette, trimmed to what the views use.

use ratatui::style::Color;

pub const TEXT: Color = Color::Rgb(205, 214, 244);
pub const SUBTEXT0: Color = Color::Rgb(166, 173, 200);
pub const SURFACE0: Color = Color::Rgb(49, 50, 68);
pub const LAVENDER: Color = Color::Rgb(180, 190, 254);
pub const YELLOW: Color = Color::Rgb(249, 226, 175);
