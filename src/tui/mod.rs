// SPDX-FileCopyrightText: 2025 The tidemark Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod columns;
pub mod formatters;
pub mod list;
pub mod row;
pub mod sort;
pub mod view;
