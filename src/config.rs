// SPDX-FileCopyrightText: 2025 The tidemark Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use figment::providers::{Env, Format};
use figment::{providers::Toml, Figment};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::units::PrefixFamily;

use strum_macros::EnumCount;
use strum_macros::EnumIter;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default, EnumIter, EnumCount)]
pub enum TorrentSortColumn {
    #[default]
    Name,
    Size,
    Progress,
    Up,
    Down,
    Eta,
}

impl TorrentSortColumn {
    /// Record field the column sorts by.
    pub fn field(self) -> &'static str {
        match self {
            TorrentSortColumn::Name => "name",
            TorrentSortColumn::Size => "size",
            TorrentSortColumn::Progress => "progress",
            TorrentSortColumn::Up => "rate-up",
            TorrentSortColumn::Down => "rate-down",
            TorrentSortColumn::Eta => "eta",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default, EnumIter, EnumCount)]
pub enum PeerSortColumn {
    #[default]
    Address,
    Client,
    Progress,
    Up,
    Down,
}

impl PeerSortColumn {
    pub fn field(self) -> &'static str {
        match self {
            PeerSortColumn::Address => "address",
            PeerSortColumn::Client => "client",
            PeerSortColumn::Progress => "progress",
            PeerSortColumn::Up => "rate-up",
            PeerSortColumn::Down => "rate-down",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum DataUnit {
    Bit,
    Byte,
}

impl DataUnit {
    pub fn short(self) -> &'static str {
        match self {
            DataUnit::Bit => "b",
            DataUnit::Byte => "B",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Settings {
    // Backend daemon
    pub backend_url: String,
    pub poll_interval_ms: u64,

    // UI
    pub torrent_sort_column: TorrentSortColumn,
    pub torrent_sort_direction: SortDirection,
    pub peer_sort_column: PeerSortColumn,
    pub peer_sort_direction: SortDirection,
    pub mark_symbol: String,

    // Number formatting
    pub size_unit: DataUnit,
    pub size_prefix: PrefixFamily,
    pub rate_unit: DataUnit,
    pub rate_prefix: PrefixFamily,

    // Cell format cache
    pub cache_ttl_secs: u64,
    pub cache_prune_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:9091/transmission/rpc".to_string(),
            poll_interval_ms: 1000,
            torrent_sort_column: TorrentSortColumn::default(),
            torrent_sort_direction: SortDirection::default(),
            peer_sort_column: PeerSortColumn::default(),
            peer_sort_direction: SortDirection::default(),
            mark_symbol: "*".to_string(),
            size_unit: DataUnit::Byte,
            size_prefix: PrefixFamily::Binary,
            rate_unit: DataUnit::Byte,
            rate_prefix: PrefixFamily::Metric,
            cache_ttl_secs: 600,
            cache_prune_interval_secs: 60,
        }
    }
}

/// Single source of truth for app directories.
pub fn get_app_paths() -> Option<(PathBuf, PathBuf)> {
    if let Some(proj_dirs) = ProjectDirs::from("com", "github", "tidemark") {
        let config_dir = proj_dirs.config_dir().to_path_buf();
        let data_dir = proj_dirs.data_local_dir().to_path_buf();

        fs::create_dir_all(&config_dir).ok()?;
        fs::create_dir_all(&data_dir).ok()?;

        Some((config_dir, data_dir))
    } else {
        None
    }
}

pub fn load_settings() -> Settings {
    if let Some((config_dir, _)) = get_app_paths() {
        return load_settings_from(&config_dir.join("settings.toml"));
    }

    // Fallback if we can't even determine the application paths.
    Settings::default()
}

pub fn load_settings_from(config_file_path: &Path) -> Settings {
    Figment::new()
        .merge(Toml::file(config_file_path))
        .merge(Env::prefixed("TIDEMARK_"))
        .extract()
        .unwrap_or_default()
}

/// Saves the provided settings to the config file.
pub fn save_settings(settings: &Settings) -> io::Result<()> {
    if let Some((config_dir, _)) = get_app_paths() {
        let config_file_path = config_dir.join("settings.toml");
        let temp_file_path = config_dir.join("settings.toml.tmp");
        let content = toml::to_string_pretty(settings).map_err(io::Error::other)?;
        fs::write(&temp_file_path, content)?;
        fs::rename(&temp_file_path, &config_file_path)?;
    }
    Ok(())
}
