// SPDX-FileCopyrightText: 2025 The tidemark Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

mod app;
mod client;
mod command;
mod config;
mod theme;
mod tui;
mod units;

use std::env;
use std::fs;
use std::fs::File;
use std::io::stdout;
use std::path::PathBuf;

use clap::Parser;
use fs2::FileExt;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*};

use app::App;

const DEFAULT_LOG_FILTER: LevelFilter = LevelFilter::INFO;

#[derive(Parser, Debug)]
#[command(name = "tidemark", version, about = "Terminal frontend for a torrent daemon")]
struct Cli {
    /// Path to an alternate settings.toml.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let base_data_dir = config::get_app_paths()
        .map(|(_, data_dir)| data_dir)
        .unwrap_or_else(|| env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    let log_dir = base_data_dir.join("logs");
    let general_log = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(31)
        .filename_prefix("app")
        .filename_suffix("log")
        .build(&log_dir)
        .expect("Failed to initialize rolling file appender");
    let (non_blocking_general, _guard_general) = tracing_appender::non_blocking(general_log);
    let _subscriber_result = {
        if fs::create_dir_all(&log_dir).is_ok() {
            let quiet_filter = Targets::new().with_default(DEFAULT_LOG_FILTER);

            let general_layer = fmt::layer()
                .with_writer(non_blocking_general)
                .with_ansi(false)
                .with_filter(quiet_filter);

            tracing_subscriber::registry()
                .with(general_layer)
                .try_init()
        } else {
            tracing_subscriber::registry().try_init()
        }
    };

    tracing::info!("STARTING TIDEMARK");

    let cli = Cli::parse();

    let mut _lock_file_handle: Option<File> = None;
    let lock_path = base_data_dir.join("tidemark.lock");
    if let Ok(file) = File::create(&lock_path) {
        if file.try_lock_exclusive().is_ok() {
            _lock_file_handle = Some(file);
        } else {
            println!("tidemark is already running.");
            return Ok(());
        }
    }

    let settings = match &cli.config {
        Some(path) => config::load_settings_from(path),
        None => config::load_settings(),
    };

    // First run: write the defaults out so users have a file to edit.
    if cli.config.is_none() {
        if let Some((config_dir, _)) = config::get_app_paths() {
            if !config_dir.join("settings.toml").exists() {
                if let Err(e) = config::save_settings(&settings) {
                    tracing::warn!("Failed to write initial settings file: {}", e);
                }
            }
        }
    }

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = cleanup_terminal();
        original_hook(panic_info);
    }));

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (client_handle, client_events, driver) = client::channel(100);
    tokio::spawn(driver.run());

    let mut app = App::new(settings, client_handle, client_events)?;
    if let Err(e) = app.run(&mut terminal).await {
        eprintln!("[Error] Application failed: {}", e);
    }

    cleanup_terminal()?;

    Ok(())
}

fn cleanup_terminal() -> Result<(), Box<dyn std::error::Error>> {
    disable_raw_mode()?;
    execute!(stdout(), LeaveAlternateScreen)?;
    Ok(())
}
