// SPDX-FileCopyrightText: 2025 The tidemark Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Small display helpers for list cells.

/// Render a remaining-time estimate. Negative means unknown, zero means
/// the torrent is done.
pub fn format_eta(seconds: i64) -> String {
    if seconds < 0 {
        return "?".to_string();
    }
    if seconds == 0 {
        return "Done".to_string();
    }

    let mut secs = seconds as u64;

    let days = secs / (24 * 3600);
    secs %= 24 * 3600;
    let hours = secs / 3600;
    secs %= 3600;
    let minutes = secs / 60;
    let seconds = secs % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 && days == 0 {
        // Only show minutes if not showing days
        parts.push(format!("{}m", minutes));
    }
    if seconds > 0 && days == 0 && hours == 0 {
        // Only show seconds if very short
        parts.push(format!("{}s", seconds));
    }

    if parts.is_empty() {
        "Done".to_string()
    } else {
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_eta() {
        assert_eq!(format_eta(-1), "?");
        assert_eq!(format_eta(0), "Done");
        assert_eq!(format_eta(42), "42s");
        assert_eq!(format_eta(90), "1m 30s");
        assert_eq!(format_eta(3600), "1h");
        assert_eq!(format_eta(2 * 24 * 3600 + 3600), "2d 1h");
    }
}
