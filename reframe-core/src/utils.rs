//! Formatting helpers for log and CLI output.

/// Formats seconds as HH:MM:SS (e.g., 3725.0 -> "01:02:05"). Returns "??:??:??" for invalid inputs.
#[must_use]
pub fn format_duration(seconds: f64) -> String {
    if seconds < 0.0 || !seconds.is_finite() {
        return "??:??:??".to_string();
    }

    let total = seconds as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// Formats a bitrate in bits per second. The unknown sentinel (any negative
/// value) prints as "unknown".
#[must_use]
pub fn format_bitrate(bits_per_second: i64) -> String {
    match bits_per_second {
        b if b < 0 => "unknown".to_string(),
        b if b >= 1_000_000 => format!("{:.2} Mb/s", b as f64 / 1_000_000.0),
        b if b >= 1_000 => format!("{:.0} kb/s", b as f64 / 1_000.0),
        b => format!("{b} b/s"),
    }
}
