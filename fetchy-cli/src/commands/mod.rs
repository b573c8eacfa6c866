//! CLI subcommands.

pub mod download;
pub mod info;

/// Format a byte count for display, e.g. `1.50 MB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

/// Format an optional size, showing `Unknown` when absent.
pub fn format_optional_size(bytes: Option<u64>) -> String {
    match bytes {
        Some(bytes) if bytes > 0 => format_size(bytes),
        _ => "Unknown".to_string(),
    }
}
