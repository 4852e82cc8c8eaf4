//! Human-readable number formatting

/// Format a count with a K/M/G/T suffix
pub fn format_count(count: u64) -> String {
    if count >= 1_000_000_000_000 {
        format!("{:.2}T", count as f64 / 1e12)
    } else if count >= 1_000_000_000 {
        format!("{:.2}G", count as f64 / 1e9)
    } else if count >= 1_000_000 {
        format!("{:.2}M", count as f64 / 1e6)
    } else if count >= 1000 {
        format!("{:.2}K", count as f64 / 1e3)
    } else {
        format!("{}", count)
    }
}

/// Format a per-second rate, e.g. `12.50 Mcheck/s`
pub fn format_rate(per_second: f64) -> String {
    if per_second >= 1e9 {
        format!("{:.2} Gcheck/s", per_second / 1e9)
    } else if per_second >= 1e6 {
        format!("{:.2} Mcheck/s", per_second / 1e6)
    } else if per_second >= 1e3 {
        format!("{:.2} Kcheck/s", per_second / 1e3)
    } else {
        format!("{:.0} check/s", per_second)
    }
}

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    if seconds < 1.0 {
        format!("{:.0}ms", seconds * 1000.0)
    } else if seconds < 60.0 {
        format!("{:.1}s", seconds)
    } else if seconds < 3600.0 {
        format!("{:.1}m", seconds / 60.0)
    } else {
        format!("{:.1}h", seconds / 3600.0)
    }
}
