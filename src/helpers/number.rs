//! Number helper functions

/// Format a view count with abbreviations: 1234 -> "1.2K", 1234567 -> "1.2M"
pub fn format_view_count(count: u64) -> String {
    if count >= 1_000_000 {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}K", count as f64 / 1_000.0)
    } else {
        count.to_string()
    }
}
