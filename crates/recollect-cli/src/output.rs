use chrono::{DateTime, Utc};

#[derive(Clone, Copy, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Shorten to at most `max_chars` chars, ending in `...` when cut
pub fn truncate_string(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}

/// Collapse newlines so multi-line text fits one table cell
pub fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_truncate_short_string_unchanged() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("0123456789", 10), "0123456789");
    }

    #[test]
    fn test_truncate_long_string() {
        assert_eq!(truncate_string("0123456789abc", 10), "0123456...");
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate_string("日本語のテキストです", 6), "日本語...");
    }

    #[test]
    fn test_format_timestamp() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 59).unwrap();
        assert_eq!(format_timestamp(&dt), "2024-03-09 14:05");
    }

    #[test]
    fn test_single_line() {
        assert_eq!(single_line("- one\n- two\n\n- three"), "- one - two - three");
    }
}
