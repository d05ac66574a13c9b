/// Width of the `=` rules framing command output
pub const RULE_WIDTH: usize = 80;

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// First `max_len` characters, without ellipsis
pub fn clip(s: &str, max_len: usize) -> String {
    s.chars().take(max_len).collect()
}

/// `2026-01-02T03:04:05.123Z` → `2026-01-02T03:04:05`
pub fn short_timestamp(date: &str) -> String {
    clip(date, 19)
}

/// Format an RFC 3339 timestamp for status lines
pub fn format_date(date: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        dt.format("%b %d, %Y %H:%M").to_string()
    } else {
        short_timestamp(date)
    }
}

pub fn rule(width: usize) -> String {
    "=".repeat(width)
}

/// Title framed by rules, preceded by a blank line
pub fn header(title: &str) -> String {
    format!("\n{}\n{}\n{}", rule(RULE_WIDTH), title, rule(RULE_WIDTH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("Überwachung", 6), "Übe...");
    }

    #[test]
    fn test_short_timestamp() {
        assert_eq!(short_timestamp("2026-01-02T03:04:05.123Z"), "2026-01-02T03:04:05");
        assert_eq!(short_timestamp(""), "");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2026-01-02T03:04:05Z"), "Jan 02, 2026 03:04");
        assert_eq!(format_date("not a date"), "not a date");
    }

    #[test]
    fn test_header() {
        let h = header("Agents");
        let lines: Vec<&str> = h.lines().collect();
        assert_eq!(lines[0], "");
        assert_eq!(lines[1].len(), RULE_WIDTH);
        assert_eq!(lines[2], "Agents");
    }
}
