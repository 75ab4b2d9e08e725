//! Shared utility functions used across multiple modules.

use chrono::{DateTime, Utc};

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Trim every tag and drop the blank ones, preserving order and duplicates.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .filter_map(|tag| normalize_text_option(Some(tag)))
        .collect()
}

/// Case-folded title and content that search patterns are matched against.
///
/// The two parts are joined with a unit separator so a pattern cannot match
/// across the boundary.
pub fn search_text(title: &str, content: &str) -> String {
    let mut text = title.to_lowercase();
    text.push('\u{1f}');
    text.push_str(&content.to_lowercase());
    text
}

/// Current time truncated to the millisecond precision the store keeps.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// Check if a database URL uses a scheme libSQL can replicate from.
pub fn is_remote_database_url(value: &str) -> bool {
    ["libsql://", "https://", "http://"]
        .iter()
        .any(|scheme| value.starts_with(scheme))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_option_rejects_empty() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some("   ".to_string())), None);
    }

    #[test]
    fn normalize_text_option_trims_value() {
        assert_eq!(
            normalize_text_option(Some(" work ".to_string())),
            Some("work".to_string())
        );
    }

    #[test]
    fn normalize_tags_keeps_order_and_duplicates() {
        let tags = vec![
            "b".to_string(),
            " a ".to_string(),
            String::new(),
            "b".to_string(),
        ];
        assert_eq!(normalize_tags(tags), vec!["b", "a", "b"]);
    }

    #[test]
    fn search_text_folds_unicode_case() {
        assert_eq!(search_text("Été à Paris", "ÇA VA"), "été à paris\u{1f}ça va");
    }

    #[test]
    fn now_millis_has_no_sub_millisecond_part() {
        let now = now_millis();
        assert_eq!(now.timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn remote_database_url_accepts_known_schemes() {
        assert!(is_remote_database_url("libsql://notes.turso.io"));
        assert!(is_remote_database_url("https://notes.turso.io"));
        assert!(!is_remote_database_url("notes.db"));
    }
}
