//! The prompt record and the parsing rules applied when one is created.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A stored prompt.
///
/// `timestamp` is kept exactly as stored. Records imported from older
/// installs may carry dates in other shapes, so it is only parsed when
/// ordering, see [`Prompt::created_at`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    pub text: String,
    pub modality: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub timestamp: String,
}

impl Prompt {
    /// Creation time, if the stored timestamp can be read as a date.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }

    /// True if `needle` (already lower-cased) occurs in the text or any tag.
    pub fn contains_lowercase(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }

        self.text.to_lowercase().contains(needle)
            || self.tags.iter().any(|tag| tag.to_lowercase().contains(needle))
    }

    /// Shortened single-line text for list views.
    pub fn preview(&self, max_chars: usize) -> String {
        let flat: String = self
            .text
            .chars()
            .map(|c| if c.is_whitespace() { ' ' } else { c })
            .collect();

        if flat.chars().count() > max_chars {
            let cut: String = flat.chars().take(max_chars).collect();
            format!("{}...", cut.trim_end())
        } else {
            flat
        }
    }
}

/// Timestamp string for a prompt created at `at`, e.g. `2024-05-01T08:00:00.000Z`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Read a stored timestamp.
///
/// Accepts RFC 3339 with any offset, a date and time without offset (taken
/// as UTC), or a bare date (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(at.and_utc());
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M") {
        return Some(at.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|at| at.and_utc())
}

/// Split a comma-separated tag string, trimming each piece and dropping blanks.
///
/// Order and duplicates are preserved.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(text: &str, tags: &[&str]) -> Prompt {
        Prompt {
            id: "p-1".to_string(),
            text: text.to_string(),
            modality: "text".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            timestamp: format_timestamp(Utc::now()),
        }
    }

    #[test]
    fn test_parse_tags_drops_blanks_and_keeps_duplicates() {
        assert_eq!(parse_tags(" a ,, b ,b"), vec!["a", "b", "b"]);
    }

    #[test]
    fn test_parse_tags_empty_input() {
        assert!(parse_tags("").is_empty());
        assert!(parse_tags(" , ,  ").is_empty());
    }

    #[test]
    fn test_contains_matches_text_or_tag() {
        let p = prompt("Summarize this article", &["Urgent", "news"]);

        assert!(p.contains_lowercase("summar"));
        assert!(p.contains_lowercase("urgent"));
        assert!(p.contains_lowercase(""));
        assert!(!p.contains_lowercase("image"));
    }

    #[test]
    fn test_preview_truncates_and_flattens() {
        let p = prompt("line one\nline two is longer", &[]);

        assert_eq!(p.preview(100), "line one line two is longer");
        assert_eq!(p.preview(8), "line one...");
    }

    #[test]
    fn test_deserialize_legacy_record() {
        // Records written by the browser extension use millisecond ids and ISO timestamps.
        let json = r#"{"text":"hi","modality":"image","tags":["x"],"timestamp":"2024-03-01T10:15:30.123Z","id":"1709288130123"}"#;
        let p: Prompt = serde_json::from_str(json).unwrap();

        assert_eq!(p.id, "1709288130123");
        assert_eq!(p.modality, "image");
        assert_eq!(p.tags, vec!["x"]);
    }

    #[test]
    fn test_format_timestamp_uses_millis_and_z() {
        let at = chrono::TimeZone::with_ymd_and_hms(&Utc, 2024, 5, 1, 8, 0, 0).unwrap();
        assert_eq!(format_timestamp(at), "2024-05-01T08:00:00.000Z");
    }

    #[test]
    fn test_parse_timestamp_shapes() {
        let midnight = parse_timestamp("2024-05-01T00:00:00.000Z").unwrap();

        assert_eq!(parse_timestamp("2024-05-01"), Some(midnight));
        assert_eq!(parse_timestamp("2024-05-01T02:00:00+02:00"), Some(midnight));
        assert_eq!(parse_timestamp("2024-05-01T00:00:00"), Some(midnight));
        assert_eq!(parse_timestamp("2024-05-01T00:00"), Some(midnight));
        assert_eq!(parse_timestamp(" 2024-05-01 "), Some(midnight));

        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("last tuesday").is_none());
    }

    #[test]
    fn test_odd_timestamp_still_deserializes() {
        let json = r#"{"text":"hi","modality":"text","timestamp":"sometime","id":"7"}"#;
        let p: Prompt = serde_json::from_str(json).unwrap();

        assert_eq!(p.timestamp, "sometime");
        assert!(p.created_at().is_none());

        let missing: Prompt =
            serde_json::from_str(r#"{"text":"hi","modality":"text","id":"8"}"#).unwrap();
        assert_eq!(missing.timestamp, "");
    }
}
