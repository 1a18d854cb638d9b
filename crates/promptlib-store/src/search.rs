//! Client-side filtering and ordering of a prompt snapshot.

use std::cmp::Reverse;

use crate::model::Prompt;

/// Filter options for searching prompts.
#[derive(Debug, Default, Clone)]
pub struct PromptFilter {
    /// Case-insensitive substring matched against text and tags. Empty matches all.
    pub query: String,
    /// Exact modality to require. `None` or an empty string imposes no constraint.
    pub modality: Option<String>,
}

impl PromptFilter {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            modality: None,
        }
    }

    pub fn with_modality(mut self, modality: impl Into<String>) -> Self {
        self.modality = Some(modality.into());
        self
    }

    /// Build a filter from the two raw inputs of the search box and modality dropdown.
    pub fn from_inputs(query: &str, modality: &str) -> Self {
        let modality = (!modality.is_empty()).then(|| modality.to_string());
        Self {
            query: query.to_string(),
            modality,
        }
    }

    fn modality(&self) -> Option<&str> {
        self.modality.as_deref().filter(|m| !m.is_empty())
    }

    pub fn matches(&self, prompt: &Prompt) -> bool {
        self.matches_lowercase(prompt, &self.query.to_lowercase())
    }

    fn matches_lowercase(&self, prompt: &Prompt, needle: &str) -> bool {
        if let Some(modality) = self.modality() {
            if prompt.modality != modality {
                return false;
            }
        }

        prompt.contains_lowercase(needle)
    }

    /// Keep matching prompts, newest first. Ties keep their collection order.
    pub fn apply(&self, prompts: Vec<Prompt>) -> Vec<Prompt> {
        let needle = self.query.to_lowercase();
        let mut matched: Vec<Prompt> = prompts
            .into_iter()
            .filter(|p| self.matches_lowercase(p, &needle))
            .collect();

        sort_newest_first(&mut matched);
        matched
    }
}

/// Stable sort by timestamp descending. Unreadable timestamps go last.
pub fn sort_newest_first(prompts: &mut [Prompt]) {
    prompts.sort_by_cached_key(|p| Reverse(p.created_at()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::format_timestamp;
    use chrono::{TimeZone, Utc};

    fn prompt(id: &str, text: &str, modality: &str, tags: &[&str], minute: u32) -> Prompt {
        Prompt {
            id: id.to_string(),
            text: text.to_string(),
            modality: modality.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            timestamp: format_timestamp(Utc.with_ymd_and_hms(2025, 1, 1, 12, minute, 0).unwrap()),
        }
    }

    fn ids(prompts: &[Prompt]) -> Vec<&str> {
        prompts.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_empty_filter_sorts_newest_first() {
        let prompts = vec![
            prompt("t1", "one", "text", &[], 1),
            prompt("t3", "three", "text", &[], 3),
            prompt("t2", "two", "image", &[], 2),
        ];

        let result = PromptFilter::default().apply(prompts);
        assert_eq!(ids(&result), vec!["t3", "t2", "t1"]);
    }

    #[test]
    fn test_equal_timestamps_keep_collection_order() {
        let prompts = vec![
            prompt("a", "x", "text", &[], 5),
            prompt("b", "x", "text", &[], 5),
            prompt("c", "x", "text", &[], 7),
            prompt("d", "x", "text", &[], 5),
        ];

        let result = PromptFilter::new("x").apply(prompts);
        assert_eq!(ids(&result), vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn test_modality_filter_is_exact() {
        let prompts = vec![
            prompt("a", "draw a cat", "image", &[], 1),
            prompt("b", "draw a dog", "text", &[], 2),
            prompt("c", "draw a bird", "Image", &[], 3),
        ];

        let result = PromptFilter::new("draw").with_modality("image").apply(prompts);
        assert_eq!(ids(&result), vec!["a"]);
    }

    #[test]
    fn test_from_inputs_treats_empty_modality_as_unset() {
        let filter = PromptFilter::from_inputs("Cat", "");
        assert!(filter.modality.is_none());

        let p = prompt("a", "a CAT sat", "image", &[], 1);
        assert!(filter.matches(&p));
    }

    #[test]
    fn test_tag_match_is_case_insensitive() {
        let p = prompt("a", "fix the build", "text", &["Urgent"], 1);

        assert!(PromptFilter::new("urgent").matches(&p));
        assert!(PromptFilter::new("URG").matches(&p));
        assert!(!PromptFilter::new("later").matches(&p));
    }

    #[test]
    fn test_unreadable_timestamps_sort_last_in_order() {
        let mut odd_a = prompt("odd-a", "x", "text", &[], 0);
        odd_a.timestamp = "not a date".to_string();
        let mut odd_b = prompt("odd-b", "x", "text", &[], 0);
        odd_b.timestamp = String::new();
        let mut date_only = prompt("day", "x", "text", &[], 0);
        date_only.timestamp = "2025-01-02".to_string();

        let prompts = vec![
            odd_a,
            prompt("t1", "x", "text", &[], 1),
            odd_b,
            date_only,
        ];

        let result = PromptFilter::default().apply(prompts);
        assert_eq!(ids(&result), vec!["day", "t1", "odd-a", "odd-b"]);
    }
}
