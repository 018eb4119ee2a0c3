use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Attribute names looked up in every scraped block, whatever the caller
/// adds.
pub const DEFAULT_TARGETS: [&str; 3] = ["name", "region", "zone"];

/// A small list of attribute names, or fragments of names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetNames(Vec<String>);

impl TargetNames {
    /// The default set: `name`, `region`, `zone`.
    pub fn new() -> Self {
        Self(DEFAULT_TARGETS.iter().map(|s| s.to_string()).collect())
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Adds `name` unless it is already present.
    pub fn with(mut self, name: impl Into<String>) -> Self {
        self.push(name);
        self
    }

    pub fn push(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.0.contains(&name) {
            self.0.push(name);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if any entry is contained in `s`, ignoring case.
    pub fn matches(&self, s: &str) -> bool {
        let haystack = s.to_lowercase();
        self.0
            .iter()
            .any(|entry| haystack.contains(&entry.to_lowercase()))
    }
}

impl Default for TargetNames {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Into<String>> Extend<S> for TargetNames {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for name in iter {
            self.push(name);
        }
    }
}

impl<S: Into<String>> FromIterator<S> for TargetNames {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut names = Self::empty();
        names.extend(iter);
        names
    }
}

/// Collects `target = value` assignments from block text.
///
/// For every target the first line whose left-hand side (up to the first
/// `=`) contains the target wins; its trimmed right-hand side is stored as
/// found. Lines containing `#` anywhere are skipped. Targets without a match
/// are left out of the map.
///
/// [`DEFAULT_TARGETS`] are always scraped; `targets` adds to them.
pub fn scrape_attributes(text: &str, targets: &TargetNames) -> BTreeMap<String, String> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut attrs = BTreeMap::new();

    let mut names: Vec<&str> = DEFAULT_TARGETS.to_vec();
    for target in targets.iter() {
        if !names.contains(&target) {
            names.push(target);
        }
    }

    for target in names {
        let found = lines
            .iter()
            .filter(|line| !line.contains('#'))
            .filter_map(|line| line.split_once('='))
            .find(|(lhs, _)| lhs.contains(target));

        if let Some((_, rhs)) = found {
            attrs.insert(target.to_string(), rhs.trim().to_string());
        }
    }

    attrs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_targets() {
        let targets = TargetNames::default();
        assert_eq!(targets.iter().collect::<Vec<_>>(), vec!["name", "region", "zone"]);
    }

    #[test]
    fn test_with_skips_duplicates() {
        let targets = TargetNames::new().with("machine_type").with("name");
        assert_eq!(targets.len(), 4);
    }

    #[test]
    fn test_matches_is_case_insensitive_containment() {
        let targets: TargetNames = ["Compute", "sql"].into_iter().collect();
        assert!(targets.matches("google_compute_instance"));
        assert!(targets.matches("google_SQL_database"));
        assert!(!targets.matches("google_storage_bucket"));
        assert!(!TargetNames::empty().matches("anything"));
    }

    #[test]
    fn test_scrape_first_match_wins() {
        let text = "resource \"a\" \"b\" {\n  name = \"first\"\n  name = \"second\"\n}";
        let attrs = scrape_attributes(text, &TargetNames::new());
        assert_eq!(attrs.get("name").map(String::as_str), Some("\"first\""));
    }

    #[test]
    fn test_scrape_skips_comment_lines() {
        let text = "resource \"x\" \"y\" {\n  name = \"foo\"\n  region = \"us-east1\" # default\n}\n";
        let attrs = scrape_attributes(text, &TargetNames::new());

        assert_eq!(attrs.get("name").map(String::as_str), Some("\"foo\""));
        assert!(!attrs.contains_key("region"));
        assert!(!attrs.contains_key("zone"));
    }

    #[test]
    fn test_scrape_later_uncommented_line_matches() {
        let text = "{\n  # region = \"old\"\n  region = \"us-central1\"\n}";
        let attrs = scrape_attributes(text, &TargetNames::new());
        assert_eq!(attrs.get("region").map(String::as_str), Some("\"us-central1\""));
    }

    #[test]
    fn test_scrape_substring_of_left_hand_side() {
        let text = "{\n  display_name = \"shown\"\n  name = \"real\"\n}";
        let attrs = scrape_attributes(text, &TargetNames::new());
        assert_eq!(attrs.get("name").map(String::as_str), Some("\"shown\""));
    }

    #[test]
    fn test_scrape_is_case_sensitive() {
        let text = "{\n  Name = \"upper\"\n}";
        let attrs = scrape_attributes(text, &TargetNames::new());
        assert!(attrs.is_empty());
    }

    #[test]
    fn test_scrape_one_line_satisfies_several_targets() {
        let text = "{\n  region_zone = \"us-east1-b\"\n}";
        let attrs = scrape_attributes(text, &TargetNames::new());
        assert_eq!(attrs.get("region").map(String::as_str), Some("\"us-east1-b\""));
        assert_eq!(attrs.get("zone").map(String::as_str), Some("\"us-east1-b\""));
    }

    #[test]
    fn test_scrape_splits_on_first_equals_only() {
        let text = "{\n  name = var.env == \"prod\" ? \"a\" : \"b\"\n}";
        let attrs = scrape_attributes(text, &TargetNames::new());
        assert_eq!(
            attrs.get("name").map(String::as_str),
            Some("var.env == \"prod\" ? \"a\" : \"b\"")
        );
    }

    #[test]
    fn test_scrape_requires_equals_sign() {
        let text = "resource \"google_compute_network\" \"name\" {\n}";
        let attrs = scrape_attributes(text, &TargetNames::new());
        assert!(attrs.is_empty());
    }

    #[test]
    fn test_scrape_empty_right_hand_side() {
        let text = "{\n  zone =\n}";
        let attrs = scrape_attributes(text, &TargetNames::new());
        assert_eq!(attrs.get("zone").map(String::as_str), Some(""));
    }

    #[test]
    fn test_scrape_caller_targets() {
        let text = "{\n  machine_type = \"e2-small\"\n  name = \"vm\"\n}";
        let targets = TargetNames::new().with("machine_type");
        let attrs = scrape_attributes(text, &targets);

        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs["machine_type"], "\"e2-small\"");

        let only_custom: TargetNames = ["machine_type"].into_iter().collect();
        let attrs = scrape_attributes(text, &only_custom);
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs["name"], "\"vm\"");
        assert_eq!(attrs["machine_type"], "\"e2-small\"");
    }

    #[test]
    fn test_scrape_defaults_survive_empty_target_set() {
        let text = "{\n  name = \"vm-1\"\n  zone = \"z\"\n}";
        let attrs = scrape_attributes(text, &TargetNames::empty());

        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs["name"], "\"vm-1\"");
        assert_eq!(attrs["zone"], "\"z\"");
    }

    #[test]
    fn test_scrape_keeps_carriage_return_out_of_values() {
        let text = "resource \"a\" \"b\" {\r\n  name = \"crlf\"\r\n}\r";
        let attrs = scrape_attributes(text, &TargetNames::new());
        assert_eq!(attrs["name"], "\"crlf\"");
    }
}
