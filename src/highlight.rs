use regex::{Regex, RegexBuilder};

use crate::search::NoteFilter;

/// Case-insensitive regex for the filter's needle, for marking matches in
/// note titles. `None` when the filter is inactive.
pub fn build_highlight_regex(filter: &NoteFilter) -> Option<Regex> {
    let needle = filter.needle()?;
    RegexBuilder::new(&regex::escape(needle))
        .case_insensitive(true)
        .build()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_filter_builds_nothing() {
        assert!(build_highlight_regex(&NoteFilter::parse(Some("  "))).is_none());
    }

    #[test]
    fn metacharacters_are_literal() {
        let regex = build_highlight_regex(&NoteFilter::parse(Some("v1.0 (draft)"))).expect("regex");
        assert!(regex.is_match("Plan V1.0 (Draft)"));
        assert!(!regex.is_match("v100 draft"));
    }

    #[test]
    fn matches_any_case() {
        let regex = build_highlight_regex(&NoteFilter::parse(Some("WEL"))).expect("regex");
        let matches: Vec<_> = regex.find_iter("Welcome, farewell").map(|m| m.as_str()).collect();
        assert_eq!(matches, vec!["Wel", "wel"]);
    }
}
