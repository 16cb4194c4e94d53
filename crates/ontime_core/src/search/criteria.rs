//! Search criteria construction and matching.
//!
//! # Invariants
//! - A criteria built from raw input always carries a non-blank term; blank
//!   or missing input yields `None` so callers route to unfiltered views.
//! - Matching is a case-insensitive substring test over Unicode lowercase.
//! - Internal whitespace runs in a term collapse to a single space.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Search term applied to appointment objective/reason/additional info.
///
/// `Default` is the empty term, which degenerates to plain classification
/// filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchCriteria {
    term: String,
}

impl SearchCriteria {
    /// Builds criteria from a raw query string.
    ///
    /// Returns `None` for `None`, empty or whitespace-only input.
    pub fn from_query(raw: Option<&str>) -> Option<Self> {
        normalize_term(raw?).map(|term| Self { term })
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn is_empty(&self) -> bool {
        self.term.is_empty()
    }

    /// Returns whether any field contains the term. Empty terms match all.
    pub fn matches(&self, fields: &[Option<&str>]) -> bool {
        term_matches(&self.term, fields)
    }
}

/// Search term applied to audit snapshots, including the classification name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditSearchCriteria {
    term: String,
}

impl AuditSearchCriteria {
    /// Builds criteria from a raw query string.
    ///
    /// Returns `None` for `None`, empty or whitespace-only input.
    pub fn from_query(raw: Option<&str>) -> Option<Self> {
        normalize_term(raw?).map(|term| Self { term })
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn matches(&self, fields: &[Option<&str>]) -> bool {
        term_matches(&self.term, fields)
    }
}

fn normalize_term(raw: &str) -> Option<String> {
    let collapsed = WHITESPACE_RE.replace_all(raw.trim(), " ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed.into_owned())
    }
}

fn term_matches(term: &str, fields: &[Option<&str>]) -> bool {
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    fields
        .iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(needle.as_str()))
}

#[cfg(test)]
mod tests {
    use super::{AuditSearchCriteria, SearchCriteria};

    #[test]
    fn blank_input_yields_no_criteria() {
        assert!(SearchCriteria::from_query(None).is_none());
        assert!(SearchCriteria::from_query(Some("")).is_none());
        assert!(SearchCriteria::from_query(Some(" \t\n")).is_none());
        assert!(AuditSearchCriteria::from_query(Some("   ")).is_none());
    }

    #[test]
    fn term_is_trimmed_and_whitespace_collapsed() {
        let criteria = SearchCriteria::from_query(Some("  dentist \t check ")).unwrap();
        assert_eq!(criteria.term(), "dentist check");
    }

    #[test]
    fn matching_is_case_insensitive_across_fields() {
        let criteria = SearchCriteria::from_query(Some("ÉCOLE")).unwrap();
        assert!(criteria.matches(&[Some("visit"), None, Some("rendez-vous à l'école")]));
        assert!(!criteria.matches(&[Some("visit"), None, None]));
    }

    #[test]
    fn default_criteria_matches_everything() {
        let criteria = SearchCriteria::default();
        assert!(criteria.is_empty());
        assert!(criteria.matches(&[None]));
    }

    #[test]
    fn audit_criteria_matches_classification_field() {
        let criteria = AuditSearchCriteria::from_query(Some("missed")).unwrap();
        assert!(criteria.matches(&[Some("O1"), None, None, Some("Missed")]));
    }
}
