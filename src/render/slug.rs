//! Anchor slugs for heading ids and `[[#heading]]` wikilinks.
//!
//! Both sides use the same rule so in-page links always land: lower-case,
//! strip everything that is neither word character nor whitespace, collapse
//! whitespace runs to single hyphens.

use std::collections::HashMap;

/// Derive the anchor slug for a heading or wikilink target.
pub(crate) fn anchor_slug(text: &str) -> String {
    let lowered = text.to_lowercase();
    let filtered: String = lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    filtered.split_whitespace().collect::<Vec<_>>().join("-")
}

/// Deterministically generate unique anchor slugs within a single document.
///
/// Headings processed in order receive monotonic suffixes on duplicates
/// (`section`, `section-2`, `section-3`). Wikilinks resolve against the
/// unsuffixed form, i.e. the first occurrence.
#[derive(Default, Debug)]
pub(crate) struct AnchorSlugger {
    occurrences: HashMap<String, usize>,
}

impl AnchorSlugger {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn anchor_for(&mut self, text: &str) -> String {
        let base = anchor_slug(text);
        let base = if base.is_empty() {
            "section".to_string()
        } else {
            base
        };
        let count = self.occurrences.entry(base.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            base
        } else {
            format!("{base}-{count}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_lowercase_and_hyphenate() {
        assert_eq!(anchor_slug("My  Heading!"), "my-heading");
        assert_eq!(anchor_slug("Design & Review"), "design-review");
    }

    #[test]
    fn duplicate_headings_get_suffixes() {
        let mut slugger = AnchorSlugger::new();
        assert_eq!(slugger.anchor_for("Setup"), "setup");
        assert_eq!(slugger.anchor_for("Setup"), "setup-2");
        assert_eq!(slugger.anchor_for("Setup"), "setup-3");
    }

    #[test]
    fn symbol_only_headings_fall_back() {
        let mut slugger = AnchorSlugger::new();
        assert_eq!(slugger.anchor_for("!!!"), "section");
    }
}
