//! Link extraction from raw user input.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://\S+$").expect("valid regex"));

/// Extracts media links from whitespace-separated input.
///
/// Only tokens starting with `http://` or `https://` are kept; duplicates are
/// dropped while preserving first-seen order.
#[must_use]
pub fn extract_links(input: &str) -> Vec<String> {
    dedup_links(input).0
}

/// Like [`extract_links`], also returning how many repeated links were dropped.
#[must_use]
pub fn dedup_links(input: &str) -> (Vec<String>, usize) {
    let mut seen = HashSet::new();
    let mut dropped = 0;
    let links = input
        .split_whitespace()
        .filter(|token| is_link(token))
        .filter(|token| {
            let fresh = seen.insert(*token);
            if !fresh {
                dropped += 1;
            }
            fresh
        })
        .map(str::to_string)
        .collect();
    (links, dropped)
}

/// Returns `true` if `s` looks like an http(s) link.
#[must_use]
pub fn is_link(s: &str) -> bool {
    LINK_RE.is_match(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_http_links() {
        let links = extract_links(
            "https://youtu.be/abc ftp://host/file notalink http://example.com/v?id=1",
        );
        assert_eq!(
            links,
            vec!["https://youtu.be/abc", "http://example.com/v?id=1"]
        );
    }

    #[test]
    fn deduplicates_in_order() {
        let links = extract_links("https://a.test/1 https://b.test/2 https://a.test/1");
        assert_eq!(links, vec!["https://a.test/1", "https://b.test/2"]);
    }

    #[test]
    fn reports_dropped_duplicates() {
        let (links, dropped) =
            dedup_links("https://a.test/1 https://a.test/1 junk https://a.test/1 https://b.test/2");
        assert_eq!(links.len(), 2);
        assert_eq!(dropped, 2);
        assert_eq!(dedup_links("https://a.test/1").1, 0);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(extract_links("").is_empty());
        assert!(extract_links("   \n\t ").is_empty());
    }

    #[test]
    fn bare_scheme_is_not_a_link() {
        assert!(!is_link("https://"));
        assert!(is_link("https://x"));
    }
}
