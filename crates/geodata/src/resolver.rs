//! Entity resolver: turns free-text place queries into structured
//! [`PlaceQuery`] values the adapter can search with.
//!
//! Handles the messy reality of user-typed place names: diacritics
//! ("Hà Nội" vs "Hanoi"), parenthetical country hints ("… (Vietnam)"),
//! aliases/abbreviations ("HCMC"), and punctuation-heavy street
//! addresses that only match station text loosely.

use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use aqm_domain::place::PlaceQuery;

use crate::aliases::alias_candidates;

/// Minimum alnum length before the loose wildcard pattern is usable;
/// shorter patterns match far too widely.
pub const MIN_LOOSE_LEN: usize = 3;

pub struct PlaceResolver {
    /// Trailing `"(Country)"` hint, e.g. `"Hanoi (Vietnam)"`.
    paren_hint: Regex,
}

impl Default for PlaceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaceResolver {
    pub fn new() -> Self {
        Self {
            // Static pattern, cannot fail to compile.
            paren_hint: Regex::new(r"\(([^)]+)\)\s*$").unwrap(),
        }
    }

    /// Resolve a raw query. Never fails: empty input yields a query
    /// with no candidates, which the adapter short-circuits.
    pub fn resolve(&self, raw: &str) -> PlaceQuery {
        let raw = raw.trim();
        if raw.is_empty() {
            return PlaceQuery {
                raw_text: String::new(),
                country_hint: None,
                normalized_base: String::new(),
                candidates: Vec::new(),
                loose_pattern: String::new(),
            };
        }

        let country_hint = self
            .paren_hint
            .captures(raw)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty());
        let without_paren = self.paren_hint.replace(raw, "").trim().to_string();

        let normalized_base = normalize_ascii_base(&without_paren);
        let loose_pattern = loose_pattern(&normalized_base);

        let candidates = match alias_candidates(&normalized_base) {
            Some(set) => set.iter().map(|s| (*s).to_string()).collect(),
            None => vec![without_paren.clone(), normalized_base.clone()],
        };

        PlaceQuery {
            raw_text: raw.to_string(),
            country_hint,
            normalized_base,
            candidates,
            loose_pattern,
        }
    }
}

/// Lowercase, NFKD-decompose, drop combining marks, collapse whitespace.
fn normalize_ascii_base(text: &str) -> String {
    let stripped: String = text
        .to_lowercase()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep only ASCII letters/digits, then interleave `%` between every
/// character: `"so 46, pho"` becomes `"s%o%4%6%p%h%o"`. Tolerant to
/// missing punctuation and diacritics in station/address text. Empty
/// when fewer than [`MIN_LOOSE_LEN`] characters survive.
fn loose_pattern(base: &str) -> String {
    let alnum: Vec<char> = base.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    if alnum.len() < MIN_LOOSE_LEN {
        return String::new();
    }
    let mut pattern = String::with_capacity(alnum.len() * 2);
    for (i, c) in alnum.iter().enumerate() {
        if i > 0 {
            pattern.push('%');
        }
        pattern.push(*c);
    }
    pattern
}
