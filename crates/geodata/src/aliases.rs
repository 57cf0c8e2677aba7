//! Curated alias table for place names.
//!
//! Keys are the normalized ASCII base form produced by the resolver;
//! values are the known spellings to search for: native script with
//! diacritics, ASCII transliterations, and common abbreviations. The
//! station data mixes all of these, so a single normalized query has
//! to fan out to every variant.

/// Look up the alias set for a normalized base form.
pub fn alias_candidates(base: &str) -> Option<&'static [&'static str]> {
    let set: &'static [&'static str] = match base {
        // Vietnam
        "hanoi" => &["hà nội", "ha noi", "hanoi"],
        "ho chi minh" => &["hồ chí minh", "ho chi minh", "hcmc", "sài gòn", "saigon"],
        // Common diacritic variants
        "sao paulo" => &["são paulo", "sao paulo"],
        "bogota" => &["bogotá", "bogota"],
        "mexico city" => &["ciudad de méxico", "mexico city"],
        "belem" => &["belém", "belem"],
        "montreal" => &["montréal", "montreal"],
        _ => return None,
    };
    Some(set)
}
