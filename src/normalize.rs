//! Text normalization primitives shared by the curriculum parser, the theme
//! resolver and the note assembler.
//!
//! Two flavours of cleanup exist side by side:
//!
//! - [`normalize_text`] / [`slugify`] fold diacritics and case and are used
//!   for identity (slugs, lookup keys, fuzzy matching).
//! - [`clean_line`] only collapses whitespace and is used for display text.

use std::collections::HashSet;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Fold `s` to lowercase ASCII words separated by single spaces.
///
/// Diacritics are removed by NFD decomposition followed by dropping the
/// combining marks, so `"Pravdepodobnosť"` becomes `"pravdepodobnost"`.
/// Every run of characters outside `[a-z0-9]` turns into one space.
pub fn normalize_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_space = false;

    for c in s.nfd().filter(|c| !is_combining_mark(*c)) {
        let mut emitted = false;
        for lower in c.to_lowercase() {
            if lower.is_ascii_lowercase() || lower.is_ascii_digit() {
                if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
                out.push(lower);
                emitted = true;
            }
        }
        if !emitted {
            pending_space = true;
        }
    }

    out
}

/// URL-safe identifier derived from [`normalize_text`].
pub fn slugify(s: &str) -> String {
    let normalized = normalize_text(s);
    let mut slug = String::with_capacity(normalized.len());
    for c in normalized.chars() {
        if c == ' ' || c == '-' {
            if !slug.ends_with('-') {
                slug.push('-');
            }
        } else {
            slug.push(c);
        }
    }
    slug.trim_matches('-').to_string()
}

/// Collapse whitespace runs to a single space and trim. Case and
/// punctuation are preserved.
pub fn clean_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Token-overlap similarity of two pre-normalized strings.
///
/// Returns `1.0` for identical inputs, otherwise
/// `|A ∩ B| / max(|A|, |B|)` over the whitespace-delimited token sets.
pub fn score_name_match(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let a_tokens: HashSet<&str> = a.split_whitespace().collect();
    let b_tokens: HashSet<&str> = b.split_whitespace().collect();
    if a_tokens.is_empty() || b_tokens.is_empty() {
        return 0.0;
    }

    let shared = a_tokens.intersection(&b_tokens).count();
    shared as f64 / a_tokens.len().max(b_tokens.len()) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_diacritics_and_punctuation() {
        assert_eq!(
            normalize_text("  Základy matematickej logiky: výroky!  "),
            "zaklady matematickej logiky vyroky"
        );
        assert_eq!(normalize_text("Ľubovoľná FUNKCIA-2"), "lubovolna funkcia 2");
        assert_eq!(normalize_text("---"), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        for s in [
            "Pravdepodobnosť a štatistika",
            "1. Funkcia [pojem funkcie, inverzná funkcia]",
            "  \t\n",
            "Ärger über Öl",
        ] {
            let once = normalize_text(s);
            assert_eq!(normalize_text(&once), once, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn slugify_ignores_diacritics_and_case() {
        assert_eq!(slugify("Pravdepodobnosť"), slugify("pravdepodobnost"));
        assert_eq!(slugify("Pravdepodobnosť"), "pravdepodobnost");
        assert_eq!(slugify(" Lineárna -- algebra "), "linearna-algebra");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn clean_line_keeps_case_and_punctuation() {
        assert_eq!(clean_line("  Funkcia\t[pojem,   graf]  "), "Funkcia [pojem, graf]");
        assert_eq!(clean_line(""), "");
    }

    #[test]
    fn score_bounds() {
        assert_eq!(score_name_match("funkcia", "funkcia"), 1.0);
        assert_eq!(score_name_match("a b", "c d"), 0.0);
        assert_eq!(score_name_match("", "a"), 0.0);
        assert_eq!(score_name_match("a b c d", "a b"), 0.5);
        let s = score_name_match("zaklady logiky", "zaklady matematickej logiky");
        assert!((s - 2.0 / 3.0).abs() < 1e-9);
        assert!((0.0..=1.0).contains(&s));
    }
}
