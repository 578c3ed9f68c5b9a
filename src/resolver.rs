//! Heading → theme resolution.
//!
//! Manuscript headings repeat the syllabus theme titles, but not always
//! verbatim. A heading resolves by exact normalized equality first and falls
//! back to the best token-overlap score when that score reaches
//! [`MATCH_THRESHOLD`].

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::models::ThemeLookup;
use crate::normalize::{normalize_text, score_name_match};

/// Minimum [`score_name_match`] for a fuzzy match to count.
pub const MATCH_THRESHOLD: f64 = 0.55;

/// A successful resolution.
#[derive(Debug, Clone, Copy)]
pub struct ThemeMatch<'a> {
    pub theme: &'a ThemeLookup,
    pub score: f64,
    pub exact: bool,
}

pub struct ThemeResolver {
    lookups: Vec<ThemeLookup>,
    normalized: Vec<String>,
    exact: HashMap<String, usize>,
}

fn ordinal_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\d+\.\s*").unwrap())
}

impl ThemeResolver {
    /// Lookups are sorted by slug so ties resolve the same way regardless of
    /// the order the store returned them in.
    pub fn new(mut lookups: Vec<ThemeLookup>) -> Self {
        lookups.sort_by(|a, b| a.slug.cmp(&b.slug));
        let normalized: Vec<String> = lookups.iter().map(|l| normalize_text(&l.title)).collect();
        let mut exact = HashMap::new();
        for (idx, key) in normalized.iter().enumerate() {
            exact.entry(key.clone()).or_insert(idx);
        }
        Self {
            lookups,
            normalized,
            exact,
        }
    }

    pub fn len(&self) -> usize {
        self.lookups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookups.is_empty()
    }

    pub fn resolve(&self, heading: &str) -> Option<&ThemeLookup> {
        self.resolve_scored(heading).map(|m| m.theme)
    }

    pub fn resolve_scored(&self, heading: &str) -> Option<ThemeMatch<'_>> {
        let stripped = ordinal_prefix_re().replace(heading, "");
        let key = normalize_text(&stripped);
        if key.is_empty() {
            return None;
        }

        if let Some(&idx) = self.exact.get(&key) {
            return Some(ThemeMatch {
                theme: &self.lookups[idx],
                score: 1.0,
                exact: true,
            });
        }

        let mut best: Option<(usize, f64)> = None;
        for (idx, candidate) in self.normalized.iter().enumerate() {
            let score = score_name_match(&key, candidate);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((idx, score));
            }
        }

        match best {
            Some((idx, score)) if score >= MATCH_THRESHOLD => Some(ThemeMatch {
                theme: &self.lookups[idx],
                score,
                exact: false,
            }),
            _ => None,
        }
    }
}
