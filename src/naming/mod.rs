// src/naming/mod.rs
pub mod ident;

pub use ident::{column_identifier, quote_ident, relation_name, series_file_stem};

use std::collections::BTreeMap;
use tracing::debug;

/// The upper-case characters of `name`, in order.
pub fn acronym(name: &str) -> String {
    name.chars().filter(|c| c.is_uppercase()).collect()
}

/// Acronyms handed out during one run, each mapped to the name it was derived
/// from. Owned by the caller; nothing here is global.
#[derive(Debug, Default, Clone)]
pub struct AcronymRegistry {
    used: BTreeMap<String, String>,
}

impl AcronymRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive an acronym for `name` that no earlier call has returned, record it
    /// and return it.
    ///
    /// On collision the lower-case letters of `name` are tried in order, each
    /// inserted into the acronym at its own index in `name` (clamped to the
    /// acronym length). If every such candidate is taken, or `name` has no
    /// lower-case letter, a numeric suffix starting at 2 is appended.
    pub fn register(&mut self, name: &str) -> String {
        let base = acronym(name);
        let chosen = if self.used.contains_key(&base) {
            let alt = self.disambiguate(name, &base);
            debug!(name, base = %base, chosen = %alt, "acronym collision");
            alt
        } else {
            base
        };
        self.used.insert(chosen.clone(), name.to_string());
        chosen
    }

    fn disambiguate(&self, name: &str, base: &str) -> String {
        let acro: Vec<char> = base.chars().collect();
        for (idx, ch) in name.chars().enumerate().filter(|(_, c)| c.is_lowercase()) {
            let at = idx.min(acro.len());
            let mut candidate: String = acro[..at].iter().collect();
            candidate.push(ch);
            candidate.extend(&acro[at..]);
            if !self.used.contains_key(&candidate) {
                return candidate;
            }
        }

        let mut n = 2usize;
        loop {
            let candidate = format!("{base}{n}");
            if !self.used.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Name an acronym was issued for.
    pub fn source_of(&self, acronym: &str) -> Option<&str> {
        self.used.get(acronym).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.used
    }
}
