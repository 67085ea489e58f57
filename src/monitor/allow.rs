//! Station allow-list.
//!
//! Entries are exact identifiers unless they contain `*`, in which case the
//! entry is a wildcard pattern (`"Freeport*"` matches every key starting with
//! `Freeport`). Matching is case-sensitive.

use std::collections::HashSet;
use std::fmt;

use regex::Regex;

/// Set of station identifiers and wildcard patterns that may be tracked.
#[derive(Debug, Clone)]
pub struct AllowList {
    entries: Vec<String>,
    exact: HashSet<String>,
    patterns: Vec<Regex>,
}

impl AllowList {
    /// Builds an allow-list from identifiers, trimming whitespace and
    /// skipping empty entries.
    ///
    /// # Errors
    ///
    /// Returns an error if a wildcard entry compiles to an oversized regex.
    pub fn new<I, S>(entries: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self {
            entries: Vec::new(),
            exact: HashSet::new(),
            patterns: Vec::new(),
        };

        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() || list.entries.iter().any(|e| e == entry) {
                continue;
            }

            if entry.contains('*') {
                list.patterns.push(wildcard_regex(entry)?);
            } else {
                list.exact.insert(entry.to_string());
            }
            list.entries.push(entry.to_string());
        }

        Ok(list)
    }

    /// Parses a comma-separated list such as `"alpha, beta,Freeport*"`.
    ///
    /// # Errors
    ///
    /// See [`AllowList::new`].
    pub fn parse(csv: &str) -> Result<Self, regex::Error> {
        Self::new(csv.split(','))
    }

    /// Returns `true` if the key is allowed.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.exact.contains(key) || self.patterns.iter().any(|p| p.is_match(key))
    }

    /// All entries in configuration order.
    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Exact identifiers only; these are the keys expected to show up upstream.
    pub fn exact_entries(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .map(String::as_str)
            .filter(|e| !e.contains('*'))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entries are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for AllowList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.entries.join(","))
    }
}

fn wildcard_regex(entry: &str) -> Result<Regex, regex::Error> {
    let body = entry
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{body}$"))
}
