//! Cache key composition.
//!
//! Keys look like `search:shopee:fone%20bluetooth:1:limit=20:min=500`:
//! a namespace, positional segments, then named parameters sorted by name.
//! Keyword normalization is what makes `"  Fone  Bluetooth"` and
//! `"fone bluetooth"` share one entry.

use std::collections::BTreeMap;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped inside a key segment so user input cannot forge a
/// separator. Non-ASCII bytes are always escaped.
const SEGMENT: &AsciiSet = &CONTROLS.add(b' ').add(b':').add(b'=').add(b'%');

/// A cache key uniquely identifying a cached value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    key: String,
}

impl CacheKey {
    /// Create a cache key from an already-composed string.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Start a key in `namespace` (e.g. `"search"`, `"detail"`).
    #[must_use]
    pub fn builder(namespace: &'static str) -> CacheKeyBuilder {
        CacheKeyBuilder {
            namespace,
            segments: Vec::new(),
            params: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key)
    }
}

#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    namespace: &'static str,
    segments: Vec<String>,
    params: BTreeMap<&'static str, String>,
}

impl CacheKeyBuilder {
    /// Append a positional segment, escaped.
    #[must_use]
    pub fn segment(mut self, value: impl AsRef<str>) -> Self {
        self.segments.push(escape(value.as_ref()));
        self
    }

    /// Append free-text keywords after [`normalize_keywords`].
    #[must_use]
    pub fn keywords(mut self, keywords: &str) -> Self {
        self.segments.push(escape(&normalize_keywords(keywords)));
        self
    }

    /// Add a named parameter. Order of calls does not matter.
    #[must_use]
    pub fn param(mut self, name: &'static str, value: impl ToString) -> Self {
        self.params.insert(name, escape(&value.to_string()));
        self
    }

    /// Add a named parameter only when present; absent values leave no trace.
    #[must_use]
    pub fn param_opt<T: ToString>(self, name: &'static str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.param(name, v),
            None => self,
        }
    }

    #[must_use]
    pub fn build(self) -> CacheKey {
        let mut key = String::from(self.namespace);
        for segment in &self.segments {
            key.push(':');
            key.push_str(segment);
        }
        for (name, value) in &self.params {
            key.push(':');
            key.push_str(name);
            key.push('=');
            key.push_str(value);
        }
        CacheKey { key }
    }
}

/// Trim, collapse inner whitespace, and case-fold search keywords.
#[must_use]
pub fn normalize_keywords(keywords: &str) -> String {
    keywords
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn escape(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}
