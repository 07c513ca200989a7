//! `Cache-Control` interpretation.

use std::{collections::BTreeSet, fmt, time::Duration};

/// `no-store` directive
pub const NO_STORE: &str = "no-store";
/// `no-cache` directive
pub const NO_CACHE: &str = "no-cache";
/// `must-revalidate` directive
pub const MUST_REVALIDATE: &str = "must-revalidate";

const MAX_AGE_PREFIX: &str = "max-age=";

/// A normalized set of `Cache-Control` directives.
///
/// Tokens are split on commas, trimmed and lowercased, so
/// `"Max-Age=60, NO-CACHE"` and `"no-cache,max-age=60"` produce the same set.
///
/// ```
/// use proxy_cache::Directives;
///
/// let directives = Directives::parse("public, Max-Age=60");
/// assert!(directives.contains("public"));
/// assert_eq!(directives.max_age(), Some(60));
/// assert!(!directives.no_store());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    tokens: BTreeSet<String>,
}

impl Directives {
    /// Parses a `Cache-Control` header value. An empty value yields an empty set.
    pub fn parse(header_value: &str) -> Self {
        let tokens = header_value
            .split(',')
            .map(|token| token.trim().to_ascii_lowercase())
            .filter(|token| !token.is_empty())
            .collect();
        Self { tokens }
    }

    /// Parses an optional header value, treating an absent header as empty.
    pub fn parse_opt(header_value: Option<&str>) -> Self {
        header_value.map(Self::parse).unwrap_or_default()
    }

    /// Checks whether the exact (lowercase) token is present.
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    /// `no-store` is present
    pub fn no_store(&self) -> bool {
        self.contains(NO_STORE)
    }

    /// `no-cache` is present
    pub fn no_cache(&self) -> bool {
        self.contains(NO_CACHE)
    }

    /// `must-revalidate` is present
    pub fn must_revalidate(&self) -> bool {
        self.contains(MUST_REVALIDATE)
    }

    /// Extracts `N` from a `max-age=N` token.
    ///
    /// Returns `None` unless `N` consists only of decimal digits, so
    /// `max-age=`, `max-age=abc` and `max-age=-1` are all ignored.
    pub fn max_age(&self) -> Option<u64> {
        self.tokens.iter().find_map(|token| {
            let value = token.strip_prefix(MAX_AGE_PREFIX)?;
            if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit())
            {
                return None;
            }
            value.parse().ok()
        })
    }

    /// The TTL to store a response with, derived from `max-age`.
    pub fn ttl(&self) -> Option<Duration> {
        self.max_age().map(Duration::from_secs)
    }

    /// Number of distinct directives
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True when no directive was present
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Iterates the normalized tokens in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }
}

impl fmt::Display for Directives {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        f.write_str(&joined.join(", "))
    }
}
