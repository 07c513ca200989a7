use std::fmt;

use regex::Regex;

use crate::Result;

/// A cache key pattern with `*` (any run of characters) and `?` (exactly one
/// character) wildcards, anchored at both ends.
///
/// Every other character matches itself, including regex metacharacters.
///
/// ```
/// use proxy_cache::KeyPattern;
///
/// let pattern = KeyPattern::new("GET:http://origin/users*")?;
/// assert!(pattern.matches("GET:http://origin/users"));
/// assert!(pattern.matches("GET:http://origin/users/42?full=1"));
/// assert!(!pattern.matches("HEAD:http://origin/users"));
/// # Ok::<(), proxy_cache::StoreError>(())
/// ```
#[derive(Clone)]
pub struct KeyPattern {
    source: String,
    regex: Regex,
}

impl KeyPattern {
    /// Compiles a wildcard pattern.
    pub fn new(pattern: &str) -> Result<Self> {
        let mut expr = String::with_capacity(pattern.len() + 8);
        expr.push_str("(?s)^");
        let mut literal = [0u8; 4];
        for c in pattern.chars() {
            match c {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                _ => expr.push_str(&regex::escape(c.encode_utf8(&mut literal))),
            }
        }
        expr.push('$');
        Ok(Self { source: pattern.to_string(), regex: Regex::new(&expr)? })
    }

    /// Tests a full cache key against the pattern.
    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    /// The pattern as it was written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The literal text before the first wildcard.
    ///
    /// Backends with ordered or prefix-scannable key spaces use this to narrow
    /// the candidates before calling [`KeyPattern::matches`].
    pub fn literal_prefix(&self) -> &str {
        let end = self.source.find(['*', '?']).unwrap_or(self.source.len());
        &self.source[..end]
    }
}

impl fmt::Debug for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KeyPattern").field(&self.source).finish()
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
