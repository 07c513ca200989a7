//! Invalidation planning for mutating requests.

use http::Method;
use regex::Regex;
use url::Url;

/// Default pattern for path segments that identify a single resource:
/// anything containing a digit, underscore or hyphen.
pub const DEFAULT_RESOURCE_ID_PATTERN: &str = "[0-9_-]";

/// Computes which cached `GET` responses a mutation makes stale.
///
/// - `POST U` purges `GET:{U without query}*`, covering both the collection
///   listing and whatever child resource the POST created.
/// - `PUT`, `PATCH` and `DELETE U` purge `GET:{U}` exactly. When the last
///   path segment of `U` looks like a resource identifier the owning
///   collection is purged too (`GET:{U minus that segment}*`). Collection
///   paths such as `/users` never trigger the collection purge, so unrelated
///   endpoints sharing a prefix survive.
///
/// ```
/// use http::Method;
/// use proxy_cache::InvalidationPlanner;
///
/// let planner = InvalidationPlanner::default();
/// assert_eq!(
///     planner.plan(&Method::PUT, "http://origin/users/123"),
///     vec!["GET:http://origin/users/123", "GET:http://origin/users*"],
/// );
/// assert_eq!(
///     planner.plan(&Method::PUT, "http://origin/users"),
///     vec!["GET:http://origin/users"],
/// );
/// ```
#[derive(Debug, Clone)]
pub struct InvalidationPlanner {
    resource_id: Regex,
}

impl Default for InvalidationPlanner {
    fn default() -> Self {
        Self {
            resource_id: Regex::new(DEFAULT_RESOURCE_ID_PATTERN)
                .expect("default resource id pattern is valid"),
        }
    }
}

impl InvalidationPlanner {
    /// Create a planner with a custom resource-id pattern.
    ///
    /// The pattern is searched (not anchored) within the last path segment.
    pub fn new(resource_id_pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self { resource_id: Regex::new(resource_id_pattern)? })
    }

    /// Create a planner from a pre-compiled resource-id regex.
    pub fn with_regex(resource_id: Regex) -> Self {
        Self { resource_id }
    }

    /// Returns true if the method is one that triggers invalidation.
    pub fn is_mutating(method: &Method) -> bool {
        matches!(
            *method,
            Method::POST | Method::PUT | Method::PATCH | Method::DELETE
        )
    }

    /// Returns the invalidation patterns for a mutating request to `url`.
    ///
    /// Non-mutating methods yield no patterns.
    pub fn plan(&self, method: &Method, url: &str) -> Vec<String> {
        match *method {
            Method::POST => vec![format!("GET:{}*", strip_query(url))],
            Method::PUT | Method::PATCH | Method::DELETE => {
                let mut patterns = vec![format!("GET:{url}")];
                if let Some(collection) = self.collection_of(url) {
                    patterns.push(format!("GET:{collection}*"));
                }
                patterns
            }
            _ => Vec::new(),
        }
    }

    /// Returns the collection URL when the last path segment of `url` is a
    /// resource identifier.
    fn collection_of<'a>(&self, url: &'a str) -> Option<&'a str> {
        let path_url = strip_query(url).trim_end_matches('/');
        let parsed = Url::parse(path_url).ok()?;
        let last = parsed.path_segments()?.rev().find(|s| !s.is_empty())?;
        if !self.resource_id.is_match(last) {
            return None;
        }
        let (collection, segment) = path_url.rsplit_once('/')?;
        if segment.is_empty() || collection.ends_with('/') {
            // `scheme://` or an empty segment; there is no owning collection
            return None;
        }
        Some(collection)
    }

    /// The resource-id regex in use
    pub fn resource_id_pattern(&self) -> &str {
        self.resource_id.as_str()
    }
}

/// Strips the query string and fragment from a URL.
pub fn strip_query(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}
