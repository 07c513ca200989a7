//! Tower service for a transparent HTTP caching reverse proxy.
//!
//! [`ProxyLayer`] wraps an origin service (usually [`OriginClient`]) and
//! turns it into a caching reverse proxy for one configured origin:
//!
//! - `GET`, `HEAD` and `OPTIONS` responses are cached under
//!   `METHOD:ABSOLUTE_URL`, for the origin's `max-age` or the store's default
//!   TTL
//! - cached entries marked `no-cache` are revalidated with `If-None-Match` /
//!   `If-Modified-Since` and served again on `304 Not Modified`
//! - `no-store` and `no-cache` responses are never stored
//! - successful `POST`, `PUT`, `PATCH` and `DELETE` requests purge the
//!   cached `GET` responses they make stale
//! - hop-by-hop headers never cross the proxy in either direction
//! - every response carries exactly one `x-cache` header: `HIT`, `MISS`,
//!   `BYPASS`, `REVALIDATED`, `NO-STORE` or `UNCACHEABLE`
//!
//! Requests under the admin prefix (`/__cache__` by default) are answered by
//! the proxy itself:
//!
//! | Path | Method | Response |
//! |---|---|---|
//! | `/__cache__/stats` | GET | store statistics and backend metadata |
//! | `/__cache__/keys` | GET | `{"keys": [...], "count": N}` |
//! | `/__cache__/clear` | POST | `{"message": "Cache cleared successfully"}` |
//! | `/__cache__/invalidate?key=K` or `?pattern=P` | POST | the removed keys |
//!
//! # Example
//!
//! ```rust
//! use bytes::Bytes;
//! use http::{Request, Response};
//! use http_body_util::Full;
//! use proxy_cache::MemoryStore;
//! use proxy_cache_tower::{ProxyLayer, ProxyOptions};
//! use std::sync::Arc;
//! use tower::{Layer, ServiceExt};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let options = ProxyOptions::new("http://origin.internal")?;
//! let layer = ProxyLayer::new(Arc::new(MemoryStore::default()), options);
//!
//! // Stands in for `OriginClient`
//! let origin = tower::service_fn(|req: Request<Bytes>| async move {
//!     assert_eq!(req.uri(), "http://origin.internal/users/1");
//!     Ok::<_, std::io::Error>(
//!         Response::builder()
//!             .header("cache-control", "max-age=60")
//!             .body(Full::new(Bytes::from("{\"id\":1}")))
//!             .unwrap(),
//!     )
//! });
//!
//! let proxy = layer.layer(origin);
//! let req = Request::get("/users/1").body(Full::new(Bytes::new()))?;
//! let res = proxy.clone().oneshot(req).await?;
//! assert_eq!(res.headers()["x-cache"], "MISS");
//!
//! let req = Request::get("/users/1").body(Full::new(Bytes::new()))?;
//! let res = proxy.oneshot(req).await?;
//! assert_eq!(res.headers()["x-cache"], "HIT");
//! # Ok(())
//! # }
//! ```
//!
//! # Shared cache
//!
//! Cached responses are served to every client. The cache key does not
//! include `Authorization`, cookies or any other request header, so origins
//! must mark per-user responses `no-store` or `no-cache`.

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod admin;
mod error;
pub mod headers;
mod origin;

pub use error::ProxyError;
pub use origin::OriginClient;

use bytes::Bytes;
use http::{
    header::{self, HeaderName, HeaderValue},
    Method, Request, Response, StatusCode, Uri,
};
use http_body::{Body as HttpBody, Frame, SizeHint};
use http_body_util::BodyExt;
use proxy_cache::{
    cache_key, BackendInfo, BackendSelection, BoxError, CacheEntry,
    CacheStatus, CacheStore, Directives, InvalidationPlanner, KeyPattern,
    XCACHE,
};
use serde_json::json;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use url::Url;

/// Default path prefix of the admin endpoints
pub const DEFAULT_ADMIN_PREFIX: &str = "/__cache__";

/// Returns true for methods whose responses are cached.
pub fn is_cacheable(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Returns true for methods the proxy forwards at all.
pub fn is_supported(method: &Method) -> bool {
    is_cacheable(method) || InvalidationPlanner::is_mutating(method)
}

/// Request counters, one per caching decision.
#[derive(Debug, Default)]
pub struct ProxyMetrics {
    /// Responses served from cache
    pub hits: AtomicU64,
    /// Responses fetched from the origin and stored
    pub misses: AtomicU64,
    /// Responses fetched from the origin and not stored
    pub bypasses: AtomicU64,
    /// Cached responses confirmed by the origin
    pub revalidations: AtomicU64,
    /// Responses the origin marked `no-store`
    pub no_store: AtomicU64,
    /// Responses to non-cacheable methods
    pub uncacheable: AtomicU64,
    /// Invalidation patterns applied after mutations
    pub invalidations: AtomicU64,
    /// Store failures that degraded a request to pass-through
    pub store_errors: AtomicU64,
}

impl ProxyMetrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one response with the given decision.
    pub fn record(&self, status: CacheStatus) {
        let counter = match status {
            CacheStatus::Hit => &self.hits,
            CacheStatus::Miss => &self.misses,
            CacheStatus::Bypass => &self.bypasses,
            CacheStatus::Revalidated => &self.revalidations,
            CacheStatus::NoStore => &self.no_store,
            CacheStatus::Uncacheable => &self.uncacheable,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Fraction of cache lookups answered without a full origin response
    /// (hits and revalidations over lookups), 0.0 to 1.0.
    pub fn hit_rate(&self) -> f64 {
        let served = self.hits.load(Ordering::Relaxed)
            + self.revalidations.load(Ordering::Relaxed);
        let total = served + self.misses.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else {
            served as f64 / total as f64
        }
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        for counter in self.counters() {
            counter.1.store(0, Ordering::Relaxed);
        }
    }

    /// The counters as a JSON object.
    pub fn snapshot(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (name, counter) in self.counters() {
            map.insert(name.to_string(), counter.load(Ordering::Relaxed).into());
        }
        map.insert("hit_rate".to_string(), json!(self.hit_rate()));
        serde_json::Value::Object(map)
    }

    fn counters(&self) -> [(&'static str, &AtomicU64); 8] {
        [
            ("hits", &self.hits),
            ("misses", &self.misses),
            ("bypasses", &self.bypasses),
            ("revalidations", &self.revalidations),
            ("no_store", &self.no_store),
            ("uncacheable", &self.uncacheable),
            ("invalidations", &self.invalidations),
            ("store_errors", &self.store_errors),
        ]
    }
}

/// Configuration of the proxy.
#[derive(Debug, Clone)]
pub struct ProxyOptions {
    origin: Url,
    admin_prefix: String,
    planner: InvalidationPlanner,
}

impl ProxyOptions {
    /// Create options for the given origin base URL, e.g.
    /// `http://127.0.0.1:8080`. A path in the base is kept as a prefix of
    /// every forwarded path.
    pub fn new(origin: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            origin: Url::parse(origin)?,
            admin_prefix: DEFAULT_ADMIN_PREFIX.to_string(),
            planner: InvalidationPlanner::default(),
        })
    }

    /// Moves the admin endpoints under another path prefix.
    pub fn with_admin_prefix(mut self, prefix: &str) -> Self {
        self.admin_prefix = format!("/{}", prefix.trim_matches('/'));
        self
    }

    /// Sets the regex deciding whether a trailing path segment identifies a
    /// single resource, for collection invalidation.
    pub fn with_resource_id_pattern(
        mut self,
        pattern: &str,
    ) -> Result<Self, BoxError> {
        self.planner = InvalidationPlanner::new(pattern)?;
        Ok(self)
    }

    /// Replaces the invalidation planner.
    pub fn with_planner(mut self, planner: InvalidationPlanner) -> Self {
        self.planner = planner;
        self
    }

    /// The origin base URL
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// The admin path prefix
    pub fn admin_prefix(&self) -> &str {
        &self.admin_prefix
    }

    /// The invalidation planner
    pub fn planner(&self) -> &InvalidationPlanner {
        &self.planner
    }

    /// Builds the absolute origin URL for an inbound request URI:
    /// `origin + path [+ "?" + query]`.
    pub fn origin_url(&self, uri: &Uri) -> String {
        let base = self.origin.as_str().trim_end_matches('/');
        match uri.query() {
            Some(query) => format!("{base}{}?{query}", uri.path()),
            None => format!("{base}{}", uri.path()),
        }
    }

    /// Returns the admin sub-path when `path` is under the admin prefix.
    /// The bare prefix yields an empty sub-path.
    fn admin_sub_path<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.admin_prefix.as_str())?;
        if rest.is_empty() {
            Some(rest)
        } else {
            rest.strip_prefix('/')
        }
    }
}

/// Response body types.
#[derive(Debug)]
pub enum ProxyBody {
    /// Body of a cached entry.
    Cached(Bytes),
    /// Body received from the origin.
    Origin(Bytes),
    /// Body generated by the proxy itself.
    Local(Bytes),
}

impl ProxyBody {
    fn bytes(&self) -> &Bytes {
        match self {
            ProxyBody::Cached(b) | ProxyBody::Origin(b) | ProxyBody::Local(b) => {
                b
            }
        }
    }
}

impl HttpBody for ProxyBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let bytes = match &mut *self {
            ProxyBody::Cached(b) | ProxyBody::Origin(b) | ProxyBody::Local(b) => {
                std::mem::take(b)
            }
        };

        if bytes.is_empty() {
            Poll::Ready(None)
        } else {
            Poll::Ready(Some(Ok(Frame::data(bytes))))
        }
    }

    fn is_end_stream(&self) -> bool {
        self.bytes().is_empty()
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.bytes().len() as u64)
    }
}

pub(crate) struct Shared {
    store: Arc<dyn CacheStore>,
    options: ProxyOptions,
    backend: Option<BackendInfo>,
    metrics: ProxyMetrics,
}

impl fmt::Debug for Shared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("options", &self.options)
            .field("backend", &self.backend)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

/// Tower layer turning an origin service into a caching reverse proxy.
///
/// All services produced by one layer share its store and metrics.
#[derive(Debug, Clone)]
pub struct ProxyLayer {
    shared: Arc<Shared>,
}

impl ProxyLayer {
    /// Create a proxy layer over an already constructed store.
    pub fn new(store: Arc<dyn CacheStore>, options: ProxyOptions) -> Self {
        Self::build(store, options, None)
    }

    /// Create a proxy layer over the store picked by
    /// [`select_backend`](proxy_cache::select_backend). The admin stats
    /// endpoint then also reports which backend is active and why it fell
    /// back, if it did.
    pub fn from_selection(
        selection: BackendSelection,
        options: ProxyOptions,
    ) -> Self {
        let info = selection.info();
        Self::build(selection.store, options, Some(info))
    }

    fn build(
        store: Arc<dyn CacheStore>,
        options: ProxyOptions,
        backend: Option<BackendInfo>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                options,
                backend,
                metrics: ProxyMetrics::new(),
            }),
        }
    }

    /// The shared store
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.shared.store
    }

    /// Get a reference to the request metrics.
    pub fn metrics(&self) -> &ProxyMetrics {
        &self.shared.metrics
    }

    /// The proxy configuration
    pub fn options(&self) -> &ProxyOptions {
        &self.shared.options
    }
}

impl<S> Layer<S> for ProxyLayer {
    type Service = ProxyService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ProxyService { inner, shared: self.shared.clone() }
    }
}

/// Tower service that implements the caching proxy.
#[derive(Debug, Clone)]
pub struct ProxyService<S> {
    inner: S,
    shared: Arc<Shared>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for ProxyService<S>
where
    S: Service<Request<Bytes>, Response = Response<ResBody>>
        + Clone
        + Send
        + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
    ReqBody: HttpBody + Send + 'static,
    ReqBody::Data: Send,
    ReqBody::Error: Into<BoxError>,
    ResBody: HttpBody + Send + 'static,
    ResBody::Data: Send,
    ResBody::Error: Into<BoxError>,
{
    type Response = Response<ProxyBody>;
    type Error = ProxyError;
    type Future = Pin<
        Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(|e| ProxyError::Origin(e.into()))
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let shared = self.shared.clone();
        // Use the instance that was driven to readiness
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move { proxy(shared, inner, req).await })
    }
}

async fn proxy<S, ReqBody, ResBody>(
    shared: Arc<Shared>,
    mut inner: S,
    req: Request<ReqBody>,
) -> Result<Response<ProxyBody>, ProxyError>
where
    S: Service<Request<Bytes>, Response = Response<ResBody>>,
    S::Error: Into<BoxError>,
    ReqBody: HttpBody,
    ReqBody::Error: Into<BoxError>,
    ResBody: HttpBody,
    ResBody::Error: Into<BoxError>,
{
    let (parts, body) = req.into_parts();

    if let Some(sub_path) = shared.options.admin_sub_path(parts.uri.path()) {
        return Ok(admin::handle(
            &shared,
            &parts.method,
            sub_path,
            parts.uri.query(),
        )
        .await);
    }

    if !is_supported(&parts.method) {
        log::debug!("Rejecting unsupported method {}", parts.method);
        let mut res = admin::json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &json!({ "error": "Method not allowed" }),
        );
        res.headers_mut().insert(
            header::ALLOW,
            HeaderValue::from_static("GET, HEAD, OPTIONS, POST, PUT, PATCH, DELETE"),
        );
        return Ok(res);
    }

    let method = parts.method.clone();
    let url = shared.options.origin_url(&parts.uri);
    let key = cache_key(method.as_str(), &url);
    let cacheable = is_cacheable(&method);

    let mut cached = None;
    if cacheable {
        match shared.store.get(&key).await {
            Ok(Some(entry)) if !entry.directives().no_cache() => {
                log::debug!("{key}: {}", CacheStatus::Hit);
                shared.metrics.record(CacheStatus::Hit);
                return Ok(entry_response(entry, CacheStatus::Hit));
            }
            Ok(entry) => cached = entry,
            Err(e) if e.is_malformed() => {
                log::warn!("{e}; discarding it");
                if let Err(e) = shared.store.invalidate(&key).await {
                    log::warn!("Failed to invalidate {key}: {e}");
                }
            }
            Err(e) => {
                log::warn!("Cache lookup for {key} failed: {e}");
                shared.metrics.store_errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    let body = collect_body(body).await.map_err(ProxyError::Body)?;
    let mut outbound =
        Request::builder().method(method.clone()).uri(url.as_str()).body(body)?;
    *outbound.headers_mut() = headers::outbound_request_headers(parts.headers);
    if let Some(entry) = &cached {
        add_conditional_headers(outbound.headers_mut(), entry);
    }

    let response =
        inner.call(outbound).await.map_err(|e| ProxyError::Origin(e.into()))?;
    let (mut res_parts, res_body) = response.into_parts();
    let res_bytes = collect_body(res_body).await.map_err(ProxyError::Body)?;
    headers::strip_hop_by_hop(&mut res_parts.headers);

    if res_parts.status == StatusCode::NOT_MODIFIED {
        if let Some(entry) = cached {
            log::debug!("{key}: {}", CacheStatus::Revalidated);
            shared.metrics.record(CacheStatus::Revalidated);
            return Ok(entry_response(entry, CacheStatus::Revalidated));
        }
    }

    let directives = Directives::parse_opt(
        res_parts
            .headers
            .get(header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok()),
    );
    // `no-store` and `no-cache` responses are relayed untouched
    let status = if directives.no_store() {
        CacheStatus::NoStore
    } else if directives.no_cache() {
        CacheStatus::Bypass
    } else if !cacheable {
        if InvalidationPlanner::is_mutating(&method)
            && res_parts.status.as_u16() < 400
        {
            invalidate_after_mutation(&shared, &method, &url).await;
        }
        CacheStatus::Uncacheable
    } else if res_parts.status.is_success() {
        let entry = CacheEntry::new(
            res_parts.status.as_u16(),
            stored_headers(&res_parts.headers),
            res_bytes.to_vec(),
        );
        match shared.store.set(&key, entry, directives.ttl()).await {
            Ok(()) => CacheStatus::Miss,
            Err(e) => {
                log::warn!("Failed to store {key}: {e}");
                shared.metrics.store_errors.fetch_add(1, Ordering::Relaxed);
                CacheStatus::Bypass
            }
        }
    } else {
        CacheStatus::Bypass
    };

    log::debug!("{key}: {status} ({})", res_parts.status);
    shared.metrics.record(status);
    let mut response =
        Response::from_parts(res_parts, ProxyBody::Origin(res_bytes));
    set_cache_status(response.headers_mut(), status);
    Ok(response)
}

/// Applies the invalidation plan for a successful mutation. Failures are
/// logged; the mutation's response is returned regardless.
async fn invalidate_after_mutation(shared: &Shared, method: &Method, url: &str) {
    for pattern in shared.options.planner.plan(method, url) {
        let compiled = match KeyPattern::new(&pattern) {
            Ok(compiled) => compiled,
            Err(e) => {
                log::warn!("Skipping invalidation pattern {pattern}: {e}");
                continue;
            }
        };
        match shared.store.invalidate_pattern(&compiled).await {
            Ok(removed) => {
                shared.metrics.invalidations.fetch_add(1, Ordering::Relaxed);
                log::debug!(
                    "{method} {url} invalidated {} key(s) matching {pattern}",
                    removed.len()
                );
            }
            Err(e) => {
                shared.metrics.store_errors.fetch_add(1, Ordering::Relaxed);
                log::warn!("Invalidating {pattern} failed: {e}");
            }
        }
    }
}

fn add_conditional_headers(headers: &mut http::HeaderMap, entry: &CacheEntry) {
    let validators = [
        (header::ETAG, header::IF_NONE_MATCH),
        (header::LAST_MODIFIED, header::IF_MODIFIED_SINCE),
    ];
    for (stored, conditional) in validators {
        if let Some(value) = entry
            .header(stored.as_str())
            .and_then(|v| HeaderValue::from_str(v).ok())
        {
            headers.insert(conditional, value);
        }
    }
}

/// Headers worth keeping with a stored entry. Values that are not valid
/// UTF-8 are dropped.
fn stored_headers(headers: &http::HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter(|(name, _)| name.as_str() != XCACHE)
        .filter_map(|(name, value)| {
            value.to_str().ok().map(|v| (name.to_string(), v.to_string()))
        })
        .collect()
}

/// Rebuilds a response from a cached entry.
fn entry_response(entry: CacheEntry, status: CacheStatus) -> Response<ProxyBody> {
    let mut response = Response::new(ProxyBody::Cached(Bytes::from(entry.body)));
    *response.status_mut() =
        StatusCode::from_u16(entry.status).unwrap_or(StatusCode::OK);
    let headers = response.headers_mut();
    for (name, value) in &entry.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.append(name, value);
        }
    }
    set_cache_status(headers, status);
    response
}

fn set_cache_status(headers: &mut http::HeaderMap, status: CacheStatus) {
    headers.insert(XCACHE, HeaderValue::from_static(status.as_str()));
}

/// Collect a body into bytes.
async fn collect_body<B>(body: B) -> Result<Bytes, BoxError>
where
    B: HttpBody,
    B::Error: Into<BoxError>,
{
    body.collect()
        .await
        .map(|collected| collected.to_bytes())
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_urls() {
        let options = ProxyOptions::new("http://origin:8080").unwrap();
        let uri: Uri = "/users/1?full=true".parse().unwrap();
        assert_eq!(options.origin_url(&uri), "http://origin:8080/users/1?full=true");

        let options = ProxyOptions::new("http://origin/api/").unwrap();
        let uri: Uri = "/users".parse().unwrap();
        assert_eq!(options.origin_url(&uri), "http://origin/api/users");
    }

    #[test]
    fn admin_paths() {
        let options = ProxyOptions::new("http://origin").unwrap();
        assert_eq!(options.admin_sub_path("/__cache__/stats"), Some("stats"));
        assert_eq!(options.admin_sub_path("/__cache__"), Some(""));
        assert_eq!(options.admin_sub_path("/__cache__x"), None);
        assert_eq!(options.admin_sub_path("/users"), None);

        let options = options.with_admin_prefix("internal/cache/");
        assert_eq!(options.admin_prefix(), "/internal/cache");
        assert_eq!(options.admin_sub_path("/internal/cache/keys"), Some("keys"));
    }

    #[test]
    fn methods() {
        assert!(is_cacheable(&Method::OPTIONS));
        assert!(!is_cacheable(&Method::POST));
        assert!(is_supported(&Method::PATCH));
        assert!(!is_supported(&Method::TRACE));
        assert!(!is_supported(&Method::CONNECT));
    }

    #[test]
    fn metrics() {
        let metrics = ProxyMetrics::new();
        metrics.record(CacheStatus::Hit);
        metrics.record(CacheStatus::Revalidated);
        metrics.record(CacheStatus::Miss);
        metrics.record(CacheStatus::Miss);
        assert_eq!(metrics.hit_rate(), 0.5);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot["misses"], 2);
        assert_eq!(snapshot["hit_rate"], 0.5);
        metrics.reset();
        assert_eq!(metrics.hit_rate(), 0.0);
    }

    #[test]
    fn resource_id_pattern_option() {
        let options = ProxyOptions::new("http://o")
            .unwrap()
            .with_resource_id_pattern("^[0-9]+$")
            .unwrap();
        assert_eq!(options.planner().resource_id_pattern(), "^[0-9]+$");
        assert!(ProxyOptions::new("http://o")
            .unwrap()
            .with_resource_id_pattern("(")
            .is_err());
        assert!(ProxyOptions::new("not a url").is_err());
    }

    #[test]
    fn conditional_headers_from_entry() {
        let entry = CacheEntry::new(
            200,
            vec![
                ("ETag".into(), "\"v1\"".into()),
                ("Last-Modified".into(), "Wed, 21 Oct 2015 07:28:00 GMT".into()),
            ],
            vec![],
        );
        let mut headers = http::HeaderMap::new();
        add_conditional_headers(&mut headers, &entry);
        assert_eq!(headers[header::IF_NONE_MATCH], "\"v1\"");
        assert_eq!(
            headers[header::IF_MODIFIED_SINCE],
            "Wed, 21 Oct 2015 07:28:00 GMT"
        );
    }
}
