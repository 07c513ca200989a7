//! The `/__cache__/` control surface.
//!
//! Every response is JSON. Client mistakes get a 4xx with an `error` field;
//! failures inside the cache are reported in the body with status 200 so a
//! broken store never turns into a 5xx.

use bytes::Bytes;
use http::{header, HeaderValue, Method, Response, StatusCode};
use proxy_cache::{CacheStatus, KeyPattern, StoreError, XCACHE};
use serde_json::{json, Value};

use crate::{ProxyBody, Shared};

/// The admin endpoints, by sub-path.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Endpoint {
    Stats,
    Keys,
    Clear,
    Invalidate,
}

impl Endpoint {
    fn from_path(sub_path: &str) -> Option<Self> {
        match sub_path {
            "stats" => Some(Self::Stats),
            "keys" => Some(Self::Keys),
            "clear" => Some(Self::Clear),
            "invalidate" => Some(Self::Invalidate),
            _ => None,
        }
    }

    fn method(self) -> Method {
        match self {
            Self::Stats | Self::Keys => Method::GET,
            Self::Clear | Self::Invalidate => Method::POST,
        }
    }
}

/// Handles a request whose path is `{admin_prefix}/{sub_path}`.
pub(crate) async fn handle(
    shared: &Shared,
    method: &Method,
    sub_path: &str,
    query: Option<&str>,
) -> Response<ProxyBody> {
    let Some(endpoint) = Endpoint::from_path(sub_path) else {
        return error(StatusCode::NOT_FOUND, "Not found");
    };
    if *method != endpoint.method() {
        let mut res = error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
        if let Ok(allow) = HeaderValue::from_str(endpoint.method().as_str()) {
            res.headers_mut().insert(header::ALLOW, allow);
        }
        return res;
    }
    let result = match endpoint {
        Endpoint::Stats => stats(shared).await,
        Endpoint::Keys => keys(shared).await,
        Endpoint::Clear => clear(shared).await,
        Endpoint::Invalidate => return invalidate(shared, query).await,
    };
    match result {
        Ok(body) => json_response(StatusCode::OK, &body),
        Err(e) => store_failure(e),
    }
}

async fn stats(shared: &Shared) -> Result<Value, StoreError> {
    let mut body = serde_json::to_value(shared.store.stats().await?)
        .unwrap_or_else(|_| json!({}));
    if let (Some(map), Some(info)) = (body.as_object_mut(), &shared.backend)
    {
        if let Ok(Value::Object(info)) = serde_json::to_value(info) {
            map.extend(info);
        }
        map.entry("fallback_reason").or_insert(Value::Null);
    }
    if let Some(map) = body.as_object_mut() {
        map.insert("requests".to_string(), shared.metrics.snapshot());
    }
    Ok(body)
}

async fn keys(shared: &Shared) -> Result<Value, StoreError> {
    let mut keys = shared.store.keys().await?;
    keys.sort();
    Ok(json!({ "count": keys.len(), "keys": keys }))
}

async fn clear(shared: &Shared) -> Result<Value, StoreError> {
    shared.store.clear().await?;
    log::debug!("Cache cleared via admin endpoint");
    Ok(json!({ "message": "Cache cleared successfully" }))
}

async fn invalidate(
    shared: &Shared,
    query: Option<&str>,
) -> Response<ProxyBody> {
    let param = |name: &str| {
        url::form_urlencoded::parse(query.unwrap_or_default().as_bytes())
            .find(|(k, v)| k == name && !v.is_empty())
            .map(|(_, v)| v.into_owned())
    };
    if let Some(key) = param("key") {
        return match shared.store.invalidate(&key).await {
            Ok(invalidated) => json_response(
                StatusCode::OK,
                &json!({ "key": key, "invalidated": invalidated }),
            ),
            Err(e) => store_failure(e),
        };
    }
    let Some(pattern) = param("pattern") else {
        return error(
            StatusCode::BAD_REQUEST,
            "Missing 'key' or 'pattern' parameter",
        );
    };
    let compiled = match KeyPattern::new(&pattern) {
        Ok(compiled) => compiled,
        Err(e) => {
            return error(
                StatusCode::BAD_REQUEST,
                &format!("Invalid pattern: {e}"),
            )
        }
    };
    match shared.store.invalidate_pattern(&compiled).await {
        Ok(mut removed) => {
            removed.sort();
            json_response(
                StatusCode::OK,
                &json!({
                    "pattern": pattern,
                    "count": removed.len(),
                    "invalidated": removed,
                }),
            )
        }
        Err(e) => store_failure(e),
    }
}

fn store_failure(e: StoreError) -> Response<ProxyBody> {
    log::warn!("Cache admin operation failed: {e}");
    json_response(StatusCode::OK, &json!({ "error": e.to_string() }))
}

fn error(status: StatusCode, message: &str) -> Response<ProxyBody> {
    json_response(status, &json!({ "error": message }))
}

pub(crate) fn json_response(
    status: StatusCode,
    body: &Value,
) -> Response<ProxyBody> {
    let bytes = serde_json::to_vec(body).unwrap_or_default();
    let mut res = Response::new(ProxyBody::Local(Bytes::from(bytes)));
    *res.status_mut() = status;
    let headers = res.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        XCACHE,
        HeaderValue::from_static(CacheStatus::Bypass.as_str()),
    );
    res
}
