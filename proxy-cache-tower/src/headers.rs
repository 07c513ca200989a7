//! Header hygiene for traffic crossing the proxy.

use http::{header, HeaderMap};

/// Headers that only apply to a single connection and are never forwarded,
/// in either direction. `trailer` is the registered spelling of `trailers`.
pub const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Returns true if `name` is one of the fixed hop-by-hop headers.
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// Removes the hop-by-hop headers, plus every header the `Connection` header
/// nominates as connection-specific.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let nominated: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
    for name in &nominated {
        headers.remove(name.as_str());
    }
}

/// Prepares inbound request headers for the origin: hop-by-hop headers and
/// `Host` are removed, the client sets its own.
pub fn outbound_request_headers(mut headers: HeaderMap) -> HeaderMap {
    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn strips_fixed_set_in_any_case() {
        let mut headers = HeaderMap::new();
        for name in ["Keep-Alive", "TE", "Transfer-Encoding", "UPGRADE"] {
            headers.insert(
                http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_static("x"),
            );
        }
        headers.insert("x-kept", HeaderValue::from_static("1"));
        strip_hop_by_hop(&mut headers);
        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key("x-kept"));
    }

    #[test]
    fn strips_connection_nominated() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONNECTION,
            HeaderValue::from_static("close, X-Session-Hint"),
        );
        headers.insert("x-session-hint", HeaderValue::from_static("abc"));
        headers.insert("x-other", HeaderValue::from_static("def"));
        strip_hop_by_hop(&mut headers);
        assert!(!headers.contains_key(header::CONNECTION));
        assert!(!headers.contains_key("x-session-hint"));
        assert!(headers.contains_key("x-other"));
    }

    #[test]
    fn outbound_drops_host() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("proxy.local"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
        let headers = outbound_request_headers(headers);
        assert!(!headers.contains_key(header::HOST));
        assert!(headers.contains_key(header::ACCEPT));
        assert!(is_hop_by_hop("Proxy-Authorization"));
        assert!(!is_hop_by_hop("Authorization"));
    }
}
