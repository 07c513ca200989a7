use proxy_cache::BoxError;
use std::fmt;

/// Errors that fail a single proxied request
#[derive(Debug)]
pub enum ProxyError {
    /// The origin could not be reached or did not answer with HTTP
    Origin(BoxError),
    /// Reading a request or response body failed
    Body(BoxError),
    /// The outbound request could not be built
    Http(http::Error),
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyError::Origin(e) => write!(f, "Origin request failed: {e}"),
            ProxyError::Body(e) => write!(f, "Body processing error: {e}"),
            ProxyError::Http(e) => write!(f, "HTTP error: {e}"),
        }
    }
}

impl std::error::Error for ProxyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProxyError::Origin(e) => Some(e.as_ref()),
            ProxyError::Body(e) => Some(e.as_ref()),
            ProxyError::Http(e) => Some(e),
        }
    }
}

impl From<http::Error> for ProxyError {
    fn from(error: http::Error) -> Self {
        ProxyError::Http(error)
    }
}
