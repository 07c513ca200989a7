//! The reqwest-backed origin client.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use http::{Request, Response};
use http_body_util::Full;
use proxy_cache::BoxError;
use tower::Service;

/// A Tower service that sends absolute-URI requests to the origin with
/// [`reqwest`] and buffers the response body.
///
/// Redirects are never followed; they are relayed to the client like any
/// other response.
#[derive(Debug, Clone)]
pub struct OriginClient {
    client: reqwest::Client,
}

impl OriginClient {
    /// Create a client with the default reqwest settings, minus redirects.
    pub fn new() -> Result<Self, BoxError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }

    /// Wraps an already configured [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Service<Request<Bytes>> for OriginClient {
    type Response = Response<Full<Bytes>>;
    type Error = BoxError;
    type Future = Pin<
        Box<
            dyn Future<Output = Result<Self::Response, Self::Error>> + Send,
        >,
    >;

    fn poll_ready(
        &mut self,
        _cx: &mut Context<'_>,
    ) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Bytes>) -> Self::Future {
        let client = self.client.clone();
        Box::pin(async move {
            let req = reqwest::Request::try_from(req).map_err(BoxError::from)?;
            let res = client.execute(req).await.map_err(BoxError::from)?;

            let mut builder =
                Response::builder().status(res.status()).version(res.version());
            if let Some(headers) = builder.headers_mut() {
                headers.extend(
                    res.headers()
                        .iter()
                        .map(|(name, value)| (name.clone(), value.clone())),
                );
            }
            let body = res.bytes().await.map_err(BoxError::from)?;
            builder.body(Full::new(body)).map_err(BoxError::from)
        })
    }
}
