//! Pluggable HTTP transports.
//!
//! Code under test sends requests through an [`HttpTransport`]. Tests hand it
//! a [`MockDispatcher`]; production hands it a [`ReqwestTransport`].

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http::{Request, Response};
use tracing::debug;

use crate::dispatcher::MockDispatcher;
use crate::error::TransportError;

/// The future returned by [`HttpTransport::send`].
pub type TransportFuture =
    Pin<Box<dyn Future<Output = Result<Response<Bytes>, TransportError>> + Send>>;

/// Something that can carry an HTTP request and return its response.
///
/// The trait returns a boxed future so it can be used as `Arc<dyn HttpTransport>`.
pub trait HttpTransport: Send + Sync {
    /// Send `request`.
    fn send(&self, request: Request<Bytes>) -> TransportFuture;
}

impl HttpTransport for MockDispatcher {
    fn send(&self, request: Request<Bytes>) -> TransportFuture {
        if !self.is_active() {
            if let Some(fallback) = self.fallback() {
                debug!(uri = %request.uri(), "Mock dispatcher inactive, using fallback transport");
                return fallback.send(request);
            }
        }
        let result = self.dispatch(&request).map_err(TransportError::from);
        Box::pin(async move { result })
    }
}

/// The real network path.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with a default `reqwest` client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport around an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: Request<Bytes>) -> TransportFuture {
        let client = self.client.clone();
        Box::pin(async move {
            let request = reqwest::Request::try_from(request)?;
            debug!(method = %request.method(), url = %request.url(), "Sending HTTP request");

            let resp = client.execute(request).await?;
            let status = resp.status();
            let version = resp.version();
            let headers = resp.headers().clone();
            let body = resp.bytes().await?;

            let mut out = Response::new(body);
            *out.status_mut() = status;
            *out.version_mut() = version;
            *out.headers_mut() = headers;
            Ok(out)
        })
    }
}
