//! The request descriptor a signer works from.
//!
//! A [`RequestDescriptor`] is the decoded, transport-independent view of an
//! outbound request: method, scheme and host, path, ordered query parameters,
//! headers, and the payload hash that goes on the last line of the canonical
//! request.

use http::header::HOST;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};

use crate::error::AuthError;

/// Payload hash token used by presigned URLs.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// SHA-256 of the empty string, hex-encoded.
pub const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// The hashed-payload line of a canonical request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadHash {
    /// The literal `UNSIGNED-PAYLOAD` token.
    Unsigned,
    /// Hex-encoded SHA-256 of the body.
    Sha256(String),
}

impl PayloadHash {
    /// Hash a request body.
    #[must_use]
    pub fn of(body: &[u8]) -> Self {
        Self::Sha256(crate::sigv4::hash_payload(body))
    }

    /// The value as it appears in the canonical request and in `x-amz-content-sha256`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unsigned => UNSIGNED_PAYLOAD,
            Self::Sha256(hash) => hash,
        }
    }
}

impl Default for PayloadHash {
    fn default() -> Self {
        Self::Sha256(EMPTY_PAYLOAD_SHA256.to_owned())
    }
}

/// A request to be signed.
///
/// Query parameters are kept decoded and in insertion order; encoding and
/// sorting happen during canonicalization.
///
/// # Examples
///
/// ```
/// use http::Method;
/// use sigmock_auth::RequestDescriptor;
///
/// let req = RequestDescriptor::new(
///     Method::GET,
///     "https://test-bucket.s3.us-west-2.amazonaws.com/test-object?versionId=3",
/// )
/// .unwrap();
/// assert_eq!(req.host.as_deref(), Some("test-bucket.s3.us-west-2.amazonaws.com"));
/// assert_eq!(req.path, "/test-object");
/// assert_eq!(req.query, vec![("versionId".to_owned(), "3".to_owned())]);
/// ```
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// HTTP method.
    pub method: Method,
    /// URL scheme (`https` when the URL did not carry one).
    pub scheme: String,
    /// Host, with port if one was given.
    pub host: Option<String>,
    /// Raw URI path.
    pub path: String,
    /// Decoded query parameters in their original order.
    pub query: Vec<(String, String)>,
    /// Headers to include in the signature (in addition to `host`).
    pub headers: HeaderMap,
    /// Payload hash.
    pub payload: PayloadHash,
}

impl RequestDescriptor {
    /// Parse an absolute URL into a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidRequest`] if the URL cannot be parsed.
    pub fn new(method: Method, url: &str) -> Result<Self, AuthError> {
        let uri: Uri = url
            .parse()
            .map_err(|e| AuthError::InvalidRequest(format!("invalid URL {url:?}: {e}")))?;
        Ok(Self::from_uri(method, &uri))
    }

    /// Build a descriptor from a method and an already parsed URI.
    #[must_use]
    pub fn from_uri(method: Method, uri: &Uri) -> Self {
        let query = uri
            .query()
            .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        Self {
            method,
            scheme: uri.scheme_str().unwrap_or("https").to_owned(),
            host: uri.authority().map(host_and_port),
            path: uri.path().to_owned(),
            query,
            headers: HeaderMap::new(),
            payload: PayloadHash::default(),
        }
    }

    /// Build a descriptor from an `http::Request`, taking its headers along.
    ///
    /// When the URI is not absolute the `Host` header supplies the host.
    #[must_use]
    pub fn from_request<B>(req: &http::Request<B>) -> Self {
        let mut descriptor = Self::from_uri(req.method().clone(), req.uri());
        descriptor.headers = req.headers().clone();
        if descriptor.host.is_none() {
            descriptor.host = req
                .headers()
                .get(HOST)
                .and_then(|v| v.to_str().ok())
                .map(ToOwned::to_owned);
        }
        descriptor
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Append a query parameter.
    #[must_use]
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Replace the payload hash.
    #[must_use]
    pub fn with_payload(mut self, payload: PayloadHash) -> Self {
        self.payload = payload;
        self
    }

    /// The host, or an error if the descriptor has none.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidRequest`] when the host is absent or empty.
    pub fn require_host(&self) -> Result<&str, AuthError> {
        self.host
            .as_deref()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| AuthError::InvalidRequest("request descriptor has no host".to_owned()))
    }
}

/// Render an authority without any userinfo.
fn host_and_port(authority: &http::uri::Authority) -> String {
    match authority.port_u16() {
        Some(port) => format!("{}:{port}", authority.host()),
        None => authority.host().to_owned(),
    }
}
