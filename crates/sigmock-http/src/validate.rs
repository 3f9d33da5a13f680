//! A responder that behaves like S3 in front of presigned URLs.
//!
//! [`PresignedUrlValidator`] wraps another responder. Requests whose query
//! lacks a presign parameter, carries a malformed one, has expired, or (with
//! credentials configured) fails signature verification are answered with the
//! corresponding 400 or 403 response; everything else reaches the inner
//! responder.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::header::HOST;
use http::{HeaderValue, Request, Response, StatusCode};
use sigmock_auth::presigned::{is_expired, parse_presigned_params, verify_presigned_at};
use sigmock_auth::{AuthError, CredentialProvider};
use sigmock_core::{Clock, SigmockConfig, SystemClock};
use tracing::debug;

use crate::error::ResponderError;
use crate::responder::{Responder, string_response};

/// Body of the response to an expired URL.
pub const EXPIRED_MESSAGE: &str = "Request has expired";

/// Body of the response to a URL whose signature does not verify.
pub const SIGNATURE_MISMATCH_MESSAGE: &str = "SignatureDoesNotMatch";

/// Checks presigned URL parameters before handing the request to `inner`.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use http::{Request, StatusCode};
/// use sigmock_http::{PresignedUrlValidator, Responder, string_responder};
///
/// let validator = PresignedUrlValidator::new(string_responder(StatusCode::OK, "mock object content"));
/// let req = Request::get("https://test-bucket.s3.us-west-2.amazonaws.com/test-object")
///     .body(Bytes::new())
///     .unwrap();
/// let resp = validator.respond(&req).unwrap();
/// assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
/// assert_eq!(resp.body().as_ref(), b"Missing required parameter: X-Amz-Algorithm");
/// ```
pub struct PresignedUrlValidator {
    inner: Arc<dyn Responder>,
    clock: Arc<dyn Clock>,
    credentials: Option<Arc<dyn CredentialProvider>>,
    verify_signatures: bool,
}

impl fmt::Debug for PresignedUrlValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresignedUrlValidator")
            .field("clock", &self.clock)
            .field("credentials", &self.credentials.as_ref().map(|_| "..."))
            .field("verify_signatures", &self.verify_signatures)
            .finish_non_exhaustive()
    }
}

impl PresignedUrlValidator {
    /// Wrap `inner`, reading time from the system clock.
    pub fn new(inner: impl Responder + 'static) -> Self {
        Self {
            inner: Arc::new(inner),
            clock: Arc::new(SystemClock),
            credentials: None,
            verify_signatures: true,
        }
    }

    /// Wrap `inner` and take `verify_signatures` from `config`.
    pub fn from_config(inner: impl Responder + 'static, config: &SigmockConfig) -> Self {
        Self {
            verify_signatures: config.verify_signatures,
            ..Self::new(inner)
        }
    }

    /// Read the current time from `clock`.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Recompute signatures with secrets from `provider`.
    #[must_use]
    pub fn with_credentials(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(provider);
        self
    }

    fn check(&self, request: &Request<Bytes>) -> Result<(), AuthError> {
        let query = request.uri().query().unwrap_or("");
        let params = parse_presigned_params(query)?;
        let now = self.clock.now();

        if is_expired(&params.timestamp, params.expires, now)? {
            return Err(AuthError::RequestExpired);
        }

        match &self.credentials {
            Some(provider) if self.verify_signatures => {
                let parts = request_parts(request);
                verify_presigned_at(&parts, provider.as_ref(), now).map(|_| ())
            }
            _ => Ok(()),
        }
    }
}

impl Responder for PresignedUrlValidator {
    fn respond(&self, request: &Request<Bytes>) -> Result<Response<Bytes>, ResponderError> {
        match self.check(request) {
            Ok(()) => self.inner.respond(request),
            Err(err) => {
                debug!(uri = %request.uri(), error = %err, "Rejected presigned request");
                Ok(rejection(&err))
            }
        }
    }
}

/// The S3-style response for a failed presign check.
#[must_use]
pub fn rejection(err: &AuthError) -> Response<Bytes> {
    match err {
        AuthError::RequestExpired => string_response(StatusCode::FORBIDDEN, EXPIRED_MESSAGE),
        AuthError::SignatureDoesNotMatch => {
            string_response(StatusCode::FORBIDDEN, SIGNATURE_MISMATCH_MESSAGE)
        }
        AuthError::AccessKeyNotFound(_) | AuthError::InvalidCredential => {
            string_response(StatusCode::FORBIDDEN, err.to_string())
        }
        _ => string_response(StatusCode::BAD_REQUEST, err.to_string()),
    }
}

/// Header-only copy of `request`, with `host` filled in from the URI when absent.
fn request_parts(request: &Request<Bytes>) -> http::request::Parts {
    let mut copy = Request::new(());
    *copy.method_mut() = request.method().clone();
    *copy.uri_mut() = request.uri().clone();
    *copy.version_mut() = request.version();
    *copy.headers_mut() = request.headers().clone();

    if !copy.headers().contains_key(HOST) {
        let host = request
            .uri()
            .authority()
            .and_then(|a| HeaderValue::from_str(a.as_str()).ok());
        if let Some(host) = host {
            copy.headers_mut().insert(HOST, host);
        }
    }

    copy.into_parts().0
}
