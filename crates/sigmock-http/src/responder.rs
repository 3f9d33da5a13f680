//! Responders: the handlers a registration runs when it matches.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Request, Response, StatusCode};

use crate::error::ResponderError;

/// Produces a response for a matched request.
///
/// Responders run outside the dispatcher lock, so they may call back into
/// the dispatcher (for example to read call counters).
///
/// Any `Fn(&Request<Bytes>) -> Result<Response<Bytes>, ResponderError>` that is
/// `Send + Sync` is a responder.
pub trait Responder: Send + Sync {
    /// Handle `request`.
    ///
    /// # Errors
    ///
    /// Returns a [`ResponderError`] to fail the call; the dispatcher reports it
    /// to the caller unchanged.
    fn respond(&self, request: &Request<Bytes>) -> Result<Response<Bytes>, ResponderError>;
}

impl<F> Responder for F
where
    F: Fn(&Request<Bytes>) -> Result<Response<Bytes>, ResponderError> + Send + Sync,
{
    fn respond(&self, request: &Request<Bytes>) -> Result<Response<Bytes>, ResponderError> {
        self(request)
    }
}

/// A `text/plain` response.
///
/// # Examples
///
/// ```
/// use http::StatusCode;
/// use sigmock_http::string_response;
///
/// let resp = string_response(StatusCode::OK, "mock object content");
/// assert_eq!(resp.status(), 200);
/// assert_eq!(resp.body().as_ref(), b"mock object content");
/// ```
#[must_use]
pub fn string_response(status: StatusCode, body: impl Into<String>) -> Response<Bytes> {
    let mut resp = Response::new(Bytes::from(body.into()));
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    resp
}

/// A responder that always answers with the same text.
pub fn string_responder(status: StatusCode, body: impl Into<String>) -> impl Responder + Clone {
    let body: String = body.into();
    move |_: &Request<Bytes>| -> Result<Response<Bytes>, ResponderError> {
        Ok(string_response(status, body.clone()))
    }
}

/// A responder that always answers with the same bytes.
pub fn bytes_responder(status: StatusCode, body: impl Into<Bytes>) -> impl Responder + Clone {
    let body: Bytes = body.into();
    move |_: &Request<Bytes>| -> Result<Response<Bytes>, ResponderError> {
        let mut resp = Response::new(body.clone());
        *resp.status_mut() = status;
        Ok(resp)
    }
}

/// A responder that always fails with `message`.
pub fn error_responder(message: impl Into<String>) -> impl Responder + Clone {
    let err = ResponderError::new(message);
    move |_: &Request<Bytes>| -> Result<Response<Bytes>, ResponderError> { Err(err.clone()) }
}
