//! In-process mock HTTP dispatcher for sigmock.
//!
//! This crate replaces the network in tests. It provides:
//!
//! - **Patterns** ([`pattern`]): exact URLs and `=~`-prefixed regular
//!   expressions.
//!
//! - **Responders** ([`responder`]): the [`Responder`] trait and canned
//!   string, bytes and error responders.
//!
//! - **Dispatcher** ([`dispatcher`]): the [`MockDispatcher`] registry with
//!   most-recent-wins matching and call counters.
//!
//! - **Transport** ([`transport`]): the [`HttpTransport`] seam, implemented by
//!   the dispatcher and by [`ReqwestTransport`] for the real network.
//!
//! - **Validation** ([`validate`]): [`PresignedUrlValidator`], a responder that
//!   answers bad, expired, or forged presigned requests the way S3 does.
//!
//! # Architecture
//!
//! ```text
//! Code under test
//!   -> HttpTransport::send
//!     -> MockDispatcher (active)   -> newest matching registration -> Responder
//!     -> fallback transport (inactive, if configured)
//!   <- http::Response<Bytes>
//! ```

pub mod dispatcher;
pub mod error;
pub mod pattern;
pub mod responder;
pub mod transport;
pub mod validate;

pub use dispatcher::MockDispatcher;
pub use error::{DispatchError, ResponderError, TransportError};
pub use pattern::UrlPattern;
pub use responder::{
    Responder, bytes_responder, error_responder, string_responder, string_response,
};
pub use transport::{HttpTransport, ReqwestTransport, TransportFuture};
pub use validate::PresignedUrlValidator;
