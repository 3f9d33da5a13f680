//! The in-process mock dispatcher.
//!
//! [`MockDispatcher`] holds a list of `(method, pattern, responder)`
//! registrations. A request is answered by the most recently registered
//! match; a miss is an error rather than a fall-through to the network.
//!
//! Registrations, counters and the active flag live behind one
//! `parking_lot::Mutex`. The lock is held only to pick a responder and bump
//! the counters; the responder itself runs after the lock is released.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::header::HOST;
use http::{Method, Request, Response};
use parking_lot::Mutex;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::DispatchError;
use crate::pattern::UrlPattern;
use crate::responder::Responder;
use crate::transport::HttpTransport;

/// Counter key for calls answered by the catch-all responder.
pub const NO_RESPONDER_KEY: &str = "NO_RESPONDER";

struct Registration {
    method: Method,
    pattern: UrlPattern,
    responder: Arc<dyn Responder>,
}

impl Registration {
    fn counter_key(&self) -> String {
        counter_key(&self.method, &self.pattern.as_str())
    }
}

#[derive(Default)]
struct Registry {
    active: bool,
    registrations: Vec<Registration>,
    no_responder: Option<Arc<dyn Responder>>,
    total_calls: usize,
    calls: HashMap<String, usize>,
}

impl Registry {
    fn clear(&mut self) {
        self.registrations.clear();
        self.no_responder = None;
        self.zero_counters();
    }

    fn zero_counters(&mut self) {
        self.total_calls = 0;
        self.calls.clear();
    }

    fn record(&mut self, key: String) {
        self.total_calls += 1;
        *self.calls.entry(key).or_default() += 1;
    }
}

/// An in-process stand-in for the network.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use http::{Method, Request, StatusCode};
/// use sigmock_http::{MockDispatcher, string_responder};
///
/// let mock = MockDispatcher::new();
/// mock.activate();
/// mock.register_responder(
///     Method::GET,
///     "https://s3.amazonaws.com/my-bucket/my-file.txt",
///     string_responder(StatusCode::OK, "This is the content of my-file.txt"),
/// )
/// .unwrap();
///
/// let req = Request::get("https://s3.amazonaws.com/my-bucket/my-file.txt")
///     .body(Bytes::new())
///     .unwrap();
/// let resp = mock.dispatch(&req).unwrap();
/// assert_eq!(resp.status(), StatusCode::OK);
/// assert_eq!(mock.total_call_count(), 1);
/// ```
#[derive(Default)]
pub struct MockDispatcher {
    registry: Mutex<Registry>,
    fallback: Option<Arc<dyn HttpTransport>>,
}

impl fmt::Debug for MockDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.lock();
        f.debug_struct("MockDispatcher")
            .field("active", &registry.active)
            .field(
                "registrations",
                &registry
                    .registrations
                    .iter()
                    .map(Registration::counter_key)
                    .collect::<Vec<_>>(),
            )
            .field("no_responder", &registry.no_responder.is_some())
            .field("total_calls", &registry.total_calls)
            .field("fallback", &self.fallback.as_ref().map(|_| "..."))
            .finish()
    }
}

impl MockDispatcher {
    /// Create an inactive dispatcher with no registrations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Send requests to `transport` while the dispatcher is inactive.
    #[must_use]
    pub fn with_fallback(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.fallback = Some(transport);
        self
    }

    /// The transport used while inactive, if any.
    #[must_use]
    pub fn fallback(&self) -> Option<&Arc<dyn HttpTransport>> {
        self.fallback.as_ref()
    }

    /// Start intercepting requests and zero the call counters.
    pub fn activate(&self) {
        let mut registry = self.registry.lock();
        registry.active = true;
        registry.zero_counters();
        debug!("Mock dispatcher activated");
    }

    /// Stop intercepting and forget every registration and counter.
    pub fn deactivate_and_reset(&self) {
        let mut registry = self.registry.lock();
        registry.active = false;
        registry.clear();
        debug!("Mock dispatcher deactivated and reset");
    }

    /// Forget every registration and counter but stay active.
    pub fn reset(&self) {
        self.registry.lock().clear();
    }

    /// Zero the call counters, keeping registrations.
    pub fn zero_call_counters(&self) {
        self.registry.lock().zero_counters();
    }

    /// Whether the dispatcher is intercepting requests.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.registry.lock().active
    }

    /// Register `responder` for `method` and `url`.
    ///
    /// A `url` starting with `=~` is a regular expression matched against the
    /// full request URL. Registering the same method and pattern again replaces
    /// the earlier responder.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidPattern`] if a `=~` expression does not compile.
    pub fn register_responder(
        &self,
        method: Method,
        url: &str,
        responder: impl Responder + 'static,
    ) -> Result<(), DispatchError> {
        let pattern = UrlPattern::parse(url)?;
        self.register(method, pattern, Arc::new(responder));
        Ok(())
    }

    /// Register `responder` for `method` and URLs matching `regex`.
    pub fn register_regex_responder(
        &self,
        method: Method,
        regex: Regex,
        responder: impl Responder + 'static,
    ) {
        self.register(method, UrlPattern::Regex(regex), Arc::new(responder));
    }

    /// Answer requests that match no registration with `responder`.
    pub fn register_no_responder(&self, responder: impl Responder + 'static) {
        self.registry.lock().no_responder = Some(Arc::new(responder));
    }

    fn register(&self, method: Method, pattern: UrlPattern, responder: Arc<dyn Responder>) {
        let key = counter_key(&method, &pattern.as_str());
        let mut registry = self.registry.lock();
        registry
            .registrations
            .retain(|r| r.counter_key() != key);
        registry.registrations.push(Registration {
            method,
            pattern,
            responder,
        });
        debug!(registration = %key, "Registered responder");
    }

    /// Answer `request` from the registrations.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Inactive`] when deactivated,
    /// [`DispatchError::NoResponder`] when nothing matches, or
    /// [`DispatchError::Responder`] when the matched responder fails.
    pub fn dispatch(&self, request: &Request<Bytes>) -> Result<Response<Bytes>, DispatchError> {
        let url = request_url(request);
        let responder = {
            let mut registry = self.registry.lock();
            if !registry.active {
                return Err(DispatchError::Inactive);
            }

            let matched = registry
                .registrations
                .iter()
                .rev()
                .find(|r| r.method == *request.method() && r.pattern.matches(&url))
                .map(|r| (Arc::clone(&r.responder), r.counter_key()));

            match matched {
                Some((responder, key)) => {
                    debug!(method = %request.method(), url, registration = %key, "Matched responder");
                    registry.record(key);
                    responder
                }
                None => {
                    let Some(responder) = registry.no_responder.clone() else {
                        warn!(method = %request.method(), url, "No responder found");
                        return Err(DispatchError::NoResponder {
                            method: request.method().clone(),
                            url,
                        });
                    };
                    registry.record(NO_RESPONDER_KEY.to_owned());
                    responder
                }
            }
        };

        Ok(responder.respond(request)?)
    }

    /// Number of requests answered since the last reset.
    #[must_use]
    pub fn total_call_count(&self) -> usize {
        self.registry.lock().total_calls
    }

    /// Number of requests answered by the registration for `method` and `pattern`.
    ///
    /// `pattern` is the string passed to [`register_responder`](Self::register_responder).
    #[must_use]
    pub fn call_count(&self, method: &Method, pattern: &str) -> usize {
        self.registry
            .lock()
            .calls
            .get(&counter_key(method, pattern))
            .copied()
            .unwrap_or(0)
    }

    /// Per-registration call counts keyed as `"<METHOD> <pattern>"`.
    #[must_use]
    pub fn call_count_info(&self) -> HashMap<String, usize> {
        self.registry.lock().calls.clone()
    }
}

fn counter_key(method: &Method, pattern: &str) -> String {
    format!("{method} {pattern}")
}

/// The absolute URL of `request`, rebuilt from the `Host` header for
/// origin-form URIs.
fn request_url<B>(request: &Request<B>) -> String {
    let uri = request.uri();
    if uri.authority().is_some() {
        return uri.to_string();
    }
    let host = request
        .headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
    format!("{}://{host}{path_and_query}", uri.scheme_str().unwrap_or("http"))
}
