//! Canonical request construction for AWS Signature Version 4.
//!
//! The canonical request is the byte string every SigV4 signature is computed over:
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! The signing side starts from decoded query pairs ([`build_canonical_query`]);
//! the verifying side starts from the query string exactly as it arrived on the
//! wire ([`build_canonical_query_string`]). Both produce the same text for a URL
//! this crate emitted.

use std::collections::BTreeMap;
use std::fmt;

use http::HeaderMap;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use sha2::{Digest, Sha256};

use crate::error::AuthError;

/// Characters left unencoded in URI path segments and query components:
/// the RFC 3986 unreserved set (`A-Z`, `a-z`, `0-9`, `-`, `_`, `.`, `~`).
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Headers that are never signed. `authorization` is replaced by the
/// signature itself and `user-agent` may be rewritten by proxies.
pub const UNSIGNED_HEADERS: [&str; 2] = ["authorization", "user-agent"];

/// A fully built canonical request.
///
/// `Display` renders the exact bytes that get hashed into the string to sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    /// HTTP method, upper case.
    pub method: String,
    /// Encoded URI path.
    pub canonical_uri: String,
    /// Sorted, encoded query string.
    pub canonical_query: String,
    /// `name:value` lines joined with `\n`, without the trailing blank line.
    pub canonical_headers: String,
    /// Semicolon-joined signed header names.
    pub signed_headers: String,
    /// Hashed payload line.
    pub payload_hash: String,
}

impl CanonicalRequest {
    /// Rebuild the canonical request of a received request.
    ///
    /// `query` is the wire query string to sign over and `signed_headers` the
    /// names the client declared; each must be present on `parts`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingHeader`] if a signed header is absent or not UTF-8.
    pub fn from_received(
        parts: &http::request::Parts,
        query: &str,
        signed_headers: &[&str],
        payload_hash: &str,
    ) -> Result<Self, AuthError> {
        let mut pairs = Vec::with_capacity(signed_headers.len());
        for &name in signed_headers {
            let value = parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| AuthError::MissingHeader(name.to_owned()))?;
            pairs.push((name, value));
        }

        Ok(Self {
            method: parts.method.as_str().to_owned(),
            canonical_uri: build_canonical_uri(parts.uri.path()),
            canonical_query: build_canonical_query_string(query),
            canonical_headers: build_canonical_headers(&pairs, signed_headers),
            signed_headers: build_signed_headers_string(signed_headers),
            payload_hash: payload_hash.to_owned(),
        })
    }

    /// Hex-encoded SHA-256 of the rendered canonical request.
    #[must_use]
    pub fn hash(&self) -> String {
        hex::encode(Sha256::digest(self.to_string().as_bytes()))
    }
}

impl fmt::Display for CanonicalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{}\n{}\n{}\n\n{}\n{}",
            self.method,
            self.canonical_uri,
            self.canonical_query,
            self.canonical_headers,
            self.signed_headers,
            self.payload_hash
        )
    }
}

/// Build the full canonical request string from raw request components.
///
/// `query_string` is taken as it appeared on the wire (already encoded).
///
/// # Examples
///
/// ```
/// use sigmock_auth::canonical::build_canonical_request;
///
/// let canonical = build_canonical_request(
///     "GET",
///     "/test.txt",
///     "",
///     &[("host", "examplebucket.s3.amazonaws.com")],
///     &["host"],
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
/// );
/// assert!(canonical.starts_with("GET\n/test.txt\n"));
/// ```
#[must_use]
pub fn build_canonical_request(
    method: &str,
    uri: &str,
    query_string: &str,
    headers: &[(&str, &str)],
    signed_headers: &[&str],
    payload_hash: &str,
) -> String {
    CanonicalRequest {
        method: method.to_owned(),
        canonical_uri: build_canonical_uri(uri),
        canonical_query: build_canonical_query_string(query_string),
        canonical_headers: build_canonical_headers(headers, signed_headers),
        signed_headers: build_signed_headers_string(signed_headers),
        payload_hash: payload_hash.to_owned(),
    }
    .to_string()
}

/// Canonicalize an outbound request for signing.
///
/// Every header in `headers` except [`UNSIGNED_HEADERS`] is signed, plus
/// `host` (taken from `host` unless the map already carries one). Header
/// values must be valid UTF-8.
///
/// # Errors
///
/// Returns [`AuthError::Encoding`] if a header value is not valid UTF-8.
pub fn canonicalize(
    method: &http::Method,
    path: &str,
    query: &[(String, String)],
    host: &str,
    headers: &HeaderMap,
    payload_hash: &str,
) -> Result<CanonicalRequest, AuthError> {
    let mut pairs = canonical_header_pairs(headers)?;
    if !headers.contains_key(http::header::HOST) {
        pairs.push(("host".to_owned(), host.to_owned()));
    }

    let names = signed_header_names(&pairs);
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let pair_refs: Vec<(&str, &str)> = pairs
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    Ok(CanonicalRequest {
        method: method.as_str().to_owned(),
        canonical_uri: build_canonical_uri(path),
        canonical_query: build_canonical_query(query),
        canonical_headers: build_canonical_headers(&pair_refs, &name_refs),
        signed_headers: build_signed_headers_string(&name_refs),
        payload_hash: payload_hash.to_owned(),
    })
}

/// Lower-case header names and decode values as UTF-8, skipping
/// [`UNSIGNED_HEADERS`].
///
/// # Errors
///
/// Returns [`AuthError::Encoding`] naming the first header whose value is not UTF-8.
pub fn canonical_header_pairs(headers: &HeaderMap) -> Result<Vec<(String, String)>, AuthError> {
    headers
        .iter()
        .filter(|(name, _)| !UNSIGNED_HEADERS.contains(&name.as_str()))
        .map(|(name, value)| {
            let value = std::str::from_utf8(value.as_bytes())
                .map_err(|e| AuthError::Encoding(format!("header {name}: {e}")))?;
            Ok((name.as_str().to_lowercase(), value.to_owned()))
        })
        .collect()
}

/// Sorted, de-duplicated, lower-case names of the given header pairs.
#[must_use]
pub fn signed_header_names(pairs: &[(String, String)]) -> Vec<String> {
    let mut names: Vec<String> = pairs.iter().map(|(k, _)| k.to_lowercase()).collect();
    names.sort_unstable();
    names.dedup();
    names
}

/// Build the canonical URI by URI-encoding each path segment individually.
///
/// Forward slashes (`/`) are preserved. Empty paths are normalized to `/`.
///
/// # Examples
///
/// ```
/// use sigmock_auth::canonical::build_canonical_uri;
///
/// assert_eq!(build_canonical_uri("/test.txt"), "/test.txt");
/// assert_eq!(build_canonical_uri("/"), "/");
/// assert_eq!(build_canonical_uri(""), "/");
/// ```
#[must_use]
pub fn build_canonical_uri(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_owned();
    }

    path.split('/')
        .map(|segment| {
            // Decode first so an already encoded path is not encoded twice.
            let decoded = percent_decode_str(segment).decode_utf8_lossy();
            uri_encode(&decoded)
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the canonical query string from decoded parameters.
///
/// Keys and values are percent-encoded with the unreserved set, then the
/// pairs are sorted byte-wise by key (and by value for repeated keys). An
/// empty value still renders as `key=`.
///
/// # Examples
///
/// ```
/// use sigmock_auth::canonical::build_canonical_query;
///
/// let query = vec![
///     ("prefix".to_owned(), "a b".to_owned()),
///     ("acl".to_owned(), String::new()),
/// ];
/// assert_eq!(build_canonical_query(&query), "acl=&prefix=a%20b");
/// ```
#[must_use]
pub fn build_canonical_query(params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (uri_encode(k), uri_encode(v)))
        .collect();
    encoded.sort_unstable();
    join_query(encoded.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}

/// Build the canonical query string from a raw, already encoded query.
///
/// Parameters are sorted by key name first, then by value for duplicate keys.
/// Values are not decoded and re-encoded: different clients encode differently
/// when signing, and the verifier must hash exactly what the client hashed.
///
/// # Examples
///
/// ```
/// use sigmock_auth::canonical::build_canonical_query_string;
///
/// assert_eq!(build_canonical_query_string(""), "");
/// assert_eq!(build_canonical_query_string("b=2&a=1"), "a=1&b=2");
/// ```
#[must_use]
pub fn build_canonical_query_string(query: &str) -> String {
    if query.is_empty() {
        return String::new();
    }

    let mut params: Vec<(&str, &str)> = query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|param| param.split_once('=').unwrap_or((param, "")))
        .collect();

    params.sort_unstable();
    join_query(params)
}

/// Build the canonical headers string from the request headers.
///
/// Only headers listed in `signed_headers` are included. Header names are lowercased,
/// values are trimmed and runs of whitespace collapse to a single space. Repeated
/// headers are joined with commas. Headers are sorted by name.
///
/// The result does NOT include a trailing newline; the caller adds that as part of
/// the canonical request format (the double newline between headers and signed headers).
///
/// # Examples
///
/// ```
/// use sigmock_auth::canonical::build_canonical_headers;
///
/// let headers = [("Host", "example.com"), ("X-Amz-Date", "20130524T000000Z")];
/// let result = build_canonical_headers(&headers, &["host", "x-amz-date"]);
/// assert_eq!(result, "host:example.com\nx-amz-date:20130524T000000Z");
/// ```
#[must_use]
pub fn build_canonical_headers(headers: &[(&str, &str)], signed_headers: &[&str]) -> String {
    let mut header_map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let trimmed_value = collapse_whitespace(value.trim());
        header_map
            .entry(name.to_lowercase())
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&trimmed_value);
            })
            .or_insert(trimmed_value);
    }

    let mut sorted_signed: Vec<&str> = signed_headers.to_vec();
    sorted_signed.sort_unstable();

    sorted_signed
        .iter()
        .filter_map(|name| header_map.get(*name).map(|value| format!("{name}:{value}")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the signed headers string as a semicolon-separated list of lowercase header names.
///
/// # Examples
///
/// ```
/// use sigmock_auth::canonical::build_signed_headers_string;
///
/// assert_eq!(build_signed_headers_string(&["x-amz-date", "host"]), "host;x-amz-date");
/// ```
#[must_use]
pub fn build_signed_headers_string(signed_headers: &[&str]) -> String {
    let mut sorted: Vec<&str> = signed_headers.to_vec();
    sorted.sort_unstable();
    sorted.join(";")
}

/// Percent-encode a path segment or query component with the SigV4 rules.
#[must_use]
pub fn uri_encode(input: &str) -> String {
    utf8_percent_encode(input, URI_ENCODE_SET).to_string()
}

fn join_query<'a>(params: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    params
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(ch);
            prev_was_space = false;
        }
    }
    result
}
