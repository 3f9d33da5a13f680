//! AWS Signature Version 4 signing and verification.
//!
//! Signing an outbound request:
//!
//! 1. Canonicalize the request (see [`crate::canonical`]).
//! 2. Build the string to sign from the timestamp, credential scope, and canonical request hash.
//! 3. Derive the signing key with the HMAC-SHA256 chain over date, region, and service.
//! 4. HMAC the string to sign with the derived key and hex-encode the result.
//!
//! Verification runs the same steps from the `Authorization` header of an
//! incoming request and compares the result in constant time.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use hmac::{Hmac, KeyInit, Mac};
use http::header::{AUTHORIZATION, HOST};
use http::{HeaderMap, HeaderName, HeaderValue};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::canonical::{CanonicalRequest, canonicalize};
use crate::credentials::{Credential, CredentialProvider};
use crate::error::AuthError;
use crate::request::RequestDescriptor;

/// The only algorithm supported by this implementation.
pub const SUPPORTED_ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// `chrono` format of `X-Amz-Date` (ISO 8601 basic).
pub const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// `chrono` format of the credential scope date.
pub const SCOPE_DATE_FORMAT: &str = "%Y%m%d";

/// Terminator of every credential scope.
pub const SCOPE_TERMINATOR: &str = "aws4_request";

/// `x-amz-date` header name.
pub const X_AMZ_DATE: &str = "x-amz-date";

/// `x-amz-content-sha256` header name.
pub const X_AMZ_CONTENT_SHA256: &str = "x-amz-content-sha256";

/// `x-amz-security-token` header name.
pub const X_AMZ_SECURITY_TOKEN: &str = "x-amz-security-token";

type HmacSha256 = Hmac<Sha256>;

/// Signing algorithms this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SigningAlgorithm {
    /// `AWS4-HMAC-SHA256`.
    #[default]
    Aws4HmacSha256,
}

impl SigningAlgorithm {
    /// Wire name of the algorithm.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aws4HmacSha256 => SUPPORTED_ALGORITHM,
        }
    }
}

impl FromStr for SigningAlgorithm {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            SUPPORTED_ALGORITHM => Ok(Self::Aws4HmacSha256),
            other => Err(AuthError::UnsupportedAlgorithm(other.to_owned())),
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `date/region/service/aws4_request` scope a signature is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningScope {
    /// `YYYYMMDD`.
    pub date: String,
    /// AWS region.
    pub region: String,
    /// AWS service name.
    pub service: String,
}

impl SigningScope {
    /// Scope for a signature made at `timestamp`.
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, region: &str, service: &str) -> Self {
        Self {
            date: timestamp.format(SCOPE_DATE_FORMAT).to_string(),
            region: region.to_owned(),
            service: service.to_owned(),
        }
    }

    /// Derive the signing key for this scope.
    #[must_use]
    pub fn signing_key(&self, secret_key: &str) -> Vec<u8> {
        derive_signing_key(secret_key, &self.date, &self.region, &self.service)
    }
}

impl fmt::Display for SigningScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{SCOPE_TERMINATOR}",
            self.date, self.region, self.service
        )
    }
}

/// Output of header-based signing.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    /// Headers to add to the request: `authorization`, `x-amz-date`,
    /// `x-amz-content-sha256`, and `x-amz-security-token` when a session token is used.
    pub headers: HeaderMap,
    /// The hex-encoded signature.
    pub signature: String,
    /// The signing instant.
    pub timestamp: DateTime<Utc>,
    /// The signed header names, semicolon-joined.
    pub signed_headers: String,
}

impl SignedRequest {
    /// Copy the signing headers onto `req`, adding `host` if it is missing.
    pub fn apply_to<B>(&self, req: &mut http::Request<B>, host: &str) -> Result<(), AuthError> {
        if !req.headers().contains_key(HOST) {
            let value = HeaderValue::from_str(host)
                .map_err(|e| AuthError::Encoding(format!("host {host:?}: {e}")))?;
            req.headers_mut().insert(HOST, value);
        }
        for (name, value) in &self.headers {
            req.headers_mut().insert(name.clone(), value.clone());
        }
        Ok(())
    }
}

/// The result of a successful SigV4 verification.
#[derive(Debug, Clone)]
pub struct AuthResult {
    /// The access key ID that signed the request.
    pub access_key_id: String,
    /// The AWS region from the credential scope.
    pub region: String,
    /// The AWS service from the credential scope.
    pub service: String,
    /// The list of headers that were included in the signature.
    pub signed_headers: Vec<String>,
}

/// Parsed components of an AWS SigV4 `Authorization` header.
///
/// Format:
/// ```text
/// AWS4-HMAC-SHA256 Credential=AKID/20130524/us-east-1/s3/aws4_request,
///   SignedHeaders=host;x-amz-content-sha256;x-amz-date,
///   Signature=<hex-signature>
/// ```
#[derive(Debug, Clone)]
pub struct ParsedAuth {
    /// The signing algorithm.
    pub algorithm: SigningAlgorithm,
    /// The access key ID.
    pub access_key_id: String,
    /// The date component of the credential scope (YYYYMMDD).
    pub date: String,
    /// The AWS region from the credential scope.
    pub region: String,
    /// The AWS service from the credential scope.
    pub service: String,
    /// The list of signed header names (lowercase).
    pub signed_headers: Vec<String>,
    /// The hex-encoded signature.
    pub signature: String,
}

/// Sign `descriptor` with `credential` at `now`, producing the headers to attach.
///
/// The signed header set is `host`, `x-amz-content-sha256`, `x-amz-date`,
/// `x-amz-security-token` (with a session token), and every header already on
/// the descriptor except `authorization` and `user-agent`.
///
/// # Errors
///
/// Returns [`AuthError::InvalidRequest`] if the descriptor has no host, or
/// [`AuthError::Encoding`] if a header value is not valid UTF-8.
pub fn sign_request(
    descriptor: &RequestDescriptor,
    credential: &Credential,
    region: &str,
    service: &str,
    now: DateTime<Utc>,
) -> Result<SignedRequest, AuthError> {
    let host = descriptor.require_host()?;
    let timestamp = now.format(AMZ_DATE_FORMAT).to_string();
    let payload_hash = descriptor.payload.as_str();

    let mut added = HeaderMap::new();
    added.insert(
        HeaderName::from_static(X_AMZ_DATE),
        header_value(X_AMZ_DATE, &timestamp)?,
    );
    added.insert(
        HeaderName::from_static(X_AMZ_CONTENT_SHA256),
        header_value(X_AMZ_CONTENT_SHA256, payload_hash)?,
    );
    if let Some(token) = credential.session_token() {
        let mut value = header_value(X_AMZ_SECURITY_TOKEN, token)?;
        value.set_sensitive(true);
        added.insert(HeaderName::from_static(X_AMZ_SECURITY_TOKEN), value);
    }

    let mut all_headers = descriptor.headers.clone();
    for (name, value) in &added {
        all_headers.insert(name.clone(), value.clone());
    }

    let canonical = canonicalize(
        &descriptor.method,
        &descriptor.path,
        &descriptor.query,
        host,
        &all_headers,
        payload_hash,
    )?;
    debug!(canonical_request = %canonical, "Built canonical request");

    let scope = SigningScope::new(now, region, service);
    let string_to_sign = build_string_to_sign(&timestamp, &scope.to_string(), &canonical.hash());
    debug!(string_to_sign, "Built string to sign");

    let signature = compute_signature(
        &scope.signing_key(credential.secret_access_key()),
        &string_to_sign,
    );

    let authorization = format!(
        "{SUPPORTED_ALGORITHM} Credential={}/{scope}, SignedHeaders={}, Signature={signature}",
        credential.access_key_id(),
        canonical.signed_headers,
    );
    added.insert(AUTHORIZATION, header_value("authorization", &authorization)?);

    debug!(
        access_key_id = %credential.access_key_id(),
        %scope,
        signed_headers = %canonical.signed_headers,
        "Signed request"
    );

    Ok(SignedRequest {
        headers: added,
        signature,
        timestamp: now,
        signed_headers: canonical.signed_headers,
    })
}

/// Parse an `X-Amz-Date` value (`YYYYMMDDTHHMMSSZ`).
///
/// # Errors
///
/// Returns [`AuthError::InvalidDate`] if the value is not in ISO 8601 basic format.
pub fn parse_amz_date(timestamp: &str) -> Result<DateTime<Utc>, AuthError> {
    NaiveDateTime::parse_from_str(timestamp, AMZ_DATE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| AuthError::InvalidDate(timestamp.to_owned()))
}

/// Parse an AWS SigV4 `Authorization` header value into its components.
///
/// # Errors
///
/// Returns [`AuthError::InvalidAuthHeader`] if the header format is invalid,
/// or [`AuthError::UnsupportedAlgorithm`] if the algorithm is not `AWS4-HMAC-SHA256`.
pub fn parse_authorization_header(header: &str) -> Result<ParsedAuth, AuthError> {
    let (algorithm, rest) = header.split_once(' ').ok_or(AuthError::InvalidAuthHeader)?;
    let algorithm: SigningAlgorithm = algorithm.parse()?;

    let mut credential = None;
    let mut signed_headers = None;
    let mut signature = None;

    for part in rest.split(',') {
        let part = part.trim();
        if let Some(value) = part.strip_prefix("Credential=") {
            credential = Some(value);
        } else if let Some(value) = part.strip_prefix("SignedHeaders=") {
            signed_headers = Some(value);
        } else if let Some(value) = part.strip_prefix("Signature=") {
            signature = Some(value);
        }
    }

    let credential = credential.ok_or(AuthError::InvalidAuthHeader)?;
    let signed_headers = signed_headers.ok_or(AuthError::InvalidAuthHeader)?;
    let signature = signature.ok_or(AuthError::InvalidAuthHeader)?;

    // AKID/date/region/service/aws4_request
    let cred_parts: Vec<&str> = credential.splitn(5, '/').collect();
    if cred_parts.len() != 5 || cred_parts[4] != SCOPE_TERMINATOR {
        return Err(AuthError::InvalidCredential);
    }

    Ok(ParsedAuth {
        algorithm,
        access_key_id: cred_parts[0].to_owned(),
        date: cred_parts[1].to_owned(),
        region: cred_parts[2].to_owned(),
        service: cred_parts[3].to_owned(),
        signed_headers: signed_headers.split(';').map(ToOwned::to_owned).collect(),
        signature: signature.to_owned(),
    })
}

/// Build the SigV4 string to sign.
///
/// Format:
/// ```text
/// AWS4-HMAC-SHA256\n
/// <ISO8601 timestamp>\n
/// <credential_scope>\n
/// <hex(SHA256(canonical_request))>
/// ```
///
/// # Examples
///
/// ```
/// use sigmock_auth::sigv4::build_string_to_sign;
///
/// let sts = build_string_to_sign(
///     "20130524T000000Z",
///     "20130524/us-east-1/s3/aws4_request",
///     "7344ae5b7ee6c3e7e6b0fe0640412a37625d1fbfff95c48bbb2dc43964946972",
/// );
/// assert!(sts.starts_with("AWS4-HMAC-SHA256\n20130524T000000Z\n"));
/// ```
#[must_use]
pub fn build_string_to_sign(
    timestamp: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{SUPPORTED_ALGORITHM}\n{timestamp}\n{credential_scope}\n{canonical_request_hash}")
}

/// Derive the SigV4 signing key using HMAC-SHA256 chain.
///
/// ```text
/// DateKey              = HMAC-SHA256("AWS4" + secret_key, date)
/// DateRegionKey        = HMAC-SHA256(DateKey, region)
/// DateRegionServiceKey = HMAC-SHA256(DateRegionKey, service)
/// SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
/// ```
///
/// # Examples
///
/// ```
/// use sigmock_auth::sigv4::derive_signing_key;
///
/// let key = derive_signing_key(
///     "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY",
///     "20130524",
///     "us-east-1",
///     "s3",
/// );
/// assert_eq!(key.len(), 32);
/// ```
#[must_use]
pub fn derive_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let date_region_key = hmac_sha256(&date_key, region.as_bytes());
    let date_region_service_key = hmac_sha256(&date_region_key, service.as_bytes());
    hmac_sha256(&date_region_service_key, SCOPE_TERMINATOR.as_bytes())
}

/// Compute the HMAC-SHA256 signature of `data` using the given `signing_key`.
///
/// Returns the lower-case hex-encoded signature (64 characters).
#[must_use]
pub fn compute_signature(signing_key: &[u8], data: &str) -> String {
    hex::encode(hmac_sha256(signing_key, data.as_bytes()))
}

/// Sign a string to sign with the given algorithm name.
///
/// # Errors
///
/// Returns [`AuthError::UnsupportedAlgorithm`] for anything but `AWS4-HMAC-SHA256`.
pub fn compute_signature_with(
    algorithm: &str,
    signing_key: &[u8],
    string_to_sign: &str,
) -> Result<String, AuthError> {
    match algorithm.parse::<SigningAlgorithm>()? {
        SigningAlgorithm::Aws4HmacSha256 => Ok(compute_signature(signing_key, string_to_sign)),
    }
}

/// Verify an AWS SigV4-signed HTTP request.
///
/// # Errors
///
/// Returns an [`AuthError`] if:
/// - The `Authorization` header is missing or malformed
/// - The access key is not found
/// - Required signed headers are missing
/// - The signature does not match
pub fn verify_sigv4(
    parts: &http::request::Parts,
    body_hash: &str,
    credential_provider: &dyn CredentialProvider,
) -> Result<AuthResult, AuthError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    debug!(auth_header, "Parsing SigV4 authorization header");

    let parsed = parse_authorization_header(auth_header)?;
    let secret_key = credential_provider.get_secret_key(&parsed.access_key_id)?;
    let timestamp = extract_header_value(parts, X_AMZ_DATE)?;

    debug!(
        access_key_id = %parsed.access_key_id,
        date = %parsed.date,
        region = %parsed.region,
        service = %parsed.service,
        "Verifying SigV4 signature"
    );

    let signed_header_refs: Vec<&str> = parsed.signed_headers.iter().map(String::as_str).collect();
    let canonical = CanonicalRequest::from_received(
        parts,
        parts.uri.query().unwrap_or(""),
        &signed_header_refs,
        body_hash,
    )?;
    debug!(canonical_request = %canonical, "Rebuilt canonical request");

    let scope = SigningScope {
        date: parsed.date,
        region: parsed.region,
        service: parsed.service,
    };
    check_signature(&canonical, &timestamp, &scope, &secret_key, &parsed.signature)?;

    Ok(AuthResult {
        access_key_id: parsed.access_key_id,
        region: scope.region,
        service: scope.service,
        signed_headers: parsed.signed_headers,
    })
}

/// Recompute the signature of `canonical` under `scope` and compare it with
/// `provided` in constant time.
pub(crate) fn check_signature(
    canonical: &CanonicalRequest,
    timestamp: &str,
    scope: &SigningScope,
    secret_key: &str,
    provided: &str,
) -> Result<(), AuthError> {
    let string_to_sign = build_string_to_sign(timestamp, &scope.to_string(), &canonical.hash());
    debug!(string_to_sign, "Built string to sign");

    let expected = compute_signature(&scope.signing_key(secret_key), &string_to_sign);
    if signatures_match(provided, &expected) {
        debug!(%scope, "Signature verification succeeded");
        Ok(())
    } else {
        debug!(%expected, %provided, "Signature mismatch");
        Err(AuthError::SignatureDoesNotMatch)
    }
}

/// Constant-time comparison of two hex signatures.
fn signatures_match(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

fn extract_header_value(parts: &http::request::Parts, name: &str) -> Result<String, AuthError> {
    parts
        .headers
        .get(name)
        .ok_or_else(|| AuthError::MissingHeader(name.to_owned()))?
        .to_str()
        .map(ToOwned::to_owned)
        .map_err(|_| AuthError::MissingHeader(name.to_owned()))
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, AuthError> {
    HeaderValue::from_str(value).map_err(|e| AuthError::Encoding(format!("header {name}: {e}")))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Compute the SHA-256 hash of the given payload and return it as a hex string.
///
/// # Examples
///
/// ```
/// use sigmock_auth::sigv4::hash_payload;
///
/// assert_eq!(
///     hash_payload(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}
