//! Error types for SigV4 signing and verification.
//!
//! All signing and authentication failures are represented by [`AuthError`].
//! Signing errors describe a malformed request and are never retried.

/// Errors that can occur while signing or verifying AWS Signature Version 4 requests.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Input bytes could not be decoded (e.g. a header value that is not UTF-8).
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The request descriptor is missing a required field or cannot be parsed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The presign expiry is not a whole number of seconds in `[1, 604800]`.
    #[error("Invalid expiry: {0} (must be a whole number of seconds between 1 and 604800)")]
    InvalidExpiry(String),

    /// The `Authorization` header is missing from the request.
    #[error("Missing Authorization header")]
    MissingAuthHeader,

    /// The `Authorization` header could not be parsed.
    #[error("Invalid Authorization header format")]
    InvalidAuthHeader,

    /// The signing algorithm is not supported (only AWS4-HMAC-SHA256 is supported).
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// A required HTTP header referenced in `SignedHeaders` is missing.
    #[error("Missing required header: {0}")]
    MissingHeader(String),

    /// The `Credential` component does not match the expected format
    /// (`AKID/date/region/service/aws4_request`).
    #[error("Invalid credential format")]
    InvalidCredential,

    /// `X-Amz-Date` is not `YYYYMMDDTHHMMSSZ` or falls outside the credential scope date.
    #[error("Invalid X-Amz-Date: {0}")]
    InvalidDate(String),

    /// The access key ID was not found in the credential store.
    #[error("Access key not found: {0}")]
    AccessKeyNotFound(String),

    /// The computed signature does not match the provided signature.
    #[error("Signature does not match")]
    SignatureDoesNotMatch,

    /// The presigned URL has expired (current time exceeds `X-Amz-Date` + `X-Amz-Expires`).
    #[error("Request has expired")]
    RequestExpired,

    /// A required query parameter for presigned URL authentication is missing.
    #[error("Missing required parameter: {0}")]
    MissingQueryParam(String),
}
