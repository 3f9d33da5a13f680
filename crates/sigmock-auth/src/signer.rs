//! A credential bound to a region and service.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sigmock_core::SigmockConfig;

use crate::credentials::Credential;
use crate::error::AuthError;
use crate::presigned::{PresignedUrl, presign_url};
use crate::request::RequestDescriptor;
use crate::sigv4::{SignedRequest, sign_request};

/// Signs requests and presigns URLs for one credential, region and service.
///
/// The signer holds no mutable state; share it freely across threads.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use chrono::Utc;
/// use http::Method;
/// use sigmock_auth::{Credential, RequestDescriptor, Signer};
///
/// let signer = Signer::new(Credential::new("AKID", "secret", ""), "us-west-2", "s3");
/// let descriptor =
///     RequestDescriptor::new(Method::GET, "https://test-bucket.s3.us-west-2.amazonaws.com/k")
///         .unwrap();
/// let presigned = signer
///     .presign(&descriptor, Utc::now(), Duration::from_secs(900))
///     .unwrap();
/// assert!(presigned.url.contains("X-Amz-Expires=900"));
/// ```
#[derive(Debug, Clone)]
pub struct Signer {
    credential: Credential,
    region: String,
    service: String,
}

impl Signer {
    /// Create a signer.
    #[must_use]
    pub fn new(credential: Credential, region: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            credential,
            region: region.into(),
            service: service.into(),
        }
    }

    /// Create a signer using the region and service from `config`.
    #[must_use]
    pub fn from_config(credential: Credential, config: &SigmockConfig) -> Self {
        Self::new(
            credential,
            config.default_region.as_str(),
            config.service.as_str(),
        )
    }

    /// The credential this signer uses.
    #[must_use]
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// The signing region.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// The signing service.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Sign `descriptor` with headers. See [`sign_request`].
    ///
    /// # Errors
    ///
    /// Propagates the [`AuthError`] of [`sign_request`].
    pub fn sign(
        &self,
        descriptor: &RequestDescriptor,
        now: DateTime<Utc>,
    ) -> Result<SignedRequest, AuthError> {
        sign_request(descriptor, &self.credential, &self.region, &self.service, now)
    }

    /// Presign `descriptor`. See [`presign_url`].
    ///
    /// # Errors
    ///
    /// Propagates the [`AuthError`] of [`presign_url`].
    pub fn presign(
        &self,
        descriptor: &RequestDescriptor,
        now: DateTime<Utc>,
        expires: Duration,
    ) -> Result<PresignedUrl, AuthError> {
        presign_url(
            descriptor,
            &self.credential,
            &self.region,
            &self.service,
            now,
            expires,
        )
    }
}
