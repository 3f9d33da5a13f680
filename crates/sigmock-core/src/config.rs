//! Configuration for the signer and the mock dispatcher.
//!
//! Values default to what the S3 presigning tests expect and can be overridden
//! from environment variables via [`SigmockConfig::from_env`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use typed_builder::TypedBuilder;

use crate::error::{CoreError, CoreResult};
use crate::types::AwsRegion;

/// Longest validity a presigned URL may carry: seven days, in seconds.
pub const MAX_PRESIGN_EXPIRES_SECS: u64 = 604_800;

/// sigmock configuration.
///
/// # Examples
///
/// ```
/// use sigmock_core::SigmockConfig;
///
/// let config = SigmockConfig::builder().service("s3".to_owned()).build();
/// assert_eq!(config.presign_expires_secs, 900);
/// assert_eq!(config.default_region.as_str(), "us-east-1");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct SigmockConfig {
    /// Region used in the credential scope.
    #[builder(default)]
    pub default_region: AwsRegion,

    /// Service name used in the credential scope.
    #[builder(default = String::from("s3"))]
    pub service: String,

    /// Default validity for presigned URLs, in seconds.
    #[builder(default = 900)]
    pub presign_expires_secs: u64,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// Whether the presigned URL validator recomputes signatures when it
    /// has credentials available.
    #[builder(default = true)]
    pub verify_signatures: bool,
}

impl Default for SigmockConfig {
    fn default() -> Self {
        Self {
            default_region: AwsRegion::default(),
            service: String::from("s3"),
            presign_expires_secs: 900,
            log_level: String::from("info"),
            verify_signatures: true,
        }
    }
}

impl SigmockConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `AWS_REGION`, then `DEFAULT_REGION` | `default_region` |
    /// | `SIGMOCK_SERVICE` | `service` |
    /// | `SIGMOCK_PRESIGN_EXPIRES` | `presign_expires_secs` |
    /// | `LOG_LEVEL` | `log_level` |
    /// | `SIGMOCK_VERIFY_SIGNATURES` | `verify_signatures` |
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] if `SIGMOCK_PRESIGN_EXPIRES` is not an
    /// integer in `[1, 604800]`.
    pub fn from_env() -> CoreResult<Self> {
        let mut config = Self::default();

        if let Some(v) = env_var("AWS_REGION").or_else(|| env_var("DEFAULT_REGION")) {
            config.default_region = AwsRegion::new(v);
        }
        if let Some(v) = env_var("SIGMOCK_SERVICE") {
            config.service = v;
        }
        if let Some(v) = env_var("SIGMOCK_PRESIGN_EXPIRES") {
            config.presign_expires_secs = v.parse().map_err(|_| {
                CoreError::Config(format!("SIGMOCK_PRESIGN_EXPIRES is not an integer: {v}"))
            })?;
        }
        if let Some(v) = env_var("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(v) = env_var("SIGMOCK_VERIFY_SIGNATURES") {
            config.verify_signatures = parse_bool(&v);
        }

        config.validate()?;
        debug!(?config, "Loaded configuration from environment");
        Ok(config)
    }

    /// Check that the configured values are usable.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] if the presign expiry is out of range.
    pub fn validate(&self) -> CoreResult<()> {
        if !(1..=MAX_PRESIGN_EXPIRES_SECS).contains(&self.presign_expires_secs) {
            return Err(CoreError::Config(format!(
                "presign expiry must be between 1 and {MAX_PRESIGN_EXPIRES_SECS} seconds, got {}",
                self.presign_expires_secs
            )));
        }
        Ok(())
    }

    /// The default presign validity as a [`Duration`].
    #[must_use]
    pub fn presign_expires(&self) -> Duration {
        Duration::from_secs(self.presign_expires_secs)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
