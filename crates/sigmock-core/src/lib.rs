//! Core types, configuration, and clock abstraction for sigmock.
//!
//! This crate provides the building blocks shared by the signer and the mock
//! dispatcher: environment-driven configuration, a pluggable time source so
//! expiry checks can be driven deterministically in tests, and common AWS
//! type definitions.

mod clock;
mod config;
mod error;
mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{MAX_PRESIGN_EXPIRES_SECS, SigmockConfig};
pub use error::{CoreError, CoreResult};
pub use types::AwsRegion;
