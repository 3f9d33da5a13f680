//! sigmock-presign - presign a URL or sign a request with AWS Signature Version 4.
//!
//! # Usage
//!
//! ```text
//! sigmock-presign [--headers] [-X METHOD] [--expires SECS] URL
//! ```
//!
//! Without `--headers` the presigned URL is printed. With `--headers` the
//! signing headers for the request are printed, one `name: value` per line.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `AWS_ACCESS_KEY_ID` | *(required)* | Access key ID (`--access-key-id`) |
//! | `AWS_SECRET_ACCESS_KEY` | *(required)* | Secret access key (`--secret-access-key`) |
//! | `AWS_SESSION_TOKEN` | *(unset)* | Session token for temporary credentials (`--session-token`) |
//! | `AWS_REGION` / `DEFAULT_REGION` | `us-east-1` | Signing region |
//! | `SIGMOCK_SERVICE` | `s3` | Signing service |
//! | `SIGMOCK_PRESIGN_EXPIRES` | `900` | Presigned URL validity in seconds (`--expires`) |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use http::Method;
use sigmock_auth::{Credential, RequestDescriptor, Signer};
use sigmock_core::SigmockConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "sigmock-presign")]
#[command(about = "Presign a URL or sign a request with AWS Signature Version 4")]
#[command(version)]
struct Args {
    /// Print the signing headers instead of a presigned URL
    #[arg(long)]
    headers: bool,

    /// HTTP method to sign
    #[arg(short = 'X', long, default_value = "GET", value_parser = parse_method)]
    method: Method,

    /// Presigned URL validity in seconds (overrides SIGMOCK_PRESIGN_EXPIRES)
    #[arg(long)]
    expires: Option<u64>,

    /// AWS access key ID
    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    access_key_id: String,

    /// AWS secret access key
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    secret_access_key: String,

    /// AWS session token for temporary credentials
    #[arg(long, env = "AWS_SESSION_TOKEN", hide_env_values = true, default_value = "")]
    session_token: String,

    /// Absolute URL to sign
    url: String,
}

impl Args {
    fn credential(&self) -> Credential {
        Credential::new(
            self.access_key_id.clone(),
            self.secret_access_key.clone(),
            self.session_token.clone(),
        )
    }

    fn presign_expires(&self, config: &SigmockConfig) -> Duration {
        self.expires
            .map_or_else(|| config.presign_expires(), Duration::from_secs)
    }
}

fn parse_method(value: &str) -> Result<Method, String> {
    Method::from_bytes(value.to_uppercase().as_bytes())
        .map_err(|e| format!("invalid HTTP method {value:?}: {e}"))
}

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
/// Logs go to stderr so stdout carries only the result.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn run(args: &Args, signer: &Signer, config: &SigmockConfig) -> Result<String> {
    let descriptor = RequestDescriptor::new(args.method.clone(), &args.url)
        .with_context(|| format!("invalid URL: {}", args.url))?;
    let now = Utc::now();

    if args.headers {
        let signed = signer
            .sign(&descriptor, now)
            .context("failed to sign request")?;
        let lines = signed
            .headers
            .iter()
            .map(|(name, value)| format!("{name}: {}", value.to_str().unwrap_or_default()))
            .collect::<Vec<_>>();
        return Ok(lines.join("\n"));
    }

    let presigned = signer
        .presign(&descriptor, now, args.presign_expires(config))
        .context("failed to presign URL")?;
    info!(expires_at = %presigned.expires_at, "presigned URL");
    Ok(presigned.url)
}

fn main() -> Result<()> {
    let config = SigmockConfig::from_env().context("invalid configuration")?;

    init_tracing(&config.log_level)?;

    let args = Args::parse();
    let signer = Signer::from_config(args.credential(), &config);

    info!(
        method = %args.method,
        region = %signer.region(),
        service = %signer.service(),
        "signing request",
    );

    println!("{}", run(&args, &signer, &config)?);
    Ok(())
}
