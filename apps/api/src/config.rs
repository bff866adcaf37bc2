use std::time::Duration;

use anyhow::{Context, Result};

use crate::jobs::bounded::DEFAULT_BUDGET;
use crate::jobs::dispatch::DispatchMode;

const DEFAULT_QUEUE_KEY: &str = "resumeforge:analysis_jobs";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Wall-clock ceiling for inline (bounded) execution.
    pub analysis_timeout: Duration,
    pub dispatch_mode: DispatchMode,
    pub queue_key: String,
    /// Number of queue consumer loops spawned in-process. 0 disables them.
    pub queue_workers: usize,
    /// Treat provider errors as hard failures instead of storing them as output.
    pub strict_provider_errors: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: optional_env("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG", "info"),
            analysis_timeout: match std::env::var("ANALYSIS_TIMEOUT_SECS") {
                Ok(secs) => parse_timeout(&secs)
                    .context("ANALYSIS_TIMEOUT_SECS must be a positive whole number of seconds")?,
                Err(_) => DEFAULT_BUDGET,
            },
            dispatch_mode: optional_env("DISPATCH_MODE", "queued")
                .parse::<DispatchMode>()
                .map_err(anyhow::Error::msg)
                .context("DISPATCH_MODE must be 'inline' or 'queued'")?,
            queue_key: optional_env("QUEUE_KEY", DEFAULT_QUEUE_KEY),
            queue_workers: optional_env("QUEUE_WORKERS", "2")
                .parse::<usize>()
                .context("QUEUE_WORKERS must be a non-negative integer")?,
            strict_provider_errors: parse_flag(&optional_env("STRICT_PROVIDER_ERRORS", "false"))
                .context("STRICT_PROVIDER_ERRORS must be true or false")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// A zero budget would time out every inline job before it starts.
fn parse_timeout(value: &str) -> Result<Duration> {
    match value.trim().parse::<u64>()? {
        0 => anyhow::bail!("timeout must be greater than zero"),
        secs => Ok(Duration::from_secs(secs)),
    }
}

/// Accepts the usual spellings of a boolean env flag.
fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("unrecognised boolean '{other}'"),
    }
}
