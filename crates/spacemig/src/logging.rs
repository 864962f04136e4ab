//! Tracing setup. Logs always go to stderr so stdout carries only JSON results.

use std::io;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt as tsfmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_FILTER: &str = "info";

/// `--log-level` wins over `RUST_LOG`; both fall back to `info`.
fn build_filter(level: Option<&str>) -> Result<EnvFilter> {
    match level {
        Some(level) => {
            EnvFilter::try_new(level).with_context(|| format!("invalid log filter `{level}`"))
        }
        None => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))),
    }
}

pub fn init_tracing(level: Option<&str>, json: bool) -> Result<()> {
    let filter = build_filter(level)?;
    if json {
        let layer = tsfmt::layer()
            .event_format(tsfmt::format().json())
            .with_level(true)
            .with_target(true)
            .with_writer(io::stderr);
        registry()
            .with(filter)
            .with(layer)
            .try_init()
            .context("failed to initialize logging")?;
    } else {
        let layer = tsfmt::layer()
            .with_level(true)
            .with_target(false)
            .compact()
            .with_writer(io::stderr);
        registry()
            .with(filter)
            .with(layer)
            .try_init()
            .context("failed to initialize logging")?;
    }
    Ok(())
}
