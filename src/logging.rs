use std::io::IsTerminal as _;

use anyhow::Context as _;
use tracing_subscriber::EnvFilter;

/// Log filter variable; `RUST_LOG` is honoured when it is unset.
pub const LOG_ENV: &str = "BOOKCART_LOG";

/// Diagnostics (malformed storage codes, store activity) go to stderr so
/// that stdout stays clean for the catalogue listing and the pick-list.
pub fn init() -> anyhow::Result<()> {
    let filter = build_filter(std::env::var(LOG_ENV).ok().as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}

fn build_filter(directives: Option<&str>) -> anyhow::Result<EnvFilter> {
    match directives.map(str::trim).filter(|d| !d.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("parse {LOG_ENV}={directives:?}")),
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("info"))
            .context("build log filter"),
    }
}
