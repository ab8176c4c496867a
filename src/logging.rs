use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub const DEBUG_LOG_FILE: &str = "sponsorbox_debug.log";

/// With `debug`, everything goes to [`DEBUG_LOG_FILE`] at debug level.
/// Otherwise stderr, filtered by `RUST_LOG` (default `info`).
pub fn init(debug: bool) -> Result<()> {
    if debug {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(DEBUG_LOG_FILE)
            .context("Failed to open debug log")?;
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("sponsorbox=debug,info"))
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e))?;
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e))?;
    }
    Ok(())
}
