use tracing_subscriber::{fmt, EnvFilter};

use crate::{errors::Error, Result};

/// Initialize tracing for the exporter.
///
/// `level` overrides the default directive for our own crates; `RUST_LOG`
/// still wins when set.
pub fn init(service_name: &str, level: Option<&str>) -> Result<()> {
    let level = level.unwrap_or("info");

    // grammers is chatty at info (reconnects, dc migrations).
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,tgx={level},tgx_core={level},tgx_telegram={level},{service_name}={level}"
        ))
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .try_init()
        .map_err(|e| Error::External(format!("logging init failed: {e}")))?;

    Ok(())
}
