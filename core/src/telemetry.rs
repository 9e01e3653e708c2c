use anyhow::Result;
use std::sync::OnceLock;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Route `tracing` output to stderr so it never mixes with chat text on stdout.
///
/// `RUST_LOG` takes precedence over `default_directive`. Only the first call
/// installs a subscriber; later calls return `Ok(())`.
pub fn init_logging(default_directive: &str) -> Result<()> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }

    tracing_subscriber::registry()
        .with(log_filter(default_directive)?)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()?;
    INSTALLED.set(()).ok();

    Ok(())
}

fn log_filter(default_directive: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(default_directive)?),
    }
}
