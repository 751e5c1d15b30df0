use tracing::Level;
use tracing_subscriber::{
    EnvFilter, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::runtime::RuntimeError;

/// Installs the global `tracing` subscriber.
///
/// `level` is the default directive; `RUST_LOG` directives refine it, e.g.
/// `RUST_LOG=podsweep::gc=trace,kube=warn`.
pub fn init_logger(level: Level) -> Result<(), RuntimeError> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()?;

    Ok(())
}
