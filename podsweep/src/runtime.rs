use clap::Parser;
use thiserror::Error;
use tracing_subscriber::util::TryInitError;

use crate::runtime::{
    cli::Cli,
    conf::{Conf, ConfigError},
};

pub mod cli;
pub mod conf;
pub mod task_manager;
pub mod telemetry;

pub struct Runtime {
    pub conf: Conf,
}

impl Runtime {
    /// Parses the command line and loads the layered configuration.
    pub fn new() -> Result<Self, RuntimeError> {
        let cli = Cli::parse();
        let (conf, _cli) = Conf::new(cli)?;

        Ok(Runtime { conf })
    }
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to initialize logging: {0}")]
    Logging(#[from] TryInitError),
}
