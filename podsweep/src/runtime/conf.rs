use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;

use crate::{
    gc::opts::PodGcOptions,
    health::ApiOptions,
    k8s::opts::K8sOptions,
    metrics::opts::MetricsOptions,
    runtime::{
        cli::Cli,
        conf::conf_serde::{duration, level},
    },
};

pub mod conf_serde;

/// Prefix of environment variables that override configuration keys.
/// Nested keys are separated by `__`, e.g. `PODSWEEP_POD_GC__DELETE_DELAY=30s`.
const ENV_PREFIX: &str = "PODSWEEP_";

/// Application configuration.
///
/// Values are layered, lowest priority first: built-in defaults, the YAML
/// configuration file, `PODSWEEP_*` environment variables, then CLI flags.
#[derive(Debug, Deserialize, Serialize)]
pub struct Conf {
    /// Path of the file this configuration was loaded from, if any. Not part
    /// of the file itself.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    #[serde(with = "level")]
    pub log_level: Level,

    /// Health endpoints (`/livez`, `/readyz`).
    #[serde(default)]
    pub api: ApiOptions,

    /// Prometheus scrape endpoint (`/metrics`).
    #[serde(default)]
    pub metrics: MetricsOptions,

    /// Cleanup of the metric series of deleted pods.
    #[serde(default)]
    pub pod_gc: PodGcOptions,

    #[serde(default)]
    pub k8s: K8sOptions,

    /// Maximum time to wait for background tasks to stop on shutdown.
    /// - Default: 5s
    #[serde(default = "defaults::shutdown_timeout", with = "duration")]
    pub shutdown_timeout: Duration,
}

impl Default for Conf {
    fn default() -> Self {
        Self {
            config_path: None,
            log_level: Level::INFO,
            api: ApiOptions::default(),
            metrics: MetricsOptions::default(),
            pod_gc: PodGcOptions::default(),
            k8s: K8sOptions::default(),
            shutdown_timeout: defaults::shutdown_timeout(),
        }
    }
}

mod defaults {
    use std::time::Duration;

    pub fn shutdown_timeout() -> Duration {
        Duration::from_secs(5)
    }
}

impl Conf {
    /// Builds the configuration from defaults, the optional config file named
    /// by `cli`, the environment, and finally `cli` itself.
    ///
    /// # Errors
    /// * `ConfigError::NoConfigFile` - the config path does not exist.
    /// * `ConfigError::InvalidConfigPath` - the config path is not a file.
    /// * `ConfigError::InvalidExtension` - the file is not `.yaml`/`.yml`.
    /// * `ConfigError::Extraction` - a value failed to parse.
    pub fn new(cli: Cli) -> Result<(Self, Cli), ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Conf::default()));

        let config_path_to_store = if let Some(config_path) = &cli.config {
            validate_config_path(config_path)?;
            figment = figment.merge(Yaml::file(config_path));
            Some(config_path.clone())
        } else {
            None
        };

        figment = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(&cli));

        let mut conf: Conf = figment.extract()?;

        conf.config_path = config_path_to_store;
        Ok((conf, cli))
    }
}

/// Checks that `path` is an existing file with a `yaml` or `yml` extension.
fn validate_config_path(path: &Path) -> Result<(), ConfigError> {
    if !path.is_file() {
        if path.exists() {
            return Err(ConfigError::InvalidConfigPath(
                path.to_string_lossy().into_owned(),
            ));
        }
        return Err(ConfigError::NoConfigFile);
    }

    match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => Ok(()),
        Some(ext) => Err(ConfigError::InvalidExtension(ext.to_string())),
        None => Err(ConfigError::InvalidExtension("none".to_string())),
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The specified configuration file does not exist.
    #[error("no config file provided")]
    NoConfigFile,

    /// The path exists but is not a file (e.g., it's a directory).
    #[error("path '{0}' is not a valid file")]
    InvalidConfigPath(String),

    #[error("invalid file extension '.{0}', expected 'yaml' or 'yml'")]
    InvalidExtension(String),

    #[error("configuration error: {0}")]
    Extraction(#[source] Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Extraction(Box::new(e))
    }
}
