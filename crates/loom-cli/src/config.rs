//! Application configuration.
//!
//! [`AppConfig`] is loaded once at startup and passed down by value.  The
//! CLI layer owns config; the core crate only sees the pieces it needs
//! ([`HistoryConfig`], [`GenerationSettings`]).
//!
//! # Resolution order (highest priority first)
//!
//! 1. Environment variables (`LOOM_HISTORY__MAX_UNDO=50`)
//! 2. The file given with `--config`
//! 3. `.loom.toml` in the current directory
//! 4. The global config file (see [`AppConfig::config_path`])
//! 5. Built-in defaults

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::debug;

use loom_core::application::{GenerationSettings, HistoryConfig};

/// Name of the per-directory config file.
pub const LOCAL_CONFIG: &str = ".loom.toml";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Undo history limits.
    pub history: HistoryConfig,
    /// Generation run settings.
    pub generation: GenerationSettings,
    /// Output settings.
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub no_color: bool,
}

impl AppConfig {
    /// Load configuration by layering defaults, files and the environment.
    ///
    /// An explicit `config_file` must exist; the global and local files are
    /// optional.
    pub fn load(config_file: Option<&PathBuf>) -> anyhow::Result<Self> {
        Self::load_from(Self::config_path().as_path(), Path::new(LOCAL_CONFIG), config_file)
    }

    fn load_from(
        global: &Path,
        local: &Path,
        explicit: Option<&PathBuf>,
    ) -> anyhow::Result<Self> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&Self::default()).context("encoding defaults")?)
            .add_source(File::from(global).format(FileFormat::Toml).required(false))
            .add_source(File::from(local).format(FileFormat::Toml).required(false));

        if let Some(path) = explicit {
            debug!(path = %path.display(), "Using explicit config file");
            builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Toml));
        }

        builder
            .add_source(
                Environment::with_prefix("LOOM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("reading configuration")?
            .try_deserialize()
            .context("invalid configuration")
    }

    /// Path to the global configuration file.
    ///
    /// Uses `directories::ProjectDirs` for cross-platform correctness,
    /// falling back to `.loom.toml` in the current directory.
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("dev", "loom", "loom")
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG))
    }

    /// Pretty TOML rendering, as written by `loom init`.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("serialising configuration")
    }
}
