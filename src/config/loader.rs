//! Configuration file loader.

use std::io;
use std::path::{Path, PathBuf};

use super::types::ViewerConfig;

/// Where a [`ConfigLoader`] looks for its file.
#[derive(Debug)]
enum Source {
    /// A path the user named; it has to exist.
    Explicit(PathBuf),
    /// Candidates tried in order; none of them has to exist.
    Search(Vec<PathBuf>),
}

/// A loaded configuration and the file it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    pub config: ViewerConfig,
    /// `None` when no file was found and the defaults apply.
    pub source: Option<PathBuf>,
}

/// Loads a [`ViewerConfig`] from an explicit file or the default locations.
#[derive(Debug)]
pub struct ConfigLoader {
    source: Source,
}

impl ConfigLoader {
    /// Search `./.buggrabber-viewer.toml`, then
    /// `<config dir>/buggrabber-viewer/config.toml`.
    #[must_use]
    pub fn new() -> Self {
        let mut candidates = vec![PathBuf::from(".buggrabber-viewer.toml")];
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("buggrabber-viewer").join("config.toml"));
        }
        Self::searching(candidates)
    }

    /// Load exactly `path`. A missing file is an error rather than a reason
    /// to fall back to defaults.
    #[must_use]
    pub fn explicit(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::Explicit(path.into()),
        }
    }

    fn searching(candidates: Vec<PathBuf>) -> Self {
        Self {
            source: Source::Search(candidates),
        }
    }

    /// Load the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file is missing, or if any file that
    /// exists cannot be read, parsed or validated.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        match &self.source {
            Source::Explicit(path) => Ok(LoadedConfig {
                config: read_config(path)?,
                source: Some(path.clone()),
            }),
            Source::Search(candidates) => {
                for path in candidates {
                    match read_config(path) {
                        Ok(config) => {
                            return Ok(LoadedConfig {
                                config,
                                source: Some(path.clone()),
                            })
                        }
                        Err(ConfigError::NotFound { .. }) => {
                            tracing::trace!(path = %path.display(), "No config file here");
                        }
                        Err(e) => return Err(e),
                    }
                }
                Ok(LoadedConfig {
                    config: ViewerConfig::default(),
                    source: None,
                })
            }
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn read_config(path: &Path) -> Result<ViewerConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ConfigError::NotFound {
            path: path.to_path_buf(),
        },
        _ => ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let config: ViewerConfig = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    if config.file_name.is_empty() {
        return Err(ConfigError::Invalid {
            path: path.to_path_buf(),
            reason: "file_name must not be empty",
        });
    }
    Ok(config)
}

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Failed to read config file {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },

    #[error("Failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid config file {path}: {reason}")]
    Invalid { path: PathBuf, reason: &'static str },
}
