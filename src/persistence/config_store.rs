use super::{Config, ConfigError};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CONFIG_DIR: &str = "joymon";
const CONFIG_FILE: &str = "config.toml";

/// Reads and writes the settings file.
///
/// The file is a flat TOML table; see [`super::StoredConfig`] for the keys.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under the platform configuration directory.
    pub fn default_location() -> Result<Self, ConfigError> {
        let mut path = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored configuration.
    ///
    /// A missing file is not an error: the defaults are returned. Missing keys
    /// inside an existing file take their default values.
    pub fn load(&self) -> Result<Config, ConfigError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(
                    "No config file at {}, using defaults",
                    self.path.display()
                );
                return Ok(Config::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })?;
        debug!("Loaded config: {:?}", config);
        info!("Config loaded from {}", self.path.display());
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.path, content).map_err(|source| {
            warn!("Writing config to {} failed: {}", self.path.display(), source);
            ConfigError::Write {
                path: self.path.clone(),
                source,
            }
        })?;

        info!("Config saved to {}", self.path.display());
        Ok(())
    }
}
