//! Server configuration.
//!
//! Settings come from an optional TOML file and are then overridden by
//! environment variables:
//!
//! | Variable | Setting |
//! |---|---|
//! | `BIND_ADDR` | `bind_addr` |
//! | `PORT` | `port` |
//! | `DATABASE_PATH` | `database_path` (empty means in-memory) |
//! | `PUSH_ENDPOINT` | `push_endpoint` |
//! | `NOMINATIM_URL` | `nominatim_url` |
//! | `FIREBASE_API_KEY` | `firebase_api_key` |
//!
//! The file is the one passed on the command line, else the one named by
//! `ALERT_SPHERE_CONFIG`, else `alert_sphere.toml` if it exists.

use std::path::{Path, PathBuf};

use alert_sphere_geocoder::nominatim::DEFAULT_REVERSE_URL;
use alert_sphere_identity::DEFAULT_IDENTITY_URL;
use alert_sphere_notify::DEFAULT_PUSH_ENDPOINT;
use serde::Deserialize;
use thiserror::Error;

/// Config file read when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "alert_sphere.toml";

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "ALERT_SPHERE_CONFIG";

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`ServerConfig`].
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// An environment override has an unusable value.
    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },
}

/// Everything the server needs to start.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    /// `SQLite` file for the document store. In-memory when unset.
    pub database_path: Option<PathBuf>,
    /// Base URL of the push delivery service.
    pub push_endpoint: String,
    /// Nominatim reverse endpoint.
    pub nominatim_url: String,
    /// Sign-in is disabled without a key.
    pub firebase_api_key: Option<String>,
    pub identity_url: String,
    /// Frontend build to serve at `/`, if any.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
            database_path: None,
            push_endpoint: DEFAULT_PUSH_ENDPOINT.to_string(),
            nominatim_url: DEFAULT_REVERSE_URL.to_string(),
            firebase_api_key: None,
            identity_url: DEFAULT_IDENTITY_URL.to_string(),
            static_dir: None,
        }
    }
}

impl ServerConfig {
    /// Loads the config file (if any) and applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicitly named file cannot be read,
    /// any file fails to parse, or an override is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::from_file(path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Reads a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loaded config from {}", path.display());
        Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses TOML config text.
    ///
    /// # Errors
    ///
    /// Returns the TOML error if the text is invalid.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Applies overrides looked up by variable name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] if `PORT` is not a port number.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(addr) = lookup("BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(port) = lookup("PORT") {
            self.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: "PORT",
                value: port.clone(),
            })?;
        }
        if let Some(path) = lookup("DATABASE_PATH") {
            self.database_path = Some(PathBuf::from(path)).filter(|p| !p.as_os_str().is_empty());
        }
        if let Some(endpoint) = lookup("PUSH_ENDPOINT") {
            self.push_endpoint = endpoint;
        }
        if let Some(url) = lookup("NOMINATIM_URL") {
            self.nominatim_url = url;
        }
        if let Some(key) = lookup("FIREBASE_API_KEY") {
            self.firebase_api_key = Some(key).filter(|k| !k.trim().is_empty());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = ServerConfig::parse("").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.push_endpoint, "http://localhost:5000");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn file_values_override_defaults() {
        let config = ServerConfig::parse(
            r#"
            port = 9000
            database_path = "data/alerts.db"
            firebase_api_key = "key"
            "#,
        )
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.database_path, Some(PathBuf::from("data/alerts.db")));
        assert_eq!(config.firebase_api_key.as_deref(), Some("key"));
        assert_eq!(config.bind_addr, "127.0.0.1");
    }

    #[test]
    fn unknown_types_are_rejected() {
        assert!(ServerConfig::parse("port = \"eighty\"").is_err());
    }

    #[test]
    fn env_overrides_win() {
        let env: BTreeMap<&str, &str> = [
            ("BIND_ADDR", "0.0.0.0"),
            ("PORT", "3000"),
            ("DATABASE_PATH", ""),
            ("PUSH_ENDPOINT", "http://push:5000"),
        ]
        .into_iter()
        .collect();

        let mut config = ServerConfig {
            database_path: Some(PathBuf::from("file.db")),
            ..ServerConfig::default()
        };
        config
            .apply_overrides(|name| env.get(name).map(ToString::to_string))
            .unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.database_path, None);
        assert_eq!(config.push_endpoint, "http://push:5000");
    }

    #[test]
    fn bad_port_is_an_error() {
        let mut config = ServerConfig::default();
        let result = config.apply_overrides(|name| (name == "PORT").then(|| "http".to_string()));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidEnv { name: "PORT", .. })
        ));
    }
}
