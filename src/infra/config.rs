//! Configuration management infrastructure.
//!
//! Settings are layered: built-in defaults, then the TOML config file, then
//! the `CA_PATH` / `DEBUG` environment variables, then command-line flags
//! (applied by the binary).

use crate::infra::error::{ChainError, ChainResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding [`ChainConfiguration::ca_path`].
pub const CA_PATH_ENV: &str = "CA_PATH";

/// Environment variable overriding [`ChainConfiguration::debug`].
pub const DEBUG_ENV: &str = "DEBUG";

/// Chain building preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfiguration {
    /// Directory searched recursively for candidate certificates
    pub ca_path: PathBuf,

    /// Whether to load the system CA bundle before the CA path
    pub include_system_bundle: bool,

    /// Location of the system CA bundle
    pub system_bundle: PathBuf,

    /// File extensions (without the dot) treated as certificate files
    pub extensions: Vec<String>,

    /// Exit successfully even when no root was found
    pub allow_incomplete: bool,

    /// Debug logging
    pub debug: bool,
}

impl Default for ChainConfiguration {
    fn default() -> Self {
        Self {
            ca_path: PathBuf::from("."),
            include_system_bundle: true,
            system_bundle: PathBuf::from("/etc/ssl/cert.pem"),
            extensions: vec!["pem".to_string(), "crt".to_string()],
            allow_incomplete: false,
            debug: false,
        }
    }
}

impl ChainConfiguration {
    /// Apply `CA_PATH` and `DEBUG` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> ChainResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ca_path) = lookup(CA_PATH_ENV).filter(|v| !v.is_empty()) {
            self.ca_path = PathBuf::from(ca_path);
        }

        if let Some(debug) = lookup(DEBUG_ENV).filter(|v| !v.is_empty()) {
            self.debug = parse_bool(&debug).ok_or_else(|| {
                ChainError::ConfigurationError(format!(
                    "Invalid boolean value for {DEBUG_ENV}: {debug}"
                ))
            })?;
        }

        Ok(())
    }

    /// `ca_path` with `~`, `$VAR` and `${VAR}` expanded through `lookup`.
    #[must_use]
    pub fn expanded_ca_path<F>(&self, lookup: F) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        PathBuf::from(expand_env(&self.ca_path.to_string_lossy(), lookup))
    }

    /// Validate configuration values
    pub fn validate(&self) -> ChainResult<()> {
        if self.extensions.is_empty() {
            return Err(ChainError::ConfigurationError(
                "At least one certificate file extension is required".to_string(),
            ));
        }

        if self
            .extensions
            .iter()
            .any(|ext| ext.trim_start_matches('.').is_empty())
        {
            return Err(ChainError::ConfigurationError(
                "Certificate file extensions must not be empty".to_string(),
            ));
        }

        if self.ca_path.as_os_str().is_empty() {
            return Err(ChainError::ConfigurationError(
                "CA path must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Render the configuration in a portable format
    pub fn export(&self, format: ExportFormat) -> ChainResult<String> {
        match format {
            ExportFormat::Toml => toml::to_string_pretty(self)
                .map_err(|e| ChainError::ConfigurationError(format!("TOML export failed: {e}"))),
            ExportFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| ChainError::ConfigurationError(format!("JSON export failed: {e}"))),
            ExportFormat::Yaml => serde_yaml::to_string(self)
                .map_err(|e| ChainError::ConfigurationError(format!("YAML export failed: {e}"))),
        }
    }
}

/// Configuration export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Toml,
    Json,
    Yaml,
}

/// Configuration manager for handling the config file
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a configuration manager using the default path
    #[must_use]
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a configuration manager with custom path
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// `<config dir>/make-chain.toml`, or the working directory when the
    /// platform has no config directory.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("make-chain.toml")
        } else {
            PathBuf::from("make-chain.toml")
        }
    }

    /// Load the config file, falling back to defaults when it does not exist
    pub fn load_or_default(&self) -> ChainResult<ChainConfiguration> {
        if self.config_path.exists() {
            self.load()
        } else {
            log::debug!(
                "Configuration file not found, using defaults: {}",
                self.config_path.display()
            );
            Ok(ChainConfiguration::default())
        }
    }

    /// Load configuration from file
    pub fn load(&self) -> ChainResult<ChainConfiguration> {
        log::debug!("Loading configuration from: {}", self.config_path.display());

        let content = fs::read_to_string(&self.config_path).map_err(|e| {
            ChainError::ConfigurationError(format!(
                "Failed to read config file {}: {}",
                self.config_path.display(),
                e
            ))
        })?;

        let config: ChainConfiguration = toml::from_str(&content).map_err(|e| {
            ChainError::ConfigurationError(format!("Failed to parse config file: {e}"))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &ChainConfiguration) -> ChainResult<()> {
        config.validate()?;
        log::info!("Saving configuration to: {}", self.config_path.display());

        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    ChainError::ConfigurationError(format!(
                        "Failed to create config directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let content = config.export(ExportFormat::Toml)?;

        fs::write(&self.config_path, content).map_err(|e| {
            ChainError::ConfigurationError(format!(
                "Failed to write config file {}: {}",
                self.config_path.display(),
                e
            ))
        })?;

        Ok(())
    }

    /// Get the configuration file path
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Expand a leading `~` and `$VAR` / `${VAR}` references. Unset variables
/// expand to nothing.
fn expand_env<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());

    let rest = if input == "~" || input.starts_with("~/") {
        match lookup("HOME") {
            Some(home) => {
                out.push_str(&home);
                &input[1..]
            }
            None => input,
        }
    } else {
        input
    };

    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        let name: String = if chars.peek() == Some(&'{') {
            chars.next();
            let name: String = chars.by_ref().take_while(|&c| c != '}').collect();
            name
        } else {
            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    name.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            if name.is_empty() {
                out.push('$');
                continue;
            }
            name
        };

        if let Some(value) = lookup(&name) {
            out.push_str(&value);
        }
    }

    out
}
