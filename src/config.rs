use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::options::{ConversionOptions, Escaping, PrefixTable};
use crate::writer::is_prefix;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Library configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub namespaces: NamespaceConfig,
    pub cache: CacheConfig,
}

/// Default marshalling output settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Omit the XML declaration
    pub fragment: bool,
    /// Indent nested elements
    pub pretty_print: bool,
    /// Post-processing escape
    pub escaping: Escaping,
}

/// Fixed namespace prefixes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct NamespaceConfig {
    /// Namespace URI to prefix; an empty prefix declares the default namespace
    pub prefixes: BTreeMap<String, String>,
}

/// Schema cache configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Number of types the cache is sized for up front
    pub initial_capacity: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            fragment: true,
            pretty_print: false,
            escaping: Escaping::None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
        }
    }
}

impl Config {
    /// Default conversion options described by this configuration
    pub fn conversion_options(&self) -> ConversionOptions {
        let options = ConversionOptions::default()
            .with_fragment(self.output.fragment)
            .with_pretty_print(self.output.pretty_print)
            .with_escaping(self.output.escaping);

        if self.namespaces.prefixes.is_empty() {
            options
        } else {
            options.with_prefix_mapper(PrefixTable::from(self.namespaces.prefixes.clone()))
        }
    }
}

/// Configuration manager for loading and layering configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: defaults -> file -> environment
    pub fn load_config() -> Result<Config> {
        // Start with default configuration, or the first file found
        let config = Self::find_config_file()?.unwrap_or_default();

        // Apply environment variable overrides
        let config = Self::apply_environment_overrides(config)?;

        // Validate the final configuration
        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub fn find_config_file() -> Result<Option<Config>> {
        let config_names = [
            "xml-marshal.toml",
            "xml-marshal.json",
            ".xml-marshal.toml",
            ".xml-marshal.json",
        ];

        // Check current directory first
        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path)?));
            }
        }

        // Check user config directory
        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("xml-marshal");
            for name in &config_names {
                let path = app_config_dir.join(name);
                if path.exists() {
                    return Ok(Some(Self::load_from_file(&path)?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        // Output settings
        if let Some(fragment) = env.get("XML_MARSHAL_FRAGMENT") {
            config.output.fragment = fragment.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid XML_MARSHAL_FRAGMENT value: {}", fragment))
            })?;
        }

        if let Some(pretty_print) = env.get("XML_MARSHAL_PRETTY_PRINT") {
            config.output.pretty_print = pretty_print.parse().map_err(|_| {
                ConfigError::Environment(format!(
                    "Invalid XML_MARSHAL_PRETTY_PRINT value: {}",
                    pretty_print
                ))
            })?;
        }

        if let Some(escaping) = env.get("XML_MARSHAL_ESCAPING") {
            config.output.escaping = match escaping.to_lowercase().as_str() {
                "none" => Escaping::None,
                "xml" => Escaping::Xml,
                "html" => Escaping::Html,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid XML_MARSHAL_ESCAPING value: {}",
                        escaping
                    )));
                }
            };
        }

        // Namespace settings, as uri=prefix pairs
        if let Some(namespaces) = env.get("XML_MARSHAL_NAMESPACES") {
            for pair in namespaces.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                // URIs may contain '=', prefixes may not
                let (uri, prefix) = pair.rsplit_once('=').ok_or_else(|| {
                    ConfigError::Environment(format!(
                        "Invalid XML_MARSHAL_NAMESPACES entry: {}",
                        pair
                    ))
                })?;
                config
                    .namespaces
                    .prefixes
                    .insert(uri.trim().to_string(), prefix.trim().to_string());
            }
        }

        // Cache settings
        if let Some(capacity) = env.get("XML_MARSHAL_CACHE_CAPACITY") {
            config.cache.initial_capacity = capacity.parse().map_err(|_| {
                ConfigError::Environment(format!(
                    "Invalid XML_MARSHAL_CACHE_CAPACITY value: {}",
                    capacity
                ))
            })?;
        }

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        let mut seen = BTreeMap::new();

        for (uri, prefix) in &config.namespaces.prefixes {
            if uri.is_empty() {
                return Err(ConfigError::Validation(
                    "Namespace URI cannot be empty".to_string(),
                ));
            }

            if !prefix.is_empty() && !is_prefix(prefix) {
                return Err(ConfigError::Validation(format!(
                    "Invalid namespace prefix '{}' for {}",
                    prefix, uri
                )));
            }

            if let Some(other) = seen.insert(prefix.as_str(), uri.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Namespace prefix '{}' is mapped to both {} and {}",
                    prefix, other, uri
                )));
            }
        }

        Ok(())
    }
}
