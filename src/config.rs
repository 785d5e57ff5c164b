//! Configuration for proxy generation and the file cache
//!
//! The reporting threshold is not configurable; generated code and the probe
//! both use [`crate::synth::MIN_REPORT_SECONDS`].

use crate::cache::{is_valid_identifier, DEFAULT_CACHE_IDENTIFIER};
use crate::error::HookcheckError;
use crate::synth::{ProxySynthesizer, DEFAULT_NAMESPACE, DEFAULT_REPORT_SINK};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Parent directory of the cache; entries live in `<directory>/<identifier>/`
    pub directory: PathBuf,

    /// Cache name, also used as the entry key prefix
    pub identifier: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("var/cache/code"),
            identifier: DEFAULT_CACHE_IDENTIFIER.to_string(),
        }
    }
}

/// Top-level configuration
///
/// # Example
/// ```
/// use hookcheck::config::HookcheckConfig;
///
/// let config = HookcheckConfig::default();
/// assert_eq!(config.namespace, "Hookcheck\\Proxy");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookcheckConfig {
    /// Namespace of generated proxy classes; the loader claims every class below it
    pub namespace: String,

    /// Function or static method called with `(elapsed, label)` for slow calls
    pub report_sink: String,

    pub cache: CacheConfig,
}

impl Default for HookcheckConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            report_sink: DEFAULT_REPORT_SINK.to_string(),
            cache: CacheConfig::default(),
        }
    }
}

fn is_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_qualified_name(name: &str) -> bool {
    let name = name.trim_start_matches('\\');
    !name.is_empty() && name.split('\\').all(is_identifier)
}

impl HookcheckConfig {
    /// Load configuration from a TOML file; missing keys take their defaults
    pub fn from_toml<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.as_ref().display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), HookcheckError> {
        if !is_qualified_name(&self.namespace) {
            return Err(HookcheckError::Config(format!(
                "namespace must be a \\-separated list of identifiers, got '{}'",
                self.namespace
            )));
        }

        let sink_ok = match self.report_sink.split_once("::") {
            Some((class, method)) => is_qualified_name(class) && is_identifier(method),
            None => is_qualified_name(&self.report_sink),
        };
        if !sink_ok {
            return Err(HookcheckError::Config(format!(
                "report_sink must be a function or Class::method, got '{}'",
                self.report_sink
            )));
        }

        if !is_valid_identifier(&self.cache.identifier) {
            return Err(HookcheckError::Config(format!(
                "cache.identifier '{}' is not a valid cache identifier",
                self.cache.identifier
            )));
        }

        Ok(())
    }

    /// Namespace without leading or trailing separators
    pub fn namespace(&self) -> &str {
        self.namespace.trim_matches('\\')
    }

    /// Directory holding the cache entries
    pub fn cache_directory(&self) -> PathBuf {
        self.cache.directory.join(&self.cache.identifier)
    }

    pub fn synthesizer(&self) -> ProxySynthesizer {
        ProxySynthesizer::new(self.namespace(), self.report_sink.clone())
    }
}
