//! Configuration file handling

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::{Error, Result};
use crate::backend::{BackendKind, BackendOptions};
use crate::location::PathPolicy;
use crate::parser::BufferLimits;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Output parser settings
    #[serde(default)]
    pub parser: ParserConfig,

    /// Side-channel proxy settings
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Per-backend overrides, keyed by backend name ("gdb", "lldb", ...)
    #[serde(default)]
    pub backends: HashMap<String, BackendConfig>,
}

/// Output parser settings
#[derive(Debug, Deserialize)]
pub struct ParserConfig {
    /// Trim the accumulation buffer once it grows past this many bytes
    /// without any rule matching
    #[serde(default = "default_buffer_limit")]
    pub buffer_limit: usize,

    /// Bytes kept from the end of the buffer after a trim
    #[serde(default = "default_keep_tail")]
    pub keep_tail: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            buffer_limit: default_buffer_limit(),
            keep_tail: default_keep_tail(),
        }
    }
}

fn default_buffer_limit() -> usize {
    64 * 1024
}
fn default_keep_tail() -> usize {
    4 * 1024
}

/// Side-channel proxy settings
#[derive(Debug, Deserialize)]
pub struct ProxyConfig {
    /// How long to wait for a proxy reply before treating it as absent
    #[serde(default = "default_proxy_timeout")]
    pub timeout_ms: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_proxy_timeout(),
        }
    }
}

fn default_proxy_timeout() -> u64 {
    500
}

impl ProxyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Per-backend overrides
#[derive(Debug, Deserialize, Default, Clone)]
pub struct BackendConfig {
    /// Force (or disable) absolute path normalization of jump locations
    pub absolute_paths: Option<bool>,

    /// Directory relative paths are resolved against (default: working directory)
    pub base_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.parser.buffer_limit == 0 {
            return Err(Error::Config("parser.buffer_limit must be positive".to_string()));
        }
        if self.parser.keep_tail >= self.parser.buffer_limit {
            return Err(Error::Config(format!(
                "parser.keep_tail ({}) must be smaller than parser.buffer_limit ({})",
                self.parser.keep_tail, self.parser.buffer_limit
            )));
        }
        for name in self.backends.keys() {
            name.parse::<BackendKind>()?;
        }
        Ok(())
    }

    /// Buffer limits for the output parser
    pub fn buffer_limits(&self) -> BufferLimits {
        BufferLimits {
            max_bytes: self.parser.buffer_limit,
            keep_tail: self.parser.keep_tail,
        }
    }

    /// Resolve construction-time options for a backend
    ///
    /// Falls back to the backend's own path policy when not overridden, and
    /// to the current working directory as the base for relative paths.
    pub fn backend_options(&self, kind: BackendKind) -> Result<BackendOptions> {
        let overrides = self.backends.get(kind.name()).cloned().unwrap_or_default();

        let absolute = overrides
            .absolute_paths
            .unwrap_or_else(|| kind.requires_absolute_paths());

        let path_policy = if absolute {
            let base = match overrides.base_dir {
                Some(dir) => dir,
                None => std::env::current_dir()?,
            };
            PathPolicy::Absolute { base }
        } else {
            PathPolicy::Verbatim
        };

        Ok(BackendOptions {
            path_policy,
            limits: self.buffer_limits(),
        })
    }
}
