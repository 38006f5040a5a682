//! pyrelay configuration system
//!
//! # Configuration lookup
//!
//! ```text
//! Priority (high → low):
//! 1. --config PATH
//! 2. PYRELAY_CONFIG environment variable
//! 3. User-level ($XDG_CONFIG_HOME/pyrelay/config.toml or ~/.config/pyrelay/config.toml)
//! 4. Default values
//! ```
//!
//! # Usage
//!
//! ```rust
//! use pyrelay::util::config::Config;
//!
//! let config = Config::load(None).unwrap_or_default();
//! assert!(config.kernel.recursion_limit > 0);
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::runtime::NamespacePolicy;
use crate::util::logger::LogLevel;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "PYRELAY_CONFIG";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Execution task settings
    #[serde(default)]
    pub kernel: KernelConfig,
    /// Interactive console settings
    #[serde(default)]
    pub console: ConsoleConfig,
    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
}

/// Execution task configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KernelConfig {
    /// Prefix for task thread names; threads are named `<prefix>-<n>`
    #[serde(default = "default_thread_name_prefix")]
    pub thread_name_prefix: String,
    /// Stack size of each task thread, in bytes
    #[serde(default = "default_stack_size")]
    pub stack_size: usize,
    /// Whether snippets sharing a namespace run one at a time
    #[serde(default)]
    pub namespace_policy: NamespacePolicy,
    /// Maximum guest call depth before `RecursionError`
    #[serde(default = "default_recursion_limit")]
    pub recursion_limit: usize,
    /// Longest list (items) or string (bytes) a repeat or concatenation
    /// may build before `MemoryError`
    #[serde(default = "default_max_sequence_len")]
    pub max_sequence_len: usize,
}

fn default_thread_name_prefix() -> String {
    "pyrelay-task".to_string()
}

fn default_stack_size() -> usize {
    64 * 1024 * 1024
}

fn default_recursion_limit() -> usize {
    500
}

fn default_max_sequence_len() -> usize {
    1 << 24
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: default_thread_name_prefix(),
            stack_size: default_stack_size(),
            namespace_policy: NamespacePolicy::default(),
            recursion_limit: default_recursion_limit(),
            max_sequence_len: default_max_sequence_len(),
        }
    }
}

/// Interactive console configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsoleConfig {
    /// Primary prompt
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// Prompt shown while a compound statement is incomplete
    #[serde(default = "default_continuation_prompt")]
    pub continuation_prompt: String,
    /// History size
    #[serde(default = "default_history_size")]
    pub history_size: usize,
    /// History file path
    #[serde(default)]
    pub history_file: Option<PathBuf>,
}

fn default_prompt() -> String {
    ">>> ".to_string()
}

fn default_continuation_prompt() -> String {
    "... ".to_string()
}

fn default_history_size() -> usize {
    1000
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            continuation_prompt: default_continuation_prompt(),
            history_size: default_history_size(),
            history_file: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
}

fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration following the lookup order.
    ///
    /// An explicit path or `PYRELAY_CONFIG` must point at a readable file;
    /// the user-level file is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
        let env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        match resolve_path(explicit, env) {
            Some(ConfigSource::Required(path)) => Config::from_path(&path),
            Some(ConfigSource::Optional(path)) if path.exists() => Config::from_path(&path),
            _ => Ok(Config::default()),
        }
    }

    /// Load configuration from a specific file
    pub fn from_path(path: &Path) -> Result<Config, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Config::from_toml_str(&content)
    }

    /// Parse configuration text
    pub fn from_toml_str(content: &str) -> Result<Config, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    /// Render configuration as TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }
}

enum ConfigSource {
    Required(PathBuf),
    Optional(PathBuf),
}

fn resolve_path(
    explicit: Option<&Path>,
    env: Option<PathBuf>,
) -> Option<ConfigSource> {
    if let Some(path) = explicit {
        return Some(ConfigSource::Required(path.to_path_buf()));
    }
    if let Some(path) = env.filter(|p| !p.as_os_str().is_empty()) {
        return Some(ConfigSource::Required(path));
    }
    get_config_path().map(ConfigSource::Optional)
}

/// Get the user config directory
pub fn get_config_dir() -> Option<PathBuf> {
    // Try XDG config directory on Unix
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg_config.is_empty() {
            return Some(PathBuf::from(xdg_config).join("pyrelay"));
        }
    }

    // Fallback to ~/.config/pyrelay
    if let Ok(home) = std::env::var("HOME") {
        return Some(PathBuf::from(home).join(".config").join("pyrelay"));
    }

    // On Windows, try %APPDATA%
    if let Ok(appdata) = std::env::var("APPDATA") {
        return Some(PathBuf::from(appdata).join("pyrelay"));
    }

    None
}

/// Get the user config file path (~/.config/pyrelay/config.toml)
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("config.toml"))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
