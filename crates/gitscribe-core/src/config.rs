use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::GitscribeError;
use crate::types::OutputFormat;

/// Top-level configuration loaded from `.gitscribe.toml`.
///
/// Supports layered resolution: CLI flags > local config > defaults.
///
/// # Examples
///
/// ```
/// use gitscribe_core::GitscribeConfig;
///
/// let config = GitscribeConfig::default();
/// assert_eq!(config.log.message_indent, 4);
/// assert!(config.stats.verify_summary);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitscribeConfig {
    /// Commit record parsing settings.
    #[serde(default)]
    pub log: LogConfig,
    /// Stat aggregation settings.
    #[serde(default)]
    pub stats: StatsConfig,
    /// Rendering settings for the CLI.
    #[serde(default)]
    pub output: OutputConfig,
}

impl GitscribeConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`GitscribeError::FileNotFound`] if `path` does not exist,
    /// [`GitscribeError::Io`] if it cannot be read, or the errors of
    /// [`GitscribeConfig::from_toml`].
    pub fn from_file(path: &Path) -> Result<Self, GitscribeError> {
        if !path.exists() {
            return Err(GitscribeError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`GitscribeError::Toml`] if parsing fails, or
    /// [`GitscribeError::Config`] if a value is out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use gitscribe_core::GitscribeConfig;
    ///
    /// let toml = r#"
    /// [log]
    /// message_indent = 2
    /// "#;
    /// let config = GitscribeConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.log.message_indent, 2);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, GitscribeError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), GitscribeError> {
        if self.log.message_indent == 0 {
            return Err(GitscribeError::Config(
                "log.message_indent must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Commit record parsing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Width of the space prefix on message lines (default: 4, as printed by
    /// `--pretty=raw`).
    #[serde(default = "default_message_indent")]
    pub message_indent: usize,
}

fn default_message_indent() -> usize {
    4
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            message_indent: default_message_indent(),
        }
    }
}

/// Stat aggregation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Check per-file sums against a trailing `--shortstat` summary line
    /// (default: true).
    #[serde(default = "default_verify_summary")]
    pub verify_summary: bool,
}

fn default_verify_summary() -> bool {
    true
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            verify_summary: default_verify_summary(),
        }
    }
}

/// CLI rendering configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Format used when `--format` is not given.
    #[serde(default)]
    pub format: OutputFormat,
}
