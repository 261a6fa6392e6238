//! Shell configuration loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! usable configuration.

use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

/// Runtime configuration for a memsh session.
#[derive(Debug, Clone, Deserialize)]
pub struct ShellConfig {
    /// Maximum nesting of `$(...)` before the text is left unexpanded.
    #[serde(default = "default_substitution_depth")]
    pub max_substitution_depth: usize,
    /// Context lines used by `diff -u` / `diff -c` when no count is given.
    #[serde(default = "default_context_lines")]
    pub diff_context_lines: usize,
    /// Flags whose following argument is a pattern and must not be
    /// wildcard-expanded (e.g. `find -name '*.txt'`).
    #[serde(default = "default_pattern_flags")]
    pub pattern_flags: Vec<String>,
    /// Working directory at startup. Created if missing.
    #[serde(default = "default_cwd")]
    pub initial_cwd: String,
    /// Directories created when the filesystem is initialized.
    #[serde(default = "default_directories")]
    pub directories: Vec<String>,
}

fn default_substitution_depth() -> usize {
    10
}
fn default_context_lines() -> usize {
    3
}
fn default_pattern_flags() -> Vec<String> {
    ["-name", "-iname", "-path", "-ipath", "--include", "--exclude"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_cwd() -> String {
    "/".to_string()
}
fn default_directories() -> Vec<String> {
    vec!["/tmp".to_string()]
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            max_substitution_depth: default_substitution_depth(),
            diff_context_lines: default_context_lines(),
            pattern_flags: default_pattern_flags(),
            initial_cwd: default_cwd(),
            directories: default_directories(),
        }
    }
}

impl ShellConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a configuration file from the host filesystem.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        log::debug!("loaded shell config from {}", path.display());
        Ok(config)
    }

    /// Whether `flag` is followed by a pattern argument.
    pub fn is_pattern_flag(&self, flag: &str) -> bool {
        self.pattern_flags.iter().any(|f| f == flag)
    }
}
