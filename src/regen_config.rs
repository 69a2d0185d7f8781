//! File-based configuration for regen, read from `regen.toml`.
//!
//! Every field has a default, so an absent or partial file is valid.
//!
//! # Configuration File Format
//!
//! ```toml
//! [defaults]
//! timeout_secs = 1800
//! package_prefix = "Azure.ResourceManager"
//! checkpoint_file = "progress.txt"
//!
//! [[steps]]
//! name = "restore"
//! program = "dotnet"
//! args = ["restore"]
//!
//! [[steps]]
//! name = "generate"
//! program = "dotnet"
//! args = ["build", "/t:GenerateCode"]
//! timeout_secs = 3600
//!
//! [skip]
//! packages = ["Azure.ResourceManager.Legacy"]
//! file = "skip.txt"
//! ```
//!
//! When `[[steps]]` is omitted the built-in restore/generate/test pipeline is
//! used.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::pipeline::{Step, default_steps};

pub const CONFIG_FILE_NAME: &str = "regen.toml";
pub const DEFAULT_TIMEOUT_SECS: u64 = 1800;
pub const DEFAULT_PACKAGE_PREFIX: &str = "Azure.ResourceManager";
pub const DEFAULT_CHECKPOINT_FILE: &str = "progress.txt";

/// Run-wide defaults, each overridable from the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Timeout for one step, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Only package directories starting with this prefix are executed
    #[serde(default = "default_package_prefix")]
    pub package_prefix: String,
    /// Where the resume point is stored
    #[serde(default = "default_checkpoint_file")]
    pub checkpoint_file: PathBuf,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_package_prefix() -> String {
    DEFAULT_PACKAGE_PREFIX.to_string()
}

fn default_checkpoint_file() -> PathBuf {
    PathBuf::from(DEFAULT_CHECKPOINT_FILE)
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            package_prefix: default_package_prefix(),
            checkpoint_file: default_checkpoint_file(),
        }
    }
}

/// Packages excluded from every run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkipConfig {
    /// Package names or full package paths
    #[serde(default)]
    pub packages: Vec<String>,
    /// File with one package identifier per line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegenToml {
    #[serde(default)]
    pub defaults: DefaultsConfig,
    /// Pipeline override; empty means the built-in steps
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub skip: SkipConfig,
}

impl RegenToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse regen.toml")
    }

    /// Load `regen.toml` from `dir`, or defaults if it does not exist.
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// An explicit path must exist; otherwise fall back to the working
    /// directory's `regen.toml`.
    pub fn resolve(explicit: Option<&Path>, cwd: &Path) -> Result<(Self, Option<PathBuf>)> {
        match explicit {
            Some(path) => Ok((Self::load(path)?, Some(path.to_path_buf()))),
            None => {
                let candidate = cwd.join(CONFIG_FILE_NAME);
                let source = candidate.exists().then_some(candidate);
                Ok((Self::load_or_default(cwd)?, source))
            }
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize regen.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// A config with the built-in steps spelled out, for `regen config init`.
    pub fn template() -> Self {
        Self {
            steps: default_steps(),
            ..Self::default()
        }
    }

    /// Configured steps, or the built-in pipeline when none are configured.
    pub fn pipeline_steps(&self) -> Vec<Step> {
        if self.steps.is_empty() {
            default_steps()
        } else {
            self.steps.clone()
        }
    }

    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.defaults.timeout_secs == 0 {
            warnings.push("defaults.timeout_secs is 0: every step would time out immediately".to_string());
        }
        if self.defaults.package_prefix.is_empty() {
            warnings.push("defaults.package_prefix is empty: every package directory will be executed".to_string());
        }

        let mut seen = std::collections::HashSet::new();
        for step in &self.steps {
            if step.name.trim().is_empty() {
                warnings.push("A step has an empty name".to_string());
            } else if !seen.insert(step.name.as_str()) {
                warnings.push(format!("Step '{}' is defined more than once", step.name));
            }
            if step.program.trim().is_empty() {
                warnings.push(format!("Step '{}' has an empty program", step.name));
            }
            if step.timeout_secs == Some(0) {
                warnings.push(format!("Step '{}' has timeout_secs = 0", step.name));
            }
        }

        warnings
    }
}
