//! Instrumenter configuration loaded from riskcall.toml
//!
//! # Example riskcall.toml
//!
//! ```toml
//! [instrument]
//! targets = ["strcpy", "strcat", "gets", "sprintf"]
//! hook = "profiling_log"
//! ```

use super::targets::TargetApiSet;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Name of the runtime logging hook
pub const DEFAULT_HOOK: &str = "profiling_log";

/// Which calls to instrument and which hook to insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    #[serde(default)]
    pub targets: TargetApiSet,
    #[serde(default = "default_hook")]
    pub hook: String,
}

fn default_hook() -> String {
    DEFAULT_HOOK.to_string()
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            targets: TargetApiSet::default(),
            hook: default_hook(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    instrument: InstrumentConfig,
}

impl InstrumentConfig {
    /// Load configuration from a TOML file
    ///
    /// # Example
    ///
    /// ```no_run
    /// use riskcall::instrument::InstrumentConfig;
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = InstrumentConfig::from_file("riskcall.toml")?;
    /// println!("Instrumenting {} APIs", config.targets.len());
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Load configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content).context("Failed to parse TOML")?;
        file.instrument.validate()?;
        Ok(file.instrument)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            bail!("targets must name at least one API");
        }
        if let Some(blank) = self.targets.iter().find(|t| t.trim().is_empty()) {
            bail!("target names must not be empty, got {:?}", blank);
        }
        if self.hook.trim().is_empty() {
            bail!("hook must not be empty");
        }
        if self.targets.contains(&self.hook) {
            bail!("hook '{}' cannot also be a target", self.hook);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = InstrumentConfig::default();
        assert_eq!(config.hook, "profiling_log");
        assert!(config.targets.contains("strcpy"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = InstrumentConfig::from_toml_str("").unwrap();
        assert_eq!(config, InstrumentConfig::default());
    }

    #[test]
    fn test_parse_targets_and_hook() {
        let config = InstrumentConfig::from_toml_str(
            r#"
            [instrument]
            targets = ["strcpy", "gets", "strcpy"]
            hook = "my_hook"
            "#,
        )
        .unwrap();

        assert_eq!(config.targets.iter().collect::<Vec<_>>(), vec!["strcpy", "gets"]);
        assert_eq!(config.hook, "my_hook");
    }

    #[test]
    fn test_rejects_empty_targets() {
        let err = InstrumentConfig::from_toml_str("[instrument]\ntargets = []\n").unwrap_err();
        assert!(err.to_string().contains("at least one API"));
    }

    #[test]
    fn test_rejects_blank_target() {
        assert!(InstrumentConfig::from_toml_str("[instrument]\ntargets = [\" \"]\n").is_err());
    }

    #[test]
    fn test_rejects_hook_as_target() {
        let err = InstrumentConfig::from_toml_str(
            "[instrument]\ntargets = [\"profiling_log\"]\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("cannot also be a target"));
    }

    #[test]
    fn test_rejects_bad_toml() {
        let err = InstrumentConfig::from_toml_str("[instrument\n").unwrap_err();
        assert!(err.to_string().contains("Failed to parse TOML"));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[instrument]\ntargets = [\"sprintf\"]").unwrap();

        let config = InstrumentConfig::from_file(file.path()).unwrap();
        assert!(config.targets.contains("sprintf"));
        assert!(!config.targets.contains("strcpy"));
    }

    #[test]
    fn test_from_missing_file() {
        let err = InstrumentConfig::from_file("/nonexistent/riskcall.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
