//! Runtime configuration for the profiling library

use super::entry::MAX_NAME_LEN;
use super::report::{DEFAULT_OUTPUT_PATH, DEFAULT_SUMMARY_LIMIT};
use super::table::DEFAULT_CAPACITY;
use std::path::PathBuf;

/// Environment variable overriding the report path
pub const OUTPUT_ENV: &str = "RISKCALL_PROFILE_OUTPUT";

/// Environment variable overriding the table capacity
pub const CAPACITY_ENV: &str = "RISKCALL_PROFILE_CAPACITY";

/// Settings read once, when the process-wide table is created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Where the JSON report is written at exit
    pub output_path: PathBuf,
    /// Maximum number of distinct (api, caller) keys
    pub capacity: usize,
    /// Name buffer size, terminator included
    pub max_name_len: usize,
    /// Call sites listed in the console summary
    pub summary_limit: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            capacity: DEFAULT_CAPACITY,
            max_name_len: MAX_NAME_LEN,
            summary_limit: DEFAULT_SUMMARY_LIMIT,
        }
    }
}

impl RuntimeConfig {
    /// Defaults, overridden by `RISKCALL_PROFILE_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(OUTPUT_ENV).filter(|p| !p.trim().is_empty()) {
            config.output_path = PathBuf::from(path);
        }

        if let Some(raw) = lookup(CAPACITY_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(capacity) => config.capacity = capacity,
                Err(e) => tracing::warn!(
                    "Ignoring {}={:?}: {}; using capacity {}",
                    CAPACITY_ENV,
                    raw,
                    e,
                    config.capacity
                ),
            }
        }

        config
    }
}
