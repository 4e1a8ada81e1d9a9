//! JSON profile report and console summary

use super::entry::EntrySnapshot;
use super::table::ProfileTable;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Default report location, relative to the working directory
pub const DEFAULT_OUTPUT_PATH: &str = "dangerous_api_profile.json";

/// Default number of call sites shown in the console summary
pub const DEFAULT_SUMMARY_LIMIT: usize = 10;

/// Errors that can occur while writing or reading a report
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Could not open output file {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid report JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One call site in the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub api_name: String,
    pub caller_function: String,
    pub execution_count: u64,
    /// Share of all recorded calls, two decimals
    pub percentage_of_total: f64,
    /// Time between first and last call, three decimals
    pub duration_ms: f64,
}

/// Summary counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_dangerous_calls: u64,
    pub unique_call_sites: usize,
    /// Only present when the table overflowed
    #[serde(default, skip_serializing_if = "is_zero")]
    pub dropped_observations: u64,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

/// Root report structure written at process exit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileReport {
    pub profile_data: Vec<ReportEntry>,
    pub summary: ReportSummary,
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn percentage(count: u64, total: u64) -> f64 {
    if total > 0 {
        count as f64 * 100.0 / total as f64
    } else {
        0.0
    }
}

impl ProfileReport {
    /// Build a report from entries in table order
    pub fn from_entries(entries: &[EntrySnapshot], dropped: u64) -> Self {
        let total: u64 = entries.iter().map(|e| e.count).sum();

        let profile_data = entries
            .iter()
            .map(|entry| ReportEntry {
                api_name: entry.api_name.clone(),
                caller_function: entry.caller_name.clone(),
                execution_count: entry.count,
                percentage_of_total: round_to(percentage(entry.count, total), 2),
                duration_ms: round_to(entry.duration().as_secs_f64() * 1000.0, 3),
            })
            .collect::<Vec<_>>();

        Self {
            summary: ReportSummary {
                total_dangerous_calls: total,
                unique_call_sites: profile_data.len(),
                dropped_observations: dropped,
            },
            profile_data,
        }
    }

    pub fn from_table(table: &ProfileTable) -> Self {
        Self::from_entries(&table.snapshot(), table.dropped())
    }

    /// Write the report as pretty JSON, replacing any existing file
    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), ReportError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| ReportError::Open {
            path: path.display().to_string(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ReportError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ReportError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Console summary, listing up to `limit` call sites in table order
    ///
    /// The listing is deliberately not sorted by count.
    pub fn render_summary(&self, output_path: &Path, limit: usize) -> String {
        let total = self.summary.total_dangerous_calls;
        let mut out = String::new();

        let _ = writeln!(out);
        let _ = writeln!(out, "=== Dangerous API Profiling Results ===");
        let _ = writeln!(out, "Total dangerous API calls: {}", total);
        let _ = writeln!(out, "Unique call sites: {}", self.summary.unique_call_sites);
        if self.summary.dropped_observations > 0 {
            let _ = writeln!(
                out,
                "Dropped observations (table full): {}",
                self.summary.dropped_observations
            );
        }
        let _ = writeln!(out, "Results written to: {}", output_path.display());
        let _ = writeln!(out);
        let _ = writeln!(out, "Top call sites:");

        for entry in self.profile_data.iter().take(limit) {
            let _ = writeln!(
                out,
                "  {}() -> {}: {} calls ({:.1}%)",
                entry.caller_function,
                entry.api_name,
                entry.execution_count,
                percentage(entry.execution_count, total)
            );
        }
        out
    }

    /// Print the console summary to stdout, ignoring a closed stdout
    pub fn print_summary(&self, output_path: &Path, limit: usize) {
        let text = self.render_summary(output_path, limit);
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }
}
