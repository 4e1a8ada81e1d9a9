//! Runtime aggregator linked into instrumented programs
//!
//! Instrumented call sites report `(api, caller)` observations through the
//! `profiling_log` hook. Observations are aggregated in a bounded
//! [`ProfileTable`] and flushed to a JSON [`ProfileReport`] plus a console
//! summary when the process exits.

mod config;
mod entry;
pub mod global;
mod report;
mod table;

pub use config::{RuntimeConfig, CAPACITY_ENV, OUTPUT_ENV};
pub use entry::{truncate_name, EntrySnapshot, ProfileEntry, MAX_NAME_LEN};
pub use global::{profiling_init, profiling_log, Profiler};
pub use report::{
    ProfileReport, ReportEntry, ReportError, ReportSummary, DEFAULT_OUTPUT_PATH,
    DEFAULT_SUMMARY_LIMIT,
};
pub use table::{LogOutcome, ProfileTable, DEFAULT_CAPACITY, SHARD_COUNT};
