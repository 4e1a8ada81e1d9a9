//! Process-wide profiler behind the `profiling_log` hook
//!
//! The instrumented program links this library and calls
//! `profiling_log(api, caller)` before every risky call. The first call (or
//! an explicit `profiling_init()`) creates the table from
//! [`RuntimeConfig::from_env`] and registers an exit handler, exactly once,
//! that writes the JSON report and prints the console summary.

use super::config::RuntimeConfig;
use super::report::{ProfileReport, ReportError};
use super::table::{LogOutcome, ProfileTable};
use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Once, OnceLock};

static PROFILER: OnceLock<Profiler> = OnceLock::new();
static EXIT_HANDLER: Once = Once::new();

/// A profile table together with the settings used to flush it
#[derive(Debug)]
pub struct Profiler {
    table: ProfileTable,
    config: RuntimeConfig,
}

impl Profiler {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            table: ProfileTable::with_name_limit(config.capacity, config.max_name_len),
            config,
        }
    }

    pub fn table(&self) -> &ProfileTable {
        &self.table
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn log_call(&self, api_name: &str, caller_name: &str) -> LogOutcome {
        self.table.log_call(api_name, caller_name)
    }

    /// Write the report and print the console summary
    ///
    /// If the report cannot be written the error is logged and returned and
    /// no summary is printed; the collected data is lost.
    pub fn flush(&self) -> Result<ProfileReport, ReportError> {
        let report = ProfileReport::from_table(&self.table);

        if let Err(e) = report.write_to_path(&self.config.output_path) {
            tracing::error!("Failed to write profile report: {}", e);
            eprintln!("Error: {}", e);
            return Err(e);
        }

        tracing::debug!(
            "Wrote {} call sites to {}",
            report.summary.unique_call_sites,
            self.config.output_path.display()
        );
        report.print_summary(&self.config.output_path, self.config.summary_limit);
        Ok(report)
    }
}

extern "C" fn flush_at_exit() {
    if let Some(profiler) = PROFILER.get() {
        // must not unwind into libc
        let _ = panic::catch_unwind(AssertUnwindSafe(|| profiler.flush()));
    }
}

/// The process-wide profiler, created and wired to process exit on first use
pub fn profiler() -> &'static Profiler {
    let profiler = PROFILER.get_or_init(|| Profiler::new(RuntimeConfig::from_env()));
    EXIT_HANDLER.call_once(|| {
        // SAFETY: flush_at_exit is a plain extern "C" fn with no arguments
        let rc = unsafe { libc::atexit(flush_at_exit) };
        if rc != 0 {
            tracing::warn!("atexit registration failed; no profile report will be written");
        }
    });
    profiler
}

/// Initialize the process-wide profiler; idempotent
pub fn init() {
    profiler();
}

/// Record a call into the process-wide profiler
pub fn log_call(api_name: &str, caller_name: &str) -> LogOutcome {
    profiler().log_call(api_name, caller_name)
}

/// C entry point for explicit initialization
#[no_mangle]
pub extern "C" fn profiling_init() {
    let _ = panic::catch_unwind(init);
}

/// Logging hook called by instrumented code
///
/// Null pointers are ignored. Invalid UTF-8 is replaced lossily.
///
/// # Safety
///
/// Non-null arguments must point to NUL-terminated strings that stay valid
/// for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn profiling_log(api_name: *const c_char, caller_name: *const c_char) {
    if api_name.is_null() || caller_name.is_null() {
        return;
    }
    // SAFETY: both pointers are non-null and NUL-terminated per the contract above
    let (api, caller) = unsafe { (CStr::from_ptr(api_name), CStr::from_ptr(caller_name)) };
    let api = api.to_string_lossy();
    let caller = caller.to_string_lossy();

    let _ = panic::catch_unwind(AssertUnwindSafe(|| log_call(&api, &caller)));
}

#[cfg(all(feature = "auto-init", not(test)))]
#[ctor::ctor]
fn auto_init() {
    init();
}
