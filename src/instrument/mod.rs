//! Risky API call instrumentation
//!
//! For every defined function, the pass scans for direct calls to a target
//! API and then, in a separate rewrite step, inserts
//! `call @profiling_log(@api_name, @caller_name)` immediately before each
//! match. The original call is left untouched.
//!
//! ```text
//! define @copy(%d, %s) {            define @copy(%d, %s) {
//! entry:                            entry:
//!   %r = call @strcpy(%d, %s)   =>    call @profiling_log(@.str, @.str.1)
//!   ret %r                            %r = call @strcpy(%d, %s)
//! }                                   ret %r
//!                                   }
//! ```

mod config;
mod patch;
mod targets;

pub use config::{InstrumentConfig, DEFAULT_HOOK};
pub use patch::{CallSite, Insertion, PatchList};
pub use targets::{TargetApiSet, DEFAULT_TARGETS};

use crate::ir::Module;
use crate::pipeline::{ModulePass, PassResult, PreservedAnalyses};
use std::io::{self, Write};

/// Parameter names of the hook declaration
const HOOK_PARAMS: &[&str] = &["api_name", "caller_name"];

/// What one run of the pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassOutcome {
    /// Rewritten call sites, in module order
    pub instrumented: Vec<CallSite>,
}

impl PassOutcome {
    pub fn modified(&self) -> bool {
        !self.instrumented.is_empty()
    }

    pub fn preserved(&self) -> PreservedAnalyses {
        PreservedAnalyses::from_modified(self.modified())
    }
}

/// Inserts a logging hook call before every call to a target API
#[derive(Debug, Clone, Default)]
pub struct DangerousApiPass {
    config: InstrumentConfig,
}

impl DangerousApiPass {
    /// Name the pass is registered under
    pub const NAME: &'static str = "dangerous-api-pass";

    pub fn new(config: InstrumentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InstrumentConfig {
        &self.config
    }

    /// Instrument `module`, writing diagnostics to stderr
    pub fn run(&self, module: &mut Module) -> PassOutcome {
        self.run_with_diagnostics(module, &mut io::stderr().lock())
    }

    /// Instrument `module`, writing one line per rewritten site to `diagnostics`
    ///
    /// Diagnostics are best effort; a failing writer does not stop the pass.
    /// A module that already has a function named like the hook with a
    /// different parameter count is left untouched.
    pub fn run_with_diagnostics<W: Write + ?Sized>(
        &self,
        module: &mut Module,
        diagnostics: &mut W,
    ) -> PassOutcome {
        let mut outcome = PassOutcome::default();

        // calls with the wrong arity would change program behaviour
        if let Some(existing) = module.function(&self.config.hook) {
            if existing.params.len() != HOOK_PARAMS.len() {
                tracing::warn!(
                    "Not instrumenting module {}: hook {} takes {} parameter(s), expected {}",
                    module.name,
                    existing.name,
                    existing.params.len(),
                    HOOK_PARAMS.len()
                );
                return outcome;
            }
        }

        for index in 0..module.functions.len() {
            let function = &module.functions[index];
            if function.is_declaration() {
                continue;
            }
            // never make the hook report on itself
            if function.name == self.config.hook {
                tracing::debug!("Skipping hook function {}", function.name);
                continue;
            }

            let patches = PatchList::scan(function, &self.config.targets);
            tracing::debug!(
                "Scanned {}: {} call site(s) to instrument",
                function.name,
                patches.len()
            );
            if patches.is_empty() {
                continue;
            }

            module.get_or_insert_declaration(&self.config.hook, HOOK_PARAMS);
            let insertions = patches.resolve(module, &self.config.hook);

            let Some(body) = module.functions[index].body.as_mut() else {
                continue;
            };
            PatchList::apply(body, insertions);

            for site in patches.sites() {
                tracing::info!("Instrumented {} in function {}", site.callee, site.caller);
                let _ = writeln!(
                    diagnostics,
                    "Instrumented {} in function {}",
                    site.callee, site.caller
                );
            }
            outcome.instrumented.extend(patches.sites().iter().cloned());
        }

        outcome
    }
}

impl ModulePass for DangerousApiPass {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(&mut self, module: &mut Module, diagnostics: &mut dyn Write) -> PassResult {
        Ok(self.run_with_diagnostics(module, diagnostics).preserved())
    }

    fn is_required(&self) -> bool {
        true
    }
}
