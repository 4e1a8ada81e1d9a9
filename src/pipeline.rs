//! Named module passes and pipelines
//!
//! An orchestrator asks the [`PassRegistry`] for passes by name, the same way
//! a compiler pipeline string such as `"dangerous-api-pass"` selects passes.

use crate::instrument::{DangerousApiPass, InstrumentConfig};
use crate::ir::Module;
use std::collections::BTreeMap;
use std::io::Write;
use thiserror::Error;

/// Errors from building or running a pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Unknown pass '{0}'")]
    UnknownPass(String),

    #[error("Empty pipeline")]
    EmptyPipeline,

    #[error("Pass '{pass}' failed: {message}")]
    PassFailed { pass: String, message: String },
}

/// Result type returned by a pass
pub type PassResult = std::result::Result<PreservedAnalyses, PipelineError>;

/// Which cached analyses remain valid after a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreservedAnalyses {
    /// Nothing changed
    All,
    /// The module was rewritten; cached analyses are stale
    None,
}

impl PreservedAnalyses {
    pub fn from_modified(modified: bool) -> Self {
        if modified {
            PreservedAnalyses::None
        } else {
            PreservedAnalyses::All
        }
    }

    pub fn modified(self) -> bool {
        self == PreservedAnalyses::None
    }

    /// Combine results of two passes run in sequence
    pub fn intersect(self, other: Self) -> Self {
        Self::from_modified(self.modified() || other.modified())
    }
}

/// A transformation over a whole module
pub trait ModulePass {
    /// Name used to select the pass in a pipeline string
    fn name(&self) -> &'static str;

    fn run(&mut self, module: &mut Module, diagnostics: &mut dyn Write) -> PassResult;

    /// Required passes run even when optional passes are skipped
    fn is_required(&self) -> bool {
        false
    }
}

type PassFactory = Box<dyn Fn() -> Box<dyn ModulePass> + Send + Sync>;

/// Registry of passes available by name
#[derive(Default)]
pub struct PassRegistry {
    factories: BTreeMap<&'static str, PassFactory>,
}

impl std::fmt::Debug for PassRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassRegistry")
            .field("passes", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

impl PassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in pass, configured with `config`
    pub fn with_builtin_passes(config: InstrumentConfig) -> Self {
        let mut registry = Self::new();
        registry.register(DangerousApiPass::NAME, move || {
            Box::new(DangerousApiPass::new(config.clone()))
        });
        registry
    }

    /// Register a pass constructor under `name`, replacing any previous one
    pub fn register<F>(&mut self, name: &'static str, factory: F)
    where
        F: Fn() -> Box<dyn ModulePass> + Send + Sync + 'static,
    {
        self.factories.insert(name, Box::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn ModulePass>, PipelineError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| PipelineError::UnknownPass(name.to_string()))
    }

    /// Build a pipeline from a comma-separated list of pass names
    pub fn parse_pipeline(&self, pipeline: &str) -> Result<PassPipeline, PipelineError> {
        let passes = pipeline
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| self.create(name))
            .collect::<Result<Vec<_>, _>>()?;

        if passes.is_empty() {
            return Err(PipelineError::EmptyPipeline);
        }
        Ok(PassPipeline {
            passes,
            required_only: false,
        })
    }
}

/// Ordered list of passes run over one module
pub struct PassPipeline {
    passes: Vec<Box<dyn ModulePass>>,
    required_only: bool,
}

impl PassPipeline {
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Skip passes whose [`ModulePass::is_required`] is false
    pub fn required_only(mut self, required_only: bool) -> Self {
        self.required_only = required_only;
        self
    }

    /// Run every pass in order; the first failure stops the pipeline
    pub fn run(&mut self, module: &mut Module, diagnostics: &mut dyn Write) -> PassResult {
        let mut preserved = PreservedAnalyses::All;
        for pass in &mut self.passes {
            if self.required_only && !pass.is_required() {
                tracing::debug!("Skipping optional pass {}", pass.name());
                continue;
            }
            tracing::debug!("Running pass {}", pass.name());
            let result = pass.run(module, diagnostics)?;
            preserved = preserved.intersect(result);
        }
        Ok(preserved)
    }
}
