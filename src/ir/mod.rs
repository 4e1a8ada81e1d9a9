//! Program representation consumed by the instrumentation passes
//!
//! A [`Module`] is a list of functions plus module-level string constants.
//! Each defined function owns a [`Cfg`] of basic blocks; a function without a
//! body is a declaration (an external symbol such as `strcpy`).
//!
//! Modules round-trip through JSON so the `riskcall` binary can read a
//! program, rewrite it and write it back.

mod cfg;
mod display;
pub mod interp;

pub use cfg::{BasicBlock, BlockId, Cfg, EdgeKind, Terminator};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Prefix reserved for compiler intrinsics; calls to these are never matched
pub const INTRINSIC_PREFIX: &str = "llvm.";

/// Errors raised while loading or validating a module
#[derive(Error, Debug)]
pub enum IrError {
    #[error("Failed to read module {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid module JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate function '{0}'")]
    DuplicateFunction(String),

    #[error("Block '{block}' in function '{function}': {message}")]
    MalformedCfg {
        function: String,
        block: String,
        message: String,
    },

    #[error("Function '{function}' references unknown global '{global}'")]
    UnknownGlobal { function: String, global: String },
}

/// Result type for IR operations
pub type Result<T> = std::result::Result<T, IrError>;

/// An instruction operand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    /// A named local register (parameter or instruction result)
    Reg(String),
    /// Integer immediate
    Int(i64),
    /// Pointer to a module-level string constant, by global name
    Global(String),
    /// Address of a function, by name
    Func(String),
}

impl Operand {
    pub fn reg(name: impl Into<String>) -> Self {
        Operand::Reg(name.into())
    }

    pub fn global(name: impl Into<String>) -> Self {
        Operand::Global(name.into())
    }

    pub fn func(name: impl Into<String>) -> Self {
        Operand::Func(name.into())
    }
}

/// Call target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Callee {
    /// Statically known function reference
    Direct(String),
    /// Call through a value (function pointer held in a register, etc.)
    Indirect(Operand),
}

/// A non-terminator instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Instruction {
    Call {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dest: Option<String>,
        callee: Callee,
        #[serde(default)]
        args: Vec<Operand>,
    },
    Assign {
        dest: String,
        value: Operand,
    },
}

impl Instruction {
    /// Direct call to `callee`
    pub fn call(dest: Option<&str>, callee: impl Into<String>, args: Vec<Operand>) -> Self {
        Instruction::Call {
            dest: dest.map(str::to_string),
            callee: Callee::Direct(callee.into()),
            args,
        }
    }

    /// Call through `target`
    pub fn indirect_call(dest: Option<&str>, target: Operand, args: Vec<Operand>) -> Self {
        Instruction::Call {
            dest: dest.map(str::to_string),
            callee: Callee::Indirect(target),
            args,
        }
    }

    /// Name of the statically known callee, if this is a direct call
    pub fn direct_callee(&self) -> Option<&str> {
        match self {
            Instruction::Call {
                callee: Callee::Direct(name),
                ..
            } => Some(name),
            _ => None,
        }
    }

    fn operands(&self) -> Vec<&Operand> {
        match self {
            Instruction::Call { callee, args, .. } => {
                let mut ops: Vec<&Operand> = args.iter().collect();
                if let Callee::Indirect(target) = callee {
                    ops.push(target);
                }
                ops
            }
            Instruction::Assign { value, .. } => vec![value],
        }
    }
}

/// Module-level NUL-terminated string constant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalString {
    pub name: String,
    pub value: String,
}

/// A function definition or declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    /// `None` for declarations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Cfg>,
}

impl Function {
    pub fn declaration(name: impl Into<String>, params: &[&str]) -> Self {
        Self {
            name: name.into(),
            params: params.iter().map(|p| p.to_string()).collect(),
            body: None,
        }
    }

    pub fn define(name: impl Into<String>, params: &[&str], body: Cfg) -> Self {
        Self {
            name: name.into(),
            params: params.iter().map(|p| p.to_string()).collect(),
            body: Some(body),
        }
    }

    pub fn is_declaration(&self) -> bool {
        self.body.is_none()
    }

    pub fn is_intrinsic(&self) -> bool {
        is_intrinsic_name(&self.name)
    }
}

/// Whether `name` designates a compiler intrinsic
pub fn is_intrinsic_name(name: &str) -> bool {
    name.starts_with(INTRINSIC_PREFIX)
}

/// A compilation unit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(default)]
    pub globals: Vec<GlobalString>,
    #[serde(default)]
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Append a function, builder style
    pub fn with_function(mut self, function: Function) -> Self {
        self.functions.push(function);
        self
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn global(&self, name: &str) -> Option<&GlobalString> {
        self.globals.iter().find(|g| g.name == name)
    }

    /// Declare `name` unless a function of that name already exists
    ///
    /// Returns true if a declaration was added.
    pub fn get_or_insert_declaration(&mut self, name: &str, params: &[&str]) -> bool {
        if self.function(name).is_some() {
            return false;
        }
        self.functions.push(Function::declaration(name, params));
        true
    }

    /// Return the global holding `value`, creating it if needed
    ///
    /// New globals are named `.str`, `.str.1`, `.str.2`, ... skipping names
    /// already taken.
    pub fn intern_string(&mut self, value: &str) -> String {
        if let Some(existing) = self.globals.iter().find(|g| g.value == value) {
            return existing.name.clone();
        }

        let mut suffix = 0usize;
        let name = loop {
            let candidate = if suffix == 0 {
                ".str".to_string()
            } else {
                format!(".str.{}", suffix)
            };
            if self.global(&candidate).is_none() {
                break candidate;
            }
            suffix += 1;
        };

        self.globals.push(GlobalString {
            name: name.clone(),
            value: value.to_string(),
        });
        name
    }

    /// Total number of instructions across all function bodies
    pub fn instruction_count(&self) -> usize {
        self.functions
            .iter()
            .filter_map(|f| f.body.as_ref())
            .map(Cfg::instruction_count)
            .sum()
    }

    /// Check structural well-formedness
    ///
    /// Function names must be unique, every CFG must have the edges its
    /// terminators require, and every `Operand::Global` must resolve.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for function in &self.functions {
            if !seen.insert(function.name.as_str()) {
                return Err(IrError::DuplicateFunction(function.name.clone()));
            }

            let Some(body) = &function.body else {
                continue;
            };
            body.validate(&function.name)?;

            for (_, block) in body.blocks() {
                for instruction in &block.instructions {
                    for operand in instruction.operands() {
                        if let Operand::Global(global) = operand {
                            if self.global(global).is_none() {
                                return Err(IrError::UnknownGlobal {
                                    function: function.name.clone(),
                                    global: global.clone(),
                                });
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let module: Module = serde_json::from_str(content)?;
        module.validate()?;
        Ok(module)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| IrError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
