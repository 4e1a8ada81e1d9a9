//! Reference interpreter for modules
//!
//! Executes defined functions block by block and dispatches calls to
//! declarations to host-registered externals. Every external call is
//! recorded, which makes it possible to compare what an instrumented and an
//! uninstrumented program do at their boundary.

use super::{Callee, Cfg, EdgeKind, Function, Instruction, Module, Operand, Terminator};
use crate::runtime::ProfileTable;
use std::collections::HashMap;
use thiserror::Error;

/// Default number of instructions + terminators executed before giving up
pub const DEFAULT_STEP_LIMIT: usize = 1_000_000;

/// Default maximum call depth
pub const DEFAULT_MAX_DEPTH: usize = 256;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpError {
    #[error("No function or external named '{0}'")]
    UnresolvedExternal(String),

    #[error("Function '{function}' expects {expected} arguments, got {actual}")]
    ArityMismatch {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("Register %{register} read before assignment in '{function}'")]
    UndefinedRegister { function: String, register: String },

    #[error("Unknown global @{0}")]
    UnknownGlobal(String),

    #[error("Value {0:?} is not callable")]
    NotCallable(Value),

    #[error("Block '{block}' in '{function}' has no {kind:?} successor")]
    MissingSuccessor {
        function: String,
        block: String,
        kind: EdgeKind,
    },

    #[error("Reached unreachable in '{0}'")]
    Unreachable(String),

    #[error("Step limit of {0} exceeded")]
    StepLimit(usize),

    #[error("Call depth limit of {0} exceeded")]
    DepthLimit(usize),
}

/// Runtime value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Unit,
    Int(i64),
    Str(String),
    Func(String),
}

impl Value {
    fn is_truthy(&self) -> bool {
        match self {
            Value::Unit => false,
            Value::Int(n) => *n != 0,
            Value::Str(_) | Value::Func(_) => true,
        }
    }
}

/// One observed call across the module boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCall {
    pub name: String,
    pub args: Vec<Value>,
    pub result: Value,
}

type ExternalFn<'h> = Box<dyn FnMut(&[Value]) -> Value + 'h>;

/// Executes functions of a single module
pub struct Interpreter<'m, 'h> {
    module: &'m Module,
    externals: HashMap<String, ExternalFn<'h>>,
    trace: Vec<ExternalCall>,
    step_limit: usize,
    max_depth: usize,
    steps: usize,
}

impl<'m, 'h> Interpreter<'m, 'h> {
    pub fn new(module: &'m Module) -> Self {
        Self {
            module,
            externals: HashMap::new(),
            trace: Vec::new(),
            step_limit: DEFAULT_STEP_LIMIT,
            max_depth: DEFAULT_MAX_DEPTH,
            steps: 0,
        }
    }

    pub fn with_step_limit(mut self, step_limit: usize) -> Self {
        self.step_limit = step_limit;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Provide the implementation of an external symbol
    pub fn register_external<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: FnMut(&[Value]) -> Value + 'h,
    {
        self.externals.insert(name.into(), Box::new(handler));
    }

    /// Route calls to `hook` into `table`, the way the runtime library does
    pub fn bind_profiler(&mut self, hook: &str, table: &'h ProfileTable) {
        self.register_external(hook, move |args| {
            if let [Value::Str(api), Value::Str(caller)] = args {
                table.log_call(api, caller);
            }
            Value::Unit
        });
    }

    /// External calls observed so far, in execution order
    pub fn trace(&self) -> &[ExternalCall] {
        &self.trace
    }

    pub fn take_trace(&mut self) -> Vec<ExternalCall> {
        std::mem::take(&mut self.trace)
    }

    /// Run `function` to completion
    pub fn call(&mut self, function: &str, args: Vec<Value>) -> Result<Value, InterpError> {
        self.steps = 0;
        self.invoke(function, args, 0)
    }

    fn invoke(&mut self, name: &str, args: Vec<Value>, depth: usize) -> Result<Value, InterpError> {
        if depth > self.max_depth {
            return Err(InterpError::DepthLimit(self.max_depth));
        }

        let module = self.module;
        if let Some(function) = module.function(name) {
            if let Some(body) = &function.body {
                return self.execute(function, body, args, depth);
            }
        }

        let handler = self
            .externals
            .get_mut(name)
            .ok_or_else(|| InterpError::UnresolvedExternal(name.to_string()))?;
        let result = handler(&args);
        self.trace.push(ExternalCall {
            name: name.to_string(),
            args,
            result: result.clone(),
        });
        Ok(result)
    }

    fn tick(&mut self) -> Result<(), InterpError> {
        self.steps += 1;
        if self.steps > self.step_limit {
            return Err(InterpError::StepLimit(self.step_limit));
        }
        Ok(())
    }

    fn eval(
        &self,
        function: &Function,
        regs: &HashMap<String, Value>,
        operand: &Operand,
    ) -> Result<Value, InterpError> {
        match operand {
            Operand::Reg(name) => {
                regs.get(name)
                    .cloned()
                    .ok_or_else(|| InterpError::UndefinedRegister {
                        function: function.name.clone(),
                        register: name.clone(),
                    })
            }
            Operand::Int(value) => Ok(Value::Int(*value)),
            Operand::Global(name) => self
                .module
                .global(name)
                .map(|g| Value::Str(g.value.clone()))
                .ok_or_else(|| InterpError::UnknownGlobal(name.clone())),
            Operand::Func(name) => Ok(Value::Func(name.clone())),
        }
    }

    fn execute(
        &mut self,
        function: &'m Function,
        body: &'m Cfg,
        args: Vec<Value>,
        depth: usize,
    ) -> Result<Value, InterpError> {
        if args.len() != function.params.len() {
            return Err(InterpError::ArityMismatch {
                function: function.name.clone(),
                expected: function.params.len(),
                actual: args.len(),
            });
        }

        let mut regs: HashMap<String, Value> =
            function.params.iter().cloned().zip(args).collect();
        let mut current = body.entry();

        loop {
            let Some(block) = body.block(current) else {
                return Err(InterpError::Unreachable(function.name.clone()));
            };

            for instruction in &block.instructions {
                self.tick()?;
                match instruction {
                    Instruction::Assign { dest, value } => {
                        let value = self.eval(function, &regs, value)?;
                        regs.insert(dest.clone(), value);
                    }
                    Instruction::Call { dest, callee, args } => {
                        let target = match callee {
                            Callee::Direct(name) => name.clone(),
                            Callee::Indirect(operand) => {
                                match self.eval(function, &regs, operand)? {
                                    Value::Func(name) => name,
                                    other => return Err(InterpError::NotCallable(other)),
                                }
                            }
                        };
                        let argv = args
                            .iter()
                            .map(|arg| self.eval(function, &regs, arg))
                            .collect::<Result<Vec<_>, _>>()?;
                        let result = self.invoke(&target, argv, depth + 1)?;
                        if let Some(dest) = dest {
                            regs.insert(dest.clone(), result);
                        }
                    }
                }
            }

            self.tick()?;
            let kind = match &block.terminator {
                Terminator::Ret(value) => {
                    return match value {
                        Some(value) => self.eval(function, &regs, value),
                        None => Ok(Value::Unit),
                    };
                }
                Terminator::Unreachable => {
                    return Err(InterpError::Unreachable(function.name.clone()));
                }
                Terminator::Br => EdgeKind::Uncond,
                Terminator::CondBr { cond } => {
                    if self.eval(function, &regs, cond)?.is_truthy() {
                        EdgeKind::True
                    } else {
                        EdgeKind::False
                    }
                }
            };

            current = body
                .successor(current, kind)
                .ok_or_else(|| InterpError::MissingSuccessor {
                    function: function.name.clone(),
                    block: block.label.clone(),
                    kind,
                })?;
        }
    }
}
