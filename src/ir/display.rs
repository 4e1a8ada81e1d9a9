//! Human-readable dump of a module (`riskcall instrument --print`)

use super::{Callee, Cfg, EdgeKind, Function, Instruction, Module, Operand, Terminator};
use std::fmt;

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(name) => write!(f, "%{}", name),
            Operand::Int(value) => write!(f, "{}", value),
            Operand::Global(name) => write!(f, "@{}", name),
            Operand::Func(name) => write!(f, "@{}", name),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Call { dest, callee, args } => {
                if let Some(dest) = dest {
                    write!(f, "%{} = ", dest)?;
                }
                match callee {
                    Callee::Direct(name) => write!(f, "call @{}(", name)?,
                    Callee::Indirect(target) => write!(f, "call {}(", target)?,
                }
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Instruction::Assign { dest, value } => write!(f, "%{} = {}", dest, value),
        }
    }
}

fn label_of(cfg: &Cfg, kind: EdgeKind, from: super::BlockId) -> &str {
    cfg.successor(from, kind)
        .and_then(|id| cfg.block(id))
        .map(|block| block.label.as_str())
        .unwrap_or("?")
}

fn write_body(f: &mut fmt::Formatter<'_>, cfg: &Cfg) -> fmt::Result {
    for (id, block) in cfg.blocks() {
        writeln!(f, "{}:", block.label)?;
        for instruction in &block.instructions {
            writeln!(f, "  {}", instruction)?;
        }
        match &block.terminator {
            Terminator::Ret(Some(value)) => writeln!(f, "  ret {}", value)?,
            Terminator::Ret(None) => writeln!(f, "  ret void")?,
            Terminator::Br => writeln!(f, "  br label %{}", label_of(cfg, EdgeKind::Uncond, id))?,
            Terminator::CondBr { cond } => writeln!(
                f,
                "  br {}, label %{}, label %{}",
                cond,
                label_of(cfg, EdgeKind::True, id),
                label_of(cfg, EdgeKind::False, id)
            )?,
            Terminator::Unreachable => writeln!(f, "  unreachable")?,
        }
    }
    Ok(())
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .params
            .iter()
            .map(|p| format!("%{}", p))
            .collect::<Vec<_>>()
            .join(", ");
        match &self.body {
            None => writeln!(f, "declare @{}({})", self.name, params),
            Some(cfg) => {
                writeln!(f, "define @{}({}) {{", self.name, params)?;
                write_body(f, cfg)?;
                writeln!(f, "}}")
            }
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; module {}", self.name)?;
        for global in &self.globals {
            writeln!(f, "@{} = c{:?}", global.name, global.value)?;
        }
        for function in &self.functions {
            writeln!(f)?;
            write!(f, "{}", function)?;
        }
        Ok(())
    }
}
