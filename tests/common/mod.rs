// Shared module builders for integration tests

#![allow(dead_code)]

use riskcall::instrument::DangerousApiPass;
use riskcall::ir::{BasicBlock, Cfg, Function, Instruction, Module, Operand, Terminator};

pub fn strcpy_call() -> Instruction {
    Instruction::call(
        Some("r"),
        "strcpy",
        vec![Operand::reg("dst"), Operand::reg("src")],
    )
}

/// `name(dst, src)` calling strcpy `calls` times, returning the last result
pub fn copier(name: &str, calls: usize) -> Function {
    let mut block = BasicBlock::new("entry");
    for _ in 0..calls {
        block = block.with(strcpy_call());
    }
    let ret = if calls > 0 {
        Operand::reg("r")
    } else {
        Operand::reg("dst")
    };
    Function::define(
        name,
        &["dst", "src"],
        Cfg::new(block.terminate(Terminator::Ret(Some(ret)))),
    )
}

/// `main(dst, src)` calling each of `callees` once with its own arguments
pub fn driver(callees: &[&str]) -> Function {
    let mut block = BasicBlock::new("entry");
    for callee in callees {
        block = block.with(Instruction::call(
            None,
            *callee,
            vec![Operand::reg("dst"), Operand::reg("src")],
        ));
    }
    Function::define(
        "main",
        &["dst", "src"],
        Cfg::new(block.terminate(Terminator::Ret(Some(Operand::Int(0))))),
    )
}

/// A calls strcpy twice, B once, main calls A then B
pub fn two_caller_module() -> Module {
    Module::new("two_callers")
        .with_function(Function::declaration("strcpy", &["dst", "src"]))
        .with_function(copier("A", 2))
        .with_function(copier("B", 1))
        .with_function(driver(&["A", "B"]))
}

pub fn instrument(module: &mut Module) -> Vec<String> {
    let mut diagnostics = Vec::new();
    DangerousApiPass::default().run_with_diagnostics(module, &mut diagnostics);
    String::from_utf8(diagnostics)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}
