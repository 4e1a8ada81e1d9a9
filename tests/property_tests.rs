//! Property-based tests for the instrumenter and the profile table

mod common;

use common::{copier, instrument};
use proptest::prelude::*;
use riskcall::instrument::DEFAULT_HOOK;
use riskcall::ir::{Function, Instruction, Module};
use riskcall::runtime::{truncate_name, ProfileReport, ProfileTable, MAX_NAME_LEN};
use std::collections::HashMap;

proptest! {
    /// Every target call gets exactly one hook call right before it
    #[test]
    fn prop_every_target_call_is_preceded_by_hook(
        calls in prop::collection::vec(0usize..5, 1..6)
    ) {
        let mut module = Module::new("generated")
            .with_function(Function::declaration("strcpy", &["dst", "src"]));
        for (i, n) in calls.iter().enumerate() {
            module = module.with_function(copier(&format!("f{}", i), *n));
        }
        let before = module.instruction_count();

        let diagnostics = instrument(&mut module);
        let expected: usize = calls.iter().sum();

        prop_assert_eq!(diagnostics.len(), expected);
        prop_assert_eq!(module.instruction_count(), before + expected);
        prop_assert!(module.validate().is_ok());

        for function in &module.functions {
            let Some(body) = &function.body else { continue };
            for (_, block) in body.blocks() {
                for (i, instruction) in block.instructions.iter().enumerate() {
                    if instruction.direct_callee() == Some("strcpy") {
                        prop_assert!(i > 0);
                        prop_assert_eq!(
                            block.instructions[i - 1].direct_callee(),
                            Some(DEFAULT_HOOK)
                        );
                    }
                }
            }
        }
    }

    /// Counts match a reference model; percentages sum to about 100
    #[test]
    fn prop_table_matches_model(
        calls in prop::collection::vec((0usize..3, 0usize..6), 1..200),
        capacity in 1usize..20,
    ) {
        let apis = ["strcpy", "gets", "sprintf"];
        let table = ProfileTable::new(capacity);

        let mut model: Vec<((usize, usize), u64)> = Vec::new();
        let mut dropped = 0u64;
        for (api, caller) in &calls {
            table.log_call(apis[*api], &format!("caller_{}", caller));
            if let Some((_, count)) = model.iter_mut().find(|(key, _)| *key == (*api, *caller)) {
                *count += 1;
            } else if model.len() < capacity {
                model.push(((*api, *caller), 1));
            } else {
                dropped += 1;
            }
        }

        prop_assert_eq!(table.len(), model.len());
        prop_assert_eq!(table.dropped(), dropped);

        let snapshot = table.snapshot();
        for (entry, ((api, caller), count)) in snapshot.iter().zip(&model) {
            prop_assert_eq!(&entry.api_name, apis[*api]);
            prop_assert_eq!(&entry.caller_name, &format!("caller_{}", caller));
            prop_assert_eq!(entry.count, *count);
        }

        let report = ProfileReport::from_table(&table);
        let total: f64 = report.profile_data.iter().map(|e| e.percentage_of_total).sum();
        prop_assert!((total - 100.0).abs() < 0.01 * report.profile_data.len() as f64 + 1e-9);
    }

    /// Truncation keeps a prefix that fits the name buffer
    #[test]
    fn prop_truncate_name_fits_buffer(name in "\\PC{0,400}") {
        let truncated = truncate_name(&name, MAX_NAME_LEN);
        prop_assert!(truncated.len() < MAX_NAME_LEN);
        prop_assert!(name.starts_with(truncated));
        if name.len() < MAX_NAME_LEN {
            prop_assert_eq!(truncated, name.as_str());
        }
    }

    /// Hook calls never target anything but the configured hook
    #[test]
    fn prop_non_target_calls_untouched(names in prop::collection::vec("[a-z]{1,8}", 1..10)) {
        let mut block = riskcall::ir::BasicBlock::new("entry");
        for name in &names {
            block = block.with(Instruction::call(None, name.as_str(), vec![]));
        }
        let body = riskcall::ir::Cfg::new(block.terminate(riskcall::ir::Terminator::Ret(None)));
        let mut module = Module::new("m").with_function(Function::define("main", &[], body));

        let diagnostics = instrument(&mut module);
        let strcpy_calls = names.iter().filter(|n| n.as_str() == "strcpy").count();
        prop_assert_eq!(diagnostics.len(), strcpy_calls);

        let mut seen: HashMap<String, usize> = HashMap::new();
        let body = module.function("main").unwrap().body.as_ref().unwrap();
        for (_, block) in body.blocks() {
            for instruction in &block.instructions {
                if let Some(callee) = instruction.direct_callee() {
                    *seen.entry(callee.to_string()).or_default() += 1;
                }
            }
        }
        prop_assert_eq!(seen.get(DEFAULT_HOOK).copied().unwrap_or(0), strcpy_calls);
    }
}
