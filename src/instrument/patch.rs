use super::targets::TargetApiSet;
use crate::ir::{is_intrinsic_name, BlockId, Cfg, Function, Instruction, Module, Operand};

/// A matched call to a target API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    /// Name of the called target API
    pub callee: String,
    /// Function containing the call
    pub caller: String,
    pub block: BlockId,
    /// Position of the call inside `block` before any rewrite
    pub index: usize,
}

/// Hook call ready to be spliced in before `index` of `block`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    pub block: BlockId,
    pub index: usize,
    pub instruction: Instruction,
}

/// Call sites collected from one function, applied in a separate pass
///
/// Collecting first and mutating afterwards keeps the scan independent of
/// the rewrite: the scan only ever sees the original instruction layout.
#[derive(Debug, Default)]
pub struct PatchList {
    sites: Vec<CallSite>,
}

impl PatchList {
    /// Collect every direct, non-intrinsic call to a target in `function`
    ///
    /// Declarations yield an empty list.
    pub fn scan(function: &Function, targets: &TargetApiSet) -> Self {
        let Some(body) = &function.body else {
            return Self::default();
        };

        let mut sites = Vec::new();
        for (block, bb) in body.blocks() {
            for (index, instruction) in bb.instructions.iter().enumerate() {
                let Some(callee) = instruction.direct_callee() else {
                    continue;
                };
                if is_intrinsic_name(callee) || !targets.contains(callee) {
                    continue;
                }
                sites.push(CallSite {
                    callee: callee.to_string(),
                    caller: function.name.clone(),
                    block,
                    index,
                });
            }
        }
        Self { sites }
    }

    pub fn sites(&self) -> &[CallSite] {
        &self.sites
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Build the hook call for every site
    ///
    /// String constants for callee and caller names are interned into
    /// `module`, which is why this step is separate from [`apply`].
    ///
    /// [`apply`]: PatchList::apply
    pub fn resolve(&self, module: &mut Module, hook: &str) -> Vec<Insertion> {
        self.sites
            .iter()
            .map(|site| {
                let api = module.intern_string(&site.callee);
                let caller = module.intern_string(&site.caller);
                Insertion {
                    block: site.block,
                    index: site.index,
                    instruction: Instruction::call(
                        None,
                        hook,
                        vec![Operand::Global(api), Operand::Global(caller)],
                    ),
                }
            })
            .collect()
    }

    /// Splice `insertions` into `body`
    ///
    /// Within a block, insertions run from the highest original index down so
    /// every recorded index still points at its call. Returns the number of
    /// instructions inserted.
    pub fn apply(body: &mut Cfg, mut insertions: Vec<Insertion>) -> usize {
        insertions.sort_by(|a, b| a.block.cmp(&b.block).then(b.index.cmp(&a.index)));

        let mut applied = 0;
        for insertion in insertions {
            if body.insert_before(insertion.block, insertion.index, insertion.instruction) {
                applied += 1;
            } else {
                tracing::warn!(
                    "Skipping stale insertion at block {:?} index {}",
                    insertion.block,
                    insertion.index
                );
            }
        }
        applied
    }
}
