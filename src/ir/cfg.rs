//! Control flow graph of a function body

use super::{Instruction, IrError, Operand, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

/// Handle to a basic block inside its [`Cfg`]
pub type BlockId = NodeIndex;

/// Edge kind in the control flow graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Unconditional jump
    Uncond,
    /// Conditional jump (true branch)
    True,
    /// Conditional jump (false branch)
    False,
}

/// Block terminator; branch targets are the block's outgoing edges
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminator {
    Ret(Option<Operand>),
    /// Follows the single `Uncond` edge
    Br,
    /// Follows the `True` edge when `cond` is non-zero, `False` otherwise
    CondBr { cond: Operand },
    Unreachable,
}

/// A straight-line sequence of instructions ending in a terminator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub label: String,
    #[serde(default)]
    pub instructions: Vec<Instruction>,
    pub terminator: Terminator,
}

impl BasicBlock {
    /// Empty block ending in `unreachable`
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            instructions: Vec::new(),
            terminator: Terminator::Unreachable,
        }
    }

    /// Append an instruction, builder style
    pub fn with(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    /// Set the terminator, builder style
    pub fn terminate(mut self, terminator: Terminator) -> Self {
        self.terminator = terminator;
        self
    }
}

/// Graph of basic blocks with a distinguished entry block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cfg {
    graph: DiGraph<BasicBlock, EdgeKind>,
    entry: BlockId,
}

impl Cfg {
    /// Create a CFG whose entry is `entry`
    pub fn new(entry: BasicBlock) -> Self {
        let mut graph = DiGraph::new();
        let entry = graph.add_node(entry);
        Self { graph, entry }
    }

    pub fn add_block(&mut self, block: BasicBlock) -> BlockId {
        self.graph.add_node(block)
    }

    pub fn add_edge(&mut self, from: BlockId, to: BlockId, kind: EdgeKind) {
        self.graph.add_edge(from, to, kind);
    }

    pub fn entry(&self) -> BlockId {
        self.entry
    }

    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.graph.node_weight(id)
    }

    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut BasicBlock> {
        self.graph.node_weight_mut(id)
    }

    /// Blocks in layout (insertion) order
    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &BasicBlock)> {
        self.graph
            .node_indices()
            .map(move |id| (id, &self.graph[id]))
    }

    pub fn block_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Successor of `id` along an edge of the given kind
    pub fn successor(&self, id: BlockId, kind: EdgeKind) -> Option<BlockId> {
        self.graph
            .edges_directed(id, Direction::Outgoing)
            .find(|edge| *edge.weight() == kind)
            .map(|edge| edge.target())
    }

    /// Get the underlying graph
    pub fn graph(&self) -> &DiGraph<BasicBlock, EdgeKind> {
        &self.graph
    }

    pub fn instruction_count(&self) -> usize {
        self.graph
            .node_weights()
            .map(|block| block.instructions.len())
            .sum()
    }

    /// Insert `instruction` so it lands at position `index` of `block`
    ///
    /// Returns false when the block does not exist or `index` is past the
    /// end of the block.
    pub fn insert_before(&mut self, block: BlockId, index: usize, instruction: Instruction) -> bool {
        match self.graph.node_weight_mut(block) {
            Some(bb) if index <= bb.instructions.len() => {
                bb.instructions.insert(index, instruction);
                true
            }
            _ => false,
        }
    }

    /// Check that every terminator has exactly the edges it needs
    pub fn validate(&self, function: &str) -> Result<()> {
        if self.graph.node_weight(self.entry).is_none() {
            return Err(IrError::MalformedCfg {
                function: function.to_string(),
                block: "<entry>".to_string(),
                message: "entry block does not exist".to_string(),
            });
        }

        for (id, block) in self.blocks() {
            let mut uncond = 0;
            let mut on_true = 0;
            let mut on_false = 0;
            for edge in self.graph.edges_directed(id, Direction::Outgoing) {
                match edge.weight() {
                    EdgeKind::Uncond => uncond += 1,
                    EdgeKind::True => on_true += 1,
                    EdgeKind::False => on_false += 1,
                }
            }

            let expected = match block.terminator {
                Terminator::Br => (1, 0, 0),
                Terminator::CondBr { .. } => (0, 1, 1),
                Terminator::Ret(_) | Terminator::Unreachable => (0, 0, 0),
            };

            if (uncond, on_true, on_false) != expected {
                return Err(IrError::MalformedCfg {
                    function: function.to_string(),
                    block: block.label.clone(),
                    message: format!(
                        "terminator {:?} has {} uncond, {} true, {} false successor edges",
                        block.terminator, uncond, on_true, on_false
                    ),
                });
            }
        }
        Ok(())
    }
}
