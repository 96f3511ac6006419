//! Control-flow graph: an arena of basic blocks addressed by [`BlockId`].
//!
//! Terminators refer to blocks by id, so back-edges (loop continues) are plain data and
//! the graph owns every block it ever allocated, including the unreachable ones created
//! after `break`/`continue`/`ret`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use sm5_ir::{Operand, TestBoolean};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(u32);

impl BlockId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// Branch condition: a scalar operand tested against zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Condition {
    pub operand: Operand,
    pub test: TestBoolean,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    Unconditional(BlockId),
    Conditional {
        cond: Condition,
        if_true: BlockId,
        if_false: BlockId,
    },
    Switch {
        selector: Operand,
        cases: BTreeMap<u32, BlockId>,
        default: BlockId,
    },
    Return,
}

impl Terminator {
    /// Successor blocks in edge order; switch cases come in ascending case value.
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Self::Unconditional(target) => vec![*target],
            Self::Conditional {
                if_true, if_false, ..
            } => vec![*if_true, *if_false],
            Self::Switch { cases, default, .. } => {
                let mut out: Vec<BlockId> = cases.values().copied().collect();
                out.push(*default);
                out
            }
            Self::Return => Vec::new(),
        }
    }
}

/// An instruction placed in a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockInst<L> {
    /// Output of the instruction lowering.
    Lowered(L),
    /// Terminates the pixel invocation (`discard`).
    PixelDiscard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock<L> {
    pub name: &'static str,
    pub instructions: Vec<BlockInst<L>>,
    terminator: Option<Terminator>,
}

impl<L> BasicBlock<L> {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            instructions: Vec::new(),
            terminator: None,
        }
    }

    pub fn terminator(&self) -> Option<&Terminator> {
        self.terminator.as_ref()
    }

    /// A block is open until its terminator is set.
    pub fn is_open(&self) -> bool {
        self.terminator.is_none()
    }

    /// Lowered instructions, skipping [`BlockInst::PixelDiscard`].
    pub fn lowered(&self) -> impl Iterator<Item = &L> {
        self.instructions.iter().filter_map(|inst| match inst {
            BlockInst::Lowered(l) => Some(l),
            BlockInst::PixelDiscard => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{0} already has a terminator")]
pub struct TerminatorAlreadySet(pub BlockId);

/// The graph of one shader function.
///
/// Created with an open entry block (`entrybb`) and a shared return block (`returnbb`)
/// that already ends in [`Terminator::Return`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cfg<L> {
    blocks: Vec<BasicBlock<L>>,
    entry: BlockId,
    exit: BlockId,
}

impl<L> Default for Cfg<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L> Cfg<L> {
    pub fn new() -> Self {
        let mut cfg = Self {
            blocks: Vec::new(),
            entry: BlockId(0),
            exit: BlockId(0),
        };
        cfg.entry = cfg.add_block("entrybb");
        cfg.exit = cfg.add_block("returnbb");
        cfg.blocks[cfg.exit.index()].terminator = Some(Terminator::Return);
        cfg
    }

    pub fn entry(&self) -> BlockId {
        self.entry
    }

    /// The shared return block; every `ret` edges here.
    pub fn exit(&self) -> BlockId {
        self.exit
    }

    pub fn add_block(&mut self, name: &'static str) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(BasicBlock::new(name));
        id
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock<L> {
        &self.blocks[id.index()]
    }

    pub fn push(&mut self, id: BlockId, inst: BlockInst<L>) {
        self.blocks[id.index()].instructions.push(inst);
    }

    /// Sets the terminator of an open block.
    pub fn terminate(
        &mut self,
        id: BlockId,
        terminator: Terminator,
    ) -> Result<(), TerminatorAlreadySet> {
        let block = &mut self.blocks[id.index()];
        if block.terminator.is_some() {
            return Err(TerminatorAlreadySet(id));
        }
        block.terminator = Some(terminator);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockId, &BasicBlock<L>)> {
        self.blocks
            .iter()
            .enumerate()
            .map(|(i, b)| (BlockId(i as u32), b))
    }

    pub fn successors(&self, id: BlockId) -> Vec<BlockId> {
        self.block(id)
            .terminator()
            .map(Terminator::successors)
            .unwrap_or_default()
    }

    pub fn predecessors(&self, id: BlockId) -> Vec<BlockId> {
        self.iter()
            .filter(|(_, b)| {
                b.terminator()
                    .is_some_and(|t| t.successors().contains(&id))
            })
            .map(|(pred, _)| pred)
            .collect()
    }

    /// Blocks reachable from the entry block.
    pub fn reachable(&self) -> BTreeSet<BlockId> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![self.entry];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            stack.extend(self.successors(id));
        }
        seen
    }
}

impl<L: fmt::Debug> fmt::Display for Cfg<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, block) in self.iter() {
            writeln!(f, "{id} ({}):", block.name)?;
            for inst in &block.instructions {
                match inst {
                    BlockInst::Lowered(l) => writeln!(f, "  {l:?}")?,
                    BlockInst::PixelDiscard => writeln!(f, "  discard")?,
                }
            }
            match block.terminator() {
                None => writeln!(f, "  <open>")?,
                Some(Terminator::Unconditional(target)) => writeln!(f, "  br {target}")?,
                Some(Terminator::Conditional {
                    cond,
                    if_true,
                    if_false,
                }) => writeln!(
                    f,
                    "  br_{} {}, {if_true}, {if_false}",
                    match cond.test {
                        TestBoolean::Zero => "z",
                        TestBoolean::NonZero => "nz",
                    },
                    cond.operand.ty
                )?,
                Some(Terminator::Switch {
                    cases, default, ..
                }) => {
                    write!(f, "  switch")?;
                    for (value, target) in cases {
                        write!(f, " {value}:{target}")?;
                    }
                    writeln!(f, " default:{default}")?;
                }
                Some(Terminator::Return) => writeln!(f, "  ret")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_graph_has_entry_and_return() {
        let cfg: Cfg<()> = Cfg::new();
        assert_eq!(cfg.len(), 2);
        assert!(cfg.block(cfg.entry()).is_open());
        assert_eq!(cfg.block(cfg.exit()).terminator(), Some(&Terminator::Return));
        assert_eq!(cfg.block(cfg.exit()).name, "returnbb");
    }

    #[test]
    fn terminator_is_set_once() {
        let mut cfg: Cfg<()> = Cfg::new();
        let entry = cfg.entry();
        cfg.terminate(entry, Terminator::Unconditional(cfg.exit()))
            .unwrap();
        assert_eq!(
            cfg.terminate(entry, Terminator::Return),
            Err(TerminatorAlreadySet(entry))
        );
        assert_eq!(cfg.predecessors(cfg.exit()), vec![entry]);
    }

    #[test]
    fn reachability_ignores_orphans() {
        let mut cfg: Cfg<()> = Cfg::new();
        let orphan = cfg.add_block("after_break");
        cfg.terminate(orphan, Terminator::Unconditional(cfg.exit()))
            .unwrap();
        cfg.terminate(cfg.entry(), Terminator::Unconditional(cfg.exit()))
            .unwrap();
        let reachable = cfg.reachable();
        assert!(reachable.contains(&cfg.exit()));
        assert!(!reachable.contains(&orphan));
    }

    #[test]
    fn dump() {
        let mut cfg: Cfg<&str> = Cfg::new();
        cfg.push(cfg.entry(), BlockInst::Lowered("mov"));
        cfg.terminate(cfg.entry(), Terminator::Unconditional(cfg.exit()))
            .unwrap();
        assert_eq!(
            cfg.to_string(),
            "bb0 (entrybb):\n  \"mov\"\n  br bb1\nbb1 (returnbb):\n  ret\n"
        );
    }
}
