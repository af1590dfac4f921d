//! Per-block instrumentation planning.
//!
//! When the host translates a new block, the planner decides which instructions get a
//! hook. The decision only depends on the static instruction bytes, so a block is
//! planned once no matter how often it later executes.

use tracing::{debug, trace};

use crate::host::{InstructionRecord, MemAccess};
use crate::sentinel::SentinelPattern;

/// Behavior attached to a single instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    /// Flip capture each time the instruction executes.
    Toggle,
    /// Record the instruction's memory accesses of the given kind.
    Record(MemAccess),
}

/// A hook bound to an instruction by its index within the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedHook {
    pub index: usize,
    pub hook: Hook,
}

/// Classifies instructions into sentinel, memory-accessing and other.
#[derive(Debug, Clone, Default)]
pub struct Planner {
    sentinel: SentinelPattern,
    access: MemAccess,
}

impl Planner {
    #[must_use]
    pub const fn new(sentinel: SentinelPattern, access: MemAccess) -> Self {
        Self { sentinel, access }
    }

    #[must_use]
    pub const fn sentinel(&self) -> &SentinelPattern {
        &self.sentinel
    }

    #[must_use]
    pub const fn access(&self) -> MemAccess {
        self.access
    }

    /// Hook for one instruction, if any.
    ///
    /// The sentinel check comes first: a sentinel is never recorded, even if it also
    /// touches memory.
    #[must_use]
    pub fn classify(&self, insn: &InstructionRecord<'_>) -> Option<Hook> {
        if self.sentinel.matches(insn.bytes()) {
            Some(Hook::Toggle)
        } else if insn.is_memory_access() {
            Some(Hook::Record(self.access))
        } else {
            None
        }
    }

    /// Plan hooks for a newly translated block, in instruction order.
    #[must_use]
    pub fn plan(&self, block: &[InstructionRecord<'_>]) -> Vec<PlannedHook> {
        let hooks: Vec<PlannedHook> = block
            .iter()
            .enumerate()
            .filter_map(|(index, insn)| {
                self.classify(insn)
                    .map(|hook| PlannedHook { index, hook })
            })
            .collect();

        let sentinels = hooks.iter().filter(|p| p.hook == Hook::Toggle).count();
        if sentinels > 0 {
            debug!(insns = block.len(), sentinels, "sentinel found in block");
        }
        trace!(insns = block.len(), hooks = hooks.len(), "planned block");
        hooks
    }
}
