//! Haplotype block segmentation
//!
//! Every incoming variant is tested against the anchor (first member) of the
//! open block. Passing variants join the block; the first failing one closes
//! it and anchors the next block.

use crate::correlation::{correlation, Correlation};
use crate::variant::VariantRecord;
use crate::window::{Window, WindowPolicy};
use log::debug;

/// Contiguous run of variants on one chromosome
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub members: Vec<VariantRecord>,
}

impl Block {
    pub fn anchor(&self) -> Option<&VariantRecord> {
        self.members.first()
    }

    pub fn chrom(&self) -> Option<&str> {
        self.anchor().map(|anchor| anchor.chrom.as_str())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

enum BlockState {
    NoOpenBlock,
    /// Members in arrival order; the window head is the anchor
    BlockOpen(Window),
}

/// Test a variant must pass against the anchor to join its block
#[derive(Debug, Clone, Copy, PartialEq)]
struct InclusionRule {
    ld_threshold: f64,
    /// Only coupling-phase correlation (r > 0) counts
    require_coupling: bool,
}

impl InclusionRule {
    fn accepts(&self, correlation: Option<Correlation>) -> bool {
        correlation.is_some_and(|c| {
            c.r2 >= self.ld_threshold && (!self.require_coupling || c.r > 0.0)
        })
    }
}

/// Streaming block segmenter.
///
/// `push` returns a block as soon as it closes, so only the open block is
/// ever held in memory.
pub struct BlockSegmenter {
    rule: InclusionRule,
    policy: WindowPolicy,
    state: BlockState,
}

impl BlockSegmenter {
    pub fn new(ld_threshold: f64, require_coupling: bool, policy: WindowPolicy) -> Self {
        BlockSegmenter {
            rule: InclusionRule {
                ld_threshold,
                require_coupling,
            },
            policy,
            state: BlockState::NoOpenBlock,
        }
    }

    /// Feed the next variant. Returns the block it closed, if any.
    pub fn push(&mut self, record: VariantRecord) -> Option<Block> {
        let rule = self.rule;
        if let BlockState::BlockOpen(members) = &mut self.state {
            match close_reason(rule, members, &record) {
                None => {
                    members.admit(record);
                    return None;
                }
                Some(reason) => debug!("Closing block before {} ({})", record.locus(), reason),
            }
        }

        let closed = self.finish();
        let mut members = Window::new(self.policy);
        members.admit(record);
        self.state = BlockState::BlockOpen(members);
        closed
    }

    /// Close the open block at end of input
    pub fn finish(&mut self) -> Option<Block> {
        match std::mem::replace(&mut self.state, BlockState::NoOpenBlock) {
            BlockState::NoOpenBlock => None,
            BlockState::BlockOpen(mut members) => {
                let members = members.drain();
                (!members.is_empty()).then_some(Block { members })
            }
        }
    }
}

/// Why `record` cannot join the block held in `members`; `None` if it can
fn close_reason(
    rule: InclusionRule,
    members: &Window,
    record: &VariantRecord,
) -> Option<&'static str> {
    let anchor = members.head()?;
    if anchor.chrom != record.chrom {
        return Some("chromosome change");
    }
    if members.would_evict(record) {
        return Some("window limit");
    }
    let result = correlation(&anchor.dosages, &record.dosages);
    if rule.accepts(result) {
        return None;
    }
    match result {
        None => Some("r2 undefined against anchor"),
        Some(c) if c.r2 >= rule.ld_threshold => Some("repulsion phase against anchor"),
        Some(_) => Some("r2 below threshold against anchor"),
    }
}
