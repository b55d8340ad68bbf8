use crate::blocks::{Block, BlockSegmenter};
use crate::filter::validate_r2_threshold;
use crate::output::{format_block, OutputMode};
use crate::vcf::VariantReader;
use crate::window::WindowPolicy;
use log::{debug, info, warn};
use std::io::{self, BufRead, Write};

/// Configuration for the blocks command
#[derive(Debug, Clone, PartialEq)]
pub struct BlocksConfig {
    /// Minimum r² against the anchor for a variant to join its block.
    /// Default: 0.8
    pub ld_threshold: f64,

    /// Bound on block extent; a block closes before its anchor would be
    /// evicted. Default: unbounded
    pub window: WindowPolicy,

    /// Require coupling phase (r > 0) with the anchor.
    /// Default: true
    pub require_coupling: bool,
}

impl Default for BlocksConfig {
    fn default() -> Self {
        BlocksConfig {
            ld_threshold: 0.8,
            window: WindowPolicy::Unbounded,
            require_coupling: true,
        }
    }
}

impl BlocksConfig {
    pub fn validate(&self) -> io::Result<()> {
        validate_r2_threshold("--ld-threshold", self.ld_threshold)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlocksSummary {
    pub variants: usize,
    pub blocks: usize,
    pub singletons: usize,
}

/// Segment the records of `reader` into haplotype blocks, writing each block
/// as soon as it closes
pub fn run_blocks<R: BufRead, W: Write>(
    reader: &mut VariantReader<R>,
    out: &mut W,
    config: &BlocksConfig,
) -> io::Result<BlocksSummary> {
    let mode = OutputMode::Blocks;
    let mut segmenter =
        BlockSegmenter::new(config.ld_threshold, config.require_coupling, config.window);
    let mut summary = BlocksSummary::default();

    mode.write_preamble(out)?;
    let mut emit = |block: Block, out: &mut W| -> io::Result<()> {
        summary.blocks += 1;
        if block.len() == 1 {
            summary.singletons += 1;
        }
        debug!(
            "Block {} on {} has {} variants",
            summary.blocks,
            block.chrom().unwrap_or("?"),
            block.len()
        );
        writeln!(out, "{}", format_block(summary.blocks, &block))
    };

    let mut variants = 0;
    for record in reader.by_ref() {
        variants += 1;
        if let Some(block) = segmenter.push(record?) {
            emit(block, out)?;
        }
    }
    if let Some(block) = segmenter.finish() {
        emit(block, out)?;
    }
    mode.write_epilogue(out)?;
    summary.variants = variants;

    if summary.variants == 0 {
        warn!("No variants read; no haplotype blocks written");
    }
    let stats = reader.stats();
    info!(
        "Read {} variants ({} rows skipped), wrote {} blocks ({} singletons)",
        stats.records, stats.skipped_rows, summary.blocks, summary.singletons
    );
    Ok(summary)
}
