use crate::correlation::PairwiseResult;
use crate::filter::{validate_r2_threshold, PairThreshold};
use crate::matrix::LdMatrix;
use crate::output::{format_pair, write_matrix, LabelStyle, OutputMode};
use crate::vcf::VariantReader;
use crate::window::{Window, WindowPolicy};
use log::{debug, info};
use std::io::{self, BufRead, Write};
use std::num::NonZeroUsize;

/// Count window used by streaming mode when no bound is given
pub const DEFAULT_WINDOW: NonZeroUsize = match NonZeroUsize::new(10) {
    Some(count) => count,
    None => NonZeroUsize::MIN,
};

/// Configuration for the ld command
#[derive(Debug, Clone, PartialEq)]
pub struct LdConfig {
    /// Full matrix instead of streamed pairs
    pub matrix: bool,

    /// Candidate retention in streaming mode; the matrix is always unbounded
    /// within a chromosome.
    /// Default: the 10 most recent variants
    pub window: WindowPolicy,

    /// Minimum r² for a streamed pair to be written.
    /// Default: 0.0
    pub threshold: f64,

    /// Matrix labels
    pub labels: LabelStyle,
}

impl Default for LdConfig {
    fn default() -> Self {
        LdConfig {
            matrix: false,
            window: WindowPolicy::MaxCount(DEFAULT_WINDOW),
            threshold: 0.0,
            labels: LabelStyle::Locus,
        }
    }
}

impl LdConfig {
    pub fn validate(&self) -> io::Result<()> {
        validate_r2_threshold("--threshold", self.threshold)?;
        if let WindowPolicy::MaxCount(count) = self.window {
            if !self.matrix && count.get() < 2 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("--window must be at least 2 to form pairs, got {count}"),
                ));
            }
        }
        Ok(())
    }

    pub fn output_mode(&self) -> OutputMode {
        if self.matrix {
            OutputMode::Matrix(self.labels)
        } else {
            OutputMode::Pairs
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LdSummary {
    pub variants: usize,
    /// Pairs compared (matrix: same-chromosome pairs off the diagonal)
    pub pairs: usize,
    /// Pairs whose r² is undefined
    pub undefined: usize,
    /// Pairs written (streaming mode only)
    pub written: usize,
}

/// Compute pairwise r² over every record of `reader` and write it to `out`
pub fn run_ld<R: BufRead, W: Write>(
    reader: &mut VariantReader<R>,
    out: &mut W,
    config: &LdConfig,
) -> io::Result<LdSummary> {
    let mode = config.output_mode();
    mode.write_preamble(out)?;
    let summary = if config.matrix {
        matrix_ld(reader, out, config)?
    } else {
        streaming_ld(reader, out, config)?
    };
    mode.write_epilogue(out)?;

    let stats = reader.stats();
    info!(
        "Read {} variants ({} rows skipped, {} outside regions)",
        stats.records, stats.skipped_rows, stats.outside_region
    );
    info!(
        "Compared {} pairs ({} undefined), wrote {}",
        summary.pairs,
        summary.undefined,
        if config.matrix {
            format!("{0}x{0} matrix", summary.variants)
        } else {
            format!("{} pairs", summary.written)
        }
    );
    Ok(summary)
}

fn streaming_ld<R: BufRead, W: Write>(
    reader: &mut VariantReader<R>,
    out: &mut W,
    config: &LdConfig,
) -> io::Result<LdSummary> {
    let threshold = PairThreshold(config.threshold);
    let mut window = Window::new(config.window);
    let mut summary = LdSummary::default();

    for record in reader.by_ref() {
        window.admit(record?);
        summary.variants += 1;
        let Some(newest) = window.newest() else {
            continue;
        };
        for candidate in window.candidates_for(newest) {
            let pair = PairwiseResult::compute(candidate, newest);
            summary.pairs += 1;
            if pair.r2.is_none() {
                summary.undefined += 1;
            }
            if threshold.accepts(pair.r2) {
                writeln!(out, "{}", format_pair(&pair))?;
                summary.written += 1;
            }
        }
    }
    debug!("Window evicted {} variants", window.evicted());

    Ok(summary)
}

fn matrix_ld<R: BufRead, W: Write>(
    reader: &mut VariantReader<R>,
    out: &mut W,
    config: &LdConfig,
) -> io::Result<LdSummary> {
    let mut matrix = LdMatrix::new();
    for record in reader.by_ref() {
        matrix.push(record?);
    }
    write_matrix(out, &matrix, config.labels)?;

    let mut summary = LdSummary {
        variants: matrix.len(),
        ..Default::default()
    };
    for (_, _, r2) in matrix.pairs() {
        summary.pairs += 1;
        if r2.is_none() {
            summary.undefined += 1;
        }
    }
    Ok(summary)
}
