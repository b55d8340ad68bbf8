//! Output formats
//!
//! The mode is picked once from the command line; each arm is a plain
//! formatter over pairs, a finished matrix, or closed blocks.

use crate::blocks::Block;
use crate::correlation::PairwiseResult;
use crate::matrix::{LdMatrix, MatrixVariant};
use std::io::{self, Write};

pub const MATRIX_START: &str = "#LD_MATRIX_START";
pub const MATRIX_END: &str = "#LD_MATRIX_END";
pub const TOO_FEW_VARIANTS: &str = "No or only one variant in the region => no pairwise LD.";
pub const BLOCKS_START: &str = "#HAPLOTYPE_BLOCKS_START";
pub const BLOCKS_END: &str = "#HAPLOTYPE_BLOCKS_END";
pub const PAIRS_HEADER: &str =
    "#VAR1_CHROM\tVAR1_POS\tVAR1_ID\tVAR2_CHROM\tVAR2_POS\tVAR2_ID\tR2";

/// How matrix rows and columns are labelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelStyle {
    /// `chrom:pos`
    #[default]
    Locus,
    /// The ID column, falling back to `chrom:pos` when it is `.`
    Id,
}

impl LabelStyle {
    pub fn label(&self, variant: &MatrixVariant) -> String {
        match (self, &variant.id) {
            (LabelStyle::Id, Some(id)) => id.clone(),
            _ => format!("{}:{}", variant.chrom, variant.pos),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Matrix(LabelStyle),
    Pairs,
    Blocks,
}

impl OutputMode {
    /// Lines written before any data
    pub fn write_preamble<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self {
            OutputMode::Matrix(_) => writeln!(out, "{MATRIX_START}"),
            OutputMode::Pairs => writeln!(out, "{PAIRS_HEADER}"),
            OutputMode::Blocks => writeln!(out, "{BLOCKS_START}"),
        }
    }

    /// Lines written after all data
    pub fn write_epilogue<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self {
            OutputMode::Matrix(_) => writeln!(out, "{MATRIX_END}"),
            OutputMode::Pairs => Ok(()),
            OutputMode::Blocks => writeln!(out, "{BLOCKS_END}"),
        }
    }
}

/// r² with 4 decimals, `NA` when undefined
pub fn format_r2(r2: Option<f64>) -> String {
    match r2 {
        Some(r2) => format!("{r2:.4}"),
        None => "NA".to_string(),
    }
}

pub fn format_pair(pair: &PairwiseResult) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}",
        pair.first.chrom,
        pair.first.pos,
        pair.first.id_or_dot(),
        pair.second.chrom,
        pair.second.pos,
        pair.second.id_or_dot(),
        format_r2(pair.r2)
    )
}

/// `Block <n>: <index>:(<chrom>:<pos>), ...`
pub fn format_block(number: usize, block: &Block) -> String {
    let members: Vec<String> = block
        .members
        .iter()
        .map(|member| format!("{}:({}:{})", member.index, member.chrom, member.pos))
        .collect();
    format!("Block {}: {}", number, members.join(", "))
}

/// Matrix body: header row and one row per variant, or the explanatory line
/// when fewer than two variants were admitted
pub fn write_matrix<W: Write>(out: &mut W, matrix: &LdMatrix, labels: LabelStyle) -> io::Result<()> {
    if matrix.len() < 2 {
        return writeln!(out, "{TOO_FEW_VARIANTS}");
    }

    let names: Vec<String> = matrix.variants().iter().map(|v| labels.label(v)).collect();
    write!(out, "Index/Var")?;
    for name in &names {
        write!(out, "\t{name}")?;
    }
    writeln!(out)?;

    for (i, name) in names.iter().enumerate() {
        write!(out, "{name}")?;
        for j in 0..matrix.len() {
            write!(out, "\t{}", format_r2(matrix.get(i, j)))?;
        }
        writeln!(out)?;
    }
    Ok(())
}
