//! Pairwise dosage correlation (naive r²)
//!
//! Pearson correlation over pairwise-complete samples: a sample missing in
//! either vector is dropped for that pair only.

use crate::genotype::Dosage;
use crate::variant::VariantRecord;

/// Signed correlation and its square, both clamped to their valid ranges
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correlation {
    pub r: f64,
    pub r2: f64,
}

/// Correlation between two dosage vectors.
///
/// Returns `None` when fewer than two samples are called in both vectors, when
/// either vector is constant over those samples, or when the vectors differ in
/// length.
pub fn correlation(a: &[Dosage], b: &[Dosage]) -> Option<Correlation> {
    if a.len() != b.len() {
        return None;
    }

    let mut n = 0usize;
    let mut sum_a = 0.0;
    let mut sum_b = 0.0;
    for (x, y) in paired(a, b) {
        n += 1;
        sum_a += x;
        sum_b += y;
    }
    if n < 2 {
        return None;
    }

    let mean_a = sum_a / n as f64;
    let mean_b = sum_b / n as f64;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in paired(a, b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a <= 0.0 || var_b <= 0.0 {
        return None;
    }

    let r = (cov / (var_a * var_b).sqrt()).clamp(-1.0, 1.0);
    Some(Correlation {
        r,
        r2: (r * r).clamp(0.0, 1.0),
    })
}

/// r² between two dosage vectors, `None` when undefined
pub fn r_squared(a: &[Dosage], b: &[Dosage]) -> Option<f64> {
    correlation(a, b).map(|c| c.r2)
}

/// r² between two records, ordered by arrival
#[derive(Debug, Clone, Copy)]
pub struct PairwiseResult<'a> {
    pub first: &'a VariantRecord,
    pub second: &'a VariantRecord,
    pub r2: Option<f64>,
}

impl<'a> PairwiseResult<'a> {
    /// Compute r² for an earlier and a later record.
    ///
    /// Records on different chromosomes are never paired: their r² is `NA`.
    pub fn compute(first: &'a VariantRecord, second: &'a VariantRecord) -> Self {
        let r2 = if first.chrom == second.chrom {
            r_squared(&first.dosages, &second.dosages)
        } else {
            None
        };
        PairwiseResult { first, second, r2 }
    }
}

fn paired<'a>(a: &'a [Dosage], b: &'a [Dosage]) -> impl Iterator<Item = (f64, f64)> + 'a {
    a.iter().zip(b).filter_map(|(x, y)| Some(((*x)?, (*y)?)))
}
