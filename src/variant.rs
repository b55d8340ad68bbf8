use crate::genotype::{encode_genotype, Dosage, Genotype};
use std::fmt;

/// Leading VCF columns: CHROM POS ID REF ALT QUAL FILTER INFO
pub const FIXED_COLUMNS: usize = 8;
/// Index of the FORMAT column; sample columns follow it
pub const FORMAT_COLUMN: usize = 8;

/// One variant row with its per-sample dosages.
///
/// Identity fields are carried through untouched. Records are immutable once
/// built and all records of a run have the same number of dosages.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantRecord {
    /// 0-based arrival index among the records accepted in this run
    pub index: usize,
    pub chrom: String,
    /// 1-based position
    pub pos: u64,
    /// `None` when the ID column is `.`
    pub id: Option<String>,
    pub ref_allele: String,
    pub alt: String,
    pub dosages: Vec<Dosage>,
}

impl VariantRecord {
    /// `chrom:pos`, the default label in matrix output
    pub fn locus(&self) -> String {
        format!("{}:{}", self.chrom, self.pos)
    }

    /// The ID column as written in the input
    pub fn id_or_dot(&self) -> &str {
        self.id.as_deref().unwrap_or(".")
    }
}

/// Problems with a single data row.
///
/// Only [`RowErr::SampleCountMismatch`] is fatal; every other variant causes the
/// row to be skipped with a warning.
#[derive(Debug, Clone, PartialEq)]
pub enum RowErr {
    NotEnoughFields { found: usize, required: usize },
    InvalidPosition(String),
    MissingGenotypeField(String),
    UnexpectedPloidy {
        sample: usize,
        expected: usize,
        found: usize,
    },
    SampleCountMismatch { expected: usize, found: usize },
}

impl RowErr {
    pub fn is_fatal(&self) -> bool {
        matches!(self, RowErr::SampleCountMismatch { .. })
    }
}

impl fmt::Display for RowErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowErr::NotEnoughFields { found, required } => write!(
                f,
                "Not enough fields in VCF record ({found} found, {required} required)"
            ),
            RowErr::InvalidPosition(pos) => write!(f, "Invalid position '{pos}'"),
            RowErr::MissingGenotypeField(format) => {
                write!(f, "FORMAT '{format}' does not start with GT")
            }
            RowErr::UnexpectedPloidy {
                sample,
                expected,
                found,
            } => write!(
                f,
                "Sample {} has ploidy {found}, expected {expected}",
                sample + 1
            ),
            RowErr::SampleCountMismatch { expected, found } => write!(
                f,
                "Record has {found} sample columns but the header declares {expected}"
            ),
        }
    }
}

impl std::error::Error for RowErr {}

/// Site part of a row: enough to decide whether the row is wanted before any
/// genotype is decoded.
#[derive(Debug)]
pub struct Site<'a> {
    pub chrom: &'a str,
    pub pos: u64,
    fields: Vec<&'a str>,
    n_samples: usize,
}

/// Columns a row must have before its sample count can be checked: the fixed
/// columns, plus FORMAT when the header declares samples
pub fn fixed_fields(n_samples: usize) -> usize {
    if n_samples == 0 {
        FIXED_COLUMNS
    } else {
        FORMAT_COLUMN + 1
    }
}

/// Exact column count for a header with `n_samples` samples
pub fn required_fields(n_samples: usize) -> usize {
    if n_samples == 0 {
        FIXED_COLUMNS
    } else {
        FORMAT_COLUMN + 1 + n_samples
    }
}

/// Split a data row and parse CHROM/POS.
///
/// A row short of the fixed columns is recoverable. A row with a FORMAT column
/// but the wrong number of samples is not: every record must carry one dosage
/// per header sample.
pub fn parse_site(line: &str, n_samples: usize) -> Result<Site<'_>, RowErr> {
    let fields: Vec<&str> = line.split('\t').collect();
    let minimum = fixed_fields(n_samples);
    if fields.len() < minimum {
        return Err(RowErr::NotEnoughFields {
            found: fields.len(),
            required: minimum,
        });
    }
    if n_samples > 0 && fields.len() != required_fields(n_samples) {
        return Err(RowErr::SampleCountMismatch {
            expected: n_samples,
            found: fields.len() - FORMAT_COLUMN - 1,
        });
    }

    let pos = match fields[1].parse::<u64>() {
        Ok(pos) if pos > 0 => pos,
        _ => return Err(RowErr::InvalidPosition(fields[1].to_string())),
    };

    Ok(Site {
        chrom: fields[0],
        pos,
        fields,
        n_samples,
    })
}

/// Dosages decoded from one row, plus how many tokens could not be parsed
pub struct EncodedSamples {
    pub dosages: Vec<Dosage>,
    pub malformed: usize,
}

/// Decode the sample columns of a row.
///
/// The genotype is the first `:`-delimited subfield of each sample column.
/// With `expected_ploidy` set, a called genotype of another ploidy rejects the
/// whole row.
pub fn encode_samples(
    site: &Site<'_>,
    expected_ploidy: Option<usize>,
) -> Result<EncodedSamples, RowErr> {
    if site.n_samples == 0 {
        return Ok(EncodedSamples {
            dosages: Vec::new(),
            malformed: 0,
        });
    }

    let samples = &site.fields[FORMAT_COLUMN + 1..];
    let format = site.fields[FORMAT_COLUMN];
    if format.split(':').next() != Some("GT") {
        return Err(RowErr::MissingGenotypeField(format.to_string()));
    }

    let mut dosages = Vec::with_capacity(samples.len());
    let mut malformed = 0;
    for (sample, column) in samples.iter().enumerate() {
        let token = column.split(':').next().unwrap_or(column);
        let genotype = encode_genotype(token);
        match (genotype, expected_ploidy) {
            (Genotype::Called { ploidy, .. }, Some(expected)) if ploidy != expected => {
                return Err(RowErr::UnexpectedPloidy {
                    sample,
                    expected,
                    found: ploidy,
                });
            }
            (Genotype::Malformed, _) => malformed += 1,
            _ => {}
        }
        dosages.push(genotype.dosage());
    }

    Ok(EncodedSamples { dosages, malformed })
}

impl<'a> Site<'a> {
    /// Build the record once the site has been accepted
    pub fn into_record(self, index: usize, dosages: Vec<Dosage>) -> VariantRecord {
        let id = match self.fields[2] {
            "." | "" => None,
            id => Some(id.to_string()),
        };
        VariantRecord {
            index,
            chrom: self.chrom.to_string(),
            pos: self.pos,
            id,
            ref_allele: self.fields[3].to_string(),
            alt: self.fields[4].to_string(),
            dosages,
        }
    }
}
