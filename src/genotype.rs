//! Genotype token encoding
//!
//! Turns a single sample's `GT` token (`0/1`, `1|2`, `./.`, `1`, ...) into an
//! alternate-allele dosage. Phasing is ignored: `0|1` and `1/0` both encode to 1.

/// Alternate-allele dosage for one sample, `None` when missing.
pub type Dosage = Option<f64>;

/// Result of encoding one genotype token
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Genotype {
    /// Every allele slot parsed as an integer
    Called { alt_alleles: u32, ploidy: usize },
    /// At least one allele slot is `.`
    Missing { ploidy: usize },
    /// An allele slot that is neither `.` nor a non-negative integer
    Malformed,
}

impl Genotype {
    /// Dosage carried by this genotype; missing and malformed tokens have none
    pub fn dosage(&self) -> Dosage {
        match self {
            Genotype::Called { alt_alleles, .. } => Some(*alt_alleles as f64),
            Genotype::Missing { .. } | Genotype::Malformed => None,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Genotype::Malformed)
    }
}

/// Encode a genotype token.
///
/// The dosage counts allele slots whose index is at least 1, so `1/2` is 2 and
/// `0/3` is 1. No ploidy is assumed: `1` (haploid) and `0/1/1` (triploid) are
/// both valid tokens.
pub fn encode_genotype(token: &str) -> Genotype {
    if token.is_empty() {
        return Genotype::Malformed;
    }

    let mut ploidy = 0;
    let mut alt_alleles = 0;
    let mut missing = false;
    let mut malformed = false;
    for allele in token.split(|c| c == '/' || c == '|') {
        ploidy += 1;
        if allele == "." {
            missing = true;
            continue;
        }
        match allele.parse::<u32>() {
            Ok(0) => {}
            Ok(_) => alt_alleles += 1,
            Err(_) => malformed = true,
        }
    }

    if missing {
        Genotype::Missing { ploidy }
    } else if malformed {
        Genotype::Malformed
    } else {
        Genotype::Called {
            alt_alleles,
            ploidy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diploid_dosages() {
        assert_eq!(encode_genotype("0/0").dosage(), Some(0.0));
        assert_eq!(encode_genotype("0/1").dosage(), Some(1.0));
        assert_eq!(encode_genotype("1/0").dosage(), Some(1.0));
        assert_eq!(encode_genotype("1/1").dosage(), Some(2.0));
    }

    #[test]
    fn test_phasing_is_ignored() {
        assert_eq!(encode_genotype("0|1"), encode_genotype("0/1"));
        assert_eq!(encode_genotype("1|1"), encode_genotype("1/1"));
    }

    #[test]
    fn test_multiallelic_counts_each_alt_once() {
        assert_eq!(encode_genotype("1/2").dosage(), Some(2.0));
        assert_eq!(encode_genotype("0/3").dosage(), Some(1.0));
        assert_eq!(encode_genotype("2|2").dosage(), Some(2.0));
    }

    #[test]
    fn test_non_diploid_tokens() {
        assert_eq!(
            encode_genotype("1"),
            Genotype::Called {
                alt_alleles: 1,
                ploidy: 1
            }
        );
        assert_eq!(
            encode_genotype("0/1/1"),
            Genotype::Called {
                alt_alleles: 2,
                ploidy: 3
            }
        );
    }

    #[test]
    fn test_missing_tokens() {
        assert_eq!(encode_genotype("."), Genotype::Missing { ploidy: 1 });
        assert_eq!(encode_genotype("./."), Genotype::Missing { ploidy: 2 });
        assert_eq!(encode_genotype(".|."), Genotype::Missing { ploidy: 2 });
        // A half-called genotype is still missing, not zero
        assert_eq!(encode_genotype("0/.").dosage(), None);
        assert_eq!(encode_genotype("1|.").dosage(), None);
    }

    #[test]
    fn test_malformed_tokens() {
        assert!(encode_genotype("0/X").is_malformed());
        assert!(encode_genotype("").is_malformed());
        assert!(encode_genotype("0/").is_malformed());
        assert!(encode_genotype("-1/0").is_malformed());
        assert_eq!(encode_genotype("A/T").dosage(), None);
    }
}
