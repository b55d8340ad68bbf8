//! Region restriction and r² threshold
//!
//! Regions decide which records are admitted at all (matrix mode); the
//! threshold decides which computed pairs are written (streaming pair mode).

use coitrees::{BasicCOITree, Interval, IntervalTree};
use log::debug;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};

/// A 1-based inclusive genomic interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
}

impl Region {
    /// Parse `chrom:start-end` (1-based, inclusive). Thousands separators in the
    /// coordinates are accepted, and the chromosome name may itself contain `:`.
    pub fn parse(region: &str) -> io::Result<Self> {
        let pattern = Regex::new(r"^(?P<chrom>\S+):(?P<start>[\d,]+)-(?P<end>[\d,]+)$")
            .map_err(|e| io::Error::other(format!("Invalid region pattern: {e}")))?;
        let captures = pattern.captures(region.trim()).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Region '{region}' should be formatted as `chrom:start-end`"),
            )
        })?;

        let start = parse_coordinate(&captures["start"], region)?;
        let end = parse_coordinate(&captures["end"], region)?;
        if start > end {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Region '{region}': start must not exceed end"),
            ));
        }

        Ok(Region {
            chrom: captures["chrom"].to_string(),
            start,
            end,
        })
    }

    pub fn contains(&self, chrom: &str, pos: u64) -> bool {
        self.chrom == chrom && self.start <= pos && pos <= self.end
    }
}

fn parse_coordinate(value: &str, region: &str) -> io::Result<u64> {
    let value: String = value.chars().filter(|c| *c != ',').collect();
    let coordinate = value.parse::<u64>().map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Region '{region}': invalid coordinate '{value}'"),
        )
    })?;
    // Interval trees index with i32 coordinates
    if coordinate > i32::MAX as u64 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Region '{region}': coordinate {coordinate} is out of range"),
        ));
    }
    Ok(coordinate)
}

/// Set of regions, one interval tree per chromosome
pub struct RegionFilter {
    trees: FxHashMap<String, BasicCOITree<(), u32>>,
    region_count: usize,
}

impl RegionFilter {
    pub fn from_regions(regions: &[Region]) -> Self {
        let mut intervals: FxHashMap<String, Vec<Interval<()>>> = FxHashMap::default();
        for region in regions {
            intervals
                .entry(region.chrom.clone())
                .or_default()
                .push(Interval {
                    first: region.start as i32,
                    last: region.end as i32,
                    metadata: (),
                });
        }

        let trees = intervals
            .into_iter()
            .map(|(chrom, nodes)| (chrom, BasicCOITree::new(nodes.as_slice())))
            .collect();

        RegionFilter {
            trees,
            region_count: regions.len(),
        }
    }

    /// Load regions from a BED file (0-based, half-open), skipping comment,
    /// `track` and `browser` lines
    pub fn from_bed(bed_file: &str) -> io::Result<Self> {
        let file = File::open(bed_file).map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("Failed to open BED file '{bed_file}': {e}"),
            )
        })?;
        let reader = BufReader::new(file);
        let mut regions = Vec::new();

        for (line_number, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty()
                || trimmed.starts_with('#')
                || trimmed.starts_with("track")
                || trimmed.starts_with("browser")
            {
                continue;
            }
            regions.push(parse_bed_line(trimmed).map_err(|msg| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("Invalid BED file '{bed_file}' at line {}: {msg}", line_number + 1),
                )
            })?);
        }

        if regions.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("BED file '{bed_file}' did not contain any regions"),
            ));
        }
        debug!("Loaded {} regions from {}", regions.len(), bed_file);

        Ok(RegionFilter::from_regions(&regions))
    }

    pub fn region_count(&self) -> usize {
        self.region_count
    }

    /// Whether the 1-based position falls inside any region
    pub fn contains(&self, chrom: &str, pos: u64) -> bool {
        if pos > i32::MAX as u64 {
            return false;
        }
        self.trees
            .get(chrom)
            .is_some_and(|tree| tree.query_count(pos as i32, pos as i32) > 0)
    }
}

fn parse_bed_line(line: &str) -> Result<Region, String> {
    let parts: Vec<&str> = line.split('\t').collect();
    if parts.len() < 3 {
        return Err("expected at least 3 columns".to_string());
    }
    let start = parts[1]
        .parse::<u64>()
        .map_err(|_| format!("invalid start '{}'", parts[1]))?;
    let end = parts[2]
        .parse::<u64>()
        .map_err(|_| format!("invalid end '{}'", parts[2]))?;
    if start >= end {
        return Err("start must be less than end".to_string());
    }
    if end > i32::MAX as u64 {
        return Err(format!("end {end} is out of range"));
    }

    Ok(Region {
        chrom: parts[0].to_string(),
        start: start + 1,
        end,
    })
}

/// Minimum r² a pair must reach to be written
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairThreshold(pub f64);

impl PairThreshold {
    /// `NA` pairs never pass
    pub fn accepts(&self, r2: Option<f64>) -> bool {
        r2.is_some_and(|r2| r2 >= self.0)
    }
}

/// Check that a threshold is a valid r² value
pub fn validate_r2_threshold(name: &str, value: f64) -> io::Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{name} must be within [0, 1], got {value}"),
        ));
    }
    Ok(())
}
