//! VCF input
//!
//! Opens plain, gzip or BGZF input from a file or standard input, parses the
//! header and yields one [`VariantRecord`] per accepted data row. Row-level
//! problems are logged and skipped here; only structural errors reach the
//! caller.

use crate::filter::RegionFilter;
use crate::variant::{encode_samples, parse_site, RowErr, VariantRecord, FORMAT_COLUMN};
use flate2::read::MultiGzDecoder;
use log::{debug, warn};
use noodles::bgzf;
use rustc_hash::FxHashSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Error as IoError, Read};
use std::num::NonZeroUsize;

#[derive(Debug)]
pub enum ParseErr {
    MissingHeader,
    DataBeforeHeader(usize),
    Row { line: usize, err: RowErr },
    IoError(IoError),
}

impl std::fmt::Display for ParseErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseErr::MissingHeader => write!(f, "No #CHROM header line found"),
            ParseErr::DataBeforeHeader(line) => {
                write!(f, "Data line {line} encountered before the #CHROM header")
            }
            ParseErr::Row { line, err } => write!(f, "Line {line}: {err}"),
            ParseErr::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for ParseErr {}

impl From<ParseErr> for IoError {
    fn from(err: ParseErr) -> Self {
        match err {
            ParseErr::IoError(e) => e,
            other => IoError::new(io::ErrorKind::InvalidData, other.to_string()),
        }
    }
}

const BGZF_HEADER_SIZE: usize = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compression {
    None,
    Gzip,
    Bgzf,
}

impl Compression {
    /// Detect the compression from the first bytes of a stream
    fn detect(header: &[u8]) -> Self {
        if header.len() < 2 || header[0..2] != [0x1f, 0x8b] {
            return Compression::None;
        }
        let is_bgzf = header.len() >= BGZF_HEADER_SIZE
            && header[2] == 0x08              // DEFLATE
            && header[3] == 0x04              // FEXTRA
            && header[10..12] == [0x06, 0x00] // XLEN=6
            && header[12..14] == [b'B', b'C'] // BC subfield
            && header[14..16] == [0x02, 0x00]; // SLEN=2
        if is_bgzf {
            Compression::Bgzf
        } else {
            Compression::Gzip
        }
    }
}

/// Open a VCF stream. `None` or `-` reads standard input.
///
/// Compression is detected from the content, not the file name, so piped
/// `.vcf.gz` input works as well.
pub fn open_input(path: Option<&str>, threads: NonZeroUsize) -> io::Result<Box<dyn BufRead>> {
    match path {
        None | Some("-") => decode(io::stdin(), "<stdin>", threads),
        Some(path) => {
            let file = File::open(path).map_err(|e| {
                IoError::new(e.kind(), format!("Failed to open input file '{path}': {e}"))
            })?;
            decode(file, path, threads)
        }
    }
}

fn decode<R: Read + Send + 'static>(
    inner: R,
    source: &str,
    threads: NonZeroUsize,
) -> io::Result<Box<dyn BufRead>> {
    let mut reader = BufReader::new(inner);
    let compression = Compression::detect(reader.fill_buf()?);
    debug!("Reading {} as {:?}", source, compression);

    Ok(match compression {
        Compression::None => Box::new(reader),
        Compression::Gzip => Box::new(BufReader::new(MultiGzDecoder::new(reader))),
        Compression::Bgzf if threads.get() > 1 => Box::new(BufReader::new(
            bgzf::io::MultithreadedReader::with_worker_count(threads, reader),
        )),
        Compression::Bgzf => Box::new(bgzf::io::Reader::new(reader)),
    })
}

/// Read one line into `line` without its terminator. Bytes that are not valid
/// UTF-8 (e.g. Latin-1 text in INFO) are replaced rather than failing the read.
fn read_line_lossy<R: BufRead>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    line: &mut String,
) -> io::Result<usize> {
    buf.clear();
    line.clear();
    let read = reader.read_until(b'\n', buf)?;
    line.push_str(&String::from_utf8_lossy(buf));
    let len = line.trim_end_matches(&['\n', '\r'][..]).len();
    line.truncate(len);
    Ok(read)
}

/// Sample names from the `#CHROM` line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VcfHeader {
    pub samples: Vec<String>,
}

impl VcfHeader {
    fn from_chrom_line(line: &str) -> Self {
        VcfHeader {
            samples: line
                .split('\t')
                .skip(FORMAT_COLUMN + 1)
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Options applied while reading rows
#[derive(Default)]
pub struct ReaderOptions {
    /// Records outside these regions are dropped before they get an index
    pub region: Option<RegionFilter>,
    /// Reject rows whose called genotypes have another ploidy
    pub expected_ploidy: Option<usize>,
}

/// Counters kept while reading
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    pub records: usize,
    pub skipped_rows: usize,
    pub outside_region: usize,
    pub malformed_genotypes: usize,
    pub order_violations: usize,
}

/// Warns when input is not sorted by chromosome block and position.
///
/// Unsorted input is processed anyway; windows and blocks then follow input
/// order.
#[derive(Default)]
struct OrderingCheck {
    current: Option<(String, u64)>,
    finished: FxHashSet<String>,
}

impl OrderingCheck {
    fn observe(&mut self, chrom: &str, pos: u64) -> Option<String> {
        let violation = match &self.current {
            Some((current, last_pos)) if current == chrom => (pos < *last_pos).then(|| {
                format!("position {pos} on {chrom} follows position {last_pos}")
            }),
            Some((current, _)) => {
                self.finished.insert(current.clone());
                self.finished
                    .contains(chrom)
                    .then(|| format!("chromosome {chrom} reappears after other chromosomes"))
            }
            None => None,
        };
        self.current = Some((chrom.to_string(), pos));
        violation
    }
}

/// Pull-based reader producing one record per accepted data row
pub struct VariantReader<R: BufRead> {
    reader: R,
    header: VcfHeader,
    options: ReaderOptions,
    ordering: OrderingCheck,
    stats: ReadStats,
    buf: Vec<u8>,
    line: String,
    line_number: usize,
}

impl<R: BufRead> VariantReader<R> {
    /// Read the header. Fails if a data row or end of input comes before the
    /// `#CHROM` line.
    pub fn new(mut reader: R, options: ReaderOptions) -> Result<Self, ParseErr> {
        let mut buf = Vec::new();
        let mut line = String::new();
        let mut line_number = 0;
        loop {
            if read_line_lossy(&mut reader, &mut buf, &mut line).map_err(ParseErr::IoError)? == 0 {
                return Err(ParseErr::MissingHeader);
            }
            line_number += 1;
            let trimmed = line.as_str();
            if trimmed.is_empty() || trimmed.starts_with("##") {
                continue;
            }
            if trimmed.starts_with("#CHROM") {
                let header = VcfHeader::from_chrom_line(trimmed);
                debug!("Header declares {} samples", header.samples.len());
                return Ok(VariantReader {
                    reader,
                    header,
                    options,
                    ordering: OrderingCheck::default(),
                    stats: ReadStats::default(),
                    buf,
                    line: String::new(),
                    line_number,
                });
            }
            if !trimmed.starts_with('#') {
                return Err(ParseErr::DataBeforeHeader(line_number));
            }
        }
    }

    pub fn header(&self) -> &VcfHeader {
        &self.header
    }

    pub fn stats(&self) -> ReadStats {
        self.stats
    }

    fn next_line(&mut self) -> Option<Result<(), ParseErr>> {
        match read_line_lossy(&mut self.reader, &mut self.buf, &mut self.line) {
            Ok(0) => None,
            Ok(_) => {
                self.line_number += 1;
                Some(Ok(()))
            }
            Err(e) => Some(Err(ParseErr::IoError(e))),
        }
    }

    /// Parse the current line. `Ok(None)` means the row was skipped.
    fn parse_current(&mut self) -> Result<Option<VariantRecord>, RowErr> {
        let site = parse_site(&self.line, self.header.samples.len())?;
        if let Some(violation) = self.ordering.observe(site.chrom, site.pos) {
            self.stats.order_violations += 1;
            warn!(
                "Line {}: input is not sorted ({}); windows and blocks follow input order",
                self.line_number, violation
            );
        }

        if let Some(region) = &self.options.region {
            if !region.contains(site.chrom, site.pos) {
                self.stats.outside_region += 1;
                return Ok(None);
            }
        }

        let samples = encode_samples(&site, self.options.expected_ploidy)?;
        if samples.malformed > 0 {
            self.stats.malformed_genotypes += samples.malformed;
            warn!(
                "Line {}: {} unparseable genotype(s) treated as missing",
                self.line_number, samples.malformed
            );
        }

        let record = site.into_record(self.stats.records, samples.dosages);
        self.stats.records += 1;
        Ok(Some(record))
    }
}

impl<R: BufRead> Iterator for VariantReader<R> {
    type Item = Result<VariantRecord, ParseErr>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Err(e) = self.next_line()? {
                return Some(Err(e));
            }
            if self.line.is_empty() || self.line.starts_with('#') {
                continue;
            }
            match self.parse_current() {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => continue,
                Err(err) if err.is_fatal() => {
                    return Some(Err(ParseErr::Row {
                        line: self.line_number,
                        err,
                    }))
                }
                Err(err) => {
                    self.stats.skipped_rows += 1;
                    warn!("Skipping line {}: {}", self.line_number, err);
                }
            }
        }
    }
}
