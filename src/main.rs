use clap::Parser;
use log::info;
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::num::NonZeroUsize;
use vcfld::commands::blocks::{run_blocks, BlocksConfig};
use vcfld::commands::ld::{run_ld, LdConfig};
use vcfld::filter::{Region, RegionFilter};
use vcfld::output::LabelStyle;
use vcfld::vcf::{open_input, ReaderOptions, VariantReader};
use vcfld::window::WindowPolicy;

/// Common options shared between all commands
#[derive(Parser, Debug)]
struct CommonOpts {
    /// Input VCF (plain, gzip or BGZF). Reads standard input when omitted or `-`.
    #[clap(short = 'i', long, value_parser)]
    input: Option<String>,

    /// Output file. Writes to standard output when omitted.
    #[clap(short = 'o', long, value_parser)]
    output: Option<String>,

    /// Expected ploidy of called genotypes; rows with another ploidy are skipped
    #[clap(long, value_parser)]
    ploidy: Option<NonZeroUsize>,

    /// Number of threads for BGZF decompression.
    #[clap(short = 't', long, value_parser, default_value_t = NonZeroUsize::MIN)]
    threads: NonZeroUsize,

    /// Verbosity level (0 = warning, 1 = info, 2 = debug)
    #[clap(short, long, default_value = "0")]
    verbose: u8,
}

/// Naive linkage disequilibrium (r²) between VCF variants.
#[derive(Parser, Debug)]
#[command(author, version, about, disable_help_subcommand = true)]
enum Args {
    /// Pairwise r², streamed within a window or as a full matrix
    Ld {
        #[clap(flatten)]
        common: CommonOpts,

        /// Compute the full pairwise matrix instead of streaming pairs
        #[clap(long, action)]
        matrix: bool,

        /// Keep at most this many variants in the window, the newest included [default: 10, minimum: 2]
        #[clap(short = 'w', long, value_parser, conflicts_with_all = ["max_distance", "matrix"])]
        window: Option<NonZeroUsize>,

        /// Pair each variant with the preceding variants at most this many bases away
        #[clap(short = 'd', long, value_parser, conflicts_with = "matrix")]
        max_distance: Option<u64>,

        /// Restrict the matrix to `chrom:start-end` (1-based, inclusive)
        #[clap(short = 'r', long, value_parser, requires = "matrix")]
        region: Option<String>,

        /// Restrict the matrix to the regions of a BED file
        #[clap(short = 'b', long, value_parser, requires = "matrix", conflicts_with = "region")]
        region_bed: Option<String>,

        /// Minimum r² for a streamed pair to be written
        #[clap(long, value_parser, default_value_t = 0.0, conflicts_with = "matrix")]
        threshold: f64,

        /// Label matrix rows and columns with the ID column when it is set
        #[clap(long, action, requires = "matrix")]
        use_ids: bool,
    },
    /// Segment variants into haplotype blocks anchored on their first variant
    Blocks {
        #[clap(flatten)]
        common: CommonOpts,

        /// Minimum r² with the block anchor for a variant to join the block
        #[clap(short = 'l', long, value_parser, default_value_t = 0.8)]
        ld_threshold: f64,

        /// Close a block once it holds this many variants
        #[clap(short = 'w', long, value_parser, conflicts_with = "max_distance")]
        window: Option<NonZeroUsize>,

        /// Close a block before it spans more than this many bases
        #[clap(short = 'd', long, value_parser)]
        max_distance: Option<u64>,

        /// Also admit variants in repulsion phase (negative r) with the anchor
        #[clap(long, action)]
        allow_repulsion: bool,
    },
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    match args {
        Args::Ld {
            common,
            matrix,
            window,
            max_distance,
            region,
            region_bed,
            threshold,
            use_ids,
        } => {
            initialize_logger(common.verbose);

            let config = LdConfig {
                matrix,
                window: if matrix {
                    WindowPolicy::Unbounded
                } else {
                    window_policy(window, max_distance, LdConfig::default().window)
                },
                threshold,
                labels: if use_ids {
                    LabelStyle::Id
                } else {
                    LabelStyle::Locus
                },
            };
            config.validate()?;
            let region = load_regions(region.as_deref(), region_bed.as_deref())?;

            let mut reader = open_reader(&common, region)?;
            let mut out = open_output(common.output.as_deref())?;
            run_ld(&mut reader, &mut out, &config)?;
            out.flush()?;
        }
        Args::Blocks {
            common,
            ld_threshold,
            window,
            max_distance,
            allow_repulsion,
        } => {
            initialize_logger(common.verbose);

            let config = BlocksConfig {
                ld_threshold,
                window: window_policy(window, max_distance, WindowPolicy::Unbounded),
                require_coupling: !allow_repulsion,
            };
            config.validate()?;

            let mut reader = open_reader(&common, None)?;
            let mut out = open_output(common.output.as_deref())?;
            run_blocks(&mut reader, &mut out, &config)?;
            out.flush()?;
        }
    }

    Ok(())
}

fn initialize_logger(verbose: u8) {
    env_logger::Builder::new()
        .filter_level(match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();
}

fn window_policy(
    window: Option<NonZeroUsize>,
    max_distance: Option<u64>,
    default: WindowPolicy,
) -> WindowPolicy {
    match (window, max_distance) {
        (Some(count), _) => WindowPolicy::MaxCount(count),
        (None, Some(distance)) => WindowPolicy::MaxDistance(distance),
        (None, None) => default,
    }
}

fn load_regions(region: Option<&str>, region_bed: Option<&str>) -> io::Result<Option<RegionFilter>> {
    let filter = match (region, region_bed) {
        (Some(region), _) => RegionFilter::from_regions(&[Region::parse(region)?]),
        (None, Some(bed)) => RegionFilter::from_bed(bed)?,
        (None, None) => return Ok(None),
    };
    info!("Restricting input to {} region(s)", filter.region_count());
    Ok(Some(filter))
}

/// Open the input and read its header
fn open_reader(
    common: &CommonOpts,
    region: Option<RegionFilter>,
) -> io::Result<VariantReader<Box<dyn BufRead>>> {
    let input = open_input(common.input.as_deref(), common.threads)?;
    let options = ReaderOptions {
        region,
        expected_ploidy: common.ploidy.map(NonZeroUsize::get),
    };
    let reader = VariantReader::new(input, options)?;
    info!("Input has {} samples", reader.header().samples.len());
    Ok(reader)
}

fn open_output(path: Option<&str>) -> io::Result<BufWriter<Box<dyn Write>>> {
    let writer: Box<dyn Write> = match path {
        Some(path) => Box::new(File::create(path).map_err(|e| {
            io::Error::new(e.kind(), format!("Failed to create output file '{path}': {e}"))
        })?),
        None => Box::new(io::stdout().lock()),
    };
    Ok(BufWriter::new(writer))
}
