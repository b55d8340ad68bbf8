//! End-to-end tests of the vcfld binary: argument handling, input formats,
//! output formats and exit status

use noodles::bgzf;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

fn get_vcfld_binary() -> PathBuf {
    // CARGO_BIN_EXE_vcfld is set by cargo test for the binary crate
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_vcfld") {
        return PathBuf::from(path);
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let candidates = [
        manifest_dir.join("target/release/vcfld"),
        manifest_dir.join("target/debug/vcfld"),
    ];
    for path in &candidates {
        if path.exists() {
            return path.clone();
        }
    }

    PathBuf::from("vcfld")
}

fn run_vcfld(args: &[&str]) -> Output {
    Command::new(get_vcfld_binary())
        .args(args)
        .output()
        .expect("failed to run vcfld")
}

fn run_vcfld_stdin(args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(get_vcfld_binary())
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to run vcfld");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

const HEADER: &str = "##fileformat=VCFv4.2\n\
                      ##contig=<ID=chr1>\n\
                      #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2\tS3\n";

fn vcf(rows: &[(&str, u64, &str, [&str; 3])]) -> String {
    let mut text = HEADER.to_string();
    for (chrom, pos, id, genotypes) in rows {
        text.push_str(&format!(
            "{chrom}\t{pos}\t{id}\tA\tG\t50\tPASS\t.\tGT\t{}\n",
            genotypes.join("\t")
        ));
    }
    text
}

fn block_example() -> String {
    vcf(&[
        ("chr1", 100, "rs1", ["0/0", "0/1", "1/1"]),
        ("chr1", 150, "rs2", ["0/0", "0/1", "1/1"]),
        ("chr1", 200, "rs3", ["0/0", "0/1", "1/1"]),
        ("chr1", 250, "rs4", ["1/1", "0/1", "0/0"]),
    ])
}

fn write_file(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn test_blocks_example() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_file(temp_dir.path(), "input.vcf", &block_example());

    let output = run_vcfld(&["blocks", "-i", &input, "--ld-threshold", "0.8"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "#HAPLOTYPE_BLOCKS_START\n\
         Block 1: 0:(chr1:100), 1:(chr1:150), 2:(chr1:200)\n\
         Block 2: 3:(chr1:250)\n\
         #HAPLOTYPE_BLOCKS_END\n"
    );

    let output = run_vcfld(&["blocks", "-i", &input, "--allow-repulsion"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Block 1: 0:(chr1:100), 1:(chr1:150), 2:(chr1:200), 3:(chr1:250)\n"));
}

#[test]
fn test_blocks_from_stdin() {
    let output = run_vcfld_stdin(&["blocks", "-l", "0.99"], &block_example());
    assert!(output.status.success());
    assert_eq!(stdout(&output).lines().filter(|l| l.starts_with("Block")).count(), 2);
}

#[test]
fn test_ld_streaming_pairs() {
    let input = vcf(&[
        ("chr1", 100, "rs1", ["0/0", "0/1", "1/1"]),
        ("chr1", 200, ".", ["0|0", "0|1", "1|1"]),
        ("chr2", 300, "rs3", ["0/0", "0/1", "1/1"]),
    ]);
    let output = run_vcfld_stdin(&["ld"], &input);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "#VAR1_CHROM\tVAR1_POS\tVAR1_ID\tVAR2_CHROM\tVAR2_POS\tVAR2_ID\tR2\n\
         chr1\t100\trs1\tchr1\t200\t.\t1.0000\n"
    );
}

#[test]
fn test_ld_matrix_with_region() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_file(
        temp_dir.path(),
        "input.vcf",
        &vcf(&[
            ("chr1", 100, "rs1", ["0/0", "0/1", "1/1"]),
            ("chr1", 200, "rs2", ["0/0", "0/0", "1/1"]),
            ("chr1", 300, "rs3", ["1/1", "0/1", "0/0"]),
            ("chr1", 400, "rs4", ["0/0", "0/1", "1/1"]),
        ]),
    );

    let output = run_vcfld(&["ld", "--matrix", "-i", &input, "--region", "chr1:150-300"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "#LD_MATRIX_START\n\
         Index/Var\tchr1:200\tchr1:300\n\
         chr1:200\t1.0000\t0.7500\n\
         chr1:300\t0.7500\t1.0000\n\
         #LD_MATRIX_END\n"
    );

    let output = run_vcfld(&["ld", "--matrix", "--use-ids", "-i", &input, "-r", "chr1:150-300"]);
    assert!(stdout(&output).contains("Index/Var\trs2\trs3\n"));
}

#[test]
fn test_ld_matrix_region_from_bed() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_file(temp_dir.path(), "input.vcf", &block_example());
    let bed = write_file(temp_dir.path(), "regions.bed", "chr1\t99\t100\nchr1\t249\t250\n");

    let output = run_vcfld(&["ld", "--matrix", "-i", &input, "--region-bed", &bed]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Index/Var\tchr1:100\tchr1:250\n"));
}

#[test]
fn test_ld_matrix_single_variant() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_file(temp_dir.path(), "input.vcf", &block_example());

    let output = run_vcfld(&["ld", "--matrix", "-i", &input, "--region", "chr1:100-100"]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "#LD_MATRIX_START\n\
         No or only one variant in the region => no pairwise LD.\n\
         #LD_MATRIX_END\n"
    );
}

#[test]
fn test_output_file() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_file(temp_dir.path(), "input.vcf", &block_example());
    let out_path = temp_dir.path().join("blocks.txt");

    let output = run_vcfld(&["blocks", "-i", &input, "-o", out_path.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(stdout(&output).is_empty());
    let written = fs::read_to_string(&out_path).unwrap();
    assert!(written.starts_with("#HAPLOTYPE_BLOCKS_START\n"));
    assert!(written.ends_with("#HAPLOTYPE_BLOCKS_END\n"));
}

#[test]
fn test_compressed_inputs() {
    let temp_dir = TempDir::new().unwrap();
    let content = block_example();

    let bgzf_path = temp_dir.path().join("input.vcf.gz");
    let mut writer = bgzf::io::Writer::new(File::create(&bgzf_path).unwrap());
    writer.write_all(content.as_bytes()).unwrap();
    writer.finish().unwrap();

    // Plain gzip under a misleading name; detection goes by content
    let gzip_path = temp_dir.path().join("input.vcf");
    let mut encoder = flate2::write::GzEncoder::new(
        File::create(&gzip_path).unwrap(),
        flate2::Compression::default(),
    );
    encoder.write_all(content.as_bytes()).unwrap();
    encoder.finish().unwrap();

    let plain = run_vcfld_stdin(&["blocks"], &content);
    for path in [&bgzf_path, &gzip_path] {
        for threads in ["1", "2"] {
            let output = run_vcfld(&["blocks", "-i", path.to_str().unwrap(), "-t", threads]);
            assert!(output.status.success(), "stderr: {}", stderr(&output));
            assert_eq!(stdout(&output), stdout(&plain), "{:?}", path);
        }
    }
}

#[test]
fn test_unparseable_genotype_warns() {
    let input = vcf(&[
        ("chr1", 100, "rs1", ["0/X", "0/1", "1/1"]),
        ("chr1", 200, "rs2", ["0/0", "0/1", "1/1"]),
    ]);
    let output = run_vcfld_stdin(&["ld"], &input);
    assert!(output.status.success());
    assert!(stderr(&output).contains("unparseable genotype"));
    // Two jointly called samples remain and agree
    assert!(stdout(&output).contains("chr1\t100\trs1\tchr1\t200\trs2\t1.0000\n"));
}

#[test]
fn test_short_row_is_skipped_with_warning() {
    let mut input = vcf(&[("chr1", 100, "rs1", ["0/0", "0/1", "1/1"])]);
    input.push_str("chr1\t150\trs2\tA\n");
    input.push_str("chr1\tabc\trs3\tA\tG\t50\tPASS\t.\tGT\t0/0\t0/1\t1/1\n");
    input.push_str("chr1\t200\trs4\tA\tG\t50\tPASS\t.\tGT\t0/0\t0/1\t1/1\n");

    let output = run_vcfld_stdin(&["blocks", "-v", "1"], &input);
    assert!(output.status.success());
    assert!(stderr(&output).contains("Skipping line 5"));
    assert!(stderr(&output).contains("Skipping line 6"));
    assert!(stdout(&output).contains("Block 1: 0:(chr1:100), 1:(chr1:200)\n"));
}

#[test]
fn test_unsorted_input_warns() {
    let input = vcf(&[
        ("chr1", 200, "rs1", ["0/0", "0/1", "1/1"]),
        ("chr1", 100, "rs2", ["0/0", "0/1", "1/1"]),
    ]);
    let output = run_vcfld_stdin(&["blocks"], &input);
    assert!(output.status.success());
    assert!(stderr(&output).contains("not sorted"));
}

#[test]
fn test_data_before_header_fails() {
    let input = "chr1\t100\trs1\tA\tG\t50\tPASS\t.\tGT\t0/0\n".to_string() + HEADER;
    let output = run_vcfld_stdin(&["ld"], &input);
    assert!(!output.status.success());
    assert!(stdout(&output).is_empty());
    assert!(stderr(&output).contains("before the #CHROM header"));
}

#[test]
fn test_missing_header_fails() {
    let output = run_vcfld_stdin(&["blocks"], "##fileformat=VCFv4.2\n");
    assert!(!output.status.success());
    assert!(stderr(&output).contains("No #CHROM header"));
}

#[test]
fn test_sample_count_mismatch_fails() {
    let mut input = HEADER.to_string();
    input.push_str("chr1\t100\trs1\tA\tG\t50\tPASS\t.\tGT\t0/0\t0/1\t1/1\t0/1\n");
    let output = run_vcfld_stdin(&["blocks"], &input);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("sample"));
}

#[test]
fn test_missing_sample_column_fails() {
    let mut input = vcf(&[("chr1", 100, "rs1", ["0/0", "0/1", "1/1"])]);
    input.push_str("chr1\t200\trs2\tA\tG\t50\tPASS\t.\tGT\t0/0\t0/1\n");
    let output = run_vcfld_stdin(&["blocks"], &input);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("has 2 sample columns but the header declares 3"), "{}", stderr(&output));
}

#[test]
fn test_configuration_errors() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_file(temp_dir.path(), "input.vcf", &block_example());

    // Rejected by the argument parser
    for args in [
        vec!["ld", "-i", &input, "--region", "chr1:1-10"],
        vec!["ld", "-i", &input, "--matrix", "--threshold", "0.5"],
        vec!["ld", "-i", &input, "--window", "5", "--max-distance", "100"],
        vec!["blocks", "-i", &input, "--window", "0"],
    ] {
        let output = run_vcfld(&args);
        assert!(!output.status.success(), "{:?}", args);
        assert!(stdout(&output).is_empty(), "{:?}", args);
    }

    // Rejected before any output
    for (args, message) in [
        (vec!["ld", "-i", &input, "--threshold", "1.5"], "--threshold"),
        (vec!["ld", "-i", &input, "--window", "1"], "--window must be at least 2"),
        (vec!["blocks", "-i", &input, "--ld-threshold", "2"], "--ld-threshold"),
        (vec!["ld", "-i", &input, "--matrix", "--region", "chr1:300-100"], "start must not exceed end"),
        (vec!["ld", "-i", &input, "--matrix", "--region", "chr1"], "chrom:start-end"),
    ] {
        let output = run_vcfld(&args);
        assert!(!output.status.success(), "{:?}", args);
        assert!(stdout(&output).is_empty(), "{:?}", args);
        assert!(stderr(&output).contains(message), "{:?}: {}", args, stderr(&output));
    }

    let output = run_vcfld(&["ld", "-i", "/nonexistent/input.vcf"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to open input file"));
}
