// lib.rs
pub mod blocks;
pub mod commands;
pub mod correlation;
pub mod filter;
pub mod genotype;
pub mod matrix;
pub mod output;
pub mod variant;
pub mod vcf;
pub mod window;
