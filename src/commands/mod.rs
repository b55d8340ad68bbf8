pub mod blocks;
pub mod ld;
