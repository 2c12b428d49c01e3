//! CLI command implementations.

pub mod bench;
pub mod common;
pub mod compare;
pub mod compressor;
pub mod generate;
pub mod thd;
pub mod timing;
