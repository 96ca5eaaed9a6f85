use std::path::PathBuf;

use clap::Parser;

/// Rewrites an indefinite-length BER stream into an equivalent
/// definite-length one.
#[derive(Parser, Debug)]
#[command(name = "indef2def", version, about)]
pub struct Cli {
    /// Convert every top-level value in the file, sized against the
    /// file's total length, instead of just the first one.
    #[arg(short = 'a', long = "all")]
    pub all: bool,

    /// Input file containing the indefinite-length (or mixed) BER stream.
    pub input: PathBuf,

    /// Output file to write the definite-length BER stream to.
    pub output: PathBuf,
}
