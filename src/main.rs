mod cli;

use std::fs::File;
use std::io::BufWriter;

use anyhow::Context;
use clap::Parser;
use indef2def::rewrite::convert;

use cli::Cli;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let input = File::open(&cli.input)
        .with_context(|| format!("opening input file {}", cli.input.display()))?;
    let output = File::create(&cli.output)
        .with_context(|| format!("creating output file {}", cli.output.display()))?;
    let mut sink = BufWriter::new(output);

    log::debug!(
        "converting {} -> {} (whole_file={})",
        cli.input.display(),
        cli.output.display(),
        cli.all
    );

    let stats = convert(input, &mut sink, cli.all)
        .with_context(|| format!("converting {}", cli.input.display()))?;

    log::debug!(
        "bytes_read={} bytes_written={}",
        stats.bytes_read,
        stats.bytes_written
    );
    println!(
        "{}: {} bytes -> {} bytes",
        cli.output.display(),
        stats.bytes_read,
        stats.bytes_written
    );

    Ok(())
}
