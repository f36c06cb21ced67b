use anyhow::Result;
use clap::Parser;
use codequity::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.execute()
}
