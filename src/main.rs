use anyhow::Result;
use clap::Parser;
use space_cleanser::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.run()
}
