mod cli;
mod platform;

use anyhow::Result;
use clap::Parser;

use crate::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    console_logging::initialize(cli.log_destination(), cli.log_level(), &cli.log_file);
    console_logging::console_info!("retrieval-console {}", env!("CARGO_PKG_VERSION"));

    let result = cli::run(cli);
    if let Err(err) = &result {
        console_logging::console_error!("{:#}", err);
    }
    result
}
