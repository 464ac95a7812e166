//! schemadrift - print the SQL that turns one database schema into another.

use clap::Parser;

use schemadrift_cli::cli::Cli;
use schemadrift_cli::commands;
use schemadrift_cli::error::CliResult;
use schemadrift_cli::{logging, output};

/// Exit status when `--exit-code` is given and the schemas differ.
const EXIT_DIFFERENCES: i32 = 2;

#[tokio::main]
async fn main() {
    match run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            output::error(&e.to_string());
            std::process::exit(1);
        }
    }
}

async fn run() -> CliResult<i32> {
    // Parse CLI arguments
    let cli = Cli::parse();
    logging::init();

    let exit_code = cli.exit_code;
    let outcome = commands::compare::run(cli).await?;

    if exit_code && outcome.has_differences() {
        Ok(EXIT_DIFFERENCES)
    } else {
        Ok(0)
    }
}
