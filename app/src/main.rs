//! harvest entrypoint
//! - CLI parsing
//! - logging initialization
//! - command dispatch

use app::cli::{self, Commands};
use app::logging;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    logging::init_logging()?;

    match args.command {
        Commands::Run(a) => cli::run::main(a).await,
        Commands::List(a) => cli::list::main(a).await,
    }
}
