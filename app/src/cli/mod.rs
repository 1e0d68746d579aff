pub mod list;
pub mod output;
pub mod run;

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

use crate::config::Overrides;

#[derive(Parser, Debug)]
#[command(name = "harvest")]
#[command(about = "Aggregate proxy subscriptions into a Clash config", long_about = None)]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch, deduplicate, probe and write the Clash config
    Run(run::RunArgs),
    /// List the nodes of each subscription without probing
    List(list::ListArgs),
}

/// Output format for command results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Human,
    Json,
}

/// Source selection shared by all commands.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Subscription addresses (http(s) URL, file:// URL or path)
    #[arg(long, num_args = 1..)]
    pub urls: Option<Vec<String>>,

    /// Config file (YAML, or JSON with a .json extension)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
}

impl SourceArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            subscriptions: self.urls.clone(),
            ..Overrides::default()
        }
    }
}
