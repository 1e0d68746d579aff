//! `harvest run`: fetch, aggregate, probe, write the Clash config.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use harvest_core::{collect_sources, Aggregator, ProxyDescriptor};
use harvest_probe::{probe_sequential, ProbeSettings, Prober};

use super::output::banner;
use super::SourceArgs;
use crate::config::HarvestConfig;
use crate::emit::{ClashDocument, ClashTemplate};
use crate::fetch::HttpRetriever;

#[derive(ClapArgs, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Latency threshold in milliseconds
    #[arg(long)]
    pub max_latency: Option<u64>,

    /// Per-probe connect timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Probes in flight
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Output path for the Clash config
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Probe one node at a time with blocking sockets
    #[arg(long)]
    pub sequential: bool,
}

impl RunArgs {
    fn config(&self) -> Result<HarvestConfig> {
        let mut overrides = self.sources.overrides();
        overrides.max_latency_ms = self.max_latency;
        overrides.timeout_secs = self.timeout;
        overrides.concurrency = self.concurrency;
        overrides.output = self.output.clone();
        HarvestConfig::load(self.sources.config.as_deref(), overrides)
    }
}

fn now() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

async fn probe(descriptors: Vec<ProxyDescriptor>, settings: ProbeSettings, sequential: bool) -> Result<Vec<ProxyDescriptor>> {
    let reachable = if sequential {
        tokio::task::spawn_blocking(move || probe_sequential(descriptors, &settings))
            .await
            .context("sequential probe task")??
    } else {
        Prober::tcp(settings).probe(descriptors).await?
    };
    Ok(reachable)
}

/// Append `config_file` and `node_count` to the file named by `GITHUB_OUTPUT`.
fn write_github_output(target: &Path, config_file: &Path, nodes: usize) -> Result<()> {
    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(target)
        .with_context(|| format!("open {}", target.display()))?;
    writeln!(f, "config_file={}", config_file.display())?;
    writeln!(f, "node_count={nodes}")?;
    Ok(())
}

pub async fn main(args: RunArgs) -> Result<()> {
    let cfg = args.config()?;
    let settings = cfg.probe_settings();

    println!("{}", banner("Subscription harvester"));
    println!("started: {}\n", now());

    println!("[1/3] fetching subscriptions...");
    let retriever = HttpRetriever::new().context("build http client")?;
    let sources = collect_sources(&retriever, &cfg.subscriptions).await;
    let mut aggregator = Aggregator::new();
    for source in &sources {
        aggregator.push_source(&source.address, &source.body);
    }
    let aggregated = aggregator.finish().context("no nodes fetched")?;
    let total = aggregated.descriptors.len();
    println!("✓ {total} node(s) from {} source(s)\n", sources.len());

    println!("[2/3] probing nodes (dropping latency > {}ms)...", cfg.max_latency_ms);
    let reachable = probe(aggregated.descriptors, settings, args.sequential)
        .await
        .context("no reachable nodes")?;
    println!("✓ reachable: {}/{total}\n", reachable.len());

    println!("[3/3] writing Clash config...");
    let doc = ClashDocument::build(&reachable, &cfg.rule_table(), &ClashTemplate::default());
    doc.write_yaml(&cfg.output)?;
    println!("✓ written: {}", cfg.output.display());
    println!("  - {} node(s)", reachable.len());
    println!("  - {} rule(s)", doc.rules.len());
    println!("  - {} proxy group(s)", doc.groups.len());

    println!("\n{}", banner(&format!("finished: {}", now())));
    tracing::info!(
        nodes = reachable.len(),
        output = %cfg.output.display(),
        "run finished"
    );

    if std::env::var_os("GITHUB_ACTIONS").is_some() {
        if let Some(target) = std::env::var_os("GITHUB_OUTPUT") {
            let abs = std::fs::canonicalize(&cfg.output).unwrap_or_else(|_| cfg.output.clone());
            write_github_output(Path::new(&target), &abs, reachable.len())?;
        }
    }
    Ok(())
}
