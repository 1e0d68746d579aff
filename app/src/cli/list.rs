//! `harvest list`: per-subscription node listing, no probing.

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use harvest_core::{collect_sources, Aggregator, Deduplicator, ProxyDescriptor, ProxyKind, SourceReport};
use serde::Serialize;

use super::output::{self, banner};
use super::{Format, SourceArgs};
use crate::config::HarvestConfig;
use crate::fetch::HttpRetriever;

#[derive(ClapArgs, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Human)]
    pub format: Format,
}

#[derive(Debug, Serialize)]
pub struct NodeLine {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub server: String,
    pub port: u16,
    pub extras: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SourceListing {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub report: SourceReport,
    pub nodes: Vec<NodeLine>,
}

#[derive(Debug, Serialize)]
pub struct ListReport {
    pub timestamp: String,
    pub sources: Vec<SourceListing>,
    pub unique: usize,
}

/// Protocol-specific details shown after the endpoint.
pub fn extras(d: &ProxyDescriptor) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(network) = d.option_str("network").filter(|n| !n.is_empty()) {
        out.push(network.to_uppercase());
    }
    if d.option_flag("tls") {
        out.push("TLS".to_string());
    }
    match d.kind {
        ProxyKind::ShadowSocks => {
            if let Some(cipher) = d.option_str("cipher") {
                out.push(cipher.to_string());
            }
        }
        ProxyKind::VMess | ProxyKind::VLess => {
            if let Some(fp) = d.option_str("client-fingerprint") {
                out.push(format!("FP={fp}"));
            }
        }
        _ => {}
    }
    out
}

impl NodeLine {
    fn of(d: &ProxyDescriptor) -> Self {
        Self {
            name: d.name.clone(),
            kind: d.kind.clash_type(),
            server: d.server.clone(),
            port: d.port,
            extras: extras(d),
        }
    }

    /// `"  1. name -> TYPE | server:port | extras"`
    pub fn render(&self, index: usize) -> String {
        let mut detail = format!("{} | {}:{}", self.kind.to_uppercase(), self.server, self.port);
        if !self.extras.is_empty() {
            detail.push_str(" | ");
            detail.push_str(&self.extras.join(", "));
        }
        format!("{index:>3}. {} -> {detail}", self.name)
    }
}

fn render_human(report: &ListReport) -> String {
    let mut out = vec![
        banner("Subscription listing"),
        format!("{} subscription(s)\n", report.sources.len()),
    ];
    for source in &report.sources {
        out.push(format!("source: {}", source.address));
        if source.nodes.is_empty() {
            match &source.error {
                Some(e) => out.push(format!("  ✗ fetch failed: {e}\n")),
                None => out.push("  ✗ no nodes found\n".to_string()),
            }
            continue;
        }
        out.push(format!("  ✓ {} node(s):\n", source.nodes.len()));
        for (i, node) in source.nodes.iter().enumerate() {
            out.push(format!("   {}", node.render(i + 1)));
        }
        out.push(String::new());
    }
    out.push(banner(&format!("unique nodes: {}", report.unique)));
    out.join("\n")
}

pub async fn main(args: ListArgs) -> Result<()> {
    let cfg = HarvestConfig::load(args.sources.config.as_deref(), args.sources.overrides())?;
    let retriever = HttpRetriever::new().context("build http client")?;
    let sources = collect_sources(&retriever, &cfg.subscriptions).await;

    let mut unique = Deduplicator::new();
    let mut listings = Vec::with_capacity(sources.len());
    for source in sources {
        let (nodes, report) = Aggregator::per_source(&source.address, &source.body);
        for node in &nodes {
            unique.admit(node);
        }
        listings.push(SourceListing {
            address: source.address,
            error: source.error,
            report,
            nodes: nodes.iter().map(NodeLine::of).collect(),
        });
    }

    let report = ListReport {
        timestamp: chrono::Utc::now().to_rfc3339(),
        sources: listings,
        unique: unique.len(),
    };
    tracing::info!(sources = report.sources.len(), unique = report.unique, "listing finished");
    output::emit(args.format, || render_human(&report), &report);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_lines_show_protocol_extras() {
        let mut ss = ProxyDescriptor::new(ProxyKind::ShadowSocks, "1.2.3.4", 8388)
            .unwrap()
            .with_name(Some("HK".into()));
        ss.options.insert("cipher".into(), json!("aes-256-gcm"));
        assert_eq!(NodeLine::of(&ss).render(1), "  1. HK -> SS | 1.2.3.4:8388 | aes-256-gcm");

        let mut vl = ProxyDescriptor::new(ProxyKind::VLess, "v.example", 443)
            .unwrap()
            .with_name(Some("VL".into()));
        vl.options.insert("network".into(), json!("ws"));
        vl.options.insert("tls".into(), json!(true));
        vl.options.insert("client-fingerprint".into(), json!("chrome"));
        assert_eq!(
            NodeLine::of(&vl).render(12),
            " 12. VL -> VLESS | v.example:443 | WS, TLS, FP=chrome"
        );

        let tj = ProxyDescriptor::new(ProxyKind::Trojan, "t.example", 443).unwrap();
        assert!(extras(&tj).is_empty());
        assert_eq!(NodeLine::of(&tj).render(3), "  3. Trojan-t.example:443 -> TROJAN | t.example:443");
    }
}
