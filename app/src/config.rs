//! Run configuration.
//!
//! Layers, lowest to highest: built-in defaults, config file (YAML, or JSON
//! by `.json` extension), `HARVEST_*` environment variables, CLI flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use harvest_probe::ProbeSettings;
use serde::{Deserialize, Serialize};

use crate::emit::RuleTable;

/// Subscriptions used when nothing else is configured.
pub const DEFAULT_SUBSCRIPTIONS: [&str; 5] = [
    "https://snip.soulbar.ggff.net/sub/204774c0-99c5-4454-bbd8-86775343a538",
    "https://boy.solobar.dpdns.org/soul/sub",
    "https://bfree.pages.dev/sub/normal/f5c17701-c7d6-4fe4-b8b9-70fdd5e20ace?app=clash",
    "https://solo-production-0eb5.up.railway.app/solo",
    "http://103.99.52.140:2096/sub/india",
];

fn default_subscriptions() -> Vec<String> {
    DEFAULT_SUBSCRIPTIONS.iter().map(|s| s.to_string()).collect()
}

fn default_max_latency() -> u64 {
    500
}

fn default_timeout() -> u64 {
    5
}

fn default_concurrency() -> usize {
    50
}

fn default_output() -> PathBuf {
    PathBuf::from("clash-config.yaml")
}

/// Effective settings for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarvestConfig {
    /// Subscription addresses, processed in order.
    #[serde(default = "default_subscriptions")]
    pub subscriptions: Vec<String>,
    /// Latency threshold in milliseconds (inclusive).
    #[serde(default = "default_max_latency")]
    pub max_latency_ms: u64,
    /// Per-probe connect timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Probes in flight.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Where the Clash config is written.
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// Replaces the built-in routing categories when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<RuleTable>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            subscriptions: default_subscriptions(),
            max_latency_ms: default_max_latency(),
            timeout_secs: default_timeout(),
            concurrency: default_concurrency(),
            output: default_output(),
            rules: None,
        }
    }
}

/// Values given on the command line; `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// `--urls`
    pub subscriptions: Option<Vec<String>>,
    /// `--max-latency`
    pub max_latency_ms: Option<u64>,
    /// `--timeout`
    pub timeout_secs: Option<u64>,
    /// `--concurrency`
    pub concurrency: Option<usize>,
    /// `--output`
    pub output: Option<PathBuf>,
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Result<Option<T>> {
    match raw.filter(|v| !v.trim().is_empty()) {
        None => Ok(None),
        Some(v) => v
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("{key}: invalid value {v:?}")),
    }
}

impl HarvestConfig {
    /// Read a config file. `.json` files are JSON, everything else YAML.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text =
            std::fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(&text).with_context(|| format!("parse config {}", path.display()))
        } else {
            serde_yaml::from_str(&text).with_context(|| format!("parse config {}", path.display()))
        }
    }

    /// Apply `HARVEST_*` variables from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply `HARVEST_*` variables from `lookup`.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_env("HARVEST_MAX_LATENCY", lookup("HARVEST_MAX_LATENCY"))? {
            self.max_latency_ms = v;
        }
        if let Some(v) = parse_env("HARVEST_TIMEOUT", lookup("HARVEST_TIMEOUT"))? {
            self.timeout_secs = v;
        }
        if let Some(v) = parse_env("HARVEST_CONCURRENCY", lookup("HARVEST_CONCURRENCY"))? {
            self.concurrency = v;
        }
        if let Some(v) = lookup("HARVEST_OUTPUT").filter(|v| !v.trim().is_empty()) {
            self.output = PathBuf::from(v);
        }
        Ok(())
    }

    /// Apply command-line values.
    pub fn apply_overrides(&mut self, o: Overrides) {
        if let Some(v) = o.subscriptions.filter(|s| !s.is_empty()) {
            self.subscriptions = v;
        }
        if let Some(v) = o.max_latency_ms {
            self.max_latency_ms = v;
        }
        if let Some(v) = o.timeout_secs {
            self.timeout_secs = v;
        }
        if let Some(v) = o.concurrency {
            self.concurrency = v;
        }
        if let Some(v) = o.output {
            self.output = v;
        }
    }

    /// Reject settings no run can use.
    pub fn validate(&self) -> Result<()> {
        if self.subscriptions.iter().all(|s| s.trim().is_empty()) {
            bail!("no subscriptions configured");
        }
        if self.concurrency == 0 {
            bail!("concurrency must be at least 1");
        }
        if self.timeout_secs == 0 {
            bail!("timeout must be at least 1 second");
        }
        if let Some(table) = &self.rules {
            let bad = table.invalid_categories();
            if !bad.is_empty() {
                bail!("rule categories without a name or rules: {bad:?}");
            }
        }
        Ok(())
    }

    /// Full layering: defaults or `file`, then the environment, then `overrides`.
    pub fn load(file: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let mut cfg = match file {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        cfg.apply_env()?;
        cfg.apply_overrides(overrides);
        cfg.validate()?;
        Ok(cfg)
    }

    /// Prober tunables.
    pub fn probe_settings(&self) -> ProbeSettings {
        ProbeSettings {
            threshold: Duration::from_millis(self.max_latency_ms),
            timeout: Duration::from_secs(self.timeout_secs),
            concurrency: self.concurrency,
        }
    }

    /// Configured rule table, or the built-in one.
    pub fn rule_table(&self) -> RuleTable {
        self.rules.clone().unwrap_or_default()
    }
}
