//! Routing rule table: named categories of Clash rule stems.
//!
//! Each entry is a rule without its target, e.g. `DOMAIN-SUFFIX,github.com`;
//! the emitter appends the category name as the target policy group.

use serde::{Deserialize, Serialize};

/// One named category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleCategory {
    /// Policy group name, also the rule target.
    pub name: String,
    /// Rule stems (`TYPE,VALUE`).
    pub rules: Vec<String>,
}

/// Ordered category list. Order is kept in the emitted groups and rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleTable {
    categories: Vec<RuleCategory>,
}

fn suffixes(domains: &'static [&'static str]) -> impl Iterator<Item = String> {
    domains.iter().map(|d| format!("DOMAIN-SUFFIX,{d}"))
}

fn cidrs(nets: &'static [&'static str]) -> impl Iterator<Item = String> {
    nets.iter().map(|n| format!("IP-CIDR,{n}"))
}

impl RuleTable {
    /// Table from explicit categories.
    pub fn new(categories: Vec<RuleCategory>) -> Self {
        Self { categories }
    }

    /// Categories in order.
    pub fn categories(&self) -> &[RuleCategory] {
        &self.categories
    }

    /// Total number of rule stems.
    pub fn rule_count(&self) -> usize {
        self.categories.iter().map(|c| c.rules.len()).sum()
    }

    /// Categories with no rules or a blank name.
    pub fn invalid_categories(&self) -> Vec<&str> {
        self.categories
            .iter()
            .filter(|c| c.name.trim().is_empty() || c.rules.is_empty())
            .map(|c| c.name.as_str())
            .collect()
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        let cat = |name: &str, rules: Vec<String>| RuleCategory {
            name: name.to_string(),
            rules,
        };
        Self::new(vec![
            cat(
                "YouTube",
                suffixes(&["youtube.com", "googlevideo.com", "youtube-nocookie.com", "ytimg.com", "youtu.be"])
                    .collect(),
            ),
            cat(
                "ChatGPT",
                suffixes(&[
                    "openai.com",
                    "chatgpt.com",
                    "anthropic.com",
                    "claude.ai",
                    "openai.org",
                    "oaistatic.com",
                ])
                .collect(),
            ),
            cat(
                "Netflix",
                suffixes(&["netflix.com", "nflxext.com", "nflximg.com", "nflxso.net", "nflxvideo.net"]).collect(),
            ),
            cat(
                "Cloudflare",
                suffixes(&["cloudflare.com", "cloudflare.net", "cloudflare-dns.com"])
                    .chain(cidrs(&["1.1.1.0/24", "1.0.0.0/24"]))
                    .collect(),
            ),
            cat(
                "Google",
                suffixes(&[
                    "google.com",
                    "googleapis.com",
                    "gstatic.com",
                    "googleusercontent.com",
                    "gmail.com",
                    "googlemail.com",
                ])
                .collect(),
            ),
            cat(
                "Telegram",
                suffixes(&["telegram.org", "tdesktop.com", "telegra.ph"])
                    .chain(cidrs(&[
                        "91.108.56.0/22",
                        "91.108.4.0/22",
                        "91.108.8.0/22",
                        "91.108.12.0/22",
                        "91.108.16.0/22",
                        "91.108.20.0/22",
                        "149.154.160.0/20",
                        "205.172.60.0/22",
                    ]))
                    .collect(),
            ),
            cat("Twitter", suffixes(&["twitter.com", "twimg.com", "t.co", "x.com"]).collect()),
            cat(
                "Facebook",
                suffixes(&["facebook.com", "fb.com", "instagram.com", "whatsapp.com"]).collect(),
            ),
            cat("GitHub", suffixes(&["github.com", "githubusercontent.com", "github.io"]).collect()),
            cat(
                "Microsoft",
                suffixes(&[
                    "microsoft.com",
                    "office.com",
                    "office365.com",
                    "onedrive.com",
                    "outlook.com",
                    "hotmail.com",
                ])
                .collect(),
            ),
        ])
    }
}
