//! Clash config emission.
//!
//! Layout of the emitted document, in key order: base settings from the
//! [`ClashTemplate`], `proxies` (fastest first), `proxy-groups`, `rules`.

pub mod rules;

use std::path::Path;

use anyhow::{Context, Result};
use harvest_core::ProxyDescriptor;
use serde::Serialize;
use serde_json::{json, Map, Value};

pub use rules::{RuleCategory, RuleTable};

/// Automatic url-test group over every node.
pub const AUTO_GROUP: &str = "🚀 自动选择";
/// Manual selector.
pub const MANUAL_GROUP: &str = "🔯 手动选择";
/// url-test group over the fastest nodes.
pub const FASTEST_GROUP: &str = "⚡ 最快节点";
/// Direct-connect group.
pub const DIRECT_GROUP: &str = "🎯 全球直连";
/// Ad-block group.
pub const REJECT_GROUP: &str = "🛑 全球拦截";
/// Catch-all group.
pub const FINAL_GROUP: &str = "🐟 漏网之鱼";

const LAN_RULES: [&str; 7] = [
    "DOMAIN-SUFFIX,local",
    "IP-CIDR,127.0.0.0/8",
    "IP-CIDR,172.16.0.0/12",
    "IP-CIDR,192.168.0.0/16",
    "IP-CIDR,10.0.0.0/8",
    "IP-CIDR,17.0.0.0/8",
    "IP-CIDR,100.64.0.0/10",
];

const AD_RULES: [&str; 3] = [
    "DOMAIN-SUFFIX,ad.com",
    "DOMAIN-SUFFIX,ads.com",
    "DOMAIN-SUFFIX,doubleclick.net",
];

/// Fixed parts of the emitted config.
#[derive(Debug, Clone, PartialEq)]
pub struct ClashTemplate {
    /// Top-level settings emitted before `proxies`.
    pub settings: Map<String, Value>,
    /// Health-check URL for url-test groups.
    pub test_url: String,
    /// Health-check interval, seconds.
    pub test_interval: u32,
    /// url-test tolerance, milliseconds.
    pub test_tolerance: u32,
    /// Nodes in the fastest group.
    pub fastest_size: usize,
    /// Nodes offered directly in each category group.
    pub category_size: usize,
}

impl Default for ClashTemplate {
    fn default() -> Self {
        let settings = json!({
            "port": 7890,
            "socks-port": 7891,
            "allow-lan": false,
            "mode": "rule",
            "log-level": "info",
            "external-controller": "127.0.0.1:9090",
            "dns": {
                "enable": true,
                "listen": "0.0.0.0:53",
                "enhanced-mode": "fake-ip",
                "fake-ip-range": "198.18.0.1/16",
                "nameserver": ["223.5.5.5", "119.29.29.29", "1.1.1.1", "8.8.8.8"],
                "fallback": [
                    "1.1.1.1",
                    "8.8.8.8",
                    "tls://dns.cloudflare.com:853",
                    "tls://dns.google:853"
                ],
                "fallback-filter": {
                    "geoip": true,
                    "ipcidr": ["240.0.0.0/4"]
                }
            }
        });
        let settings = match settings {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            settings,
            test_url: "http://www.gstatic.com/generate_204".to_string(),
            test_interval: 300,
            test_tolerance: 50,
            fastest_size: 20,
            category_size: 5,
        }
    }
}

/// Proxy group type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupKind {
    /// Manual choice.
    Select,
    /// Periodic latency test, picks the fastest.
    UrlTest,
}

/// One `proxy-groups` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxyGroup {
    /// Group name.
    pub name: String,
    /// Group type.
    #[serde(rename = "type")]
    pub kind: GroupKind,
    /// Member node or group names.
    pub proxies: Vec<String>,
    /// Health-check URL (url-test only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Health-check interval (url-test only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    /// Tolerance (url-test only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<u32>,
}

impl ProxyGroup {
    fn select(name: &str, proxies: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            kind: GroupKind::Select,
            proxies,
            url: None,
            interval: None,
            tolerance: None,
        }
    }

    fn url_test(name: &str, proxies: Vec<String>, template: &ClashTemplate) -> Self {
        Self {
            name: name.to_string(),
            kind: GroupKind::UrlTest,
            proxies,
            url: Some(template.test_url.clone()),
            interval: Some(template.test_interval),
            tolerance: Some(template.test_tolerance),
        }
    }
}

/// A complete Clash document.
#[derive(Debug, Clone, Serialize)]
pub struct ClashDocument {
    /// Base settings.
    #[serde(flatten)]
    pub settings: Map<String, Value>,
    /// Nodes, fastest first.
    pub proxies: Vec<ProxyDescriptor>,
    /// Policy groups.
    #[serde(rename = "proxy-groups")]
    pub groups: Vec<ProxyGroup>,
    /// Rules, most specific first, `MATCH` last.
    pub rules: Vec<String>,
}

fn strings<'a>(items: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    items.into_iter().map(str::to_string).collect()
}

impl ClashDocument {
    /// Assemble the document. Nodes without a latency sort last.
    pub fn build(descriptors: &[ProxyDescriptor], table: &RuleTable, template: &ClashTemplate) -> Self {
        let mut proxies = descriptors.to_vec();
        proxies.sort_by(|a, b| {
            a.latency
                .unwrap_or(f64::INFINITY)
                .total_cmp(&b.latency.unwrap_or(f64::INFINITY))
        });
        let names: Vec<String> = proxies.iter().map(|d| d.name.clone()).collect();

        let mut groups = vec![
            ProxyGroup::url_test(AUTO_GROUP, names.clone(), template),
            ProxyGroup::select(
                MANUAL_GROUP,
                std::iter::once(AUTO_GROUP.to_string()).chain(names.iter().cloned()).collect(),
            ),
            ProxyGroup::url_test(
                FASTEST_GROUP,
                names.iter().take(template.fastest_size).cloned().collect(),
                template,
            ),
        ];
        for category in table.categories() {
            let mut members = strings([AUTO_GROUP, FASTEST_GROUP, MANUAL_GROUP]);
            members.extend(names.iter().take(template.category_size).cloned());
            groups.push(ProxyGroup::select(&category.name, members));
        }
        groups.push(ProxyGroup::select(DIRECT_GROUP, strings(["DIRECT"])));
        groups.push(ProxyGroup::select(REJECT_GROUP, strings(["REJECT", "DIRECT"])));
        groups.push(ProxyGroup::select(FINAL_GROUP, strings([AUTO_GROUP, DIRECT_GROUP])));

        let mut rules: Vec<String> = LAN_RULES.iter().map(|r| format!("{r},DIRECT")).collect();
        rules.push(format!("GEOIP,CN,{DIRECT_GROUP}"));
        for category in table.categories() {
            rules.extend(category.rules.iter().map(|r| format!("{r},{}", category.name)));
        }
        rules.extend(AD_RULES.iter().map(|r| format!("{r},{REJECT_GROUP}")));
        rules.push(format!("MATCH,{FINAL_GROUP}"));

        Self {
            settings: template.settings.clone(),
            proxies,
            groups,
            rules,
        }
    }

    /// Render as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("serialize clash config")
    }

    /// Write the YAML rendering to `path`, replacing any existing file.
    pub fn write_yaml(&self, path: &Path) -> Result<()> {
        let text = self.to_yaml()?;
        std::fs::write(path, text).with_context(|| format!("write {}", path.display()))
    }
}
