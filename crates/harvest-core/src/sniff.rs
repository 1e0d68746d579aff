//! Blob format detection.
//!
//! Subscriptions arrive as one of:
//! 1. a Clash YAML document with a `proxies:` sequence,
//! 2. a base64 blob wrapping a newline-separated link list,
//! 3. a plain link list.
//!
//! Detection is tried in that order.

use std::borrow::Cow;

use serde_yaml::Value as Yaml;
use tracing::trace;

use crate::b64;
use crate::decode::is_candidate;
use crate::model::{ProxyDescriptor, ProxyKind, TransportOptions, RESERVED_KEYS};

/// Detected blob format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    /// Clash YAML with a `proxies` sequence.
    Clash,
    /// Base64-wrapped link list.
    Base64,
    /// Plain link list (or unrecognized text).
    Plain,
    /// Blank blob.
    Empty,
}

/// What a blob turned out to contain.
#[derive(Debug)]
pub enum SourceContent<'a> {
    /// Records read directly from a Clash document.
    Structured(Vec<ProxyDescriptor>),
    /// Text to be decoded line by line.
    Lines {
        /// [`ContentFormat::Base64`], [`ContentFormat::Plain`] or
        /// [`ContentFormat::Empty`].
        format: ContentFormat,
        /// The (decoded) text.
        text: Cow<'a, str>,
    },
}

impl SourceContent<'_> {
    /// Format that produced this content.
    pub fn format(&self) -> ContentFormat {
        match self {
            Self::Structured(_) => ContentFormat::Clash,
            Self::Lines { format, .. } => *format,
        }
    }
}

/// Classify a blob and unwrap it.
pub fn sniff(blob: &str) -> SourceContent<'_> {
    if blob.trim().is_empty() {
        return SourceContent::Lines {
            format: ContentFormat::Empty,
            text: Cow::Borrowed(""),
        };
    }
    if let Some(records) = clash_proxies(blob) {
        return SourceContent::Structured(records);
    }
    if let Some(text) = b64::decode_text(blob) {
        if text.lines().any(|l| is_candidate(l.trim())) {
            return SourceContent::Lines {
                format: ContentFormat::Base64,
                text: Cow::Owned(text),
            };
        }
    }
    SourceContent::Lines {
        format: ContentFormat::Plain,
        text: Cow::Borrowed(blob),
    }
}

fn clash_proxies(blob: &str) -> Option<Vec<ProxyDescriptor>> {
    // cheap pre-check; link lists and base64 never contain the key
    if !blob.contains("proxies") {
        return None;
    }
    let doc: Yaml = serde_yaml::from_str(blob).ok()?;
    let proxies = doc.as_mapping()?.get("proxies")?.as_sequence()?;
    let records: Vec<_> = proxies.iter().filter_map(from_clash_value).collect();
    trace!(total = proxies.len(), kept = records.len(), "clash proxies read");
    Some(records)
}

/// Build a descriptor from one Clash `proxies` entry.
///
/// Entries missing `name`, `type`, `server` or `port`, or with an unknown
/// `type`, are skipped. Every other key is kept as an option; the identity
/// credential is picked from those options the same way the link decoders
/// fill them.
pub fn from_clash_value(value: &Yaml) -> Option<ProxyDescriptor> {
    let map = value.as_mapping()?;
    let text = |key: &str| match map.get(key)? {
        Yaml::String(s) => Some(s.trim().to_string()),
        Yaml::Number(n) => Some(n.to_string()),
        _ => None,
    };
    let name = text("name").filter(|n| !n.is_empty())?;
    let kind = ProxyKind::from_clash_type(&text("type")?)?;
    let server = text("server")?;
    let server = server.trim_start_matches('[').trim_end_matches(']');
    let port = text("port")?.parse::<u16>().ok()?;

    let mut options = TransportOptions::new();
    for (k, v) in map {
        let Some(key) = k.as_str() else { continue };
        if RESERVED_KEYS.contains(&key) {
            continue;
        }
        if let Ok(json) = serde_json::to_value(v) {
            options.insert(key.to_string(), json);
        }
    }
    let credential = kind.identity_credential(&options);

    let mut d = ProxyDescriptor::new(kind, server, port)
        .ok()?
        .with_name(Some(name))
        .with_credential(credential);
    d.options = options;
    Some(d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CLASH: &str = r#"
port: 7890
proxies:
  - name: "HK 01"
    type: ss
    server: hk.example
    port: 8388
    cipher: aes-256-gcm
    password: pw
  - name: VL
    type: vless
    server: "[2001:db8::2]"
    port: "443"
    uuid: u-1
    tls: true
    ws-opts:
      path: /ray
  - name: missing-port
    type: trojan
    server: t.example
  - name: weird
    type: snell
    server: s.example
    port: 1
proxy-groups: []
"#;

    #[test]
    fn clash_documents_become_structured_records() {
        let content = sniff(CLASH);
        assert_eq!(content.format(), ContentFormat::Clash);
        let SourceContent::Structured(records) = content else {
            panic!("expected structured content");
        };
        assert_eq!(records.len(), 2);

        let ss = &records[0];
        assert_eq!(ss.kind, ProxyKind::ShadowSocks);
        assert_eq!(ss.name, "HK 01");
        assert_eq!(ss.credential.as_deref(), Some("pw"));
        assert_eq!(ss.option_str("cipher"), Some("aes-256-gcm"));
        assert!(ss.options.get("name").is_none());

        let vl = &records[1];
        assert_eq!(vl.server, "2001:db8::2");
        assert_eq!(vl.port, 443);
        assert_eq!(vl.credential.as_deref(), Some("u-1"));
        assert_eq!(vl.options["ws-opts"], json!({ "path": "/ray" }));
    }

    #[test]
    fn base64_link_lists_are_unwrapped() {
        let inner = "trojan://pw@5.6.7.8:443#A\nss://bTpw@1.2.3.4:1#B\n";
        let blob = b64::encode(inner);
        let content = sniff(&blob);
        assert_eq!(content.format(), ContentFormat::Base64);
        let SourceContent::Lines { text, .. } = content else {
            panic!("expected lines");
        };
        assert_eq!(text, inner);
    }

    #[test]
    fn base64_wrapped_in_lines_is_unwrapped() {
        let blob = b64::encode("vless://id@h:443#X");
        let wrapped = format!("{}\n{}\n", &blob[..8], &blob[8..]);
        assert_eq!(sniff(&wrapped).format(), ContentFormat::Base64);
    }

    #[test]
    fn plain_lists_and_noise() {
        assert_eq!(sniff("trojan://pw@h:1\n").format(), ContentFormat::Plain);
        // decodes as base64 but carries no links
        assert_eq!(sniff("aGVsbG8gd29ybGQ=").format(), ContentFormat::Plain);
        assert_eq!(sniff("proxies: not-a-list").format(), ContentFormat::Plain);
        assert_eq!(sniff(" \n\t").format(), ContentFormat::Empty);
    }
}
