//! Canonical proxy descriptor shared by every stage of the pipeline.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

use crate::error::DecodeError;

/// Scheme-specific options, keyed by their Clash spelling
/// (`tls`, `servername`, `ws-opts`, `skip-cert-verify`, ...).
///
/// Insertion order is preserved so emitted configs read in decode order.
pub type TransportOptions = serde_json::Map<String, Value>;

/// Closed set of supported proxy protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProxyKind {
    /// Shadowsocks (`ss://`).
    #[serde(rename = "ss")]
    ShadowSocks,
    /// VMess (`vmess://`, base64 JSON body).
    #[serde(rename = "vmess")]
    VMess,
    /// Trojan (`trojan://`).
    #[serde(rename = "trojan")]
    Trojan,
    /// VLESS (`vless://`).
    #[serde(rename = "vless")]
    VLess,
    /// Hysteria 2 (`hysteria2://`, `hy2://`).
    #[serde(rename = "hysteria2")]
    Hysteria2,
    /// Legacy Hysteria (`hysteria://`).
    #[serde(rename = "hysteria")]
    Hysteria1,
    /// TUIC (`tuic://`).
    #[serde(rename = "tuic")]
    Tuic,
    /// WireGuard (`wireguard://`, `wg://`).
    #[serde(rename = "wireguard")]
    WireGuard,
    /// HTTP or HTTPS proxy.
    #[serde(rename = "http")]
    Http,
    /// SOCKS5 proxy.
    #[serde(rename = "socks5")]
    Socks5,
}

impl ProxyKind {
    /// Every kind, in dispatch order.
    pub const ALL: [ProxyKind; 10] = [
        ProxyKind::ShadowSocks,
        ProxyKind::VMess,
        ProxyKind::Trojan,
        ProxyKind::VLess,
        ProxyKind::Hysteria2,
        ProxyKind::Hysteria1,
        ProxyKind::Tuic,
        ProxyKind::WireGuard,
        ProxyKind::Http,
        ProxyKind::Socks5,
    ];

    /// Human label, used in decoder fallback names.
    pub fn label(self) -> &'static str {
        match self {
            Self::ShadowSocks => "SS",
            Self::VMess => "VMess",
            Self::Trojan => "Trojan",
            Self::VLess => "VLESS",
            Self::Hysteria2 => "Hysteria2",
            Self::Hysteria1 => "Hysteria",
            Self::Tuic => "TUIC",
            Self::WireGuard => "WireGuard",
            Self::Http => "HTTP",
            Self::Socks5 => "SOCKS5",
        }
    }

    /// Clash `type` value.
    pub fn clash_type(self) -> &'static str {
        match self {
            Self::ShadowSocks => "ss",
            Self::VMess => "vmess",
            Self::Trojan => "trojan",
            Self::VLess => "vless",
            Self::Hysteria2 => "hysteria2",
            Self::Hysteria1 => "hysteria",
            Self::Tuic => "tuic",
            Self::WireGuard => "wireguard",
            Self::Http => "http",
            Self::Socks5 => "socks5",
        }
    }

    /// Parse a Clash `type` value, accepting common aliases.
    pub fn from_clash_type(s: &str) -> Option<Self> {
        let kind = match s.trim().to_ascii_lowercase().as_str() {
            "ss" | "shadowsocks" => Self::ShadowSocks,
            "vmess" => Self::VMess,
            "trojan" => Self::Trojan,
            "vless" => Self::VLess,
            "hysteria2" | "hy2" => Self::Hysteria2,
            "hysteria" => Self::Hysteria1,
            "tuic" => Self::Tuic,
            "wireguard" | "wg" => Self::WireGuard,
            "http" | "https" => Self::Http,
            "socks5" | "socks" => Self::Socks5,
            _ => return None,
        };
        Some(kind)
    }

    /// Pick the identity-bearing secret out of a Clash-shaped option map.
    ///
    /// HTTP and SOCKS carry no identity credential even when they carry a
    /// username and password.
    pub fn identity_credential(self, options: &TransportOptions) -> Option<String> {
        let text = |k: &str| {
            options
                .get(k)
                .and_then(value_as_string)
                .filter(|s| !s.is_empty())
        };
        let keys: &[&str] = match self {
            Self::VMess | Self::VLess => &["uuid"],
            Self::Tuic => {
                return match (text("uuid"), text("password")) {
                    (Some(u), Some(p)) => Some(format!("{u}:{p}")),
                    (u, p) => u.or(p),
                };
            }
            Self::WireGuard => &["private-key", "public-key"],
            Self::ShadowSocks | Self::Trojan | Self::Hysteria2 | Self::Hysteria1 => &["password"],
            Self::Http | Self::Socks5 => &[],
        };
        keys.iter().find_map(|k| text(*k))
    }
}

impl fmt::Display for ProxyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One proxy endpoint candidate.
///
/// `server` and `port` are validated by [`ProxyDescriptor::new`]; every
/// descriptor that leaves the decoder went through it. `credential` is
/// identity material only: it is redacted from `Debug` output and is not
/// serialized separately, since the secrets a client needs are already in
/// `options` under their Clash keys.
#[derive(Clone, PartialEq)]
pub struct ProxyDescriptor {
    /// Display label. Rewritten by the aggregator to be unique.
    pub name: String,
    /// Protocol.
    pub kind: ProxyKind,
    /// Server host or IP literal (never bracketed).
    pub server: String,
    /// Server port, 1..=65535.
    pub port: u16,
    /// Identity-bearing secret (password, uuid, key).
    pub credential: Option<String>,
    /// Scheme-specific fields in Clash spelling.
    pub options: TransportOptions,
    /// Measured connect latency in milliseconds; set by the prober.
    pub latency: Option<f64>,
}

impl ProxyDescriptor {
    /// Create a descriptor with the fallback name and no options.
    pub fn new(kind: ProxyKind, server: impl Into<String>, port: u16) -> Result<Self, DecodeError> {
        let server = server.into();
        let server = server.trim();
        if server.is_empty() {
            return Err(DecodeError::MissingHost);
        }
        if port == 0 {
            return Err(DecodeError::InvalidPort("0".into()));
        }
        let mut d = Self {
            name: String::new(),
            kind,
            server: server.to_string(),
            port,
            credential: None,
            options: TransportOptions::new(),
            latency: None,
        };
        d.name = d.fallback_name();
        Ok(d)
    }

    /// Replace the name when `name` is present and non-blank.
    pub fn with_name(mut self, name: Option<String>) -> Self {
        if let Some(n) = name.filter(|n| !n.trim().is_empty()) {
            self.name = n;
        }
        self
    }

    /// Set the identity credential (blank values are ignored).
    pub fn with_credential(mut self, credential: Option<String>) -> Self {
        self.credential = credential.filter(|c| !c.is_empty());
        self
    }

    /// Decoder fallback name: `"{Label}-{server}:{port}"`.
    pub fn fallback_name(&self) -> String {
        format!("{}-{}:{}", self.kind.label(), self.server, self.port)
    }

    /// Aggregator fallback when the advertised name sanitizes to nothing:
    /// `"{type}-{server}-{port}"`.
    pub fn base_name_fallback(&self) -> String {
        format!("{}-{}-{}", self.kind.clash_type(), self.server, self.port)
    }

    /// `server:port`, bracketing IPv6 literals.
    pub fn endpoint(&self) -> String {
        if self.server.contains(':') {
            format!("[{}]:{}", self.server, self.port)
        } else {
            format!("{}:{}", self.server, self.port)
        }
    }

    /// Record a measured latency, rounded to two decimals.
    pub fn set_latency_ms(&mut self, ms: f64) {
        self.latency = Some((ms.max(0.0) * 100.0).round() / 100.0);
    }

    /// String-valued option.
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }

    /// Boolean option; absent counts as false.
    pub fn option_flag(&self, key: &str) -> bool {
        self.options.get(key).and_then(Value::as_bool).unwrap_or(false)
    }
}

impl fmt::Debug for ProxyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("server", &self.server)
            .field("port", &self.port)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("options", &self.options.keys().collect::<Vec<_>>())
            .field("latency", &self.latency)
            .finish()
    }
}

/// Flat Clash proxy mapping: `name`, `type`, `server`, `port`, then every
/// option, then `latency` when measured.
impl Serialize for ProxyDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let extra = self
            .options
            .keys()
            .filter(|k| !RESERVED_KEYS.contains(&k.as_str()))
            .count();
        let mut map = serializer.serialize_map(Some(4 + extra + usize::from(self.latency.is_some())))?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("type", self.kind.clash_type())?;
        map.serialize_entry("server", &self.server)?;
        map.serialize_entry("port", &self.port)?;
        for (k, v) in &self.options {
            if RESERVED_KEYS.contains(&k.as_str()) {
                continue;
            }
            map.serialize_entry(k, v)?;
        }
        if let Some(latency) = self.latency {
            map.serialize_entry("latency", &latency)?;
        }
        map.end()
    }
}

/// Keys owned by the descriptor itself; options never shadow them.
pub(crate) const RESERVED_KEYS: [&str; 5] = ["name", "type", "server", "port", "latency"];

pub(crate) fn value_as_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_rejects_missing_endpoint_parts() {
        assert_eq!(
            ProxyDescriptor::new(ProxyKind::Trojan, "  ", 443).unwrap_err(),
            DecodeError::MissingHost
        );
        assert!(matches!(
            ProxyDescriptor::new(ProxyKind::Trojan, "a.example", 0),
            Err(DecodeError::InvalidPort(_))
        ));
    }

    #[test]
    fn fallback_names() {
        let d = ProxyDescriptor::new(ProxyKind::ShadowSocks, "1.2.3.4", 8388).unwrap();
        assert_eq!(d.name, "SS-1.2.3.4:8388");
        assert_eq!(d.base_name_fallback(), "ss-1.2.3.4-8388");
    }

    #[test]
    fn debug_redacts_credential() {
        let d = ProxyDescriptor::new(ProxyKind::Trojan, "h", 1)
            .unwrap()
            .with_credential(Some("hunter2".into()));
        let dbg = format!("{d:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn serializes_flat_clash_mapping() {
        let mut d = ProxyDescriptor::new(ProxyKind::VLess, "v.example", 443)
            .unwrap()
            .with_name(Some("node".into()));
        d.options.insert("uuid".into(), json!("u-1"));
        d.options.insert("tls".into(), json!(true));
        d.options.insert("port".into(), json!(1));
        d.set_latency_ms(12.3456);

        let v = serde_json::to_value(&d).unwrap();
        assert_eq!(
            v,
            json!({
                "name": "node",
                "type": "vless",
                "server": "v.example",
                "port": 443,
                "uuid": "u-1",
                "tls": true,
                "latency": 12.35
            })
        );
    }

    #[test]
    fn identity_credential_priority() {
        let mut opts = TransportOptions::new();
        opts.insert("public-key".into(), json!("pub"));
        assert_eq!(ProxyKind::WireGuard.identity_credential(&opts).as_deref(), Some("pub"));
        opts.insert("private-key".into(), json!("priv"));
        assert_eq!(ProxyKind::WireGuard.identity_credential(&opts).as_deref(), Some("priv"));
        opts.insert("password".into(), json!("pw"));
        assert_eq!(ProxyKind::Http.identity_credential(&opts), None);

        let mut tuic = TransportOptions::new();
        tuic.insert("uuid".into(), json!("u"));
        assert_eq!(ProxyKind::Tuic.identity_credential(&tuic).as_deref(), Some("u"));
        tuic.insert("password".into(), json!("p"));
        assert_eq!(ProxyKind::Tuic.identity_credential(&tuic).as_deref(), Some("u:p"));
    }

    #[test]
    fn clash_type_round_trips_through_aliases() {
        for kind in ProxyKind::ALL {
            assert_eq!(ProxyKind::from_clash_type(kind.clash_type()), Some(kind));
        }
        assert_eq!(ProxyKind::from_clash_type("Shadowsocks"), Some(ProxyKind::ShadowSocks));
        assert_eq!(ProxyKind::from_clash_type("snell"), None);
    }
}
