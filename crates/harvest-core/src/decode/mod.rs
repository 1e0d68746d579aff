//! Multi-scheme link decoder.
//!
//! One trimmed line in, one [`ProxyDescriptor`] (or a [`DecodeError`]) out.
//! [`Scheme::detect`] walks a fixed prefix table; each [`Scheme`] maps onto
//! exactly one decoding function through a total `match`, so adding a scheme
//! means adding a variant, a table row and a module.
//!
//! Every decoder goes through [`ProxyDescriptor::new`], so no descriptor
//! without a valid `server` and `port` can leave this module.

mod http;
mod hysteria;
mod link;
mod query;
mod shadowsocks;
mod socks;
mod trojan;
mod tuic;
mod vless;
mod vmess;
mod wireguard;

use serde_json::Value;
use tracing::trace;

use crate::error::DecodeError;
use crate::model::{ProxyDescriptor, ProxyKind, TransportOptions};

/// Link scheme, one per accepted prefix family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// `ss://`
    Shadowsocks,
    /// `vmess://`
    Vmess,
    /// `trojan://`
    Trojan,
    /// `vless://`
    Vless,
    /// `hysteria2://`, `hy2://`
    Hysteria2,
    /// `hysteria://`
    Hysteria,
    /// `tuic://`
    Tuic,
    /// `wireguard://`, `wg://`
    WireGuard,
    /// `https://`
    Https,
    /// `http://`
    Http,
    /// `socks5://`, `socks://`
    Socks,
}

/// Prefix table. Longer prefixes come before any shorter prefix they extend.
const PREFIXES: &[(&str, Scheme)] = &[
    ("ss://", Scheme::Shadowsocks),
    ("vmess://", Scheme::Vmess),
    ("trojan://", Scheme::Trojan),
    ("vless://", Scheme::Vless),
    ("hysteria2://", Scheme::Hysteria2),
    ("hy2://", Scheme::Hysteria2),
    ("hysteria://", Scheme::Hysteria),
    ("tuic://", Scheme::Tuic),
    ("wireguard://", Scheme::WireGuard),
    ("wg://", Scheme::WireGuard),
    ("https://", Scheme::Https),
    ("http://", Scheme::Http),
    ("socks5://", Scheme::Socks),
    ("socks://", Scheme::Socks),
];

impl Scheme {
    /// Match the line's prefix (case-insensitive). Returns the scheme and the
    /// body after the prefix.
    pub fn detect(line: &str) -> Option<(Self, &str)> {
        PREFIXES.iter().find_map(|(prefix, scheme)| {
            let head = line.get(..prefix.len())?;
            head.eq_ignore_ascii_case(prefix)
                .then(|| (*scheme, &line[prefix.len()..]))
        })
    }

    /// Kind of descriptor this scheme produces.
    pub fn kind(self) -> ProxyKind {
        match self {
            Self::Shadowsocks => ProxyKind::ShadowSocks,
            Self::Vmess => ProxyKind::VMess,
            Self::Trojan => ProxyKind::Trojan,
            Self::Vless => ProxyKind::VLess,
            Self::Hysteria2 => ProxyKind::Hysteria2,
            Self::Hysteria => ProxyKind::Hysteria1,
            Self::Tuic => ProxyKind::Tuic,
            Self::WireGuard => ProxyKind::WireGuard,
            Self::Https | Self::Http => ProxyKind::Http,
            Self::Socks => ProxyKind::Socks5,
        }
    }

    fn decode_body(self, body: &str) -> Result<ProxyDescriptor, DecodeError> {
        match self {
            Self::Shadowsocks => shadowsocks::decode(body),
            Self::Vmess => vmess::decode(body),
            Self::Trojan => trojan::decode(body),
            Self::Vless => vless::decode(body),
            Self::Hysteria2 => hysteria::decode(ProxyKind::Hysteria2, body),
            Self::Hysteria => hysteria::decode(ProxyKind::Hysteria1, body),
            Self::Tuic => tuic::decode(body),
            Self::WireGuard => wireguard::decode(body),
            Self::Https => http::decode(body, true),
            Self::Http => http::decode(body, false),
            Self::Socks => socks::decode(body),
        }
    }
}

/// Whether a (trimmed) line is a candidate for [`decode`].
pub fn is_candidate(line: &str) -> bool {
    Scheme::detect(line).is_some()
}

/// Decode one line, reporting why it failed.
pub fn try_decode(line: &str) -> Result<ProxyDescriptor, DecodeError> {
    let line = line.trim();
    let (scheme, body) = Scheme::detect(line).ok_or(DecodeError::UnknownScheme)?;
    scheme.decode_body(body)
}

/// Decode one line; any failure yields `None`.
pub fn decode(line: &str) -> Option<ProxyDescriptor> {
    match try_decode(line) {
        Ok(d) => Some(d),
        Err(e) => {
            trace!(error = %e, "link rejected");
            None
        }
    }
}

// ---- option helpers shared by the scheme modules ----

fn put_str(opts: &mut TransportOptions, key: &str, value: Option<String>) {
    if let Some(v) = value.filter(|v| !v.is_empty()) {
        opts.insert(key.to_string(), Value::String(v));
    }
}

fn put_flag(opts: &mut TransportOptions, key: &str, value: Option<bool>) {
    if let Some(v) = value {
        opts.insert(key.to_string(), Value::Bool(v));
    }
}

/// Only `true` is recorded; an explicit false is the same as absent.
fn put_true(opts: &mut TransportOptions, key: &str, value: Option<bool>) {
    if value == Some(true) {
        opts.insert(key.to_string(), Value::Bool(true));
    }
}

fn put_int(opts: &mut TransportOptions, key: &str, value: Option<i64>) {
    if let Some(v) = value {
        opts.insert(key.to_string(), Value::from(v));
    }
}

fn put_list(opts: &mut TransportOptions, key: &str, value: Option<Vec<String>>) {
    if let Some(v) = value.filter(|v| !v.is_empty()) {
        opts.insert(key.to_string(), Value::from(v));
    }
}

/// `ws-opts: { path, headers: { Host } }`.
fn put_ws_opts(opts: &mut TransportOptions, path: Option<String>, host: Option<String>) {
    let mut ws = TransportOptions::new();
    ws.insert(
        "path".into(),
        Value::String(path.filter(|p| !p.is_empty()).unwrap_or_else(|| "/".into())),
    );
    if let Some(h) = host.filter(|h| !h.is_empty()) {
        let mut headers = TransportOptions::new();
        headers.insert("Host".into(), Value::String(h));
        ws.insert("headers".into(), Value::Object(headers));
    }
    opts.insert("ws-opts".into(), Value::Object(ws));
}
