//! `wireguard://private-key@host:port?params#name` (also `wg://`).

use serde_json::Value;

use super::link::Link;
use super::query::{parse_int_literal, split_list};
use super::{put_flag, put_int, put_list, put_str, ProxyDescriptor};
use crate::error::DecodeError;
use crate::model::ProxyKind;

pub(super) fn decode(body: &str) -> Result<ProxyDescriptor, DecodeError> {
    let link = Link::parse_relaxed(body)?;
    let (server, port) = link.server_or_endpoint()?;
    let q = &link.query;

    let private_key = link.secret();
    let public_key = q.string(&["public-key", "publickey", "public_key", "peer-public-key"]);
    let credential = private_key
        .clone()
        .or_else(|| public_key.clone())
        .ok_or(DecodeError::MissingCredential)?;

    let mut d = ProxyDescriptor::new(ProxyKind::WireGuard, server, port)?
        .with_name(link.name.clone())
        .with_credential(Some(credential));
    let opts = &mut d.options;
    put_str(opts, "private-key", private_key);
    put_str(opts, "public-key", public_key);
    put_str(
        opts,
        "pre-shared-key",
        q.string(&["pre-shared-key", "preshared-key", "presharedkey", "psk"]),
    );
    put_str(opts, "ip", q.string(&["ip", "address"]));
    put_str(opts, "ipv6", q.string(&["ipv6"]));
    put_list(opts, "dns", q.get(&["dns"]).map(|v| split_list(v, &[',', ';'])));
    put_int(opts, "mtu", q.int(&["mtu"]));
    put_int(
        opts,
        "keepalive",
        q.int(&["keepalive", "persistent-keepalive", "persistent_keepalive"]),
    );
    if let Some(reserved) = q.get(&["reserved"]).and_then(parse_reserved) {
        opts.insert("reserved".into(), Value::from(reserved));
    }
    put_flag(opts, "udp", q.flag(&["udp"]));
    put_str(opts, "sni", q.string(&["sni", "servername"]));
    Ok(d)
}

/// All-or-nothing: one bad element drops the whole list.
fn parse_reserved(v: &str) -> Option<Vec<i64>> {
    let parts = split_list(v, &[',', ';']);
    if parts.is_empty() {
        return None;
    }
    parts.iter().map(|p| parse_int_literal(p)).collect()
}
