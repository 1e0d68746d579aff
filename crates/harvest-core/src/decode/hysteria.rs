//! `hysteria2://` / `hy2://` and legacy `hysteria://` links.
//!
//! Both share one grammar: `scheme://password@host:port?params#name`.

use super::link::Link;
use super::{put_list, put_str, put_true, ProxyDescriptor};
use crate::error::DecodeError;
use crate::model::ProxyKind;

pub(super) fn decode(kind: ProxyKind, body: &str) -> Result<ProxyDescriptor, DecodeError> {
    let link = Link::parse(body)?;
    let q = &link.query;
    let password = link
        .secret()
        .or_else(|| q.string(&["auth", "auth_str", "auth-str"]))
        .ok_or(DecodeError::MissingCredential)?;
    let port = link.port_or(None)?;

    let mut d = ProxyDescriptor::new(kind, link.host, port)?
        .with_name(link.name.clone())
        .with_credential(Some(password.clone()));
    let opts = &mut d.options;
    put_str(opts, "password", Some(password));
    put_str(opts, "sni", q.string(&["sni", "peer", "servername"]));
    put_true(
        opts,
        "skip-cert-verify",
        q.flag(&["insecure", "allow-insecure", "allow_insecure", "skip-cert-verify"]),
    );

    let (obfs, obfs_password) = match q.string(&["obfs"]) {
        Some(o) => match o.split_once(':') {
            Some((kind, pwd)) => (Some(kind.to_string()), Some(pwd.to_string())),
            None => (Some(o), q.string(&["obfs-password", "obfs_password", "obfsparam"])),
        },
        None => (None, None),
    };
    put_str(opts, "obfs", obfs);
    put_str(opts, "obfs-password", obfs_password);

    put_str(opts, "up", q.string(&["up", "upmbps"]));
    put_str(opts, "down", q.string(&["down", "downmbps"]));
    put_list(opts, "alpn", q.list(&["alpn"]));
    Ok(d)
}
