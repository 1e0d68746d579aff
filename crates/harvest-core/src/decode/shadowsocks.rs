//! `ss://` links.
//!
//! Accepted layouts:
//! - SIP002: `ss://base64(method:password)@host:port[?plugin=..]#name`
//! - SIP002 plain userinfo: `ss://method:password@host:port#name`
//! - legacy: `ss://base64(method:password@host:port)#name`

use super::link::{split_fragment, Link};
use super::query::unescape;
use super::{put_str, ProxyDescriptor};
use crate::b64;
use crate::error::DecodeError;
use crate::model::ProxyKind;

pub(super) fn decode(body: &str) -> Result<ProxyDescriptor, DecodeError> {
    let (main, name) = split_fragment(body);
    if !main.contains('@') {
        return decode_legacy(main, name);
    }
    let link = Link::parse(body)?;
    let userinfo = link.userinfo.ok_or(DecodeError::MissingCredential)?;
    let (method, password) = method_password(userinfo)?;
    let port = link.port_or(None)?;

    let mut d = ProxyDescriptor::new(ProxyKind::ShadowSocks, link.host, port)?
        .with_name(link.name.clone())
        .with_credential(Some(password.clone()));
    put_str(&mut d.options, "cipher", Some(method));
    put_str(&mut d.options, "password", Some(password));
    put_str(&mut d.options, "plugin", link.query.string(&["plugin"]));
    Ok(d)
}

fn decode_legacy(main: &str, name: Option<String>) -> Result<ProxyDescriptor, DecodeError> {
    let main = main.split('?').next().unwrap_or_default();
    let decoded = b64::decode_text(main).ok_or(DecodeError::Base64)?;
    if !decoded.contains('@') {
        return Err(DecodeError::Malformed("ss link without server"));
    }
    let link = Link::parse(&decoded)?;
    let userinfo = link.userinfo.ok_or(DecodeError::MissingCredential)?;
    let (method, password) = userinfo
        .split_once(':')
        .ok_or(DecodeError::Malformed("ss userinfo without method"))?;
    let port = link.port_or(None)?;

    let mut d = ProxyDescriptor::new(ProxyKind::ShadowSocks, link.host, port)?
        .with_name(name)
        .with_credential(Some(password.to_string()));
    put_str(&mut d.options, "cipher", Some(method.to_string()));
    put_str(&mut d.options, "password", Some(password.to_string()));
    Ok(d)
}

/// Userinfo is either base64 of `method:password` or escaped plain text.
/// The password may itself contain `:`.
fn method_password(userinfo: &str) -> Result<(String, String), DecodeError> {
    let plain = unescape(userinfo);
    let text = if plain.contains(':') {
        plain
    } else {
        b64::decode_text(&plain).ok_or(DecodeError::Base64)?
    };
    let (method, password) = text
        .split_once(':')
        .ok_or(DecodeError::Malformed("ss userinfo without method"))?;
    if method.is_empty() {
        return Err(DecodeError::Malformed("ss userinfo without method"));
    }
    if password.is_empty() {
        return Err(DecodeError::MissingCredential);
    }
    Ok((method.to_string(), password.to_string()))
}
