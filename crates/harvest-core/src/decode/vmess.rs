//! `vmess://base64(json)` links (the v2rayN share format).

use serde_json::{Map, Value};

use super::{put_int, put_str, put_true, put_ws_opts, ProxyDescriptor};
use crate::b64;
use crate::decode::link::parse_port;
use crate::decode::query::{is_truthy, parse_int_literal};
use crate::error::DecodeError;
use crate::model::ProxyKind;

pub(super) fn decode(body: &str) -> Result<ProxyDescriptor, DecodeError> {
    // some publishers append a fragment after the payload
    let payload = body.split('#').next().unwrap_or_default().trim();
    let bytes = b64::decode_bytes(payload).ok_or(DecodeError::Base64)?;
    let text = String::from_utf8(bytes).map_err(|_| DecodeError::Utf8)?;
    let json: Value = serde_json::from_str(&text).map_err(|e| DecodeError::Json(e.to_string()))?;
    let obj = json
        .as_object()
        .ok_or(DecodeError::Malformed("vmess payload is not an object"))?;

    let server = field(obj, "add").ok_or(DecodeError::MissingHost)?;
    let port = match obj.get("port") {
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u16::try_from(n).ok())
            .filter(|n| *n != 0)
            .ok_or_else(|| DecodeError::InvalidPort(n.to_string()))?,
        Some(Value::String(s)) => parse_port(s)?,
        _ => return Err(DecodeError::MissingPort),
    };
    // `add` occasionally arrives bracketed
    let server = server.trim_start_matches('[').trim_end_matches(']');
    let uuid = field(obj, "id").ok_or(DecodeError::MissingCredential)?;

    let name = field(obj, "ps");
    let mut d = ProxyDescriptor::new(ProxyKind::VMess, server, port)?
        .with_name(name.or_else(|| Some(server.to_string())))
        .with_credential(Some(uuid.clone()));

    let network = field(obj, "net").unwrap_or_else(|| "tcp".into());
    let opts = &mut d.options;
    put_str(opts, "uuid", Some(uuid));
    put_int(
        opts,
        "alterId",
        field(obj, "aid").and_then(|a| parse_int_literal(&a)).filter(|a| *a != 0),
    );
    put_str(opts, "cipher", Some(field(obj, "scy").unwrap_or_else(|| "auto".into())));
    put_str(opts, "network", Some(network.clone()));

    let host = field(obj, "host");
    if network == "ws" {
        put_ws_opts(opts, field(obj, "path"), host.clone());
    }
    if field(obj, "tls").is_some_and(|t| t == "tls" || t == "1") {
        opts.insert("tls".into(), Value::Bool(true));
        put_str(opts, "servername", field(obj, "sni").or(host));
    }
    put_true(
        opts,
        "skip-cert-verify",
        field(obj, "skip-cert-verify").map(|v| is_truthy(&v)),
    );
    put_str(opts, "client-fingerprint", field(obj, "fp"));
    Ok(d)
}

/// String-ish field: strings as-is, numbers and bools stringified, blanks
/// treated as absent.
fn field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    let s = match obj.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::try_decode;
    use serde_json::json;

    fn link(v: Value) -> String {
        format!("vmess://{}", b64::encode(v.to_string()))
    }

    #[test]
    fn full_ws_tls_payload() {
        let line = link(json!({
            "v": "2", "ps": "HK 01", "add": "hk.example", "port": "443",
            "id": "7f6b1c2e-0000-4000-8000-000000000001", "aid": "0",
            "net": "ws", "path": "/ray", "host": "cdn.example", "tls": "tls"
        }));
        let d = try_decode(&line).unwrap();
        assert_eq!(d.kind, ProxyKind::VMess);
        assert_eq!(d.name, "HK 01");
        assert_eq!(d.port, 443);
        assert_eq!(d.credential.as_deref(), Some("7f6b1c2e-0000-4000-8000-000000000001"));
        assert!(d.options.get("alterId").is_none());
        assert_eq!(d.option_str("cipher"), Some("auto"));
        assert!(d.option_flag("tls"));
        assert_eq!(d.option_str("servername"), Some("cdn.example"));
        assert_eq!(
            d.options["ws-opts"],
            json!({ "path": "/ray", "headers": { "Host": "cdn.example" } })
        );
    }

    #[test]
    fn numeric_port_alter_id_and_sni_preference() {
        let line = link(json!({
            "add": "1.1.1.1", "port": 10086, "id": "u", "aid": 64,
            "tls": "1", "sni": "sni.example", "host": "h.example"
        }));
        let d = try_decode(&line).unwrap();
        assert_eq!(d.port, 10086);
        assert_eq!(d.name, "1.1.1.1");
        assert_eq!(d.options["alterId"], json!(64));
        assert_eq!(d.option_str("network"), Some("tcp"));
        assert_eq!(d.option_str("servername"), Some("sni.example"));
        assert!(d.options.get("ws-opts").is_none());
    }

    #[test]
    fn non_tls_ignores_servername() {
        let line = link(json!({ "add": "a", "port": 1, "id": "u", "tls": "", "sni": "x" }));
        let d = try_decode(&line).unwrap();
        assert!(!d.option_flag("tls"));
        assert!(d.options.get("servername").is_none());
    }

    #[test]
    fn rejects_bad_payloads() {
        assert!(try_decode("vmess://@@@").is_err());
        assert!(try_decode(&format!("vmess://{}", b64::encode("not json"))).is_err());
        assert!(try_decode(&link(json!({ "port": 1, "id": "u" }))).is_err());
        assert!(try_decode(&link(json!({ "add": "a", "id": "u" }))).is_err());
        assert!(try_decode(&link(json!({ "add": "a", "port": 70000, "id": "u" }))).is_err());
        assert!(try_decode(&link(json!({ "add": "a", "port": "0", "id": "u" }))).is_err());
        assert!(try_decode(&link(json!([1, 2]))).is_err());
    }
}
