//! `vless://uuid@host:port?params#name`, including Reality parameters.

use serde_json::Value;

use super::link::Link;
use super::{put_list, put_str, put_true, put_ws_opts, ProxyDescriptor, TransportOptions};
use crate::error::DecodeError;
use crate::model::ProxyKind;

pub(super) fn decode(body: &str) -> Result<ProxyDescriptor, DecodeError> {
    let link = Link::parse(body)?;
    let uuid = link.secret().ok_or(DecodeError::MissingCredential)?;
    let port = link.port_or(None)?;
    let q = &link.query;

    let mut d = ProxyDescriptor::new(ProxyKind::VLess, link.host, port)?
        .with_name(link.name.clone())
        .with_credential(Some(uuid.clone()));
    let opts = &mut d.options;
    put_str(opts, "uuid", Some(uuid));

    let network = q
        .string(&["type"])
        .map(|n| n.to_ascii_lowercase())
        .unwrap_or_else(|| "tcp".into());
    put_str(opts, "network", Some(network.clone()));

    let security = q.string(&["security"]).map(|s| s.to_ascii_lowercase());
    if matches!(security.as_deref(), Some("tls" | "reality")) {
        opts.insert("tls".into(), Value::Bool(true));
    }
    put_str(opts, "servername", q.string(&["sni", "servername", "peer"]));
    put_str(opts, "flow", q.string(&["flow"]));
    put_str(opts, "client-fingerprint", q.string(&["fp"]));
    put_list(opts, "alpn", q.list(&["alpn"]));
    put_true(opts, "skip-cert-verify", q.flag(&["allowinsecure", "insecure"]));

    if let Some(pbk) = q.string(&["pbk"]) {
        let mut reality = TransportOptions::new();
        reality.insert("public-key".into(), Value::String(pbk));
        if let Some(sid) = q.string(&["sid"]) {
            reality.insert("short-id".into(), Value::String(sid));
        }
        opts.insert("reality-opts".into(), Value::Object(reality));
    }

    match network.as_str() {
        "ws" => put_ws_opts(opts, q.string(&["path"]), q.string(&["host"])),
        "grpc" => {
            if let Some(service) = q.string(&["servicename"]) {
                let mut grpc = TransportOptions::new();
                grpc.insert("grpc-service-name".into(), Value::String(service));
                opts.insert("grpc-opts".into(), Value::Object(grpc));
            }
        }
        _ => {}
    }
    Ok(d)
}

#[cfg(test)]
mod tests {
    use crate::decode::try_decode;
    use serde_json::json;

    #[test]
    fn ws_tls_link() {
        let d = try_decode(
            "vless://uuid-test@server.com:443?type=ws&security=tls&sni=example.com&path=%2Fpath&host=cdn.example#MyVless",
        )
        .unwrap();
        assert_eq!(d.credential.as_deref(), Some("uuid-test"));
        assert_eq!(d.option_str("network"), Some("ws"));
        assert!(d.option_flag("tls"));
        assert_eq!(d.option_str("servername"), Some("example.com"));
        assert_eq!(
            d.options["ws-opts"],
            json!({ "path": "/path", "headers": { "Host": "cdn.example" } })
        );
        assert_eq!(d.name, "MyVless");
    }

    #[test]
    fn network_type_is_case_insensitive() {
        let d = try_decode("vless://id@h:443?type=WS&host=x").unwrap();
        assert_eq!(d.option_str("network"), Some("ws"));
        assert_eq!(d.options["ws-opts"], json!({ "path": "/", "headers": { "Host": "x" } }));
    }

    #[test]
    fn reality_link() {
        let d = try_decode(
            "vless://id@1.2.3.4:443?Security=REALITY&pbk=Zm9v-YmFy_&SID=6ba85179&fp=chrome&flow=xtls-rprx-vision&sni=www.microsoft.com",
        )
        .unwrap();
        assert!(d.option_flag("tls"));
        assert_eq!(
            d.options["reality-opts"],
            json!({ "public-key": "Zm9v-YmFy_", "short-id": "6ba85179" })
        );
        assert_eq!(d.option_str("client-fingerprint"), Some("chrome"));
        assert_eq!(d.option_str("flow"), Some("xtls-rprx-vision"));
        assert_eq!(d.option_str("network"), Some("tcp"));
        assert_eq!(d.name, "VLESS-1.2.3.4:443");
    }

    #[test]
    fn grpc_service_and_plain_security() {
        let d = try_decode("vless://id@h:80?type=grpc&serviceName=svc&security=none").unwrap();
        assert!(!d.option_flag("tls"));
        assert_eq!(d.options["grpc-opts"], json!({ "grpc-service-name": "svc" }));
    }

    #[test]
    fn rejects_missing_uuid() {
        assert!(try_decode("vless://h.example:443").is_err());
    }
}
