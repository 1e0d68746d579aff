//! `trojan://password@host:port?params#name`

use super::link::Link;
use super::{put_str, put_true, put_ws_opts, ProxyDescriptor};
use crate::error::DecodeError;
use crate::model::ProxyKind;

pub(super) fn decode(body: &str) -> Result<ProxyDescriptor, DecodeError> {
    let link = Link::parse(body)?;
    let password = link.secret().ok_or(DecodeError::MissingCredential)?;
    let port = link.port_or(None)?;
    let q = &link.query;

    let mut d = ProxyDescriptor::new(ProxyKind::Trojan, link.host, port)?
        .with_name(link.name.clone())
        .with_credential(Some(password.clone()));
    let opts = &mut d.options;
    put_str(opts, "password", Some(password));
    put_str(opts, "sni", q.string(&["sni", "peer", "servername"]));
    put_true(
        opts,
        "skip-cert-verify",
        q.flag(&["allowinsecure", "insecure", "allow-insecure", "skip-cert-verify"]),
    );
    put_str(opts, "client-fingerprint", q.string(&["fp"]));
    if let Some(network) = q.string(&["type"]).filter(|t| t != "tcp") {
        if network == "ws" {
            put_ws_opts(opts, q.string(&["path"]), q.string(&["host"]));
        }
        put_str(opts, "network", Some(network));
    }
    Ok(d)
}

#[cfg(test)]
mod tests {
    use crate::decode::try_decode;
    use crate::model::ProxyKind;
    use serde_json::json;

    #[test]
    fn minimal_link() {
        let d = try_decode("trojan://secret@5.6.7.8:443#A").unwrap();
        assert_eq!(d.kind, ProxyKind::Trojan);
        assert_eq!(d.server, "5.6.7.8");
        assert_eq!(d.port, 443);
        assert_eq!(d.credential.as_deref(), Some("secret"));
        assert_eq!(d.name, "A");
    }

    #[test]
    fn fallback_name_and_params() {
        let d = try_decode("trojan://p%23w@t.example:8443?peer=s.example&allowInsecure=1&type=ws&path=%2Fx").unwrap();
        assert_eq!(d.name, "Trojan-t.example:8443");
        assert_eq!(d.credential.as_deref(), Some("p#w"));
        assert_eq!(d.option_str("sni"), Some("s.example"));
        assert!(d.option_flag("skip-cert-verify"));
        assert_eq!(d.option_str("network"), Some("ws"));
        assert_eq!(d.options["ws-opts"], json!({ "path": "/x" }));
    }

    #[test]
    fn requires_password_and_port() {
        assert!(try_decode("trojan://@h:443").is_err());
        assert!(try_decode("trojan://pw@h").is_err());
        assert!(try_decode("trojan://pw@h:abc").is_err());
    }
}
