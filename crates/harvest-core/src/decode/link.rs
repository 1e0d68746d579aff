//! Generic `userinfo@host:port?query#fragment` splitting shared by the
//! URL-shaped schemes.

use super::query::{unescape, Query};
use crate::error::DecodeError;

/// A link body (scheme prefix already removed), split into its parts.
#[derive(Debug)]
pub(crate) struct Link<'a> {
    /// Raw (still escaped) userinfo before the last `@`.
    pub userinfo: Option<&'a str>,
    /// Host with IPv6 brackets removed.
    pub host: &'a str,
    pub port: Option<u16>,
    pub query: Query,
    /// Percent-decoded, trimmed fragment; `None` when empty.
    pub name: Option<String>,
}

impl<'a> Link<'a> {
    pub(crate) fn parse(body: &'a str) -> Result<Self, DecodeError> {
        Self::split(body, false)
    }

    /// Like [`Link::parse`] but tolerates an empty authority, for schemes
    /// that may carry their address in an `endpoint=host:port` parameter.
    pub(crate) fn parse_relaxed(body: &'a str) -> Result<Self, DecodeError> {
        Self::split(body, true)
    }

    fn split(body: &'a str, relaxed: bool) -> Result<Self, DecodeError> {
        let (rest, name) = split_fragment(body);
        let (authority, query) = match rest.split_once('?') {
            Some((a, q)) => (a, Query::parse(q)),
            None => (rest, Query::default()),
        };
        let (userinfo, hostport) = match authority.rfind('@') {
            Some(idx) => (Some(&authority[..idx]), &authority[idx + 1..]),
            None => (None, authority),
        };
        // drop any path component
        let hostport = hostport.split('/').next().unwrap_or_default();
        let (host, port) = if relaxed && hostport.trim().is_empty() {
            ("", None)
        } else {
            split_host_port(hostport)?
        };
        Ok(Self {
            userinfo: userinfo.filter(|u| !u.is_empty()),
            host,
            port,
            query,
            name,
        })
    }

    /// Userinfo split at the first `:` into unescaped `(user, password)`.
    pub(crate) fn credentials(&self) -> (Option<String>, Option<String>) {
        match self.userinfo {
            None => (None, None),
            Some(u) => match u.split_once(':') {
                Some((user, pass)) => (non_empty(unescape(user)), non_empty(unescape(pass))),
                None => (non_empty(unescape(u)), None),
            },
        }
    }

    /// Unescaped userinfo as a whole.
    pub(crate) fn secret(&self) -> Option<String> {
        self.userinfo.map(unescape).and_then(non_empty)
    }

    /// Port, or the scheme default.
    pub(crate) fn port_or(&self, default: Option<u16>) -> Result<u16, DecodeError> {
        self.port.or(default).ok_or(DecodeError::MissingPort)
    }

    /// Server address from the authority, filling gaps from `endpoint=`.
    ///
    /// The authority wins for whichever part it carries.
    pub(crate) fn server_or_endpoint(&self) -> Result<(String, u16), DecodeError> {
        match self.port {
            Some(port) if !self.host.is_empty() => return Ok((self.host.to_string(), port)),
            _ => {}
        }
        let Some(endpoint) = self.query.get(&["endpoint"]) else {
            return Err(if self.host.is_empty() {
                DecodeError::MissingHost
            } else {
                DecodeError::MissingPort
            });
        };
        let (host, port) = split_host_port(endpoint)?;
        let host = if self.host.is_empty() { host } else { self.host };
        let port = self.port.or(port).ok_or(DecodeError::MissingPort)?;
        Ok((host.to_string(), port))
    }
}

/// Split at the first `#`: `(before, decoded-name)`.
pub(crate) fn split_fragment(body: &str) -> (&str, Option<String>) {
    match body.split_once('#') {
        Some((rest, frag)) => (rest, non_empty(unescape(frag).trim().to_string())),
        None => (body, None),
    }
}

/// `host`, `host:port`, `[v6]`, `[v6]:port`.
///
/// An empty port after `:` is an error; a missing `:` leaves the port unset
/// so schemes with a default port can fill it in.
pub(crate) fn split_host_port(s: &str) -> Result<(&str, Option<u16>), DecodeError> {
    let s = s.trim();
    let (host, port) = if let Some(rest) = s.strip_prefix('[') {
        let (host, after) = rest
            .split_once(']')
            .ok_or(DecodeError::Malformed("unterminated ipv6 literal"))?;
        match after {
            "" => (host, None),
            p => (
                host,
                Some(
                    p.strip_prefix(':')
                        .ok_or(DecodeError::Malformed("junk after ipv6 literal"))?,
                ),
            ),
        }
    } else {
        match s.rsplit_once(':') {
            Some((h, _)) if h.contains(':') => {
                return Err(DecodeError::Malformed("unbracketed ipv6 literal"))
            }
            Some((h, p)) => (h, Some(p)),
            None => (s, None),
        }
    };
    if host.is_empty() {
        return Err(DecodeError::MissingHost);
    }
    let port = port.map(parse_port).transpose()?;
    Ok((host, port))
}

pub(crate) fn parse_port(p: &str) -> Result<u16, DecodeError> {
    match p.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(DecodeError::InvalidPort(p.to_string())),
        Ok(n) => Ok(n),
    }
}

pub(crate) fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_full_link() {
        let l = Link::parse("pw%40x@h.example:443/path?SNI=s.example#My%20Node").unwrap();
        assert_eq!(l.userinfo, Some("pw%40x"));
        assert_eq!(l.secret().as_deref(), Some("pw@x"));
        assert_eq!(l.host, "h.example");
        assert_eq!(l.port, Some(443));
        assert_eq!(l.query.get(&["sni"]), Some("s.example"));
        assert_eq!(l.name.as_deref(), Some("My Node"));
    }

    #[test]
    fn userinfo_split_on_last_at() {
        let l = Link::parse("a@b@h:1").unwrap();
        assert_eq!(l.userinfo, Some("a@b"));
        assert_eq!(l.host, "h");
    }

    #[test]
    fn ipv6_hosts() {
        assert_eq!(split_host_port("[::1]:443").unwrap(), ("::1", Some(443)));
        assert_eq!(split_host_port("[2001:db8::1]").unwrap(), ("2001:db8::1", None));
        assert!(split_host_port("2001:db8::1:443").is_err());
        assert!(split_host_port("[::1").is_err());
        assert!(split_host_port("[::1]x").is_err());
    }

    #[test]
    fn port_validation() {
        assert_eq!(split_host_port("h").unwrap(), ("h", None));
        assert!(matches!(split_host_port("h:"), Err(DecodeError::InvalidPort(_))));
        assert!(matches!(split_host_port("h:0"), Err(DecodeError::InvalidPort(_))));
        assert!(matches!(split_host_port("h:65536"), Err(DecodeError::InvalidPort(_))));
        assert!(matches!(split_host_port(":80"), Err(DecodeError::MissingHost)));
    }

    #[test]
    fn blank_fragment_is_no_name() {
        assert_eq!(split_fragment("x#%20").1, None);
        assert_eq!(split_fragment("x#").1, None);
        assert_eq!(split_fragment("x").1, None);
    }

    #[test]
    fn endpoint_fallback() {
        let l = Link::parse_relaxed("key@?endpoint=%5B2001%3Adb8%3A%3A1%5D%3A51820").unwrap();
        assert_eq!(l.host, "");
        assert_eq!(l.server_or_endpoint().unwrap(), ("2001:db8::1".to_string(), 51820));

        let l = Link::parse_relaxed("key@h.example?endpoint=other:9").unwrap();
        assert_eq!(l.server_or_endpoint().unwrap(), ("h.example".to_string(), 9));

        let l = Link::parse_relaxed("key@h.example:1?endpoint=other:9").unwrap();
        assert_eq!(l.server_or_endpoint().unwrap(), ("h.example".to_string(), 1));

        let l = Link::parse_relaxed("key@").unwrap();
        assert_eq!(l.server_or_endpoint().unwrap_err(), DecodeError::MissingHost);
        assert!(Link::parse("key@").is_err());
    }

    #[test]
    fn credentials_split() {
        let l = Link::parse("user:p%3Ass@h:1").unwrap();
        assert_eq!(l.credentials(), (Some("user".into()), Some("p:ss".into())));
        let l = Link::parse("token@h:1").unwrap();
        assert_eq!(l.credentials(), (Some("token".into()), None));
    }
}
