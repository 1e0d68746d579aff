//! Query-string access with case-insensitive keys and synonym lookup.

use percent_encoding::percent_decode_str;

/// Parsed `?k=v&...` section of a link.
///
/// Keys are lowercased; values are percent-decoded but `+` is kept literally,
/// since WireGuard and Reality keys are base64 and contain `+`.
#[derive(Debug, Default, Clone)]
pub(crate) struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub(crate) fn parse(raw: &str) -> Self {
        let pairs = raw
            .split('&')
            .filter(|p| !p.is_empty())
            .map(|p| {
                let (k, v) = p.split_once('=').unwrap_or((p, ""));
                (unescape(k).to_ascii_lowercase(), unescape(v))
            })
            .collect();
        Self { pairs }
    }

    /// First non-empty value among `keys`, in the order the keys are listed.
    ///
    /// Priority follows the caller's synonym order, not the order the keys
    /// appear in the link. Within one key the first occurrence wins.
    pub(crate) fn get(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| {
            self.pairs
                .iter()
                .find(|(k, v)| k == key && !v.is_empty())
                .map(|(_, v)| v.as_str())
        })
    }

    pub(crate) fn string(&self, keys: &[&str]) -> Option<String> {
        self.get(keys).map(str::to_string)
    }

    /// Boolean flag; `None` when no synonym is present.
    pub(crate) fn flag(&self, keys: &[&str]) -> Option<bool> {
        self.get(keys).map(is_truthy)
    }

    /// Integer value; unparseable values count as absent.
    pub(crate) fn int(&self, keys: &[&str]) -> Option<i64> {
        self.get(keys).and_then(parse_int_literal)
    }

    /// Comma-separated list, blanks dropped.
    pub(crate) fn list(&self, keys: &[&str]) -> Option<Vec<String>> {
        self.get(keys).map(|v| split_list(v, &[',']))
    }
}

pub(crate) fn unescape(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Truth values: `1`, `true`, `yes`, `on`, case-insensitive.
pub(crate) fn is_truthy(v: &str) -> bool {
    matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Integer literal: decimal, or `0x`/`0o`/`0b` prefixed, optional sign,
/// `_` digit separators allowed.
pub(crate) fn parse_int_literal(v: &str) -> Option<i64> {
    let v = v.trim();
    let (neg, body) = match v.as_bytes().first()? {
        b'-' => (true, &v[1..]),
        b'+' => (false, &v[1..]),
        _ => (false, v),
    };
    let lower = body.to_ascii_lowercase();
    let (radix, digits) = if let Some(d) = lower.strip_prefix("0x") {
        (16, d)
    } else if let Some(d) = lower.strip_prefix("0o") {
        (8, d)
    } else if let Some(d) = lower.strip_prefix("0b") {
        (2, d)
    } else {
        (10, lower.as_str())
    };
    if digits.is_empty()
        || digits.starts_with('_')
        || digits.ends_with('_')
        || !digits.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return None;
    }
    let digits: String = digits.chars().filter(|c| *c != '_').collect();
    let n = i64::from_str_radix(&digits, radix).ok()?;
    Some(if neg { -n } else { n })
}

pub(crate) fn split_list(v: &str, seps: &[char]) -> Vec<String> {
    v.split(|c: char| seps.contains(&c))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_case_insensitive_and_values_unescaped() {
        let q = Query::parse("SNI=a.example&Path=%2Fws%3Fed%3D2048&pbk=ab+c%3D");
        assert_eq!(q.get(&["sni"]), Some("a.example"));
        assert_eq!(q.get(&["path"]), Some("/ws?ed=2048"));
        assert_eq!(q.get(&["pbk"]), Some("ab+c="));
    }

    #[test]
    fn synonym_order_beats_appearance_order() {
        let q = Query::parse("peer=second.example&sni=first.example");
        assert_eq!(q.get(&["sni", "peer"]), Some("first.example"));
        assert_eq!(q.get(&["peer", "sni"]), Some("second.example"));
    }

    #[test]
    fn empty_values_are_absent() {
        let q = Query::parse("sni=&peer=p.example&flag");
        assert_eq!(q.get(&["sni", "peer"]), Some("p.example"));
        assert_eq!(q.flag(&["flag"]), None);
    }

    #[test]
    fn truthiness() {
        for v in ["1", "true", "TRUE", "Yes", "on"] {
            assert!(is_truthy(v), "{v}");
        }
        for v in ["0", "false", "no", "off", "2", ""] {
            assert!(!is_truthy(v), "{v}");
        }
    }

    #[test]
    fn integer_literals() {
        assert_eq!(parse_int_literal("25"), Some(25));
        assert_eq!(parse_int_literal(" -7 "), Some(-7));
        assert_eq!(parse_int_literal("0x1F"), Some(31));
        assert_eq!(parse_int_literal("0o17"), Some(15));
        assert_eq!(parse_int_literal("0b101"), Some(5));
        assert_eq!(parse_int_literal("1_000"), Some(1000));
        assert_eq!(parse_int_literal("abc"), None);
        assert_eq!(parse_int_literal("0x"), None);
        assert_eq!(parse_int_literal(""), None);
        assert_eq!(parse_int_literal("12ms"), None);
    }

    #[test]
    fn lists_split_and_trim() {
        assert_eq!(split_list("1.1.1.1, 8.8.8.8;;9.9.9.9", &[',', ';']), vec!["1.1.1.1", "8.8.8.8", "9.9.9.9"]);
        let q = Query::parse("alpn=h3,h3-29");
        assert_eq!(q.list(&["alpn"]), Some(vec!["h3".to_string(), "h3-29".to_string()]));
    }
}
