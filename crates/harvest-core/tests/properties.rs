use std::collections::HashSet;

use harvest_core::{aggregate, b64, sanitize, try_decode};
use proptest::prelude::*;

const PREFIXES: &[&str] = &[
    "ss://", "vmess://", "trojan://", "vless://", "hysteria2://", "hy2://", "hysteria://",
    "tuic://", "wireguard://", "wg://", "https://", "http://", "socks5://", "socks://",
];

fn any_link() -> impl Strategy<Value = String> {
    (
        prop::sample::select(PREFIXES),
        "[a-zA-Z0-9:@/?&=#%.\\[\\]_+-]{0,64}",
    )
        .prop_map(|(p, rest)| format!("{p}{rest}"))
}

// Property: sanitize is idempotent and bounded
proptest! {
    #[test]
    fn sanitize_is_idempotent(raw in "\\PC{0,120}|[ \\t(0-9)a-z节点🚀]{0,120}") {
        if let Some(once) = sanitize(&raw) {
            prop_assert!(once.chars().count() <= 80);
            prop_assert!(!once.is_empty());
            prop_assert_eq!(sanitize(&once), Some(once.clone()));
        }
    }
}

// Property: decoding never panics and every success is well-formed
proptest! {
    #[test]
    fn decode_is_total_and_well_formed(line in any_link()) {
        if let Ok(d) = try_decode(&line) {
            prop_assert!(!d.server.trim().is_empty());
            prop_assert!(d.port > 0);
            prop_assert!(!d.name.is_empty());
        }
    }

    #[test]
    fn arbitrary_text_never_panics(line in "\\PC{0,200}") {
        let _ = try_decode(&line);
    }

    #[test]
    fn base64_bodies_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..128)) {
        let _ = try_decode(&format!("vmess://{}", b64::encode(&bytes)));
        let _ = try_decode(&format!("ss://{}", b64::encode(&bytes)));
    }
}

// Property: one aggregated collection has distinct identities and names
proptest! {
    #[test]
    fn aggregated_identities_and_names_are_unique(
        entries in prop::collection::vec((0u8..4, 1u16..4, prop::sample::select(&["A", "A-1", "B", "🚀", ""][..])), 1..40),
        split in 0usize..40,
    ) {
        let lines: Vec<String> = entries
            .iter()
            .map(|(pw, port, name)| format!("trojan://pw{pw}@5.6.7.8:{port}#{name}"))
            .collect();
        let split = split.min(lines.len());
        let blobs = [lines[..split].join("\n"), lines[split..].join("\n")];

        let out = aggregate(&blobs).unwrap();
        let ids: HashSet<_> = out.iter().map(|d| d.identity()).collect();
        let names: HashSet<_> = out.iter().map(|d| d.name.as_str()).collect();
        prop_assert_eq!(ids.len(), out.len());
        prop_assert_eq!(names.len(), out.len());

        let distinct: HashSet<_> = entries.iter().map(|(pw, port, _)| (*pw, *port)).collect();
        prop_assert_eq!(out.len(), distinct.len());
    }
}
