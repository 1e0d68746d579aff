//! Display name normalization and uniqueness.

use std::collections::{HashMap, HashSet};

use crate::model::ProxyDescriptor;

/// Longest name [`sanitize`] will return, in characters.
pub const MAX_NAME_CHARS: usize = 80;

/// Normalize an advertised name for display.
///
/// Whitespace becomes a plain space, control characters and anything outside
/// the allow-list (ASCII alphanumerics, CJK ideographs, `- _ . [ ] ( ) : / |`
/// and space) are dropped, space runs collapse, and trailing `" (N)"`
/// counters left by earlier runs are stripped. The result is at most
/// [`MAX_NAME_CHARS`] characters; `None` when nothing survives.
///
/// `sanitize(sanitize(x)) == sanitize(x)` for every input.
pub fn sanitize(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        let c = if c.is_whitespace() { ' ' } else { c };
        if c.is_control() || !is_allowed(c) {
            continue;
        }
        if c == ' ' && (out.is_empty() || out.ends_with(' ')) {
            continue;
        }
        out.push(c);
    }

    let mut name = out.trim_end().to_string();
    loop {
        let mut next = name.as_str();
        while let Some(stripped) = strip_counter_suffix(next) {
            next = stripped.trim_end();
        }
        let next: String = next.chars().take(MAX_NAME_CHARS).collect();
        let next = next.trim_end().to_string();
        if next == name {
            break;
        }
        name = next;
    }
    (!name.is_empty()).then_some(name)
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '-' | '_' | '.' | ' ' | '[' | ']' | '(' | ')' | ':' | '/' | '|')
        || matches!(c, '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '\u{F900}'..='\u{FAFF}')
}

/// `"name (12)"` -> `"name"`.
fn strip_counter_suffix(s: &str) -> Option<&str> {
    let inner = s.strip_suffix(')')?;
    let open = inner.rfind(" (")?;
    let digits = &inner[open + 2..];
    (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())).then(|| &s[..open])
}

/// Hands out names that are unique within one instance.
///
/// The first request for a base name gets it unchanged (unless an earlier
/// suffixed name already took it); later requests get `"{base}-{n}"` with a
/// per-base counter that only moves forward.
#[derive(Debug, Default, Clone)]
pub struct NameResolver {
    seen: HashSet<String>,
    counters: HashMap<String, usize>,
}

impl NameResolver {
    /// Empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a name derived from `base` that this resolver has not emitted.
    pub fn resolve(&mut self, base: &str) -> String {
        let counter = self.counters.entry(base.to_string()).or_insert(0);
        let name = if *counter == 0 && !self.seen.contains(base) {
            base.to_string()
        } else {
            loop {
                *counter += 1;
                let candidate = format!("{base}-{counter}");
                if !self.seen.contains(&candidate) {
                    break candidate;
                }
            }
        };
        self.seen.insert(name.clone());
        name
    }

    /// Whether `name` was already emitted.
    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains(name)
    }

    /// Number of names emitted.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// True before the first [`NameResolver::resolve`].
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Final sweep: rename any descriptor whose name repeats an earlier one.
///
/// Returns how many descriptors were renamed.
pub fn ensure_unique(descriptors: &mut [ProxyDescriptor]) -> usize {
    let mut resolver = NameResolver::new();
    let mut renamed = 0;
    for d in descriptors.iter_mut() {
        let name = resolver.resolve(&d.name);
        if name != d.name {
            d.name = name;
            renamed += 1;
        }
    }
    renamed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProxyKind;

    #[test]
    fn strips_disallowed_and_collapses() {
        assert_eq!(sanitize("  🇭🇰 香港\t 01  ").as_deref(), Some("香港 01"));
        assert_eq!(sanitize("a\u{0007}b\nc").as_deref(), Some("ab c"));
        assert_eq!(sanitize("US|LA [v2] (x):1/2_a.b-c").as_deref(), Some("US|LA [v2] (x):1/2_a.b-c"));
        assert_eq!(sanitize("日本★東京").as_deref(), Some("日本東京"));
    }

    #[test]
    fn empty_results_are_none() {
        assert_eq!(sanitize(""), None);
        assert_eq!(sanitize("   "), None);
        assert_eq!(sanitize("🚀🚀"), None);
    }

    #[test]
    fn trailing_counters_are_stripped() {
        assert_eq!(sanitize("Node (1)").as_deref(), Some("Node"));
        assert_eq!(sanitize("Node (1) (22)").as_deref(), Some("Node"));
        assert_eq!(sanitize("Node (x)").as_deref(), Some("Node (x)"));
        assert_eq!(sanitize("Node(1)").as_deref(), Some("Node(1)"));
        assert_eq!(sanitize(" (3)").as_deref(), Some("(3)"));
    }

    #[test]
    fn truncates_to_limit() {
        let long = "a".repeat(200);
        assert_eq!(sanitize(&long).map(|s| s.chars().count()), Some(MAX_NAME_CHARS));
        let cjk = "节".repeat(100);
        assert_eq!(sanitize(&cjk).map(|s| s.chars().count()), Some(MAX_NAME_CHARS));
    }

    #[test]
    fn truncation_never_leaves_trailing_space_or_counter() {
        let raw = format!("{} (7)x", "b".repeat(MAX_NAME_CHARS - 4));
        let once = sanitize(&raw).unwrap();
        assert_eq!(sanitize(&once).as_deref(), Some(once.as_str()));
        assert!(!once.ends_with(' '));
        assert_eq!(once, "b".repeat(MAX_NAME_CHARS - 4));
    }

    #[test]
    fn resolver_suffixes_repeats() {
        let mut r = NameResolver::new();
        assert_eq!(r.resolve("Proxy"), "Proxy");
        assert_eq!(r.resolve("Proxy"), "Proxy-1");
        assert_eq!(r.resolve("Proxy"), "Proxy-2");
        assert_eq!(r.len(), 3);
        assert!(r.contains("Proxy-1"));
    }

    #[test]
    fn resolver_skips_names_taken_by_other_bases() {
        let mut r = NameResolver::new();
        assert_eq!(r.resolve("Proxy-1"), "Proxy-1");
        assert_eq!(r.resolve("Proxy"), "Proxy");
        assert_eq!(r.resolve("Proxy"), "Proxy-2");
        assert_eq!(r.resolve("Proxy-2"), "Proxy-2-1");
    }

    #[test]
    fn ensure_unique_renames_later_repeats() {
        let mk = |name: &str, port| {
            ProxyDescriptor::new(ProxyKind::Trojan, "h", port)
                .unwrap()
                .with_name(Some(name.to_string()))
        };
        let mut ds = vec![mk("A", 1), mk("B", 2), mk("A", 3)];
        assert_eq!(ensure_unique(&mut ds), 1);
        let names: Vec<_> = ds.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["A", "B", "A-1"]);
        assert_eq!(ensure_unique(&mut ds), 0);
    }
}
