//! Content-level deduplication on the identity tuple.

use std::collections::HashSet;

use crate::model::{ProxyDescriptor, ProxyKind};

/// `(kind, server, port, credential-or-empty)`.
///
/// Two descriptors with the same key reach the same endpoint as the same
/// principal; names and other options play no part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    /// Protocol.
    pub kind: ProxyKind,
    /// Server host as decoded.
    pub server: String,
    /// Server port.
    pub port: u16,
    /// Identity secret, empty when the scheme has none.
    pub credential: String,
}

impl ProxyDescriptor {
    /// Identity tuple used by [`Deduplicator`].
    pub fn identity(&self) -> IdentityKey {
        IdentityKey {
            kind: self.kind,
            server: self.server.clone(),
            port: self.port,
            credential: self.credential.clone().unwrap_or_default(),
        }
    }
}

/// Running set of admitted identities.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<IdentityKey>,
}

impl Deduplicator {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` the first time an identity is offered, `false` afterwards.
    pub fn admit(&mut self, descriptor: &ProxyDescriptor) -> bool {
        self.seen.insert(descriptor.identity())
    }

    /// Number of distinct identities admitted.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Nothing admitted yet.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
