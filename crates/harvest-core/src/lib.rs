//! # harvest-core: subscription decoding and resolution
//!
//! Turns the raw text that proxy subscriptions publish into one canonical
//! record shape ([`ProxyDescriptor`]) and folds the records from many sources
//! into a duplicate-free, uniquely named collection.
//!
//! ## Pipeline
//! `blob` -> [`sniff`] -> [`decode`] (one call per candidate line) ->
//! [`Deduplicator`] -> [`sanitize`] -> [`NameResolver`] -> [`Aggregator`]
//!
//! Everything in this crate is synchronous and owns its state; the only
//! async seam is [`ContentRetriever`], implemented by the binary.
//!
//! ## Modules
//! - [`model`]: descriptor and kind types
//! - [`decode`]: per-scheme URI decoders behind a closed dispatch
//! - [`names`]: display name sanitization and uniqueness
//! - [`dedup`]: identity-based deduplication
//! - [`aggregate`]: the per-run fold over all sources
//! - [`sniff`]: blob format detection (Clash YAML / base64 / plain)
//! - [`source`]: retrieval seam and ordered source collection

#![warn(missing_docs)]

pub mod aggregate;
pub mod b64;
pub mod decode;
pub mod dedup;
pub mod error;
pub mod model;
pub mod names;
pub mod sniff;
pub mod source;

pub use aggregate::{aggregate, Aggregated, Aggregator, SourceReport};
pub use decode::{decode, try_decode, Scheme};
pub use dedup::{Deduplicator, IdentityKey};
pub use error::{DecodeError, FetchError, HarvestError};
pub use model::{ProxyDescriptor, ProxyKind, TransportOptions};
pub use names::{ensure_unique, sanitize, NameResolver};
pub use sniff::{sniff, ContentFormat, SourceContent};
pub use source::{collect_sources, ContentRetriever, Source};
