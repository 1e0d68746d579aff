//! Error types for decoding, retrieval and aggregation.

use thiserror::Error;

/// Why a single subscription line could not become a descriptor.
///
/// Decoding failures never escape the batch: [`crate::decode`] maps every
/// variant to `None`. The variants exist so tests and trace logs can tell the
/// failure reasons apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The line does not start with any known scheme prefix.
    #[error("unknown scheme")]
    UnknownScheme,

    /// No server host could be extracted.
    #[error("missing host")]
    MissingHost,

    /// No port was given and the scheme has no default.
    #[error("missing port")]
    MissingPort,

    /// The port is not an integer in 1..=65535.
    #[error("invalid port: {0}")]
    InvalidPort(String),

    /// A scheme that requires a secret (password, uuid, key) had none.
    #[error("missing credential")]
    MissingCredential,

    /// A base64 section did not decode.
    #[error("invalid base64")]
    Base64,

    /// A decoded section was not valid UTF-8.
    #[error("invalid utf-8")]
    Utf8,

    /// The VMess JSON body did not parse.
    #[error("json: {0}")]
    Json(String),

    /// The line has the right prefix but the wrong shape.
    #[error("malformed: {0}")]
    Malformed(&'static str),
}

/// Failure to retrieve one source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("http status {0}")]
    Status(u16),

    /// Transport-level failure (DNS, TLS, connect, body read).
    #[error("transport: {0}")]
    Transport(String),

    /// Local file could not be read.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Collection-level failure: no usable output exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HarvestError {
    /// Every source was empty, failed, or contained nothing decodable.
    #[error("no descriptors decoded from {sources} source(s)")]
    NoDescriptors {
        /// How many sources were processed.
        sources: usize,
    },
}
