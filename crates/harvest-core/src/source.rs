//! Retrieval seam.
//!
//! The core never talks to the network itself; the binary supplies a
//! [`ContentRetriever`] and [`collect_sources`] drives it over the configured
//! addresses.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::FetchError;

/// Fetches the raw blob published at one subscription address.
#[async_trait]
pub trait ContentRetriever: Send + Sync {
    /// Retrieve the body at `address`.
    async fn retrieve(&self, address: &str) -> Result<String, FetchError>;
}

/// One subscription address and what it returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// Address as configured.
    pub address: String,
    /// Retrieved body; empty when retrieval failed.
    pub body: String,
    /// Retrieval error message, if any.
    pub error: Option<String>,
}

impl Source {
    /// Whether retrieval failed.
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Retrieve every address in order.
///
/// A failing source is logged and kept as an empty body so the rest of the
/// run proceeds; the aggregator decides whether anything usable came back.
pub async fn collect_sources<R, S>(retriever: &R, addresses: &[S]) -> Vec<Source>
where
    R: ContentRetriever + ?Sized,
    S: AsRef<str>,
{
    let mut sources = Vec::with_capacity(addresses.len());
    for address in addresses {
        let address = address.as_ref();
        let (body, error) = match retriever.retrieve(address).await {
            Ok(body) => {
                debug!(source = address, bytes = body.len(), "source retrieved");
                (body, None)
            }
            Err(e) => {
                warn!(source = address, error = %e, "source retrieval failed");
                (String::new(), Some(e.to_string()))
            }
        };
        sources.push(Source {
            address: address.to_string(),
            body,
            error,
        });
    }
    sources
}
