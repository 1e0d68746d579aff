//! Connection seam used by the prober.
//!
//! A probe only needs to know whether a TCP handshake completes, so
//! [`Dialer::connect`] returns `()`: implementations open the connection and
//! drop it before returning.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::TcpStream;

/// Why a connection attempt failed.
#[derive(Debug, Error)]
pub enum DialError {
    /// Resolution or connect failed at the socket layer.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else a custom dialer wants to report.
    #[error("other: {0}")]
    Other(String),
}

/// Opens (and immediately closes) a connection to `host:port`.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Complete a handshake with `host:port`, then release the connection.
    async fn connect(&self, host: &str, port: u16) -> Result<(), DialError>;
}

#[async_trait]
impl<D> Dialer for Box<D>
where
    D: Dialer + ?Sized,
{
    async fn connect(&self, host: &str, port: u16) -> Result<(), DialError> {
        (**self).connect(host, port).await
    }
}

#[async_trait]
impl<D> Dialer for Arc<D>
where
    D: Dialer + ?Sized,
{
    async fn connect(&self, host: &str, port: u16) -> Result<(), DialError> {
        (**self).connect(host, port).await
    }
}

/// Plain TCP handshake through the system resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

#[async_trait]
impl Dialer for TcpDialer {
    async fn connect(&self, host: &str, port: u16) -> Result<(), DialError> {
        let stream = TcpStream::connect((host, port)).await?;
        drop(stream);
        Ok(())
    }
}

/// Dialer backed by a closure, for scripted tests.
///
/// ```
/// use harvest_probe::{DialError, FnDialer};
///
/// let refuse_all = FnDialer::new(|_host: String, _port: u16| async {
///     Err::<(), _>(DialError::Other("refused".into()))
/// });
/// # let _ = refuse_all;
/// ```
pub struct FnDialer<F> {
    inner: Arc<F>,
}

impl<F> FnDialer<F> {
    /// Wrap `f`, which receives an owned host and the port.
    pub fn new(f: F) -> Self {
        Self { inner: Arc::new(f) }
    }
}

impl<F> Clone for FnDialer<F> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

#[async_trait]
impl<F, Fut> Dialer for FnDialer<F>
where
    F: Fn(String, u16) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), DialError>> + Send + 'static,
{
    async fn connect(&self, host: &str, port: u16) -> Result<(), DialError> {
        (self.inner)(host.to_string(), port).await
    }
}
