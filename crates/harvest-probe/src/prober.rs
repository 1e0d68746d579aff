//! Bounded-concurrency reachability probing.
//!
//! Every descriptor gets one timed connect. Descriptors that connect within
//! the threshold survive, annotated with their latency and sorted fastest
//! first; everything else is dropped.

use std::net::{IpAddr, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use harvest_core::ProxyDescriptor;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::dialer::{DialError, Dialer, TcpDialer};

/// Default latency threshold.
pub const DEFAULT_THRESHOLD: Duration = Duration::from_millis(500);
/// Default per-probe connect timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default number of probes in flight.
pub const DEFAULT_CONCURRENCY: usize = 50;

/// Prober tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Slowest accepted connect time (inclusive).
    pub threshold: Duration,
    /// Per-probe connect timeout.
    pub timeout: Duration,
    /// Maximum probes in flight; values below 1 are treated as 1.
    pub concurrency: usize,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            timeout: DEFAULT_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl ProbeSettings {
    fn threshold_ms(&self) -> f64 {
        self.threshold.as_secs_f64() * 1000.0
    }
}

/// Batch-level probe failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// No descriptor connected within the threshold.
    #[error("no reachable descriptors ({probed} probed)")]
    NoReachable {
        /// How many descriptors were probed.
        probed: usize,
    },
}

/// Result of one probe.
#[derive(Debug)]
pub enum ProbeOutcome {
    /// Handshake completed after this long.
    Reachable(Duration),
    /// The connect attempt failed before the timeout.
    Failed(DialError),
    /// The timeout fired first.
    TimedOut,
}

/// Time one connect to `descriptor`'s endpoint.
pub async fn probe_one<D>(dialer: &D, descriptor: &ProxyDescriptor, timeout: Duration) -> ProbeOutcome
where
    D: Dialer + ?Sized,
{
    let start = Instant::now();
    match tokio::time::timeout(timeout, dialer.connect(&descriptor.server, descriptor.port)).await {
        Ok(Ok(())) => ProbeOutcome::Reachable(start.elapsed()),
        Ok(Err(e)) => ProbeOutcome::Failed(e),
        Err(_) => ProbeOutcome::TimedOut,
    }
}

/// Concurrent prober over a shared [`Dialer`].
pub struct Prober<D> {
    dialer: Arc<D>,
    settings: ProbeSettings,
}

impl Prober<TcpDialer> {
    /// Prober using plain TCP connects.
    pub fn tcp(settings: ProbeSettings) -> Self {
        Self::new(TcpDialer, settings)
    }
}

impl<D> Prober<D>
where
    D: Dialer + 'static,
{
    /// Prober over `dialer`.
    pub fn new(dialer: D, settings: ProbeSettings) -> Self {
        Self {
            dialer: Arc::new(dialer),
            settings,
        }
    }

    /// Settings in use.
    pub fn settings(&self) -> &ProbeSettings {
        &self.settings
    }

    /// Probe every descriptor with at most `concurrency` probes in flight.
    ///
    /// Results are gathered in completion order; the returned list holds the
    /// descriptors within the threshold, fastest first, ties in input order.
    pub async fn probe(&self, descriptors: Vec<ProxyDescriptor>) -> Result<Vec<ProxyDescriptor>, ProbeError> {
        let total = descriptors.len();
        let permits = Arc::new(Semaphore::new(self.settings.concurrency.max(1)));
        let mut tasks = JoinSet::new();
        for (idx, descriptor) in descriptors.into_iter().enumerate() {
            let permits = permits.clone();
            let dialer = self.dialer.clone();
            let timeout = self.settings.timeout;
            tasks.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return (idx, descriptor, ProbeOutcome::Failed(DialError::Other("probe cancelled".into())));
                };
                let outcome = probe_one(dialer.as_ref(), &descriptor, timeout).await;
                (idx, descriptor, outcome)
            });
        }

        let mut tally = Tally::new(total, &self.settings);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, descriptor, outcome)) => tally.record(idx, descriptor, outcome),
                Err(e) => {
                    tally.completed += 1;
                    warn!(error = %e, "probe task aborted");
                }
            }
        }
        tally.finish()
    }
}

/// Probe one descriptor at a time with blocking sockets.
///
/// Same filtering and ordering as [`Prober::probe`]; used when no async
/// runtime is available.
pub fn probe_sequential(
    descriptors: Vec<ProxyDescriptor>,
    settings: &ProbeSettings,
) -> Result<Vec<ProxyDescriptor>, ProbeError> {
    let mut tally = Tally::new(descriptors.len(), settings);
    for (idx, descriptor) in descriptors.into_iter().enumerate() {
        let outcome = connect_blocking(&descriptor, settings.timeout);
        tally.record(idx, descriptor, outcome);
    }
    tally.finish()
}

/// Run [`Prober::probe`] over TCP on a private runtime, falling back to
/// [`probe_sequential`] when the runtime cannot be built.
///
/// Must not be called from inside a tokio runtime.
pub fn probe_blocking(
    descriptors: Vec<ProxyDescriptor>,
    settings: &ProbeSettings,
) -> Result<Vec<ProxyDescriptor>, ProbeError> {
    match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt.block_on(Prober::tcp(*settings).probe(descriptors)),
        Err(e) => {
            warn!(error = %e, "probe runtime unavailable, probing sequentially");
            probe_sequential(descriptors, settings)
        }
    }
}

/// One deadline covers resolution and every resolved address.
fn connect_blocking(descriptor: &ProxyDescriptor, timeout: Duration) -> ProbeOutcome {
    let start = std::time::Instant::now();
    let addrs = match resolve_within(&descriptor.server, descriptor.port, timeout) {
        Ok(addrs) => addrs,
        Err(outcome) => return outcome,
    };
    connect_until(&addrs, start, timeout)
}

/// Resolve on a helper thread so a stalled resolver cannot outlive `limit`.
/// IP literals skip the resolver.
fn resolve_within(host: &str, port: u16, limit: Duration) -> Result<Vec<SocketAddr>, ProbeOutcome> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(vec![SocketAddr::new(ip, port)]);
    }
    let (tx, rx) = mpsc::channel();
    let host = host.to_string();
    std::thread::spawn(move || {
        let resolved = (host.as_str(), port)
            .to_socket_addrs()
            .map(|addrs| addrs.collect::<Vec<_>>());
        let _ = tx.send(resolved);
    });
    match rx.recv_timeout(limit) {
        Ok(Ok(addrs)) => Ok(addrs),
        Ok(Err(e)) => Err(ProbeOutcome::Failed(e.into())),
        Err(_) => Err(ProbeOutcome::TimedOut),
    }
}

fn connect_until(addrs: &[SocketAddr], start: std::time::Instant, timeout: Duration) -> ProbeOutcome {
    let mut last = None;
    for addr in addrs {
        let remaining = timeout.saturating_sub(start.elapsed());
        if remaining.is_zero() {
            return ProbeOutcome::TimedOut;
        }
        match TcpStream::connect_timeout(addr, remaining) {
            Ok(stream) => {
                drop(stream);
                return ProbeOutcome::Reachable(start.elapsed());
            }
            Err(e) => last = Some(e),
        }
    }
    match last {
        Some(e) if e.kind() == std::io::ErrorKind::TimedOut => ProbeOutcome::TimedOut,
        Some(e) => ProbeOutcome::Failed(e.into()),
        None => ProbeOutcome::Failed(DialError::Other("no addresses resolved".into())),
    }
}

/// Shared bookkeeping for both probing modes.
struct Tally {
    total: usize,
    completed: usize,
    threshold_ms: f64,
    passed: Vec<(usize, ProxyDescriptor)>,
}

impl Tally {
    fn new(total: usize, settings: &ProbeSettings) -> Self {
        Self {
            total,
            completed: 0,
            threshold_ms: settings.threshold_ms(),
            passed: Vec::new(),
        }
    }

    fn record(&mut self, idx: usize, mut descriptor: ProxyDescriptor, outcome: ProbeOutcome) {
        self.completed += 1;
        let progress = format!("{}/{}", self.completed, self.total);
        match outcome {
            ProbeOutcome::Reachable(elapsed) => {
                descriptor.set_latency_ms(elapsed.as_secs_f64() * 1000.0);
                let latency = descriptor.latency.unwrap_or(f64::INFINITY);
                if latency <= self.threshold_ms {
                    debug!(%progress, name = %descriptor.name, latency_ms = latency, "passed");
                    self.passed.push((idx, descriptor));
                } else {
                    debug!(%progress, name = %descriptor.name, latency_ms = latency, "too slow");
                }
            }
            ProbeOutcome::Failed(e) => {
                debug!(%progress, name = %descriptor.name, error = %e, "connect failed");
            }
            ProbeOutcome::TimedOut => {
                debug!(%progress, name = %descriptor.name, "timed out");
            }
        }
    }

    fn finish(self) -> Result<Vec<ProxyDescriptor>, ProbeError> {
        let Self {
            total, mut passed, ..
        } = self;
        info!(probed = total, passed = passed.len(), "probing finished");
        if passed.is_empty() {
            return Err(ProbeError::NoReachable { probed: total });
        }
        passed.sort_by(|(ia, a), (ib, b)| {
            let la = a.latency.unwrap_or(f64::INFINITY);
            let lb = b.latency.unwrap_or(f64::INFINITY);
            la.total_cmp(&lb).then(ia.cmp(ib))
        });
        Ok(passed.into_iter().map(|(_, d)| d).collect())
    }
}
