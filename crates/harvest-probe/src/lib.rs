//! # harvest-probe: reachability probing
//!
//! Times a bare TCP connect to every descriptor's endpoint and keeps the
//! ones that answer within a latency threshold.
//!
//! - [`Dialer`] is the connection seam; [`TcpDialer`] is the real one and
//!   [`FnDialer`] wraps a closure for tests.
//! - [`Prober`] runs probes as tokio tasks, at most `concurrency` at a time.
//! - [`probe_sequential`] and [`probe_blocking`] cover callers without a
//!   runtime.
//!
//! No protocol handshake happens beyond TCP; a reachable descriptor is one
//! whose server accepts a connection.

#![warn(missing_docs)]

pub mod dialer;
pub mod prober;

pub use dialer::{DialError, Dialer, FnDialer, TcpDialer};
pub use prober::{
    probe_blocking, probe_one, probe_sequential, ProbeError, ProbeOutcome, ProbeSettings, Prober,
};
