//! The per-run fold over all sources.
//!
//! For every source, in order: sniff the blob, decode each candidate line,
//! drop identity duplicates, sanitize the advertised name and make it unique.
//! [`Aggregator::finish`] runs a last name sweep over the merged collection.
//!
//! One [`Aggregator`] is one run. It owns its dedup set, its name resolver
//! and its output; nothing is shared between runs.

use serde::Serialize;
use tracing::{debug, info, trace};

use crate::decode::{is_candidate, try_decode};
use crate::dedup::Deduplicator;
use crate::error::HarvestError;
use crate::model::ProxyDescriptor;
use crate::names::{ensure_unique, sanitize, NameResolver};
use crate::sniff::{sniff, ContentFormat, SourceContent};

/// Counters for one processed source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    /// Source address or label.
    pub label: String,
    /// Detected blob format.
    pub format: ContentFormat,
    /// Candidate lines (or structured records) seen.
    pub candidates: usize,
    /// Candidates that decoded.
    pub decoded: usize,
    /// Candidates rejected by the decoder.
    pub malformed: usize,
    /// Decoded descriptors dropped as identity duplicates.
    pub duplicates: usize,
    /// Descriptors added to the collection.
    pub admitted: usize,
}

impl SourceReport {
    fn new(label: &str, format: ContentFormat) -> Self {
        Self {
            label: label.to_string(),
            format,
            candidates: 0,
            decoded: 0,
            malformed: 0,
            duplicates: 0,
            admitted: 0,
        }
    }
}

/// Result of a finished run.
#[derive(Debug, Clone)]
pub struct Aggregated {
    /// Admitted descriptors in admission order, names unique.
    pub descriptors: Vec<ProxyDescriptor>,
    /// One report per source, in processing order.
    pub reports: Vec<SourceReport>,
}

/// Accumulates descriptors from sources processed strictly in order.
#[derive(Debug, Default)]
pub struct Aggregator {
    dedup: Deduplicator,
    names: NameResolver,
    admitted: Vec<ProxyDescriptor>,
    reports: Vec<SourceReport>,
}

impl Aggregator {
    /// Fresh run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sniff and fold one raw blob.
    pub fn push_source(&mut self, label: &str, blob: &str) -> SourceReport {
        match sniff(blob) {
            SourceContent::Structured(records) => {
                self.push_descriptors(label, ContentFormat::Clash, records)
            }
            SourceContent::Lines { format, text } => {
                let mut report = SourceReport::new(label, format);
                for line in text.lines().map(str::trim) {
                    if !is_candidate(line) {
                        continue;
                    }
                    report.candidates += 1;
                    match try_decode(line) {
                        Ok(d) => {
                            report.decoded += 1;
                            self.admit(d, &mut report);
                        }
                        Err(e) => {
                            report.malformed += 1;
                            trace!(source = label, error = %e, "line rejected");
                        }
                    }
                }
                self.record(report)
            }
        }
    }

    /// Fold already-built descriptors (structured records).
    pub fn push_descriptors(
        &mut self,
        label: &str,
        format: ContentFormat,
        descriptors: Vec<ProxyDescriptor>,
    ) -> SourceReport {
        let mut report = SourceReport::new(label, format);
        report.candidates = descriptors.len();
        report.decoded = descriptors.len();
        for d in descriptors {
            self.admit(d, &mut report);
        }
        self.record(report)
    }

    fn admit(&mut self, mut d: ProxyDescriptor, report: &mut SourceReport) {
        if !self.dedup.admit(&d) {
            report.duplicates += 1;
            return;
        }
        let base = sanitize(&d.name).unwrap_or_else(|| d.base_name_fallback());
        d.name = self.names.resolve(&base);
        report.admitted += 1;
        self.admitted.push(d);
    }

    fn record(&mut self, report: SourceReport) -> SourceReport {
        debug!(
            source = %report.label,
            format = ?report.format,
            candidates = report.candidates,
            decoded = report.decoded,
            malformed = report.malformed,
            duplicates = report.duplicates,
            admitted = report.admitted,
            "source aggregated"
        );
        self.reports.push(report.clone());
        report
    }

    /// Descriptors admitted so far.
    pub fn descriptors(&self) -> &[ProxyDescriptor] {
        &self.admitted
    }

    /// Reports for the sources pushed so far.
    pub fn reports(&self) -> &[SourceReport] {
        &self.reports
    }

    /// Number of admitted descriptors.
    pub fn len(&self) -> usize {
        self.admitted.len()
    }

    /// Nothing admitted yet.
    pub fn is_empty(&self) -> bool {
        self.admitted.is_empty()
    }

    /// Final name sweep; fails when no source produced a descriptor.
    pub fn finish(self) -> Result<Aggregated, HarvestError> {
        let Self {
            mut admitted,
            reports,
            ..
        } = self;
        if admitted.is_empty() {
            return Err(HarvestError::NoDescriptors {
                sources: reports.len(),
            });
        }
        let renamed = ensure_unique(&mut admitted);
        if renamed > 0 {
            debug!(renamed, "final name sweep");
        }
        info!(
            sources = reports.len(),
            descriptors = admitted.len(),
            "aggregation finished"
        );
        Ok(Aggregated {
            descriptors: admitted,
            reports,
        })
    }

    /// Aggregate one blob on its own, for per-source listings.
    ///
    /// Unlike [`Aggregator::finish`] an empty source is not an error.
    pub fn per_source(label: &str, blob: &str) -> (Vec<ProxyDescriptor>, SourceReport) {
        let mut one = Self::new();
        let report = one.push_source(label, blob);
        (one.admitted, report)
    }
}

/// Aggregate raw blobs, processed in order, into one collection.
pub fn aggregate<S: AsRef<str>>(blobs: &[S]) -> Result<Vec<ProxyDescriptor>, HarvestError> {
    let mut agg = Aggregator::new();
    for (idx, blob) in blobs.iter().enumerate() {
        agg.push_source(&format!("source-{}", idx + 1), blob.as_ref());
    }
    agg.finish().map(|a| a.descriptors)
}
