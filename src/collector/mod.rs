pub mod vtgate;
pub mod vttablet;

use std::time::Duration;

use clap::ValueEnum;
use log::{error, warn};
use serde_json::Value;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

use crate::config::CollectorOptions;
use crate::emitter::MetricEmitter;
use crate::error::{AgentError, Result};
use crate::extract;
use crate::provider::SnapshotProvider;
use crate::rates;
use crate::sink::{MetricKind, Sink};
use crate::snapshot::{Snapshot, TimingBlock};
use crate::tags::TagSchema;
use crate::timings::{self, ns_to_ms, upper_snake_to_camel};

/// Plugin name every emitted identity string starts with.
const PLUGIN: &str = "vitess";

// ─── Declarations ────────────────────────────────────────────────

/// How a raw value becomes the number we report.
#[derive(Debug, Clone, Copy)]
pub enum Transform {
    /// Report the number as-is.
    None,
    /// Nanoseconds on the wire, milliseconds out.
    NsToMs,
    /// A textual tablet type rendered as a 0/1 "is master" gauge.
    MasterFlag,
}

impl Transform {
    fn apply(self, raw: &Value) -> Option<f64> {
        match self {
            Self::None => raw.as_f64(),
            Self::NsToMs => raw.as_f64().map(ns_to_ms),
            Self::MasterFlag => raw
                .as_str()
                .map(|s| if s.eq_ignore_ascii_case("master") { 1.0 } else { 0.0 }),
        }
    }
}

/// One flattenable field declaration.
#[derive(Debug, Clone)]
pub struct ValueDecl {
    pub field: String,
    pub kind: MetricKind,
    /// Empty schema means untagged.
    pub schema: &'static TagSchema,
    /// Prepended to the reported name, e.g. `"GC."`.
    pub prefix: &'static str,
    /// Reported under this name instead of the field name.
    pub alt_name: Option<&'static str>,
    pub transform: Transform,
    /// Resolve the field inside this nested object instead of the root.
    pub subtree: Option<&'static str>,
}

impl ValueDecl {
    fn new(field: impl Into<String>, kind: MetricKind) -> Self {
        Self {
            field: field.into(),
            kind,
            schema: &[],
            prefix: "",
            alt_name: None,
            transform: Transform::None,
            subtree: None,
        }
    }

    fn tagged(
        field: impl Into<String>,
        kind: MetricKind,
        schema: &'static TagSchema,
    ) -> Self {
        Self {
            schema,
            ..Self::new(field, kind)
        }
    }
}

/// Everything one collector flavour knows how to flatten, resolved from
/// the feature toggles once at configuration time.
#[derive(Debug, Clone)]
pub enum Decl {
    /// Scalar or compound-keyed mapping via the value extractor.
    Value(ValueDecl),
    /// A timing block via the histogram decomposer.
    Timing {
        field: &'static str,
        schema: Option<&'static TagSchema>,
    },
    /// A rolling-rates family via the rate aggregator.
    Rates {
        field: &'static str,
        tag_name: &'static str,
    },
    /// A standalone bucket histogram (e.g. result-size counts).
    BucketHistogram { field: &'static str },
}

// ─── Collector ───────────────────────────────────────────────────

/// Which monitored server flavour we are pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CollectorKind {
    Vtgate,
    Vttablet,
}

impl CollectorKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Vtgate => "vtgate",
            Self::Vttablet => "vttablet",
        }
    }

    /// Well-known vars port of each server flavour.
    pub fn default_port(self) -> u16 {
        match self {
            Self::Vtgate => 15001,
            Self::Vttablet => 15101,
        }
    }

    pub fn build(self, options: &CollectorOptions) -> Collector {
        let decls = match self {
            Self::Vtgate => vtgate::declarations(options),
            Self::Vttablet => vttablet::declarations(options),
        };
        Collector {
            emitter: MetricEmitter::new(PLUGIN, self.name()),
            include_timing_histograms: options.include_timing_histograms,
            decls,
        }
    }
}

/// A configured collector: the declaration table plus the emitter that
/// renders its samples. Holds no mutable state — every cycle works off
/// the fetched snapshot alone.
#[derive(Debug)]
pub struct Collector {
    emitter: MetricEmitter,
    include_timing_histograms: bool,
    decls: Vec<Decl>,
}

impl Collector {
    /// Runs one poll cycle's worth of flattening against a snapshot.
    ///
    /// A declaration whose field is missing or malformed is skipped for
    /// this cycle only; its siblings still run. Sink failures abort the
    /// cycle and surface to the poll loop.
    pub fn collect(&self, snapshot: &Snapshot, sink: &mut Sink) -> Result<()> {
        for decl in &self.decls {
            let outcome = match decl {
                Decl::Value(d) => self.collect_value(snapshot, d, sink),
                Decl::Timing { field, schema } => {
                    self.collect_timing(snapshot, field, *schema, sink)
                }
                Decl::Rates { field, tag_name } => {
                    self.collect_rates(snapshot, field, tag_name, sink)
                }
                Decl::BucketHistogram { field } => {
                    self.collect_bucket_histogram(snapshot, field, sink)
                }
            };

            match outcome {
                Ok(()) => {}
                Err(AgentError::MissingField(field)) => {
                    warn!("'{field}' not in this snapshot, skipping")
                }
                Err(e @ (AgentError::Json(_) | AgentError::Arity { .. })) => {
                    error!("skipping declaration: {e}")
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn collect_value(
        &self,
        snapshot: &Snapshot,
        decl: &ValueDecl,
        sink: &mut Sink,
    ) -> Result<()> {
        let tree = match decl.subtree {
            Some(name) => snapshot.subtree(name)?,
            None => snapshot.root(),
        };
        let name = match decl.alt_name {
            Some(alt) => format!("{}{alt}", decl.prefix),
            None => format!("{}{}", decl.prefix, decl.field),
        };

        for (tags, raw) in extract::extract_values(tree, &decl.field, decl.schema)? {
            let Some(value) = decl.transform.apply(raw) else {
                warn!("'{}' has a non-numeric entry, skipping it", decl.field);
                continue;
            };
            self.emitter.emit(sink, &name, value, decl.kind, &tags)?;
        }
        Ok(())
    }

    fn collect_timing(
        &self,
        snapshot: &Snapshot,
        field: &str,
        schema: Option<&'static TagSchema>,
        sink: &mut Sink,
    ) -> Result<()> {
        let raw = snapshot
            .root()
            .get(field)
            .ok_or_else(|| AgentError::MissingField(field.into()))?;
        let block = TimingBlock::from_value(raw)?;

        for sample in
            timings::decompose(&block, field, schema, self.include_timing_histograms)
        {
            self.emitter.emit_sample(sink, &sample)?;
        }
        Ok(())
    }

    fn collect_rates(
        &self,
        snapshot: &Snapshot,
        field: &str,
        tag_name: &str,
        sink: &mut Sink,
    ) -> Result<()> {
        let samples = rates::aggregate(
            snapshot.root(),
            field,
            tag_name,
            rates::AGGREGATE_SERIES,
        )?;
        for sample in samples {
            self.emitter.emit_sample(sink, &sample)?;
        }
        Ok(())
    }

    /// A flat bucket-label → count histogram reported as one gauge per
    /// bucket, `<CamelField>Histogram.<label>`. Labels pass through
    /// unchanged here; only a literal `Time` member is unit-converted.
    fn collect_bucket_histogram(
        &self,
        snapshot: &Snapshot,
        field: &str,
        sink: &mut Sink,
    ) -> Result<()> {
        let map = snapshot
            .root()
            .get(field)
            .and_then(Value::as_object)
            .ok_or_else(|| AgentError::MissingField(field.into()))?;

        let base = upper_snake_to_camel(field);
        for (label, raw) in map {
            let Some(mut value) = raw.as_f64() else {
                continue;
            };
            if label == "Time" {
                value = ns_to_ms(value);
            }
            self.emitter.emit(
                sink,
                &format!("{base}Histogram.{label}"),
                value,
                MetricKind::Gauge,
                &crate::tags::TagMap::new(),
            )?;
        }
        Ok(())
    }
}

// ─── Poll loop ───────────────────────────────────────────────────

/// Fetch-decompose-emit, once per tick, forever. A failed fetch logs
/// and skips the whole cycle — nothing partial goes out and nothing is
/// retried; the next tick starts from scratch. Interval `0` polls once
/// and returns, propagating any failure.
pub async fn run(
    collector: &Collector,
    provider: &SnapshotProvider,
    sink: &mut Sink,
    interval_secs: u64,
) -> Result<()> {
    if interval_secs == 0 {
        let snapshot = provider.fetch().await?;
        return collector.collect(&snapshot, sink);
    }

    let ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    let mut ticks = IntervalStream::new(ticker);

    while ticks.next().await.is_some() {
        match provider.fetch().await {
            Ok(snapshot) => {
                if let Err(e) = collector.collect(&snapshot, sink) {
                    error!("cycle aborted: {e}");
                }
            }
            Err(e) => error!("fetch failed, skipping this cycle: {e}"),
        }
    }
    Ok(())
}
