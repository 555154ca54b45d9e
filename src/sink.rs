use std::io::Write;

use chrono::{DateTime, Utc};

use crate::error::{AgentError, Result};

/// Counter vs. gauge, collectd's two value types we use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
        }
    }
}

/// One fully rendered sample, ready for the metrics sink.
#[derive(Debug, Clone)]
pub struct MetricRecord {
    pub plugin: String,
    pub plugin_instance: String,
    pub kind: MetricKind,
    /// Canonical identity, `<plugin>.<instance>.<name>[k=v,...]`.
    pub type_instance: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// Where rendered records go. The console sink stands in for collectd
/// when running from the command line; the memory sink records
/// everything for assertions.
#[derive(Debug)]
pub enum Sink {
    Console,
    Memory(Vec<MetricRecord>),
}

impl Sink {
    /// Synchronous dispatch of one record. Failures propagate to the
    /// poll loop; the sink never retries.
    pub fn dispatch(&mut self, record: MetricRecord) -> Result<()> {
        match self {
            Self::Console => writeln!(
                std::io::stdout(),
                "{}  {:<7} {} = {}",
                record.timestamp.format("%H:%M:%S"),
                record.kind.as_str(),
                record.type_instance,
                record.value
            )
            .map_err(|e| AgentError::Sink(e.to_string())),
            Self::Memory(records) => {
                records.push(record);
                Ok(())
            }
        }
    }

    /// Everything dispatched so far (memory sink only).
    pub fn records(&self) -> &[MetricRecord] {
        match self {
            Self::Console => &[],
            Self::Memory(records) => records,
        }
    }
}
