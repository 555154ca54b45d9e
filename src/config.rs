use log::warn;

use crate::error::{AgentError, Result};

/// Immutable per-process configuration, built once at startup and passed
/// into the poll loop by reference. There is no mutable global state.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Host to fetch the snapshot from.
    pub host: String,
    /// Port on the host. Defaults to the collector's well-known port.
    pub port: u16,
    /// Path of the vars endpoint, normally `/debug/vars`.
    pub path: String,
    /// Seconds between polls. `0` means poll once and exit.
    pub interval: u64,
    /// Forward debug-level diagnostics.
    pub verbose: bool,
    /// Feature toggles consumed by the declaration tables.
    pub options: CollectorOptions,
}

/// Collectd-style feature toggles. Every one defaults to enabled; each
/// maps to a `--set Key=Value` pair on the command line.
#[derive(Debug, Clone, Copy)]
pub struct CollectorOptions {
    pub include_timing_histograms: bool,
    pub include_results_histogram: bool,
    pub include_per_user_timings: bool,
    pub include_streamlog_stats: bool,
    pub include_acl_stats: bool,
    pub include_reparent_timings: bool,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            include_timing_histograms: true,
            include_results_histogram: true,
            include_per_user_timings: true,
            include_streamlog_stats: true,
            include_acl_stats: true,
            include_reparent_timings: true,
        }
    }
}

impl CollectorOptions {
    /// Apply one `Key=Value` option pair. Unknown keys are warned about
    /// and ignored so a shared config block can carry options for both
    /// collector flavours.
    pub fn set(&mut self, key: &str, value: &str) {
        let flag = parse_bool(value);
        match key {
            "IncludeTimingHistograms" => self.include_timing_histograms = flag,
            "IncludeResultsHistogram" => self.include_results_histogram = flag,
            "IncludeTimingsPerUser" => self.include_per_user_timings = flag,
            "IncludeStreamLog" => self.include_streamlog_stats = flag,
            "IncludeACLStats" => self.include_acl_stats = flag,
            "IncludeExternalReparentTimings" => {
                self.include_reparent_timings = flag
            }
            _ => warn!("ignoring unknown option '{key}'"),
        }
    }
}

/// Case-insensitive `"true"`; anything else is false.
pub fn parse_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

/// Split a raw `Key=Value` command-line pair.
pub fn split_option(raw: &str) -> Result<(&str, &str)> {
    raw.split_once('=').ok_or_else(|| {
        AgentError::Config(format!("option '{raw}' is not Key=Value"))
    })
}
