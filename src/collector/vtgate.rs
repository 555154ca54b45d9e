use super::{Decl, ValueDecl};
use crate::config::CollectorOptions;
use crate::sink::MetricKind::{Counter, Gauge};
use crate::tags::TagSchema;

const HEALTHCHECK: &TagSchema = &["keyspace", "shard", "type"];
const TYPE_ONLY: &TagSchema = &["type"];
const API: &TagSchema = &["Operation", "Keyspace", "DbType"];
const TABLET_CALL: &TagSchema = &["Operation", "Keyspace", "ShardName", "DbType"];
const BUFFER: &TagSchema = &["Keyspace", "ShardName"];
const BUFFER_REASON: &TagSchema = &["Keyspace", "ShardName", "Reason"];

/// Everything we flatten out of a vtgate vars snapshot. None of the
/// feature toggles gate vtgate fields; the timing-histogram toggle is
/// applied inside timing decomposition.
pub fn declarations(_options: &CollectorOptions) -> Vec<Decl> {
    vec![
        // Current connections and total accepted.
        Decl::Value(ValueDecl::new("ConnAccepted", Counter)),
        Decl::Value(ValueDecl::new("ConnCount", Gauge)),
        // Healthcheck errors and connections per tablet.
        Decl::Value(ValueDecl::tagged("HealthcheckErrors", Counter, HEALTHCHECK)),
        Decl::Value(ValueDecl::tagged(
            "HealthcheckConnections",
            Gauge,
            HEALTHCHECK,
        )),
        // GC stats out of the runtime's memstats block.
        Decl::Value(ValueDecl {
            prefix: "GC.",
            alt_name: Some("CPUFraction"),
            subtree: Some("memstats"),
            ..ValueDecl::new("GCCPUFraction", Gauge)
        }),
        Decl::Value(ValueDecl {
            prefix: "GC.",
            subtree: Some("memstats"),
            ..ValueDecl::new("PauseTotalNs", Gauge)
        }),
        // Should stay at 0 for any keyspace that wants to be sharded.
        Decl::Value(ValueDecl::new(
            "FilteredReplicationUnfriendlyStatementsCount",
            Counter,
        )),
        // Rolling QPS / error rates the server maintains per dimension.
        Decl::Rates { field: "QPSByDbType", tag_name: "DbType" },
        Decl::Rates { field: "QPSByKeyspace", tag_name: "Keyspace" },
        Decl::Rates { field: "QPSByOperation", tag_name: "Operation" },
        Decl::Rates { field: "ErrorsByDbType", tag_name: "DbType" },
        Decl::Rates { field: "ErrorsByKeyspace", tag_name: "Keyspace" },
        Decl::Rates { field: "ErrorsByOperation", tag_name: "Operation" },
        // Subtracting VtgateApi from VttabletCall times shows the
        // overhead vtgate itself adds.
        Decl::Timing { field: "VtgateApi", schema: Some(API) },
        Decl::Value(ValueDecl::tagged("VtgateApiErrorCounts", Counter, API)),
        Decl::Value(ValueDecl::tagged("VtgateInfoErrorCounts", Counter, TYPE_ONLY)),
        Decl::Value(ValueDecl::tagged(
            "VtgateInternalErrorCounts",
            Counter,
            TYPE_ONLY,
        )),
        Decl::Value(ValueDecl::tagged(
            "VttabletCallErrorCount",
            Counter,
            TABLET_CALL,
        )),
        Decl::Timing { field: "VttabletCall", schema: Some(TABLET_CALL) },
        // Master-buffering activity per shard.
        Decl::Value(ValueDecl::tagged("BufferUtilizationSum", Counter, BUFFER)),
        Decl::Value(ValueDecl::tagged("BufferStarts", Counter, BUFFER)),
        Decl::Value(ValueDecl::tagged("BufferRequestsBuffered", Counter, BUFFER)),
        Decl::Value(ValueDecl::tagged("BufferRequestsDrained", Counter, BUFFER)),
        Decl::Value(ValueDecl::tagged(
            "BufferRequestsEvicted",
            Counter,
            BUFFER_REASON,
        )),
        Decl::Value(ValueDecl::tagged(
            "BufferRequestsSkipped",
            Counter,
            BUFFER_REASON,
        )),
    ]
}

#[cfg(test)]
mod tests {
    use crate::collector::CollectorKind;
    use crate::config::CollectorOptions;
    use crate::sink::{MetricKind, MetricRecord, Sink};
    use crate::snapshot::Snapshot;
    use serde_json::json;

    fn collect(snapshot: serde_json::Value) -> Vec<MetricRecord> {
        let collector =
            CollectorKind::Vtgate.build(&CollectorOptions::default());
        let snapshot = Snapshot::from_value(snapshot).unwrap();
        let mut sink = Sink::Memory(Vec::new());
        collector.collect(&snapshot, &mut sink).unwrap();
        sink.records().to_vec()
    }

    fn find<'a>(records: &'a [MetricRecord], id: &str) -> &'a MetricRecord {
        records
            .iter()
            .find(|r| r.type_instance == id)
            .unwrap_or_else(|| panic!("no record '{id}'"))
    }

    #[test]
    fn healthcheck_keys_decompose_into_three_tags() {
        let records = collect(json!({
            "HealthcheckErrors": {"user1.web.replica": 2, "user1.web.rdonly": 0}
        }));
        assert_eq!(records.len(), 2);
        let r = find(
            &records,
            "vitess.vtgate.HealthcheckErrors[keyspace=user1,shard=web,type=replica]",
        );
        assert_eq!(r.value, 2.0);
        assert_eq!(r.kind, MetricKind::Counter);
    }

    #[test]
    fn gc_metrics_come_from_the_memstats_subtree() {
        let records = collect(json!({
            "memstats": {"GCCPUFraction": 0.002, "PauseTotalNs": 7_000_000}
        }));
        assert_eq!(find(&records, "vitess.vtgate.GC.CPUFraction").value, 0.002);
        // PauseTotalNs is reported raw, no unit conversion declared.
        assert_eq!(
            find(&records, "vitess.vtgate.GC.PauseTotalNs").value,
            7_000_000.0
        );
    }

    #[test]
    fn qps_rates_skip_the_aggregate_series() {
        let records = collect(json!({
            "QPSByDbType": {
                "All": [10, 10, 10, 10, 10],
                "primary": [1, 2, 3, 4, 5]
            }
        }));
        assert_eq!(records.len(), 3);
        let one = find(&records, "vitess.vtgate.QPSByDbType.1min[DbType=primary]");
        assert_eq!(one.value, 5.0);
        let five = find(&records, "vitess.vtgate.QPSByDbType.5min[DbType=primary]");
        assert_eq!(five.value, 3.0);
        let fifteen =
            find(&records, "vitess.vtgate.QPSByDbType.15min[DbType=primary]");
        assert_eq!(fifteen.value, 1.0);
    }

    #[test]
    fn api_timing_block_is_fully_decomposed() {
        let records = collect(json!({
            "VtgateApi": {
                "Count": 20,
                "Time": 8_000_000,
                "Histogram": {
                    "Execute.user1.primary": {
                        "500000": 15,
                        "Count": 20,
                        "Time": 8_000_000
                    }
                }
            }
        }));

        assert_eq!(find(&records, "vitess.vtgate.VtgateApiTotalCount").value, 20.0);
        assert_eq!(find(&records, "vitess.vtgate.VtgateApiTotalTime").value, 8.0);
        let tagged = "[DbType=primary,Keyspace=user1,Operation=Execute]";
        assert_eq!(
            find(&records, &format!("vitess.vtgate.VtgateApiCount{tagged}")).value,
            20.0
        );
        // Timing histogram detail is on by default: 500000 ns → "0" ms.
        let detail = find(
            &records,
            &format!("vitess.vtgate.VtgateApiHistogramTime.0{tagged}"),
        );
        assert_eq!(detail.value, 15.0);
        assert_eq!(detail.kind, MetricKind::Gauge);
    }

    #[test]
    fn timing_detail_can_be_toggled_off() {
        let mut options = CollectorOptions::default();
        options.set("IncludeTimingHistograms", "false");
        let collector = CollectorKind::Vtgate.build(&options);
        let snapshot = Snapshot::from_value(json!({
            "VtgateApi": {
                "Count": 1,
                "Time": 0,
                "Histogram": {
                    "Execute.user1.primary": {"500000": 1, "Count": 1, "Time": 0}
                }
            }
        }))
        .unwrap();
        let mut sink = Sink::Memory(Vec::new());
        collector.collect(&snapshot, &mut sink).unwrap();

        assert!(sink
            .records()
            .iter()
            .all(|r| !r.type_instance.contains("HistogramTime")));
    }
}
