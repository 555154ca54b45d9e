use super::{Decl, Transform, ValueDecl};
use crate::config::CollectorOptions;
use crate::sink::MetricKind::{Counter, Gauge};
use crate::tags::TagSchema;

const HEALTHCHECK: &TagSchema = &["keyspace", "shard", "type"];
const TYPE_ONLY: &TagSchema = &["type"];
const TABLE_ONLY: &TagSchema = &["table"];
const TABLE_TYPE: &TagSchema = &["table", "type"];
const USER_TABLE: &TagSchema = &["table", "user", "type"];
const USER_TX: &TagSchema = &["user", "type"];
const STREAMLOG: &TagSchema = &["log"];
const STREAMLOG_SUB: &TagSchema = &["log", "subscriber"];
const ACL: &TagSchema = &["table", "plan", "id", "user"];

/// Everything we flatten out of a vttablet vars snapshot, with the
/// optional families resolved from the toggles up front.
pub fn declarations(options: &CollectorOptions) -> Vec<Decl> {
    let mut decls = vec![
        // Current connections and total accepted.
        Decl::Value(ValueDecl::new("ConnAccepted", Counter)),
        Decl::Value(ValueDecl::new("ConnCount", Gauge)),
        // Health. TabletState maps to SERVING (2), NOT_SERVING (0, 1, 3)
        // or SHUTTING_DOWN (4); TabletType is reported as an IsMaster flag.
        Decl::Value(ValueDecl::new("TabletState", Gauge)),
        Decl::Value(ValueDecl {
            alt_name: Some("IsMaster"),
            transform: Transform::MasterFlag,
            ..ValueDecl::new("TabletType", Gauge)
        }),
        Decl::Value(ValueDecl::tagged("HealthcheckErrors", Counter, HEALTHCHECK)),
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
    ];

    // Connection pool usage.
    for pool in ["Conn", "AppConn", "DbaConn", "StreamConn", "Transaction"] {
        decls.extend(pool_declarations(pool));
    }

    // Histogram of result sizes returned to user queries.
    if options.include_results_histogram {
        decls.push(Decl::BucketHistogram { field: "Results" });
    }

    // Error modes of the tablet itself.
    for field in ["Errors", "InfoErrors", "InternalErrors", "Kills"] {
        decls.push(Decl::Value(ValueDecl::tagged(field, Counter, TYPE_ONLY)));
    }

    // Query counts, rows, failures, and times, all broken down by table.
    for field in ["QueryCounts", "QueryErrorCounts", "QueryRowCounts"] {
        decls.push(Decl::Value(ValueDecl::tagged(field, Counter, TABLE_TYPE)));
    }
    decls.push(Decl::Value(ValueDecl {
        alt_name: Some("QueryTimes"),
        transform: Transform::NsToMs,
        ..ValueDecl::tagged("QueryTimesNs", Counter, TABLE_TYPE)
    }));

    // information_schema's view of table sizes.
    for field in ["DataFree", "DataLength", "IndexLength", "TableRows"] {
        decls.push(Decl::Value(ValueDecl::tagged(field, Gauge, TABLE_ONLY)));
    }

    // Per-user query and transaction activity.
    decls.push(Decl::Value(ValueDecl::tagged(
        "UserTableQueryCount",
        Counter,
        USER_TABLE,
    )));
    decls.push(Decl::Value(ValueDecl {
        alt_name: Some("UserTableQueryTime"),
        transform: Transform::NsToMs,
        ..ValueDecl::tagged("UserTableQueryTimesNs", Counter, USER_TABLE)
    }));
    decls.push(Decl::Value(ValueDecl::tagged(
        "UserTransactionCount",
        Counter,
        USER_TX,
    )));
    decls.push(Decl::Value(ValueDecl {
        alt_name: Some("UserTransactionTime"),
        transform: Transform::NsToMs,
        ..ValueDecl::tagged("UserTransactionTimesNs", Counter, USER_TX)
    }));

    // Execution-layer timings. MySQL is raw execution time; Queries is
    // the same work including tablet overhead; Waits tracks consolidated
    // identical queries waiting on a connection.
    for field in ["MySQL", "Queries", "Transactions", "Waits"] {
        decls.push(Decl::Timing { field, schema: None });
    }
    if options.include_reparent_timings {
        decls.push(Decl::Timing { field: "ExternalReparents", schema: None });
    }
    if options.include_per_user_timings {
        for field in ["MysqlAllPrivs", "MysqlApp", "MysqlDba"] {
            decls.push(Decl::Timing { field, schema: None });
        }
    }

    // Query plan cache usage.
    decls.push(Decl::Value(ValueDecl {
        alt_name: Some("QueryPlanCacheCapacity"),
        ..ValueDecl::new("QueryCacheCapacity", Gauge)
    }));
    decls.push(Decl::Value(ValueDecl {
        alt_name: Some("QueryPlanCacheLength"),
        ..ValueDecl::new("QueryCacheLength", Gauge)
    }));

    // Stream log delivery.
    if options.include_streamlog_stats {
        decls.push(Decl::Value(ValueDecl::tagged(
            "StreamlogSend",
            Counter,
            STREAMLOG,
        )));
        decls.push(Decl::Value(ValueDecl::tagged(
            "StreamlogDelivered",
            Counter,
            STREAMLOG_SUB,
        )));
        decls.push(Decl::Value(ValueDecl::tagged(
            "StreamlogDeliveryDroppedMessages",
            Counter,
            STREAMLOG_SUB,
        )));
    }

    // Table ACL outcomes; super users are exempt and tracked separately.
    if options.include_acl_stats {
        for field in ["TableACLAllowed", "TableACLDenied", "TableACLPseudoDenied"] {
            decls.push(Decl::Value(ValueDecl::tagged(field, Counter, ACL)));
        }
        decls.push(Decl::Value(ValueDecl::new("TableACLExemptCount", Counter)));
    }

    decls
}

/// The gauge/counter quartet every connection pool exports.
fn pool_declarations(pool: &str) -> Vec<Decl> {
    vec![
        Decl::Value(ValueDecl::new(format!("{pool}PoolAvailable"), Gauge)),
        Decl::Value(ValueDecl::new(format!("{pool}PoolCapacity"), Gauge)),
        Decl::Value(ValueDecl::new(format!("{pool}PoolWaitCount"), Counter)),
        Decl::Value(ValueDecl {
            transform: Transform::NsToMs,
            ..ValueDecl::new(format!("{pool}PoolWaitTime"), Counter)
        }),
    ]
}
