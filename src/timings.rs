use log::{error, warn};
use serde_json::Value;

use crate::emitter::Sample;
use crate::extract::KEY_DELIMITER;
use crate::sink::MetricKind;
use crate::snapshot::{TimingBlock, Tree};
use crate::tags::{self, TagMap, TagSchema};

/// Nanoseconds → milliseconds, the unit every vitess timing is stored in
/// versus the unit we report.
pub fn ns_to_ms(ns: f64) -> f64 {
    ns / 1_000_000.0
}

/// `FOO_BAR` → `FooBar`. Only keys that are entirely uppercase and
/// underscores are rewritten; anything else passes through untouched.
pub fn upper_snake_to_camel(key: &str) -> String {
    let is_upper_snake = !key.is_empty()
        && key.chars().all(|c| c.is_ascii_uppercase() || c == '_');
    if !is_upper_snake {
        return key.into();
    }

    key.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect()
}

/// Decomposes one timing block into its flat sub-metrics:
///
///   1. `<base>TotalCount` / `<base>TotalTime` counters (time ns→ms)
///   2. per histogram bucket, `Count` and `Time` counters — either
///      tagged (bucket label decomposed against `schema`, name stays
///      `<base>`) or untagged (`<base><CamelLabel>Count` etc.)
///   3. with `include_buckets`, one gauge per sub-bucket,
///      `<base>HistogramTime.<label>`, numeric nanosecond labels
///      rewritten as integer milliseconds
///
/// Buckets with zero observations still produce their zero samples; no
/// suppression happens here.
pub fn decompose(
    block: &TimingBlock,
    base_name: &str,
    schema: Option<&TagSchema>,
    include_buckets: bool,
) -> Vec<Sample> {
    let mut samples = vec![
        Sample {
            name: format!("{base_name}TotalCount"),
            value: block.count as f64,
            kind: MetricKind::Counter,
            tags: TagMap::new(),
        },
        Sample {
            name: format!("{base_name}TotalTime"),
            value: ns_to_ms(block.time as f64),
            kind: MetricKind::Counter,
            tags: TagMap::new(),
        },
    ];

    for (label, bucket) in block.buckets() {
        let (bucket_tags, prefix) = match schema {
            Some(schema) => match tags::extract(label, KEY_DELIMITER, schema) {
                Ok(t) => (t, base_name.to_owned()),
                Err(e) => {
                    error!("skipping '{base_name}' histogram bucket: {e}");
                    continue;
                }
            },
            None => (
                TagMap::new(),
                format!("{base_name}{}", upper_snake_to_camel(label)),
            ),
        };

        push_member(&mut samples, bucket, "Count", &prefix, &bucket_tags, false);
        push_member(&mut samples, bucket, "Time", &prefix, &bucket_tags, true);

        if include_buckets {
            samples.extend(bucket_detail(bucket, base_name, &bucket_tags));
        }
    }

    samples
}

/// One `Count`/`Time` counter out of a bucket object. A missing or
/// non-numeric member skips that sample only.
fn push_member(
    samples: &mut Vec<Sample>,
    bucket: &Tree,
    member: &str,
    prefix: &str,
    tags: &TagMap,
    convert: bool,
) {
    let Some(value) = bucket.get(member).and_then(Value::as_f64) else {
        warn!("bucket under '{prefix}' has no numeric '{member}' member");
        return;
    };
    samples.push(Sample {
        name: format!("{prefix}{member}"),
        value: if convert { ns_to_ms(value) } else { value },
        kind: MetricKind::Counter,
        tags: tags.clone(),
    });
}

/// The per-sub-bucket detail gauges. Every member of the bucket object
/// is reported, with the literal `Time` member unit-converted and
/// all-digit labels reinterpreted as nanosecond bounds and rewritten in
/// integer milliseconds.
fn bucket_detail(bucket: &Tree, base_name: &str, tags: &TagMap) -> Vec<Sample> {
    let mut samples = Vec::with_capacity(bucket.len());
    for (label, raw) in bucket {
        let Some(mut value) = raw.as_f64() else {
            continue;
        };
        if label == "Time" {
            value = ns_to_ms(value);
        }

        let label = match label.parse::<i64>() {
            Ok(ns) => (ns / 1_000_000).to_string(),
            Err(_) => label.clone(),
        };

        samples.push(Sample {
            name: format!("{base_name}HistogramTime.{label}"),
            value,
            kind: MetricKind::Gauge,
            tags: tags.clone(),
        });
    }
    samples
}
