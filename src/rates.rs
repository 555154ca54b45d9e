use log::warn;
use serde_json::Value;

use crate::emitter::Sample;
use crate::error::{AgentError, Result};
use crate::sink::MetricKind;
use crate::snapshot::Tree;
use crate::tags::TagMap;

/// The aggregate series name vitess always includes; reporting it next
/// to the per-key series would double-count.
pub const AGGREGATE_SERIES: &str = "all";

/// Trailing window sizes, in poll intervals.
const FIVE: usize = 5;
const FIFTEEN: usize = 15;

/// Reduces a rates field — a map of series key to the rolling
/// per-interval array the server maintains — into 1/5/15-interval
/// average gauges per key, tagged `{tag_name: key}`.
///
/// The 5- and 15-interval averages divide by the full window size even
/// when fewer observations exist. That understates early-lifetime rates
/// but matches what downstream dashboards have always been built
/// against, so it is kept as-is.
pub fn aggregate(
    tree: &Tree,
    field: &str,
    tag_name: &str,
    exclude_key: &str,
) -> Result<Vec<Sample>> {
    let series = tree
        .get(field)
        .and_then(Value::as_object)
        .ok_or_else(|| AgentError::MissingField(field.into()))?;

    let mut samples = Vec::with_capacity(series.len() * 3);
    for (key, values) in series {
        if key.eq_ignore_ascii_case(exclude_key) {
            continue;
        }
        let Some(values) = values.as_array() else {
            warn!("rates series '{field}.{key}' is not an array, skipping");
            continue;
        };
        let values: Vec<f64> =
            values.iter().filter_map(Value::as_f64).collect();
        let Some(&last) = values.last() else {
            warn!("rates series '{field}.{key}' is empty, skipping");
            continue;
        };

        let mut tags = TagMap::new();
        tags.insert(tag_name.into(), key.clone());

        for (suffix, value) in [
            ("1min", last),
            ("5min", trailing_mean(&values, FIVE)),
            ("15min", trailing_mean(&values, FIFTEEN)),
        ] {
            samples.push(Sample {
                name: format!("{field}.{suffix}"),
                value,
                kind: MetricKind::Gauge,
                tags: tags.clone(),
            });
        }
    }
    Ok(samples)
}

/// Sum of the last `window` values divided by the constant `window`,
/// however many values are actually present.
fn trailing_mean(values: &[f64], window: usize) -> f64 {
    let start = values.len().saturating_sub(window);
    values[start..].iter().sum::<f64>() / window as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(v: serde_json::Value) -> Tree {
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn windows_average_over_the_tail() {
        let t = tree(json!({"QPSByKeyspace": {"user1": [1, 2, 3, 4, 5]}}));
        let samples = aggregate(&t, "QPSByKeyspace", "Keyspace", AGGREGATE_SERIES)
            .unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].name, "QPSByKeyspace.1min");
        assert_eq!(samples[0].value, 5.0);
        assert_eq!(samples[1].name, "QPSByKeyspace.5min");
        assert_eq!(samples[1].value, 3.0);
        assert_eq!(samples[2].name, "QPSByKeyspace.15min");
        assert_eq!(samples[2].value, 1.0);
        assert!(samples.iter().all(|s| s.kind == MetricKind::Gauge));
        assert!(samples.iter().all(|s| s.tags["Keyspace"] == "user1"));
    }

    // Known bias, deliberately preserved: a series shorter than the
    // window still divides by the full window constant, so a young
    // server's 5/15-interval rates read low.
    #[test]
    fn short_series_still_divide_by_the_full_window() {
        let t = tree(json!({"QPSByDbType": {"primary": [10]}}));
        let samples =
            aggregate(&t, "QPSByDbType", "DbType", AGGREGATE_SERIES).unwrap();
        assert_eq!(samples[0].value, 10.0); // 1min = last
        assert_eq!(samples[1].value, 2.0); // 10 / 5, not 10 / 1
        assert!((samples[2].value - 10.0 / 15.0).abs() < 1e-12);
    }

    #[test]
    fn aggregate_series_is_excluded_case_insensitively() {
        let t = tree(json!({
            "ErrorsByOperation": {
                "All": [9, 9, 9],
                "all": [9],
                "Execute": [1, 2]
            }
        }));
        let samples =
            aggregate(&t, "ErrorsByOperation", "Operation", AGGREGATE_SERIES)
                .unwrap();
        assert_eq!(samples.len(), 3);
        assert!(samples.iter().all(|s| s.tags["Operation"] == "Execute"));
    }

    #[test]
    fn missing_or_empty_series_are_handled() {
        let t = tree(json!({"QPSByOperation": {"Execute": []}}));
        let samples =
            aggregate(&t, "QPSByOperation", "Operation", AGGREGATE_SERIES)
                .unwrap();
        assert!(samples.is_empty());

        let t = tree(json!({}));
        assert!(matches!(
            aggregate(&t, "QPSByOperation", "Operation", AGGREGATE_SERIES),
            Err(AgentError::MissingField(_))
        ));
    }
}
