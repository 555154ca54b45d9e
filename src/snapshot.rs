use serde::Deserialize;
use serde_json::Value;

use crate::error::{AgentError, Result};

/// One JSON object level inside the snapshot.
pub type Tree = serde_json::Map<String, Value>;

/// A fetched `/debug/vars` document. Owned for the duration of one poll
/// cycle, then dropped — nothing here survives across cycles.
#[derive(Debug)]
pub struct Snapshot {
    root: Tree,
}

impl Snapshot {
    /// Wraps a fetched JSON value, rejecting anything but a top-level object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(AgentError::Config(format!(
                "snapshot root must be a JSON object, got {other}"
            ))),
        }
    }

    pub fn root(&self) -> &Tree {
        &self.root
    }

    /// Resolves a nested object field, e.g. the `memstats` block.
    pub fn subtree(&self, name: &str) -> Result<&Tree> {
        self.root
            .get(name)
            .and_then(Value::as_object)
            .ok_or_else(|| AgentError::MissingField(name.into()))
    }
}

/// The three shapes a declared field can take. Decoded explicitly where
/// the field is consumed rather than duck-typed along the way.
#[derive(Debug, Clone, Copy)]
pub enum FieldShape<'a> {
    /// A bare number, e.g. `"ConnCount": 42`.
    Scalar(f64),
    /// A bare string, e.g. `"TabletType": "master"`.
    Text(&'a str),
    /// A flat mapping of (possibly compound) keys to values.
    Map(&'a Tree),
}

impl<'a> FieldShape<'a> {
    pub fn of(value: &'a Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(Self::Scalar),
            Value::String(s) => Some(Self::Text(s)),
            Value::Object(map) => Some(Self::Map(map)),
            _ => None,
        }
    }
}

/// A vitess timing block: totals plus one histogram object per label.
/// Each histogram object carries its own `Count`/`Time` members alongside
/// the numeric nanosecond bucket bounds.
#[derive(Debug, Clone, Deserialize)]
pub struct TimingBlock {
    #[serde(rename = "Count")]
    pub count: i64,
    #[serde(rename = "Time")]
    pub time: i64,
    #[serde(rename = "Histogram", default)]
    pub histogram: serde_json::Map<String, Value>,
}

impl TimingBlock {
    /// Decodes a declared timing field. Wrong shapes surface as JSON errors.
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(serde_json::from_value(value.clone())?)
    }

    /// The per-label bucket objects, skipping any entry that is not an
    /// object (the wire format never mixes shapes, but a snapshot is
    /// external input).
    pub fn buckets(&self) -> impl Iterator<Item = (&str, &Tree)> {
        self.histogram
            .iter()
            .filter_map(|(k, v)| v.as_object().map(|m| (k.as_str(), m)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_requires_object_root() {
        assert!(Snapshot::from_value(json!([1, 2, 3])).is_err());
        assert!(Snapshot::from_value(json!({"a": 1})).is_ok());
    }

    #[test]
    fn subtree_resolves_nested_objects_only() {
        let snap =
            Snapshot::from_value(json!({"memstats": {"PauseTotalNs": 5}, "flat": 1}))
                .unwrap();
        assert!(snap.subtree("memstats").is_ok());
        assert!(matches!(
            snap.subtree("flat"),
            Err(crate::error::AgentError::MissingField(_))
        ));
        assert!(snap.subtree("absent").is_err());
    }

    #[test]
    fn field_shapes_decode_explicitly() {
        assert!(matches!(
            FieldShape::of(&json!(3.5)),
            Some(FieldShape::Scalar(v)) if v == 3.5
        ));
        assert!(matches!(
            FieldShape::of(&json!("master")),
            Some(FieldShape::Text("master"))
        ));
        assert!(matches!(FieldShape::of(&json!({"a": 1})), Some(FieldShape::Map(_))));
        assert!(FieldShape::of(&json!(null)).is_none());
        assert!(FieldShape::of(&json!([1])).is_none());
    }

    #[test]
    fn timing_block_decodes_totals_and_buckets() {
        let block = TimingBlock::from_value(&json!({
            "Count": 10,
            "Time": 2_000_000,
            "Histogram": {
                "all": {"500000": 7, "1000000": 3, "Count": 10, "Time": 2_000_000}
            }
        }))
        .unwrap();
        assert_eq!(block.count, 10);
        assert_eq!(block.time, 2_000_000);
        assert_eq!(block.buckets().count(), 1);
    }
}
