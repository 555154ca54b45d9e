use log::{error, warn};
use serde_json::Value;

use crate::error::{AgentError, Result};
use crate::snapshot::{FieldShape, Tree};
use crate::tags::{self, TagMap, TagSchema};

/// Delimiter used by every vitess compound key.
pub const KEY_DELIMITER: char = '.';

/// Walks `tree[field]` and yields one `(tags, value)` pair per entry.
///
/// Four shapes are supported, matching what the vars endpoint actually
/// serves:
///   - empty schema + mapping: untagged, one pair per value, keys dropped
///   - empty schema + scalar: a single untagged pair
///   - schema + scalar: the *field name itself* is the compound key
///     (a single composite metric tagged by its own name)
///   - schema + mapping: every key is tag-decomposed; a key that fails
///     the arity check is logged and skipped, its siblings still emitted
///
/// A missing field is an error — the caller skips the declaration for
/// this cycle only.
pub fn extract_values<'a>(
    tree: &'a Tree,
    field: &str,
    schema: &TagSchema,
) -> Result<Vec<(TagMap, &'a Value)>> {
    let value = tree
        .get(field)
        .ok_or_else(|| AgentError::MissingField(field.into()))?;
    let Some(shape) = FieldShape::of(value) else {
        warn!("'{field}' has an unsupported JSON shape, skipping");
        return Ok(Vec::new());
    };

    match (shape, schema.is_empty()) {
        // Untagged: values only, original keys dropped.
        (FieldShape::Map(map), true) => {
            Ok(map.values().map(|v| (TagMap::new(), v)).collect())
        }
        (FieldShape::Scalar(_) | FieldShape::Text(_), true) => {
            Ok(vec![(TagMap::new(), value)])
        }
        // Tagged mapping: decompose every key, skip the ones that don't fit.
        (FieldShape::Map(map), false) => {
            let mut pairs = Vec::with_capacity(map.len());
            for (key, v) in map {
                match tags::extract(key, KEY_DELIMITER, schema) {
                    Ok(t) => pairs.push((t, v)),
                    Err(e) => error!("skipping '{field}' entry: {e}"),
                }
            }
            Ok(pairs)
        }
        // Degenerate path: decompose the field name, not sub-keys.
        (FieldShape::Scalar(_) | FieldShape::Text(_), false) => {
            Ok(match tags::extract(field, KEY_DELIMITER, schema) {
                Ok(t) => vec![(t, value)],
                Err(e) => {
                    error!("{e}");
                    Vec::new()
                }
            })
        }
    }
}
