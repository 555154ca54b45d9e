use std::collections::BTreeMap;

use crate::error::{AgentError, Result};

/// Ordered list of tag names a compound key decomposes into.
pub type TagSchema = [&'static str];

/// Decomposed tags for one sample. Keys are unique; callers treat this
/// as a set, not a sequence.
pub type TagMap = BTreeMap<String, String>;

/// Splits a compound key like `"user.Sleep.PASS_SELECT"` into a tag map
/// against `schema`. The segment count must match the schema arity
/// exactly; spaces inside segments become underscores. No other
/// validation happens — empty segments and odd characters pass through.
pub fn extract(key: &str, delimiter: char, schema: &TagSchema) -> Result<TagMap> {
    let segments: Vec<&str> = key.split(delimiter).collect();
    if segments.len() != schema.len() {
        return Err(AgentError::Arity {
            key: key.into(),
            expected: schema.len(),
            got: segments.len(),
        });
    }

    Ok(schema
        .iter()
        .zip(segments)
        .map(|(name, seg)| ((*name).into(), seg.replace(' ', "_")))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zips_schema_to_segments_positionally() {
        let tags = extract("user1.web.PASS_SELECT", '.', &["keyspace", "shard", "type"])
            .unwrap();
        assert_eq!(tags.len(), 3);
        assert_eq!(tags["keyspace"], "user1");
        assert_eq!(tags["shard"], "web");
        assert_eq!(tags["type"], "PASS_SELECT");
    }

    #[test]
    fn spaces_become_underscores() {
        let tags = extract("my table.select", '.', &["table", "type"]).unwrap();
        assert_eq!(tags["table"], "my_table");
    }

    #[test]
    fn arity_mismatch_is_an_error() {
        let err = extract("read.timeout", '.', &["type"]).unwrap_err();
        match err {
            AgentError::Arity { key, expected, got } => {
                assert_eq!(key, "read.timeout");
                assert_eq!(expected, 1);
                assert_eq!(got, 2);
            }
            other => panic!("expected arity error, got {other}"),
        }
    }

    #[test]
    fn empty_segments_are_permitted() {
        let tags = extract("a..c", '.', &["x", "y", "z"]).unwrap();
        assert_eq!(tags["y"], "");
    }
}
