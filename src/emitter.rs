use chrono::Utc;
use log::debug;

use crate::error::Result;
use crate::sink::{MetricKind, MetricRecord, Sink};
use crate::tags::TagMap;

/// One flattened metric observation, produced fresh every poll cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub value: f64,
    pub kind: MetricKind,
    pub tags: TagMap,
}

/// Renders samples into sink records. One emitter per monitored
/// process, carrying the plugin name and the source instance
/// (`vtgate`, `vttablet`) that every identity string is prefixed with.
#[derive(Debug, Clone)]
pub struct MetricEmitter {
    plugin: String,
    instance: String,
}

impl MetricEmitter {
    pub fn new(plugin: impl Into<String>, instance: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            instance: instance.into(),
        }
    }

    /// Dispatches exactly one record to the sink. A dispatch failure is
    /// returned to the caller untouched.
    pub fn emit(
        &self,
        sink: &mut Sink,
        name: &str,
        value: f64,
        kind: MetricKind,
        tags: &TagMap,
    ) -> Result<()> {
        let type_instance = format!(
            "{}.{}.{}{}",
            self.plugin,
            self.instance,
            name,
            render_tags(tags)
        );
        debug!("emit {} {type_instance} = {value}", kind.as_str());

        sink.dispatch(MetricRecord {
            plugin: self.plugin.clone(),
            plugin_instance: self.instance.clone(),
            kind,
            type_instance,
            value,
            timestamp: Utc::now(),
        })
    }

    /// Convenience for sample-producing components.
    pub fn emit_sample(&self, sink: &mut Sink, sample: &Sample) -> Result<()> {
        self.emit(sink, &sample.name, sample.value, sample.kind, &sample.tags)
    }
}

/// `[k1=v1,k2=v2]` for a non-empty tag map, nothing for an empty one.
/// Key order is whatever the map iterates in; consumers treat the tag
/// set as a set.
fn render_tags(tags: &TagMap) -> String {
    if tags.is_empty() {
        return String::new();
    }
    let joined = tags
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",");
    format!("[{joined}]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_suffix_is_bracketed_pairs() {
        let mut tags = TagMap::new();
        tags.insert("keyspace".into(), "user1".into());
        tags.insert("shard".into(), "web".into());
        assert_eq!(render_tags(&tags), "[keyspace=user1,shard=web]");
        assert_eq!(render_tags(&TagMap::new()), "");
    }

    #[test]
    fn identity_string_prefixes_plugin_and_instance() {
        let emitter = MetricEmitter::new("vitess", "vtgate");
        let mut sink = Sink::Memory(Vec::new());
        let mut tags = TagMap::new();
        tags.insert("type".into(), "read".into());

        emitter
            .emit(&mut sink, "Errors", 3.0, MetricKind::Counter, &tags)
            .unwrap();

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].plugin, "vitess");
        assert_eq!(records[0].plugin_instance, "vtgate");
        assert_eq!(records[0].type_instance, "vitess.vtgate.Errors[type=read]");
        assert_eq!(records[0].kind, MetricKind::Counter);
        assert_eq!(records[0].value, 3.0);
    }

    #[test]
    fn one_dispatch_per_emit() {
        let emitter = MetricEmitter::new("vitess", "vttablet");
        let mut sink = Sink::Memory(Vec::new());
        for i in 0..3 {
            emitter
                .emit(
                    &mut sink,
                    "ConnCount",
                    f64::from(i),
                    MetricKind::Gauge,
                    &TagMap::new(),
                )
                .unwrap();
        }
        assert_eq!(sink.records().len(), 3);
        assert_eq!(sink.records()[2].type_instance, "vitess.vttablet.ConnCount");
    }
}
