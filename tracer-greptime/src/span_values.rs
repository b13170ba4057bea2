use crate::fields::catalog::CANONICAL_ORDER;
use span_structs::time_conversion::{nanos_u64_to_i64, time_from_nanos};
use span_structs::{RawValue, SpanRecord};
use std::collections::HashMap;

/// Source field name -> raw value. A missing key means the span has no value for it.
pub type SpanValues = HashMap<String, RawValue>;

/// Flattens a span into the values the column plan picks from
pub trait SpanValueExtractor: Send + Sync {
    fn extract(&self, span: &SpanRecord) -> SpanValues;
}

/// Exposes every catalog field plus the span attributes under their own key and
/// the resource attributes under `resource.<key>`, so custom mappings can pick them.
/// Attributes named like a catalog field are only reachable through `attributes`.
#[derive(Debug, Clone, Default)]
pub struct StandardSpanValues {
    /// Reported as `node`
    pub instance_name: String,
    /// Reported as `profile`
    pub flag: String,
}

impl StandardSpanValues {
    pub fn new<S: Into<String>>(instance_name: S, flag: S) -> Self {
        Self {
            instance_name: instance_name.into(),
            flag: flag.into(),
        }
    }
}

fn insert_text(values: &mut SpanValues, key: &str, text: Option<&str>) {
    if let Some(text) = text.filter(|text| !text.is_empty()) {
        values.insert(key.to_string(), RawValue::Text(text.to_string()));
    }
}

impl SpanValueExtractor for StandardSpanValues {
    fn extract(&self, span: &SpanRecord) -> SpanValues {
        let mut values = SpanValues::new();
        for (key, value) in &span.resource {
            if let Some(raw) = RawValue::from_json(value.clone()) {
                values.insert(format!("resource.{key}"), raw);
            }
        }
        for (key, value) in &span.attributes {
            if CANONICAL_ORDER.contains(&key.as_str()) {
                continue;
            }
            if let Some(raw) = RawValue::from_json(value.clone()) {
                values.insert(key.clone(), raw);
            }
        }

        let project = ["project", "service.name"]
            .iter()
            .find_map(|key| span.resource.get(*key).and_then(|value| value.as_str()));
        insert_text(&mut values, "project", project);
        insert_text(&mut values, "profile", Some(&self.flag));
        insert_text(&mut values, "node", Some(&self.instance_name));

        let start = nanos_u64_to_i64(span.start_time_unix_nano);
        values.insert("time".to_string(), RawValue::Time(time_from_nanos(start)));
        values.insert("start".to_string(), RawValue::Int(start));
        if let Some(end) = span.end_time_unix_nano {
            values.insert("end".to_string(), RawValue::Int(nanos_u64_to_i64(end)));
        }
        if let Some(cost) = span.duration_nanos() {
            values.insert("cost".to_string(), RawValue::Int(nanos_u64_to_i64(cost)));
        }

        insert_text(&mut values, "step", Some(&span.name));
        insert_text(&mut values, "trace_id", Some(&span.trace_id));
        insert_text(&mut values, "span_id", Some(&span.span_id));
        insert_text(&mut values, "parent_id", span.parent_span_id.as_deref());
        insert_text(&mut values, "parent_span_id", span.parent_span_id.as_deref());
        insert_text(&mut values, "kind", Some(span.kind.as_str()));
        insert_text(&mut values, "entry", span.entry.as_deref());
        insert_text(&mut values, "status", Some(span.status.as_str()));
        if let Some(code) = span.code {
            values.insert("code".to_string(), RawValue::Int(code));
        }
        insert_text(&mut values, "result", span.result.as_deref());
        values.insert(
            "attributes".to_string(),
            RawValue::Map(span.attributes.clone()),
        );
        values.insert("resource".to_string(), RawValue::Map(span.resource.clone()));
        values
    }
}
