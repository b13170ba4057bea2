pub mod time_conversion;
pub mod value;

pub use value::RawValue;

pub type AttributeMap = serde_json::Map<String, serde_json::Value>;

/// One finished (or still open) span as produced by the upstream tracer.
/// Read-only from the point of view of the ingestion adapter.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SpanRecord {
    pub trace_id: String,
    pub span_id: String,
    #[serde(default)]
    pub parent_span_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub kind: SpanKind,
    /// Name of the entry point (route, task, command) the trace started from
    #[serde(default)]
    pub entry: Option<String>,
    pub start_time_unix_nano: u64,
    /// None while the span is still open
    #[serde(default)]
    pub end_time_unix_nano: Option<u64>,
    #[serde(default)]
    pub status: SpanStatus,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub attributes: AttributeMap,
    #[serde(default)]
    pub resource: AttributeMap,
}

impl SpanRecord {
    pub fn duration_nanos(&self) -> Option<u64> {
        self.end_time_unix_nano
            .map(|end| end.saturating_sub(self.start_time_unix_nano))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    #[default]
    Internal,
    Server,
    Client,
    Producer,
    Consumer,
}

impl SpanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanKind::Internal => "internal",
            SpanKind::Server => "server",
            SpanKind::Client => "client",
            SpanKind::Producer => "producer",
            SpanKind::Consumer => "consumer",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanStatus {
    #[default]
    Unset,
    Ok,
    Error,
}

impl SpanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanStatus::Unset => "unset",
            SpanStatus::Ok => "ok",
            SpanStatus::Error => "error",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn minimal_json_span_uses_defaults() {
        let span: SpanRecord = serde_json::from_str(
            r#"{"trace_id":"t1","span_id":"s1","name":"GET /","start_time_unix_nano":10}"#,
        )
        .unwrap();
        assert_eq!(span.parent_span_id, None);
        assert_eq!(span.kind, SpanKind::Internal);
        assert_eq!(span.status, SpanStatus::Unset);
        assert_eq!(span.duration_nanos(), None);
        assert!(span.attributes.is_empty());
    }

    #[test]
    fn duration_never_underflows() {
        let span: SpanRecord = serde_json::from_str(
            r#"{"trace_id":"t1","span_id":"s1","parent_span_id":"p","name":"n",
                "start_time_unix_nano":10,"end_time_unix_nano":4,"status":"error"}"#,
        )
        .unwrap();
        assert_eq!(span.parent_span_id.as_deref(), Some("p"));
        assert_eq!(span.duration_nanos(), Some(0));
        assert_eq!(span.status.as_str(), "error");
    }
}
