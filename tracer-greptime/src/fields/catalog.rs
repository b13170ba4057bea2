//! Built-in knowledge about the source fields a span exposes.

use crate::fields::FieldMapping;
use crate::table::{ColumnType, SemanticKind};

/// Order in which catalog fields appear in every column plan.
pub const CANONICAL_ORDER: [&str; 19] = [
    "project",
    "profile",
    "node",
    "time",
    "start",
    "end",
    "cost",
    "step",
    "trace_id",
    "span_id",
    "parent_id",
    "parent_span_id",
    "kind",
    "entry",
    "status",
    "code",
    "result",
    "attributes",
    "resource",
];

/// Source fields holding key-value maps, stored as json text
const STRUCTURED_FIELDS: [&str; 2] = ["attributes", "resource"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub kind: SemanticKind,
    pub column_type: ColumnType,
}

/// Source field -> default target column
pub fn default_fields() -> FieldMapping {
    CANONICAL_ORDER
        .iter()
        .map(|source| {
            let target = match *source {
                "time" => "timestamp",
                "start" => "start_time_unix_nano",
                "end" => "end_time_unix_nano",
                "cost" => "duration_unix_nano",
                same => same,
            };
            (source.to_string(), target.to_string())
        })
        .collect()
}

/// Total over all strings, unknown fields are plain string fields.
pub fn classify(source: &str) -> FieldSpec {
    let (kind, column_type) = match source {
        "project" | "profile" | "node" | "step" | "entry" => (SemanticKind::Tag, ColumnType::String),
        "time" => (SemanticKind::Timestamp, ColumnType::TimestampNanosecond),
        "start" | "end" | "cost" | "code" => (SemanticKind::Field, ColumnType::Int64),
        _ => (SemanticKind::Field, ColumnType::String),
    };
    FieldSpec { kind, column_type }
}

pub fn is_structured(source: &str) -> bool {
    STRUCTURED_FIELDS.contains(&source)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_cover_the_canonical_order() {
        let defaults = default_fields();
        assert_eq!(defaults.len(), CANONICAL_ORDER.len());
        assert_eq!(defaults["time"], "timestamp");
        assert_eq!(defaults["cost"], "duration_unix_nano");
        assert_eq!(defaults["trace_id"], "trace_id");
    }

    #[test]
    fn classify_is_total() {
        assert_eq!(
            classify("time"),
            FieldSpec {
                kind: SemanticKind::Timestamp,
                column_type: ColumnType::TimestampNanosecond
            }
        );
        assert_eq!(classify("node").kind, SemanticKind::Tag);
        assert_eq!(classify("cost").column_type, ColumnType::Int64);
        for unknown in ["", "http.method", "TIME", "attributes"] {
            assert_eq!(
                classify(unknown),
                FieldSpec {
                    kind: SemanticKind::Field,
                    column_type: ColumnType::String
                }
            );
        }
    }
}
