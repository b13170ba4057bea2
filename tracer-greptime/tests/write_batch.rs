use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use span_structs::{RawValue, SpanRecord};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracer_greptime::error::SchemaError;
use tracer_greptime::fields::default_fields;
use tracer_greptime::ingest::{ingest_lines, IngestStats};
use tracer_greptime::span_values::{SpanValueExtractor, SpanValues, StandardSpanValues};
use tracer_greptime::table::ColumnValue;
use tracer_greptime::{
    write_batch, ColumnPlan, FieldMapping, InstanceContext, SinkError, SinkFactory, SinkSettings,
    SpanWriter, Table, TableSink, WriteError,
};

#[derive(Clone, Default)]
struct RecordingSink {
    tables: Arc<Mutex<Vec<Table>>>,
    delay: Option<Duration>,
    rejection: Option<u16>,
}

#[async_trait]
impl TableSink for RecordingSink {
    async fn write(&self, table: &Table) -> Result<u64, SinkError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(status) = self.rejection {
            return Err(SinkError::Rejected {
                status,
                body: "try later".to_string(),
            });
        }
        self.tables.lock().push(table.clone());
        Ok(table.row_count() as u64)
    }
}

struct RecordingFactory {
    sink: RecordingSink,
    connects: AtomicUsize,
}

#[async_trait]
impl SinkFactory for RecordingFactory {
    fn default_port(&self) -> u16 {
        4000
    }

    async fn connect(&self, _settings: &SinkSettings) -> Result<Box<dyn TableSink>, SinkError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.sink.clone()))
    }
}

fn span(span_id: &str, code: Option<i64>) -> SpanRecord {
    serde_json::from_value(json!({
        "trace_id": "4bf92f3577b34da6a3ce929d0e0e4736",
        "span_id": span_id,
        "name": "POST /checkout",
        "kind": "server",
        "start_time_unix_nano": 1_700_000_000_000_000_000u64,
        "end_time_unix_nano": 1_700_000_000_040_000_000u64,
        "status": "ok",
        "code": code,
        "attributes": {"http.route": "/checkout"},
        "resource": {"service.name": "shop"},
    }))
    .unwrap()
}

fn mapping(pairs: &[(&str, &str)]) -> FieldMapping {
    pairs
        .iter()
        .map(|(source, target)| (source.to_string(), target.to_string()))
        .collect()
}

fn column_index(table: &Table, name: &str) -> usize {
    table
        .columns()
        .iter()
        .position(|column| column.name == name)
        .unwrap_or_else(|| panic!("missing column {name}"))
}

#[tokio::test]
async fn empty_batches_and_unopened_writers_never_reach_the_sink() {
    let sink = RecordingSink::default();
    let plan = ColumnPlan::resolve(&FieldMapping::new(), &default_fields());
    let extractor = StandardSpanValues::default();
    write_batch(&[], &plan, Some(&sink), "traces", Duration::from_secs(1), &extractor)
        .await
        .unwrap();
    write_batch(
        &[span("a", None)],
        &plan,
        None,
        "traces",
        Duration::from_secs(1),
        &extractor,
    )
    .await
    .unwrap();
    assert!(sink.tables.lock().is_empty());

    let writer = SpanWriter::new(InstanceContext::default(), SinkSettings::default());
    writer.write(&[span("a", None)]).await.unwrap();
}

#[tokio::test]
async fn override_wins_over_defaults() {
    let sink = RecordingSink::default();
    let defaults = mapping(&[("time", "timestamp"), ("cost", "cost_ms")]);
    let plan = ColumnPlan::resolve(&mapping(&[("time", "timestamp"), ("cost", "duration_ns")]), &defaults);
    write_batch(
        &[span("a", Some(200))],
        &plan,
        Some(&sink),
        "traces",
        Duration::from_secs(1),
        &StandardSpanValues::default(),
    )
    .await
    .unwrap();
    let tables = sink.tables.lock();
    let table = &tables[0];
    let names: Vec<&str> = table.columns().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["timestamp", "duration_ns"]);
    assert_eq!(table.rows()[0][1], ColumnValue::Int64(40_000_000));
}

#[tokio::test]
async fn missing_integer_only_zeroes_its_own_column() {
    let factory = RecordingFactory {
        sink: RecordingSink::default(),
        connects: AtomicUsize::new(0),
    };
    let mut writer = SpanWriter::new(
        InstanceContext {
            name: "shop-1".to_string(),
            flag: "canary".to_string(),
            fields: FieldMapping::new(),
        },
        SinkSettings::default(),
    );
    writer.open(&factory).await.unwrap();
    writer
        .write(&[span("a", Some(201)), span("b", None)])
        .await
        .unwrap();

    let tables = factory.sink.tables.lock();
    assert_eq!(tables.len(), 1);
    let table = &tables[0];
    assert_eq!(table.name(), "traces");
    assert_eq!(table.row_count(), 2);
    let code = column_index(table, "code");
    let cost = column_index(table, "duration_unix_nano");
    let node = column_index(table, "node");
    assert_eq!(table.rows()[0][code], ColumnValue::Int64(201));
    assert_eq!(table.rows()[1][code], ColumnValue::Int64(0));
    assert_eq!(table.rows()[1][cost], ColumnValue::Int64(40_000_000));
    assert_eq!(table.rows()[1][node], ColumnValue::String("shop-1".to_string()));
}

#[tokio::test]
async fn open_is_one_shot() {
    let factory = RecordingFactory {
        sink: RecordingSink::default(),
        connects: AtomicUsize::new(0),
    };
    let mut writer = SpanWriter::new(InstanceContext::default(), SinkSettings::default());
    writer.open(&factory).await.unwrap();
    writer.open(&factory).await.unwrap();
    assert!(writer.is_open());
    assert_eq!(factory.connects.load(Ordering::SeqCst), 1);
    writer.close();
}

#[tokio::test]
async fn slow_sink_times_out() {
    let sink = RecordingSink {
        delay: Some(Duration::from_secs(5)),
        ..RecordingSink::default()
    };
    let plan = ColumnPlan::resolve(&FieldMapping::new(), &default_fields());
    let err = write_batch(
        &[span("a", None)],
        &plan,
        Some(&sink),
        "traces",
        Duration::from_millis(20),
        &StandardSpanValues::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        WriteError::Timeout { rows: 1, ref table, .. } if table == "traces"
    ));
    assert!(sink.tables.lock().is_empty());
}

#[tokio::test]
async fn sink_errors_are_returned_verbatim() {
    let sink = RecordingSink {
        rejection: Some(503),
        ..RecordingSink::default()
    };
    let plan = ColumnPlan::resolve(&FieldMapping::new(), &default_fields());
    let err = write_batch(
        &[span("a", None)],
        &plan,
        Some(&sink),
        "traces",
        Duration::from_secs(1),
        &StandardSpanValues::default(),
    )
    .await
    .unwrap_err();
    match err {
        WriteError::Sink(SinkError::Rejected { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "try later");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn duplicate_targets_fail_before_the_sink() {
    let sink = RecordingSink::default();
    let plan = ColumnPlan::resolve(
        &mapping(&[("trace_id", "id"), ("span_id", "id")]),
        &default_fields(),
    );
    let err = write_batch(
        &[span("a", None)],
        &plan,
        Some(&sink),
        "traces",
        Duration::from_secs(1),
        &StandardSpanValues::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        WriteError::Schema(SchemaError::DuplicateColumn(ref name)) if name == "id"
    ));
    assert!(sink.tables.lock().is_empty());
}

fn recording_factory() -> RecordingFactory {
    RecordingFactory {
        sink: RecordingSink::default(),
        connects: AtomicUsize::new(0),
    }
}

#[tokio::test]
async fn fully_disabled_mapping_never_reaches_the_sink() {
    let factory = recording_factory();
    let mut writer = SpanWriter::new(
        InstanceContext {
            fields: mapping(&[("resource", " "), ("code", "")]),
            ..InstanceContext::default()
        },
        SinkSettings::default(),
    );
    writer.open(&factory).await.unwrap();
    writer.write(&[span("a", Some(200))]).await.unwrap();
    assert!(factory.sink.tables.lock().is_empty());
}

struct FixedCode(i64);

impl SpanValueExtractor for FixedCode {
    fn extract(&self, _span: &SpanRecord) -> SpanValues {
        SpanValues::from([("code".to_string(), RawValue::Int(self.0))])
    }
}

#[tokio::test]
async fn custom_extractor_feeds_the_rows() {
    let factory = recording_factory();
    let mut writer = SpanWriter::new(
        InstanceContext {
            fields: mapping(&[("code", "status_code")]),
            ..InstanceContext::default()
        },
        SinkSettings::default(),
    )
    .with_extractor(Arc::new(FixedCode(418)));
    writer.open(&factory).await.unwrap();
    writer.write(&[span("a", Some(200))]).await.unwrap();
    let tables = factory.sink.tables.lock();
    assert_eq!(tables[0].rows()[0], vec![ColumnValue::Int64(418)]);
}

#[tokio::test]
async fn ingested_lines_are_written_in_batches() {
    let factory = recording_factory();
    let mut writer = SpanWriter::new(InstanceContext::default(), SinkSettings::default());
    writer.open(&factory).await.unwrap();
    let input = [span("a", None), span("b", Some(500)), span("c", None)]
        .iter()
        .map(|span| serde_json::to_string(span).unwrap())
        .collect::<Vec<_>>()
        .join("\n");
    let stats = ingest_lines(input.as_bytes(), &writer, 2).await.unwrap();
    assert_eq!(
        stats,
        IngestStats {
            lines: 3,
            written_spans: 3,
            ..IngestStats::default()
        }
    );
    let row_counts: Vec<usize> = factory
        .sink
        .tables
        .lock()
        .iter()
        .map(Table::row_count)
        .collect();
    assert_eq!(row_counts, vec![2, 1]);
}
