use crate::coercion::coerce;
use crate::error::{SinkError, WriteError};
use crate::fields::{default_fields, ColumnPlan, FieldMapping};
use crate::sink::{DriverRegistry, SinkFactory, SinkSettings, TableSink};
use crate::span_values::{SpanValueExtractor, StandardSpanValues};
use crate::table::{SemanticKind, Table};
use span_structs::SpanRecord;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Who is writing, reported in every row
#[derive(Debug, Clone, Default)]
pub struct InstanceContext {
    pub name: String,
    pub flag: String,
    /// Source field -> target column, replaces the default mapping when not empty
    pub fields: FieldMapping,
}

/// Builds the schema out of the plan and one coerced row per span.
/// Fails on the first invalid column or row, so nothing partial is ever written.
#[instrument(skip_all, fields(table = table_name, spans = spans.len()))]
pub fn build_table(
    spans: &[SpanRecord],
    plan: &ColumnPlan,
    table_name: &str,
    extractor: &dyn SpanValueExtractor,
) -> Result<Table, WriteError> {
    let mut table = Table::new(table_name)?;
    for entry in plan.iter() {
        match entry.kind {
            SemanticKind::Tag => table.add_tag_column(entry.target.as_str(), entry.column_type)?,
            SemanticKind::Timestamp => {
                table.add_timestamp_column(entry.target.as_str(), entry.column_type)?
            }
            SemanticKind::Field => {
                table.add_field_column(entry.target.as_str(), entry.column_type)?
            }
        }
    }
    for (index, span) in spans.iter().enumerate() {
        let values = extractor.extract(span);
        let row = plan
            .iter()
            .map(|entry| coerce(&entry.source, entry.column_type, values.get(&entry.source)))
            .collect();
        table
            .add_row(row)
            .map_err(|source| WriteError::Row { index, source })?;
    }
    debug!("Built {} rows of {} columns", table.row_count(), plan.len());
    Ok(table)
}

/// Writes the spans as one batch, or does nothing when there's no sink, no span or no column.
/// The timeout only bounds the store call, a timed out batch is lost.
#[instrument(skip_all, fields(table = table_name, spans = spans.len()))]
pub async fn write_batch(
    spans: &[SpanRecord],
    plan: &ColumnPlan,
    sink: Option<&dyn TableSink>,
    table_name: &str,
    timeout: Duration,
    extractor: &dyn SpanValueExtractor,
) -> Result<(), WriteError> {
    let Some(sink) = sink else {
        debug!("No sink connected, skipping write");
        return Ok(());
    };
    if spans.is_empty() {
        return Ok(());
    }
    if plan.is_empty() {
        warn!("Every column is disabled, dropping {} spans", spans.len());
        return Ok(());
    }
    let table = build_table(spans, plan, table_name, extractor)?;
    let start = Instant::now();
    let written = tokio::time::timeout(timeout, sink.write(&table))
        .await
        .map_err(|_elapsed| WriteError::Timeout {
            table: table_name.to_string(),
            rows: table.row_count(),
            timeout,
        })??;
    info!(
        "Wrote {written} rows to {table_name} in {}ms",
        start.elapsed().as_millis()
    );
    Ok(())
}

/// Writes span batches for one instance to one store table.
/// Unconnected until `open`, writes before that succeed without doing anything.
pub struct SpanWriter {
    context: InstanceContext,
    settings: SinkSettings,
    extractor: Arc<dyn SpanValueExtractor>,
    sink: Option<Box<dyn TableSink>>,
}

impl SpanWriter {
    pub fn new(context: InstanceContext, settings: SinkSettings) -> Self {
        let extractor = Arc::new(StandardSpanValues::new(
            context.name.clone(),
            context.flag.clone(),
        ));
        Self {
            context,
            settings,
            extractor,
            sink: None,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn SpanValueExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Connects once, later calls keep the first sink
    #[instrument(skip_all)]
    pub async fn open(&mut self, factory: &dyn SinkFactory) -> Result<(), SinkError> {
        if self.sink.is_some() {
            warn!("Writer is already open, keeping the current sink");
            return Ok(());
        }
        info!("Opening sink with {:?}", self.settings);
        self.sink = Some(factory.connect(&self.settings).await?);
        Ok(())
    }

    pub async fn open_driver(
        &mut self,
        registry: &DriverRegistry,
        driver: &str,
    ) -> Result<(), WriteError> {
        let factory = registry.get(driver)?;
        self.open(factory.as_ref()).await?;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.sink.is_some()
    }

    /// Nothing is buffered, so there is nothing to flush
    pub fn close(&mut self) {
        debug!("Closing span writer");
    }

    /// The column plan is resolved again on every call
    pub async fn write(&self, spans: &[SpanRecord]) -> Result<(), WriteError> {
        let plan = ColumnPlan::resolve(&self.context.fields, &default_fields());
        write_batch(
            spans,
            &plan,
            self.sink.as_deref(),
            &self.settings.table,
            self.settings.timeout,
            self.extractor.as_ref(),
        )
        .await
    }
}
