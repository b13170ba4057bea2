use crate::error::{error_chain_to_pretty_formatted, SerdeJsonError};
use crate::writer::SpanWriter;
use span_structs::SpanRecord;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{error, info, instrument, warn};

const BAD_INPUT_SAMPLE_CHARS_LIMIT: usize = 256;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub lines: usize,
    pub malformed_lines: usize,
    pub written_spans: usize,
    /// Parsed but dropped because the writer has no sink
    pub unsent_spans: usize,
    pub failed_batches: usize,
    pub failed_spans: usize,
}

/// Reads one json span per line and writes them in batches of `batch_size`.
/// Malformed lines and failed batches are logged and skipped, only io errors stop it.
#[instrument(skip_all, fields(batch_size = batch_size))]
pub async fn ingest_lines<R: AsyncBufRead + Unpin>(
    reader: R,
    writer: &SpanWriter,
    batch_size: usize,
) -> std::io::Result<IngestStats> {
    let batch_size = batch_size.max(1);
    let mut stats = IngestStats::default();
    let mut batch = Vec::with_capacity(batch_size);
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        stats.lines += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<SpanRecord>(line) {
            Ok(span) => batch.push(span),
            Err(e) => {
                stats.malformed_lines += 1;
                let e = SerdeJsonError::from_serde_json_error(
                    e,
                    format!("parsing span on line {}", stats.lines),
                    line.chars().take(BAD_INPUT_SAMPLE_CHARS_LIMIT).collect(),
                );
                warn!("Skipping malformed span: {}", error_chain_to_pretty_formatted(&e));
                continue;
            }
        }
        if batch.len() >= batch_size {
            flush(writer, &mut batch, &mut stats).await;
        }
    }
    flush(writer, &mut batch, &mut stats).await;
    info!("Ingestion done: {:?}", stats);
    Ok(stats)
}

async fn flush(writer: &SpanWriter, batch: &mut Vec<SpanRecord>, stats: &mut IngestStats) {
    if batch.is_empty() {
        return;
    }
    match writer.write(batch).await {
        Ok(()) if !writer.is_open() => stats.unsent_spans += batch.len(),
        Ok(()) => stats.written_spans += batch.len(),
        Err(e) => {
            stats.failed_batches += 1;
            stats.failed_spans += batch.len();
            error!(
                "Dropping batch of {} spans: {}",
                batch.len(),
                error_chain_to_pretty_formatted(&e)
            );
        }
    }
    batch.clear();
}
