//! Writes through the InfluxDB line protocol http endpoint of the store.

use crate::error::{ReqwestError, SinkError};
use crate::sink::{SinkFactory, SinkSettings, TableSink};
use crate::table::{ColumnValue, SemanticKind, Table, TimestampPrecision};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use span_structs::time_conversion::{time_to_millis, time_to_nanos};
use tracing::{info, instrument};

pub const DRIVER_NAME: &str = "greptime";
pub const DEFAULT_PORT: u16 = 4000;
const WRITE_PATH: &str = "/v1/influxdb/write";
const REJECTED_BODY_CHARS_LIMIT: usize = 512;

#[derive(Debug, Clone, Copy, Default)]
pub struct LineProtocolDriver;

#[async_trait]
impl SinkFactory for LineProtocolDriver {
    fn default_port(&self) -> u16 {
        DEFAULT_PORT
    }

    #[instrument(skip_all)]
    async fn connect(&self, settings: &SinkSettings) -> Result<Box<dyn TableSink>, SinkError> {
        settings.validate()?;
        let client = reqwest::ClientBuilder::new()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ReqwestError::from_reqwest_error(e, "building reqwest client"))?;
        let scheme = if settings.insecure { "http" } else { "https" };
        let url = format!(
            "{scheme}://{}:{}{WRITE_PATH}",
            settings.host,
            settings.port_or(DEFAULT_PORT)
        );
        info!("Writing line protocol to {url}");
        Ok(Box::new(LineProtocolSink {
            client,
            url,
            database: settings.database.clone(),
            username: settings.username.clone(),
            password: settings.password.clone(),
        }))
    }
}

pub struct LineProtocolSink {
    client: reqwest::Client,
    url: String,
    database: String,
    username: Option<String>,
    password: Option<String>,
}

#[async_trait]
impl TableSink for LineProtocolSink {
    #[instrument(skip_all, fields(table = table.name(), rows = table.row_count()))]
    async fn write(&self, table: &Table) -> Result<u64, SinkError> {
        let precision = point_precision(table);
        let body = encode_table(table)?;
        let mut request = self.client.post(&self.url).query(&[
            ("db", self.database.as_str()),
            ("precision", precision.as_str()),
        ]);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_ref());
        }
        let resp = request
            .body(body)
            .send()
            .await
            .map_err(|e| ReqwestError::from_reqwest_error(e, "sending line protocol"))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .map_err(|e| ReqwestError::from_reqwest_error(e, "reading rejection body"))?;
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body: body.chars().take(REJECTED_BODY_CHARS_LIMIT).collect(),
            });
        }
        Ok(table.row_count() as u64)
    }
}

/// Precision of the first timestamp column, nanoseconds if there is none
fn point_precision(table: &Table) -> TimestampPrecision {
    table
        .columns()
        .iter()
        .filter(|column| column.kind == SemanticKind::Timestamp)
        .find_map(|column| column.column_type.timestamp_precision())
        .unwrap_or(TimestampPrecision::Nanosecond)
}

/// One line per row: `measurement,tag=v field=v time`.
/// The first timestamp column is the point time, any other one is written as an integer field.
/// Empty tag values are left out since the protocol can't express them.
pub fn encode_table(table: &Table) -> Result<String, SinkError> {
    let precision = point_precision(table);
    let time_index = table
        .columns()
        .iter()
        .position(|column| column.kind == SemanticKind::Timestamp);
    let measurement = escape(table.name(), &['\\', ',', ' ']);
    let mut lines = Vec::with_capacity(table.row_count());
    for (row_index, row) in table.rows().iter().enumerate() {
        let encoding_error = |reason: String| SinkError::Encoding {
            table: table.name().to_string(),
            row: row_index,
            reason,
        };
        let mut tags = String::new();
        let mut fields = Vec::new();
        let mut time = None;
        for (column_index, (column, value)) in table.columns().iter().zip(row).enumerate() {
            let key = escape_key(&column.name).map_err(&encoding_error)?;
            match column.kind {
                SemanticKind::Timestamp if Some(column_index) == time_index => {
                    time = Some(timestamp_value(value, precision).map_err(&encoding_error)?);
                }
                SemanticKind::Tag => {
                    let tag = match value {
                        ColumnValue::String(text) => text.clone(),
                        ColumnValue::Int64(int) => int.to_string(),
                        ColumnValue::Timestamp(_) => {
                            timestamp_value(value, precision).map_err(&encoding_error)?.to_string()
                        }
                    };
                    if tag.is_empty() {
                        continue;
                    }
                    if tag.contains('\n') {
                        return Err(encoding_error(format!(
                            "tag {} contains a newline",
                            column.name
                        )));
                    }
                    tags.push(',');
                    tags.push_str(&key);
                    tags.push('=');
                    tags.push_str(&escape(&tag, &['\\', ',', '=', ' ']));
                }
                SemanticKind::Timestamp | SemanticKind::Field => {
                    let field = match value {
                        ColumnValue::String(text) => {
                            format!("\"{}\"", escape(text, &['\\', '"']))
                        }
                        ColumnValue::Int64(int) => format!("{int}i"),
                        ColumnValue::Timestamp(_) => {
                            let column_precision = column
                                .column_type
                                .timestamp_precision()
                                .unwrap_or(precision);
                            format!(
                                "{}i",
                                timestamp_value(value, column_precision).map_err(&encoding_error)?
                            )
                        }
                    };
                    fields.push(format!("{key}={field}"));
                }
            }
        }
        if fields.is_empty() {
            return Err(encoding_error("row has no field values".to_string()));
        }
        let mut line = format!("{measurement}{tags} {}", fields.join(","));
        if let Some(time) = time {
            line.push(' ');
            line.push_str(&time.to_string());
        }
        lines.push(line);
    }
    Ok(lines.join("\n"))
}

fn timestamp_value(value: &ColumnValue, precision: TimestampPrecision) -> Result<i64, String> {
    let ColumnValue::Timestamp(time) = value else {
        return Err(format!("expected a timestamp, got {value:?}"));
    };
    epoch_offset(time, precision)
        .ok_or_else(|| format!("{time} can't be represented as epoch nanoseconds"))
}

fn epoch_offset(time: &DateTime<Utc>, precision: TimestampPrecision) -> Option<i64> {
    match precision {
        TimestampPrecision::Nanosecond => time_to_nanos(time),
        TimestampPrecision::Millisecond => Some(time_to_millis(time)),
    }
}

fn escape_key(key: &str) -> Result<String, String> {
    if key.contains('\n') {
        return Err(format!("column name {key:?} contains a newline"));
    }
    Ok(escape(key, &['\\', ',', '=', ' ']))
}

fn escape(text: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::table::ColumnType;
    use span_structs::time_conversion::{epoch_zero, time_from_nanos};

    fn spans_table() -> Table {
        let mut table = Table::new("traces").unwrap();
        table.add_tag_column("project", ColumnType::String).unwrap();
        table.add_tag_column("node", ColumnType::String).unwrap();
        table
            .add_timestamp_column("timestamp", ColumnType::TimestampNanosecond)
            .unwrap();
        table
            .add_field_column("start_time_unix_nano", ColumnType::Int64)
            .unwrap();
        table.add_field_column("step", ColumnType::String).unwrap();
        table.add_field_column("attributes", ColumnType::String).unwrap();
        table
    }

    fn text(text: &str) -> ColumnValue {
        ColumnValue::String(text.to_string())
    }

    #[test]
    fn rows_are_encoded_one_per_line() {
        let mut table = spans_table();
        table
            .add_row(vec![
                text("shop api"),
                text(""),
                ColumnValue::Timestamp(time_from_nanos(1_700_000_000_000_000_000)),
                ColumnValue::Int64(1_700_000_000_000_000_000),
                text(r#"GET "/orders""#),
                text(r#"{"http.method":"GET"}"#),
            ])
            .unwrap();
        table
            .add_row(vec![
                text("a,b=c"),
                text("n1"),
                ColumnValue::Timestamp(epoch_zero()),
                ColumnValue::Int64(5),
                text(""),
                text("{}"),
            ])
            .unwrap();
        let encoded = encode_table(&table).unwrap();
        insta::assert_snapshot!(encoded, @r###"
        traces,project=shop\ api start_time_unix_nano=1700000000000000000i,step="GET \"/orders\"",attributes="{\"http.method\":\"GET\"}" 1700000000000000000
        traces,project=a\,b\=c,node=n1 start_time_unix_nano=5i,step="",attributes="{}" 0
        "###);

        let mut windows_paths = Table::new("traces").unwrap();
        windows_paths.add_tag_column("entry", ColumnType::String).unwrap();
        windows_paths
            .add_timestamp_column("ts", ColumnType::TimestampNanosecond)
            .unwrap();
        windows_paths.add_field_column("dir\\", ColumnType::Int64).unwrap();
        windows_paths
            .add_row(vec![
                text("C:\\"),
                ColumnValue::Timestamp(epoch_zero()),
                ColumnValue::Int64(1),
            ])
            .unwrap();
        insta::assert_snapshot!(encode_table(&windows_paths).unwrap(), @r###"traces,entry=C:\\ dir\\=1i 0"###);
    }

    #[test]
    fn extra_timestamp_columns_become_integer_fields() {
        let mut table = Table::new("spans").unwrap();
        table
            .add_timestamp_column("ts", ColumnType::TimestampMillisecond)
            .unwrap();
        table
            .add_timestamp_column("ended", ColumnType::TimestampNanosecond)
            .unwrap();
        let time = time_from_nanos(1_500_000_000);
        table
            .add_row(vec![ColumnValue::Timestamp(time), ColumnValue::Timestamp(time)])
            .unwrap();
        assert_eq!(point_precision(&table), TimestampPrecision::Millisecond);
        assert_eq!(encode_table(&table).unwrap(), "spans ended=1500000000i 1500");
    }

    #[test]
    fn rows_without_fields_or_with_newline_tags_are_rejected() {
        let mut tags_only = Table::new("traces").unwrap();
        tags_only.add_tag_column("node", ColumnType::String).unwrap();
        tags_only.add_row(vec![text("n1")]).unwrap();
        assert!(matches!(
            encode_table(&tags_only),
            Err(SinkError::Encoding { row: 0, .. })
        ));

        let mut table = spans_table();
        table
            .add_row(vec![
                text("multi\nline"),
                text(""),
                ColumnValue::Timestamp(epoch_zero()),
                ColumnValue::Int64(0),
                text(""),
                text("{}"),
            ])
            .unwrap();
        assert!(matches!(
            encode_table(&table),
            Err(SinkError::Encoding { reason, .. }) if reason.contains("newline")
        ));
    }

    #[test]
    fn empty_table_encodes_to_nothing() {
        assert_eq!(encode_table(&spans_table()).unwrap(), "");
    }

    #[tokio::test]
    async fn connect_rejects_invalid_settings() {
        let settings = SinkSettings {
            database: "".to_string(),
            ..SinkSettings::default()
        };
        assert!(matches!(
            LineProtocolDriver.connect(&settings).await,
            Err(SinkError::Settings(_))
        ));
    }
}
