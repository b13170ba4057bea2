//! Writes through the PostgreSQL wire protocol of the store.
//! The target table has to exist already, rows go in with a single multi-row INSERT.

use crate::error::{SinkError, SqlxError};
use crate::sink::{SinkFactory, SinkSettings, TableSink};
use crate::table::{ColumnValue, Table};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{info, info_span, instrument, Instrument};

pub const DRIVER_NAME: &str = "greptime-pg";
pub const DEFAULT_PORT: u16 = 4003;
/// Postgres refuses statements with more bind parameters
const MAX_BIND_PARAMETERS: usize = u16::MAX as usize;

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDriver;

#[async_trait]
impl SinkFactory for PostgresDriver {
    fn default_port(&self) -> u16 {
        DEFAULT_PORT
    }

    #[instrument(skip_all)]
    async fn connect(&self, settings: &SinkSettings) -> Result<Box<dyn TableSink>, SinkError> {
        settings.validate()?;
        let mut options = PgConnectOptions::new()
            .host(&settings.host)
            .port(settings.port_or(DEFAULT_PORT))
            .database(&settings.database)
            .ssl_mode(if settings.insecure {
                PgSslMode::Disable
            } else {
                PgSslMode::Require
            });
        if let Some(username) = &settings.username {
            options = options.username(username);
        }
        if let Some(password) = &settings.password {
            options = options.password(password);
        }
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(settings.timeout)
            .connect_with(options)
            .instrument(info_span!("Connecting to the store"))
            .await
            .map_err(|e| {
                SqlxError::from_sqlx_error(
                    e,
                    format!("connecting to {}:{}", settings.host, settings.port_or(DEFAULT_PORT)),
                )
            })?;
        info!("Connected to {}", settings.host);
        Ok(Box::new(PostgresSink { pool }))
    }
}

pub struct PostgresSink {
    pool: PgPool,
}

#[async_trait]
impl TableSink for PostgresSink {
    #[instrument(skip_all, fields(table = table.name(), rows = table.row_count()))]
    async fn write(&self, table: &Table) -> Result<u64, SinkError> {
        if table.is_empty() {
            return Ok(0);
        }
        let mut query = insert_query(table)?;
        let result = query
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| SqlxError::from_sqlx_error(e, format!("inserting into {}", table.name())))?;
        Ok(result.rows_affected())
    }
}

fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

pub fn insert_query(table: &Table) -> Result<QueryBuilder<'static, Postgres>, SinkError> {
    let binds = table.columns().len() * table.row_count();
    if binds > MAX_BIND_PARAMETERS {
        return Err(SinkError::Encoding {
            table: table.name().to_string(),
            row: MAX_BIND_PARAMETERS / table.columns().len().max(1),
            reason: format!("{binds} bind parameters exceed the limit of {MAX_BIND_PARAMETERS}"),
        });
    }
    let mut query = QueryBuilder::new("INSERT INTO ");
    query.push(quote_identifier(table.name()));
    query.push(" (");
    let mut columns = query.separated(", ");
    for column in table.columns() {
        columns.push(quote_identifier(&column.name));
    }
    query.push(") ");
    query.push_values(table.rows(), |mut values, row| {
        for value in row {
            match value {
                ColumnValue::String(text) => values.push_bind(text.clone()),
                ColumnValue::Int64(int) => values.push_bind(*int),
                ColumnValue::Timestamp(time) => values.push_bind(*time),
            };
        }
    });
    Ok(query)
}
