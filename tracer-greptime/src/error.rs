use crate::table::{ColumnType, ColumnValue};
use std::backtrace::Backtrace;
use std::time::Duration;
use thiserror::Error;

pub fn error_chain_to_pretty_formatted(error: &(dyn std::error::Error + 'static)) -> String {
    let mut err = format!("{}", error);
    let mut source = error.source();
    while let Some(inner_err) = source {
        err.push_str(&format!("\nCaused by: \n{}", inner_err));
        source = inner_err.source();
    }
    err
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("invalid {what} name {name:?}: {reason}")]
    InvalidName {
        what: &'static str,
        name: String,
        reason: &'static str,
    },
    #[error("duplicate column {0:?}")]
    DuplicateColumn(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowError {
    #[error("row has {got} values but the table has {expected} columns")]
    Arity { expected: usize, got: usize },
    #[error("column {column:?} is {expected:?} but got {got:?}")]
    TypeMismatch {
        column: String,
        expected: ColumnType,
        got: ColumnValue,
    },
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error(transparent)]
    Sqlx(#[from] SqlxError),
    #[error(transparent)]
    Reqwest(#[from] ReqwestError),
    #[error("store rejected the write with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("can't encode row {row} of table {table}: {reason}")]
    Encoding {
        table: String,
        row: usize,
        reason: String,
    },
    #[error("invalid sink settings: {0}")]
    Settings(String),
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("building table schema")]
    Schema(#[from] SchemaError),
    #[error("building row {index}")]
    Row {
        index: usize,
        #[source]
        source: RowError,
    },
    #[error("writing batch")]
    Sink(#[from] SinkError),
    #[error("write of {rows} rows to {table} timed out after {timeout:?}")]
    Timeout {
        table: String,
        rows: usize,
        timeout: Duration,
    },
    #[error("resolving sink driver")]
    UnknownDriver(#[from] RegistryError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("driver {0} is already registered")]
    Duplicate(String),
    #[error("no driver registered as {name}, known drivers: {known:?}")]
    Unknown { name: String, known: Vec<String> },
}

#[derive(Debug, Error)]
#[error("SqlxError Context: {context}\n{backtrace}")]
pub struct SqlxError {
    #[source]
    pub source: sqlx::Error,
    pub context: String,
    pub backtrace: OptionBacktracePrettyPrinter,
}

impl SqlxError {
    pub fn from_sqlx_error<S: Into<String>>(source: sqlx::Error, context: S) -> Self {
        Self {
            source,
            context: context.into(),
            backtrace: OptionBacktracePrettyPrinter::capture(),
        }
    }
}

#[derive(Debug, Error)]
#[error("ReqwestError Context: {context}\n{backtrace}")]
pub struct ReqwestError {
    #[source]
    pub source: reqwest::Error,
    pub context: String,
    pub backtrace: OptionBacktracePrettyPrinter,
}

impl ReqwestError {
    pub fn from_reqwest_error<S: Into<String>>(source: reqwest::Error, context: S) -> Self {
        Self {
            source,
            context: context.into(),
            backtrace: OptionBacktracePrettyPrinter::capture(),
        }
    }
}

#[derive(Debug, Error)]
#[error("SerdeJsonError Context: {context}\n{bad_input_sample}\n{backtrace}")]
pub struct SerdeJsonError {
    #[source]
    pub source: serde_json::Error,
    pub context: String,
    pub bad_input_sample: String,
    pub backtrace: OptionBacktracePrettyPrinter,
}

impl SerdeJsonError {
    pub fn from_serde_json_error<S: Into<String>>(
        source: serde_json::Error,
        context: S,
        bad_input_sample: String,
    ) -> Self {
        Self {
            source,
            context: context.into(),
            bad_input_sample,
            backtrace: OptionBacktracePrettyPrinter::capture(),
        }
    }
}

/// Backtraces are only captured when RUST_BACKTRACE or RUST_LIB_BACKTRACE is set
#[derive(Debug)]
pub struct OptionBacktracePrettyPrinter(pub Option<Backtrace>);

impl OptionBacktracePrettyPrinter {
    pub fn capture() -> Self {
        Self::from(Backtrace::capture())
    }
}

impl From<Backtrace> for OptionBacktracePrettyPrinter {
    fn from(value: Backtrace) -> Self {
        Self(Some(value))
    }
}

impl std::fmt::Display for OptionBacktracePrettyPrinter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.as_ref() {
            Some(child) => write!(f, "{}", child),
            None => write!(f, "No backtrace"),
        }
    }
}
