//! Maps spans onto the columns of a GreptimeDB table and writes them in batches.

pub mod coercion;
pub mod config;
pub mod error;
pub mod fields;
pub mod ingest;
pub mod sink;
pub mod span_values;
pub mod table;
pub mod writer;

pub use error::{RegistryError, SchemaError, SinkError, WriteError};
pub use fields::{ColumnPlan, FieldMapping};
pub use sink::{DriverRegistry, SinkFactory, SinkSettings, TableSink};
pub use table::Table;
pub use writer::{write_batch, InstanceContext, SpanWriter};
