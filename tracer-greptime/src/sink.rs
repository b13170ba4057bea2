//! Destinations a finished table can be written to.

pub mod line_protocol;
pub mod postgres;
pub mod registry;

use crate::error::SinkError;
use crate::table::Table;
use async_trait::async_trait;
use std::fmt::{Debug, Formatter};
use std::time::Duration;

pub use registry::DriverRegistry;

/// A connected store accepting one schema-plus-rows batch per call.
/// Implementations take `&self` and are as thread safe as their transport.
#[async_trait]
pub trait TableSink: Send + Sync {
    /// Returns the number of rows the store acknowledged
    async fn write(&self, table: &Table) -> Result<u64, SinkError>;
}

/// Builds a connected sink out of resolved settings
#[async_trait]
pub trait SinkFactory: Send + Sync {
    fn default_port(&self) -> u16;
    async fn connect(&self, settings: &SinkSettings) -> Result<Box<dyn TableSink>, SinkError>;
}

#[derive(Clone)]
pub struct SinkSettings {
    pub host: String,
    /// The driver default port is used when missing
    pub port: Option<u16>,
    pub database: String,
    pub table: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
    /// Plain http / no TLS
    pub insecure: bool,
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: None,
            database: "public".to_string(),
            table: "traces".to_string(),
            username: None,
            password: None,
            timeout: Duration::from_secs(5),
            insecure: true,
        }
    }
}

impl SinkSettings {
    pub fn port_or(&self, default_port: u16) -> u16 {
        self.port.unwrap_or(default_port)
    }

    pub(crate) fn validate(&self) -> Result<(), SinkError> {
        if self.host.trim().is_empty() {
            return Err(SinkError::Settings("host can't be empty".to_string()));
        }
        if self.database.trim().is_empty() {
            return Err(SinkError::Settings("database can't be empty".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(SinkError::Settings("timeout must be positive".to_string()));
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(SinkError::Settings(
                "a password was given without a username".to_string(),
            ));
        }
        Ok(())
    }
}

impl Debug for SinkSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("table", &self.table)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("insecure", &self.insecure)
            .finish()
    }
}
