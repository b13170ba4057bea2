use crate::fields::FieldMapping;
use crate::sink::{line_protocol, SinkSettings};
use crate::writer::InstanceContext;
use clap::ArgAction;
use std::fmt::{Debug, Formatter};
use std::time::Duration;
use tracing_config_helper::Env;

#[derive(Debug, clap::Parser)]
#[command(about = "Writes newline delimited json spans read from stdin to GreptimeDB")]
pub struct LaunchConfig {
    #[clap(flatten)]
    pub sink: SinkConfig,
    /// Registered sink driver, greptime (line protocol over http) or greptime-pg
    #[clap(long, env, default_value = line_protocol::DRIVER_NAME)]
    pub driver: String,
    /// Reported in the node column
    #[clap(long, env, default_value = "")]
    pub instance_name: String,
    /// Reported in the profile column
    #[clap(long, env, default_value = "")]
    pub flag: String,
    /// Column mapping override as source=target, repeatable. An empty target drops the column.
    /// When given, it replaces the default mapping entirely.
    #[clap(long = "field", value_parser = parse_field_override)]
    pub fields: Vec<(String, String)>,
    #[clap(long, env, default_value_t = 500, value_parser = clap::value_parser!(u32).range(1..))]
    pub batch_size: u32,
    #[clap(long, env, default_value = "local")]
    pub environment: Env,
    /// gRPC OTLP collector receiving this program's own traces
    #[clap(long, env)]
    pub otlp_endpoint: Option<String>,
}

#[derive(clap::Args)]
pub struct SinkConfig {
    #[clap(long, env = "GREPTIME_HOST", default_value = "127.0.0.1")]
    pub host: String,
    /// Defaults to the driver port, 4000 for greptime and 4003 for greptime-pg
    #[clap(long, env = "GREPTIME_PORT")]
    pub port: Option<u16>,
    #[clap(long, env = "GREPTIME_DATABASE", default_value = "public")]
    pub database: String,
    #[clap(long, env = "GREPTIME_TABLE", default_value = "traces")]
    pub table: String,
    #[clap(long, env = "GREPTIME_USERNAME")]
    pub username: Option<String>,
    #[clap(long, env = "GREPTIME_PASSWORD")]
    pub password: Option<String>,
    #[clap(long, env = "GREPTIME_TIMEOUT_MS", default_value_t = 5_000)]
    pub timeout_ms: u64,
    /// Plain http and no TLS for the pg driver
    #[clap(long, env = "GREPTIME_INSECURE", default_value_t = true, action = ArgAction::Set)]
    pub insecure: bool,
}

impl Debug for SinkConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("table", &self.table)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout_ms", &self.timeout_ms)
            .field("insecure", &self.insecure)
            .finish()
    }
}

fn parse_field_override(arg: &str) -> Result<(String, String), String> {
    let (source, target) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected source=target, got {arg:?}"))?;
    let source = source.trim();
    if source.is_empty() {
        return Err(format!("missing source field in {arg:?}"));
    }
    Ok((source.to_string(), target.trim().to_string()))
}

impl LaunchConfig {
    pub fn sink_settings(&self) -> SinkSettings {
        SinkSettings {
            host: self.sink.host.clone(),
            port: self.sink.port,
            database: self.sink.database.clone(),
            table: self.sink.table.clone(),
            username: self.sink.username.clone(),
            password: self.sink.password.clone(),
            timeout: Duration::from_millis(self.sink.timeout_ms),
            insecure: self.sink.insecure,
        }
    }

    pub fn instance_context(&self) -> InstanceContext {
        InstanceContext {
            name: self.instance_name.clone(),
            flag: self.flag.clone(),
            fields: self.fields.iter().cloned().collect::<FieldMapping>(),
        }
    }
}
