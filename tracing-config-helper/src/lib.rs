//! Shared logging setup for the workspace binaries.
//! Logs go to stdout (compact when running locally, json everywhere else) and,
//! when a collector endpoint is configured, the spans are also exported over OTLP.
//!

use opentelemetry::sdk::trace::Tracer;
use opentelemetry_otlp::WithExportConfig;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;
use tracing::subscriber;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::{EnvFilter, Layer, Registry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Env {
    Local,
    Dev,
    Stage,
    Prod,
}

impl Env {
    pub fn log_format(&self) -> LogFormat {
        match self {
            Env::Local => LogFormat::Compact,
            Env::Dev | Env::Stage | Env::Prod => LogFormat::Json,
        }
    }
}

impl Display for Env {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let env = match self {
            Env::Local => "local",
            Env::Dev => "dev",
            Env::Stage => "stage",
            Env::Prod => "prod",
        };
        f.write_str(env)
    }
}

impl FromStr for Env {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Env::Local),
            "dev" => Ok(Env::Dev),
            "stage" => Ok(Env::Stage),
            "prod" => Ok(Env::Prod),
            other => Err(format!(
                "invalid environment {other}, expected one of: local, dev, stage, prod"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct TracerConfig {
    pub service_name: String,
    pub env: Env,
    /// gRPC OTLP collector, for example http://127.0.0.1:4317
    pub otlp_endpoint: Option<String>,
}

/// This is a guard that will shutdown the OpenTelemetry exporter on drop.
/// Keep it alive in main so buffered spans get flushed when the program exits,
/// including when it exits due to a panic unwinding to main.
#[derive(Debug)]
pub struct TraceShutdownGuard {
    tracer: Tracer,
}

impl Drop for TraceShutdownGuard {
    fn drop(&mut self) {
        match self.tracer.provider() {
            None => {
                println!("TraceShutdownGuard dropped, but the tracer provider is already gone");
            }
            Some(provider) => {
                for export_res in provider.force_flush() {
                    if let Err(err) = export_res {
                        println!("Failed to export traces during TraceShutdownGuard drop: {err:?}");
                    }
                }
            }
        }
        opentelemetry::global::shutdown_tracer_provider();
    }
}

/// Uses RUST_LOG, see https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html
/// If missing or invalid, defaults to plain "info".
fn env_filter_or_default() -> EnvFilter {
    EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|e| {
        let default_filter = "info";
        println!("Missing or invalid RUST_LOG, defaulting to {default_filter}. {e}");
        EnvFilter::builder()
            .parse(default_filter)
            .unwrap_or_else(|_| panic!("{default_filter} should work as filter"))
    })
}

type FilteredRegistry = Layered<EnvFilter, Registry>;

fn fmt_layer(format: LogFormat) -> Box<dyn Layer<FilteredRegistry> + Send + Sync> {
    match format {
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .with_ansi(true)
            .compact()
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .boxed(),
    }
}

fn otlp_tracer(service_name: &str, env: Env, endpoint: &str) -> Tracer {
    let resource = opentelemetry::sdk::Resource::new(vec![
        opentelemetry::KeyValue::new("service.name", service_name.to_string()),
        opentelemetry::KeyValue::new("deployment.environment", env.to_string()),
    ]);
    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint),
        )
        .with_trace_config(opentelemetry::sdk::trace::config().with_resource(resource))
        .install_batch(opentelemetry::runtime::Tokio)
        .unwrap_or_else(|e| panic!("OTLP pipeline for {endpoint} to install: {e}"))
}

/// Registers the stdout logger and, if configured, the OTLP exporter as the global subscriber.
/// Must be called from inside a tokio runtime when an OTLP endpoint is set.
/// Panics if called twice.
pub fn setup_or_panic(config: TracerConfig) -> Option<TraceShutdownGuard> {
    if config.service_name.trim().is_empty() {
        panic!("Service name can't be empty.");
    }
    let filter = env_filter_or_default();
    println!("Using env filter: {filter}");
    let tracer = config
        .otlp_endpoint
        .as_deref()
        .filter(|endpoint| !endpoint.trim().is_empty())
        .map(|endpoint| otlp_tracer(&config.service_name, config.env, endpoint));
    let otel_layer = tracer
        .clone()
        .map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));
    let registry = Registry::default()
        .with(filter)
        .with(fmt_layer(config.env.log_format()))
        .with(otel_layer);
    subscriber::set_global_default(registry)
        .expect("tracing to be initialized only once per process");
    install_panic_logging_hook();
    tracer.map(|tracer| TraceShutdownGuard { tracer })
}

/// Compact console logging for tests, safe to call from every test.
pub fn setup_tracing_console_logging_for_test() {
    let fmt = tracing_subscriber::fmt::layer()
        // for tests ansi if nice
        .with_ansi(true)
        .with_test_writer()
        .compact()
        .with_filter(env_filter_or_default());
    let subscriber = Registry::default().with(fmt);
    // other tests in the same binary might have set it already
    let _ = subscriber::set_global_default(subscriber);
}

fn install_panic_logging_hook() {
    let current = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let panic_span = tracing::error_span!("program panicked", is_panic = true);
        panic_span.in_scope(|| {
            let bt = std::backtrace::Backtrace::force_capture();
            let panic_info: String = panic_info.to_string().chars().take(28_000).collect();
            let bt: String = bt.to_string().chars().take(28_000).collect();
            tracing::error!("Code panicked: Panic info: {}.", panic_info);
            tracing::error!("Backtrace:\n{bt}.");
        });
        current(panic_info)
    }));
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn env_parses_case_insensitively() {
        assert_eq!(Env::from_str(" Prod ").unwrap(), Env::Prod);
        assert_eq!(Env::from_str("local").unwrap().log_format(), LogFormat::Compact);
        assert_eq!(Env::from_str("dev").unwrap().log_format(), LogFormat::Json);
        assert!(Env::from_str("qa").is_err());
    }

    #[test]
    fn env_display_round_trips() {
        for env in [Env::Local, Env::Dev, Env::Stage, Env::Prod] {
            assert_eq!(Env::from_str(&env.to_string()).unwrap(), env);
        }
    }
}
