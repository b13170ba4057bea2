use clap::Parser;
use tracer_greptime::config::LaunchConfig;
use tracer_greptime::error::error_chain_to_pretty_formatted;
use tracer_greptime::ingest::ingest_lines;
use tracer_greptime::{DriverRegistry, SpanWriter};
use tracing::{error, info, instrument};
use tracing_config_helper::TracerConfig;

#[tokio::main]
async fn main() {
    // load env vars so clap can use it when parsing a config
    println!("Loading env vars");
    dotenv::dotenv().ok();
    let config = LaunchConfig::parse();
    let trace_shutdown_guard = tracing_config_helper::setup_or_panic(TracerConfig {
        service_name: env!("CARGO_BIN_NAME").to_string(),
        env: config.environment,
        otlp_endpoint: config.otlp_endpoint.clone(),
    });
    if let Err(e) = run(config).await {
        error!("{}", error_chain_to_pretty_formatted(e.as_ref()));
        // exit skips destructors, flush the exporter first
        drop(trace_shutdown_guard);
        std::process::exit(1);
    }
}

#[instrument(level = "error", skip_all)]
async fn run(config: LaunchConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Using config: {:#?}", config);
    let registry = DriverRegistry::with_builtin_drivers();
    let mut writer = SpanWriter::new(config.instance_context(), config.sink_settings());
    writer.open_driver(&registry, &config.driver).await?;
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let stats = ingest_lines(stdin, &writer, config.batch_size as usize).await?;
    writer.close();
    info!(
        "Wrote {} spans, skipped {} malformed lines and {} spans of failed batches",
        stats.written_spans, stats.malformed_lines, stats.failed_spans
    );
    Ok(())
}
