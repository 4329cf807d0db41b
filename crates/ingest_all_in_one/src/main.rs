mod config;

use aws_clients::AwsConnector;
use common::telemetry::{init_telemetry, shutdown_telemetry, TelemetryConfig, TelemetryProviders};
use crate::config::ServiceConfig;
use ingest_worker::codec::CodecDecoder;
use ingest_worker::domain::{IngestPipeline, PipelineDependencies};
use ingest_worker::parser::parser_for_format;
use ingest_worker::sink::StdoutSink;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize telemetry (tracing + OpenTelemetry for traces and logs)
    let telemetry_config = TelemetryConfig::from(&config);
    let telemetry_providers: Option<TelemetryProviders> = match init_telemetry(&telemetry_config) {
        Ok(providers) => providers,
        Err(e) => {
            eprintln!("Failed to initialize telemetry: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        service = %telemetry_config.service_name,
        otlp_endpoint = ?telemetry_config.otlp_endpoint,
        "starting object-ingest service"
    );
    debug!(queue = %config.queue_name, bucket = ?config.bucket, "loaded configuration");

    let parser = match parser_for_format(&config.data_format) {
        Ok(parser) => parser,
        Err(e) => {
            error!(error = %e, "failed to select metric parser");
            shutdown_telemetry(telemetry_providers);
            std::process::exit(1);
        }
    };

    let mut pipeline = IngestPipeline::new(
        config.pipeline_config(),
        PipelineDependencies {
            connector: Arc::new(AwsConnector::new()),
            decoder: Arc::new(CodecDecoder::new()),
            parser,
            sink: Arc::new(StdoutSink::new()),
        },
    );

    if let Err(e) = pipeline.start().await {
        error!(error = %e, fatal = e.is_fatal(), "failed to start ingest pipeline");
        shutdown_telemetry(telemetry_providers);
        std::process::exit(1);
    }

    wait_for_shutdown_signal().await;

    match pipeline.stop().await {
        Ok(report) if report.failed > 0 || report.panicked > 0 || report.aborted > 0 => {
            warn!(?report, "ingest pipeline stopped uncleanly");
        }
        Ok(_) => info!("ingest pipeline stopped cleanly"),
        Err(e) => error!(error = %e, "failed to stop ingest pipeline"),
    }

    info!("shutting down telemetry");
    shutdown_telemetry(telemetry_providers);
}

/// Resolve on SIGINT, or SIGTERM on Unix
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to set up SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received shutdown signal"),
        _ = terminate => info!("received SIGTERM signal"),
    }
}
