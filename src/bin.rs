//! Binary entry point for `neuroflow`.
//!
//! This module provides the command-line interface for neuroflow with options
//! for the config file, the listen address, the model, and log verbosity.

use std::{net::SocketAddr, sync::Arc};

use clap::Parser;
use neuroflow::base::{
    config::Config,
    types::{Res, Void},
};
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{Protocol, WithExportConfig};
use tracing_subscriber::{filter::LevelFilter, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt};

/// Neuroflow – turn a brain dump into Traffic Light tasks.
///
/// Configuration can come from `config.toml` or `NEUROFLOW_*` environment
/// variables. The LLM API key is read from `NEUROFLOW_LLM_API_KEY`, or from
/// `GROQ_API_KEY` when that is unset.
#[derive(Parser, Debug)]
#[command(version, author, about, long_about = None)]
struct Args {
    /// Override the config file path (optional).
    ///
    /// By default, the service will look for a config file at `.hidden/config.toml`
    /// in the current directory.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
    /// Override the listen address (e.g., `0.0.0.0:8000`).
    #[arg(short, long)]
    bind: Option<SocketAddr>,
    /// Override the LLM model (e.g., `llama-3.1-8b-instant`).
    #[arg(short, long)]
    model: Option<String>,
    /// Export spans to an OTLP collector over HTTP.
    #[arg(long)]
    otlp: bool,
    /// Increase log verbosity (-v, -vv, etc.).
    ///
    /// Use multiple times to increase verbosity:
    /// - No flag: INFO level
    /// - -v: DEBUG level
    /// - -vv or more: TRACE level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Main entry point for the neuroflow binary.
#[tokio::main]
async fn main() -> Void {
    let args = Args::parse();

    init_tracing(args.verbose, args.otlp)?;

    let config = load_config(&args)?;

    neuroflow::start(config).await
}

/// Install the stdout layer, plus the OTLP layer when requested.
fn init_tracing(verbose: u8, otlp: bool) -> Void {
    let level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let stdout = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE);

    let otel = if otlp {
        let exporter = opentelemetry_otlp::SpanExporter::builder().with_http().with_protocol(Protocol::HttpBinary).build()?;
        let tracer = opentelemetry_sdk::trace::SdkTracerProvider::builder().with_simple_exporter(exporter).build().tracer("neuroflow");

        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry().with(otel).with(LevelFilter::from_level(level)).with(stdout).try_init()?;

    Ok(())
}

/// Load the config, then apply command-line overrides.
fn load_config(args: &Args) -> Res<Config> {
    let mut config = Config::load(args.config.as_deref())?;

    if let Some(bind) = args.bind {
        Arc::make_mut(&mut config.inner).bind_address = bind.to_string();
    }

    if let Some(model) = &args.model {
        Arc::make_mut(&mut config.inner).llm_model = model.clone();
    }

    config.validate()?;

    Ok(config)
}

// Tests.
