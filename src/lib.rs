//! Library root for `neuroflow`.
//!
//! Neuroflow is an LLM-powered backend for an ADHD-friendly task board designed to:
//! - Turn an unstructured "brain dump" into a short list of actionable tasks
//! - Prioritize each task with the Traffic Light system (red, yellow, green)
//! - Estimate a duration and give a one-line reason for every task
//!
//! The service exposes a small HTTP API (axum) and delegates classification to
//! any OpenAI-compatible LLM (Groq by default). The LLM sits behind a trait so
//! that it can be swapped or mocked.

#[deny(missing_docs)]
pub mod base;
pub mod interaction;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the neuroflow runtime:
/// - Creates the runtime context with the LLM client
/// - Serves the HTTP API until Ctrl-C
pub async fn start(config: Config) -> Void {
    info!("Starting neuroflow ...");

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config);

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
