//! Runtime services and shared state for neuroflow.

use tracing::{instrument, warn};

use crate::{
    base::{config::Config, types::Void},
    service::{http, llm::LlmClient},
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the configuration and the LLM client, both built once at
/// startup and shared immutably with every request.
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The LLM client instance.
    pub llm: LlmClient,
}

impl Runtime {
    /// Create a new runtime instance.
    #[instrument(skip_all)]
    pub fn new(config: Config) -> Self {
        if config.llm_api_key.is_empty() {
            warn!("No LLM API key configured; brain dump requests will fail until one is set.");
        }

        // Initialize the LLM client.
        let llm = LlmClient::openai(&config);

        Self { config, llm }
    }

    pub async fn start(&self) -> Void {
        http::serve(self.clone()).await
    }
}
