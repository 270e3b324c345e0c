//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc};

use serde::Deserialize;
use tracing::info;

use crate::base::prompts;

use super::types::{Res, Void};

/// Default OpenAI-compatible API base (Groq).
fn default_llm_api_base() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

/// Default model to use.
fn default_llm_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

/// Default sampling temperature.
fn default_llm_temperature() -> f32 {
    0.1
}

/// Default max output tokens.
fn default_llm_max_tokens() -> u32 {
    4096
}

/// Default number of generations allowed to reach schema-conforming output.
fn default_llm_max_attempts() -> u32 {
    3
}

/// Default system directive.
fn default_system_directive() -> String {
    prompts::BRAIN_DUMP_SYSTEM_DIRECTIVE.to_string()
}

/// Default listen address.
fn default_bind_address() -> String {
    "127.0.0.1:8000".to_string()
}

/// How the target schema is handed to the model.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LlmMode {
    /// A forced function call whose parameters are the schema.
    #[default]
    Tools,
    /// A strict `json_schema` response format.
    JsonSchema,
}

/// Configuration for the neuroflow application.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// The shared, immutable values.
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Configuration values, deserialized from the environment and config file.
#[derive(Debug, Deserialize, Clone)]
pub struct ConfigInner {
    /// LLM API key (`NEUROFLOW_LLM_API_KEY`, falling back to `GROQ_API_KEY`).
    ///
    /// An empty key is allowed at startup; requests then fail at the provider.
    #[serde(default)]
    pub llm_api_key: String,
    /// OpenAI-compatible API base URL (`NEUROFLOW_LLM_API_BASE`).
    #[serde(default = "default_llm_api_base")]
    pub llm_api_base: String,
    /// Model to use (`NEUROFLOW_LLM_MODEL`).
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    /// Sampling temperature (`NEUROFLOW_LLM_TEMPERATURE`).
    /// Value between 0 and 2. Lower values keep categorization consistent.
    #[serde(default = "default_llm_temperature")]
    pub llm_temperature: f32,
    /// Max output tokens (`NEUROFLOW_LLM_MAX_TOKENS`).
    #[serde(default = "default_llm_max_tokens")]
    pub llm_max_tokens: u32,
    /// Schema delivery mode, `tools` or `json_schema` (`NEUROFLOW_LLM_MODE`).
    #[serde(default)]
    pub llm_mode: LlmMode,
    /// Total generations allowed to obtain schema-conforming output (`NEUROFLOW_LLM_MAX_ATTEMPTS`).
    #[serde(default = "default_llm_max_attempts")]
    pub llm_max_attempts: u32,
    /// Optional custom system directive to override the default (`NEUROFLOW_SYSTEM_DIRECTIVE`).
    #[serde(default = "default_system_directive")]
    pub system_directive: String,
    /// Address the HTTP server listens on (`NEUROFLOW_BIND_ADDRESS`).
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ConfigInner {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base: default_llm_api_base(),
            llm_model: default_llm_model(),
            llm_temperature: default_llm_temperature(),
            llm_max_tokens: default_llm_max_tokens(),
            llm_mode: LlmMode::default(),
            llm_max_attempts: default_llm_max_attempts(),
            system_directive: default_system_directive(),
            bind_address: default_bind_address(),
        }
    }
}

impl Config {
    /// Load from `NEUROFLOW_*` environment variables, overlaid by a TOML file.
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("NEUROFLOW"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let mut inner: ConfigInner = cfg.build()?.try_deserialize()?;

        if inner.llm_api_key.is_empty()
            && let Ok(key) = std::env::var("GROQ_API_KEY")
        {
            info!("Using `GROQ_API_KEY` as the LLM API key.");
            inner.llm_api_key = key;
        }

        let result = Config { inner: Arc::new(inner) };
        result.validate()?;

        Ok(result)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Void {
        if self.llm_temperature < 0.0 || self.llm_temperature > 2.0 {
            return Err(anyhow::anyhow!("LLM temperature must be between 0 and 2."));
        }

        if self.llm_max_tokens < 1 || self.llm_max_tokens > 128000 {
            return Err(anyhow::anyhow!("LLM max tokens must be between 1 and 128000."));
        }

        if self.llm_max_attempts < 1 {
            return Err(anyhow::anyhow!("LLM max attempts must be at least 1."));
        }

        if self.llm_model.trim().is_empty() {
            return Err(anyhow::anyhow!("LLM model must not be empty."));
        }

        Ok(())
    }
}

// Tests.
