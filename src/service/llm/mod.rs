//! Integration with Large Language Model services.
//!
//! This module provides a thin wrapper around LLM clients (e.g., any
//! OpenAI-compatible API such as Groq) for turning a brain dump into a
//! schema-conforming list of tasks.
//!
//! The module defines the `GenericLlmClient` trait that can be implemented
//! for different LLM providers, with a default implementation for OpenAI-compatible APIs.

pub mod openai;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{BrainDumpResponse, Res};

// Traits.

/// Generic LLM client trait that clients must implement.
///
/// This trait defines the structured-generation capability: given the raw
/// brain dump, return data that conforms to [`BrainDumpResponse`] or fail.
#[async_trait]
pub trait GenericLlmClient: Send + Sync + 'static {
    /// Classify a brain dump into Traffic Light tasks.
    ///
    /// Implementations own schema conformance, including any re-asking of the
    /// model when its output does not parse. There are no partial results.
    async fn get_brain_dump_response(&self, raw_text: &str) -> Res<BrainDumpResponse>;
}

// Structs.

/// LLM client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct LlmClient {
    inner: Arc<dyn GenericLlmClient>,
}

impl Deref for LlmClient {
    type Target = dyn GenericLlmClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl LlmClient {
    pub fn new(inner: Arc<dyn GenericLlmClient>) -> Self {
        Self { inner }
    }
}

// Helpers.

/// Parse and validate a model reply into a [`BrainDumpResponse`].
///
/// Tolerates a surrounding markdown code fence.
pub fn parse_brain_dump(payload: &str) -> Res<BrainDumpResponse> {
    let json = strip_code_fence(payload);

    if json.is_empty() {
        return Err(anyhow::anyhow!("Reply was empty; expected a JSON object with a `tasks` array."));
    }

    let response: BrainDumpResponse = serde_json::from_str(json)?;
    response.validate()?;

    Ok(response)
}

/// Remove a ```` ```json ```` style fence, if present.
fn strip_code_fence(payload: &str) -> &str {
    let trimmed = payload.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Skip the info string (e.g., `json`).
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");

    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

// Tests.
