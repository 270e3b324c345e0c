//! Service integrations for external APIs and clients.
//!
//! This module contains implementations for the services used by neuroflow:
//! - The HTTP surface (axum router, CORS, error mapping)
//! - LLM services (e.g., Groq through an OpenAI-compatible API)
//!
//! The LLM module defines both a generic trait and a concrete implementation,
//! allowing for extensibility and easy testing.

pub mod http;
pub mod llm;
