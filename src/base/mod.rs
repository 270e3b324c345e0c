//! Core components, types, and utilities for neuroflow.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - The triage directive for LLM interactions.
//! - Task, lane, and result types.

pub mod config;
pub mod prompts;
pub mod types;
