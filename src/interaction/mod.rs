//! Request handling for neuroflow.
//!
//! This module provides the HTTP handlers:
//! - Turning a brain dump into Traffic Light tasks via the LLM
//! - Parsing a single quick-add line locally
//! - Reporting the lane table and service health

pub mod brain_dump;
pub mod health;
pub mod lanes;
pub mod quick_add;
