//! Super-resolution worker process.
//!
//! Wires the pipeline to Redis (progress, completion, request intake) and
//! PostgreSQL (audit records). The binary in `main.rs` only sequences
//! startup and shutdown; everything testable lives here.

pub mod config;
pub mod error;
pub mod intake;
