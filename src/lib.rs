//! Friday: a personal voice/text assistant.
//!
//! The binary in `main.rs` wires these modules together; integration tests
//! drive them directly.

pub mod config;
pub mod error;
pub mod llm;
pub mod logger;
pub mod subsystems;
