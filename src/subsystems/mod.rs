//! Subsystem modules for the Friday assistant.

pub mod agents;
pub mod comms;
pub mod memory;
pub mod tools;
