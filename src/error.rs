//! Application-wide error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("llm error: {0}")]
    Llm(String),

    #[error("memory error: {0}")]
    Memory(String),

    #[error("speech error: {0}")]
    Speech(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
