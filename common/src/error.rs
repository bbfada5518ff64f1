//! Error types

use thiserror::Error;

/// Engine error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Parse error in {source_name}: {reason}")]
    Parse { source_name: String, reason: String },
}

/// Result alias
pub type Result<T> = std::result::Result<T, Error>;
