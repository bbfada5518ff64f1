use thiserror::Error;

#[derive(Error, Debug)]
pub enum CardMatchError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    #[error("Invalid registry snapshot: {0}")]
    InvalidRegistry(String),

    #[error("Invalid match results: {0}")]
    InvalidMatches(String),

    #[error("No cards found in {0}")]
    NoCardsFound(String),

    #[error("JSON error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] cardmatch_common::Error),
}

pub type Result<T> = std::result::Result<T, CardMatchError>;
