use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no parser registered for extension '{0}'")]
    UnsupportedExtension(String),

    #[error("cannot register multiple parsers for '{0}'")]
    DuplicateParser(String),

    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] sled::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
