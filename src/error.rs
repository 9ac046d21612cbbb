use std::io;

use thiserror::Error;

/// Failure to turn user input into exactly one registry entry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("No server name given.")]
    Empty,
    #[error("No servers found matching '{0}'.")]
    NotFound(String),
    #[error("There are multiple matches for '{0}': {}", .1.join(", "))]
    Ambiguous(String, Vec<String>),
}

/// Network-level failure of a single query round-trip.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("timed out waiting for the server")]
    Timeout,
    #[error("failed to bind local socket: {0}")]
    BindFailed(#[source] io::Error),
    #[error("failed to connect: {0}")]
    ConnectionFailed(#[source] io::Error),
    #[error("failed to send: {0}")]
    SendFailed(#[source] io::Error),
    #[error("failed to receive: {0}")]
    ReceiveFailed(#[source] io::Error),
    #[error("malformed response framing: {0}")]
    MalformedFraming(String),
    #[error("server rejected command (error id {id}): {message}")]
    Rejected { id: u32, message: String },
}

impl From<tokio::time::error::Elapsed> for QueryError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        QueryError::Timeout
    }
}

/// A status payload that cannot be turned into a [crate::status::StatusRecord].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing field: {0}")]
    MissingField(String),
    #[error("invalid gamemode index: {0}")]
    InvalidGameMode(String),
    #[error("malformed variable block")]
    MalformedVariableBlock,
    #[error("malformed player line: {0}")]
    MalformedPlayerLine(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid address '{0}', expected host:port")]
    InvalidAddress(String),
    #[error("invalid server list line: {0}")]
    InvalidServerLine(String),
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Any failure surfaced by the engine.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("query task failed: {0}")]
    Task(String),
}
