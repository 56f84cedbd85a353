use crate::client_manager::ClientId;
use thiserror::Error;

/// Invariant violations detected by the relay hub
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("client {0} is already registered")]
    DuplicateClient(ClientId),
}

/// Failures starting or running the HTTP server
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}
