use thiserror::Error;

/// Errors that can occur while bringing up or operating a connection.
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("control-plane record truncated: expected {expected} octets, got {got}")]
    ShortRead { expected: usize, got: usize },

    #[error("control-plane record malformed: {0}")]
    Malformed(String),

    #[error("slot table at capacity")]
    Capacity,

    #[error("verbs setup failed: {0}")]
    VerbsSetup(String),

    #[error("queue-pair state transition failed: {0}")]
    StateTransition(String),

    #[error("completion error: status={status}")]
    CompletionError { status: String },

    #[error("buffer pool exhausted")]
    PoolExhausted,

    #[error("no entropy source available to draw a PSN")]
    RandomFailure,

    #[error("no device found")]
    NoDevice,

    #[error("remote-write was requested but this connection was not admitted with remote_write.enabled")]
    RemoteWriteDisabled,
}

pub type Result<T> = std::result::Result<T, BrokerError>;
