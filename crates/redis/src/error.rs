use rebulk_engine::BulkActionError;

/// Errors raised by the Redis collaborator.
#[derive(Debug, thiserror::Error)]
pub enum RedisWorkerError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// `CLUSTER NODES` output could not be understood.
    #[error("Invalid cluster topology: {0}")]
    Topology(String),

    /// A worker was run before its connection was established.
    #[error("Worker for {0} is not prepared")]
    NotPrepared(String),
}

impl RedisWorkerError {
    /// Whether the connection itself is unusable, as opposed to a
    /// single command being rejected by the server.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Redis(e) => is_connection_error(e),
            Self::Topology(_) | Self::NotPrepared(_) => true,
        }
    }
}

/// Errors after which no further command can succeed on the connection.
pub fn is_connection_error(e: &redis::RedisError) -> bool {
    e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
}

impl From<RedisWorkerError> for BulkActionError {
    fn from(err: RedisWorkerError) -> Self {
        match &err {
            RedisWorkerError::Redis(e) if is_connection_error(e) => {
                BulkActionError::Connection(err.to_string())
            }
            _ => BulkActionError::Execution(err.to_string()),
        }
    }
}
