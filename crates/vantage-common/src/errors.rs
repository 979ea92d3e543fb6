#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session already has a viewer: {0}")]
    SessionFull(String),

    #[error("role not permitted: {0}")]
    UnauthorizedRole(String),

    #[error("connection lost")]
    ConnectionLost,

    #[error("internal error: {0}")]
    InternalError(String),
}
