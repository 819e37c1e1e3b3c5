/// Error taxonomy of the conversation controller. Every variant resolves to a
/// defined user-facing reply and next state; none may leave a chat stuck.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("AI provider error: {0}")]
    Ai(String),

    #[error("catalog unavailable")]
    CatalogUnavailable,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("access denied")]
    AccessDenied,

    #[error("conversation invariant violated: {0}")]
    InvariantViolation(String),
}
