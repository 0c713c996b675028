use thiserror::Error;

/// Domain error kinds. Every user-visible failure maps to one of these so the
/// API layer can emit a stable machine code instead of a stack trace.
#[derive(Error, Debug)]
pub enum LeadScoutError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider quota exhausted: {0}")]
    Quota(String),

    #[error("Transient provider failure: {0}")]
    Transient(String),

    #[error("Permanent provider failure: {0}")]
    Permanent(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store consistency conflict on {0}")]
    Consistency(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl LeadScoutError {
    /// Stable machine code for the wire envelope.
    pub fn error_code(&self) -> &'static str {
        match self {
            LeadScoutError::Config(_) => "config",
            LeadScoutError::Quota(_) => "quota",
            LeadScoutError::Transient(_) => "transient",
            LeadScoutError::Permanent(_) => "permanent",
            LeadScoutError::Validation(_) => "validation",
            LeadScoutError::Consistency(_) => "consistency",
            LeadScoutError::Cancelled => "cancelled",
            LeadScoutError::Unavailable(_) => "unavailable",
            LeadScoutError::Anyhow(_) => "internal",
        }
    }

    /// Whether the caller may retry the same call as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LeadScoutError::Transient(_) | LeadScoutError::Consistency(_)
        )
    }
}
