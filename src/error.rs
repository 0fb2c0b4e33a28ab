use thiserror::Error;

/// Main error type for otrscore
#[derive(Error, Debug)]
pub enum OtrError {
    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Dataset (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network failure talking to the completion API (includes timeouts)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Completion API rejected the credential (401/403)
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Completion API returned a non-success status
    #[error("Completion API error {status}: {body}")]
    Api { status: u16, body: String },

    /// Completion API answered 2xx but without a usable first choice
    #[error("Completion error: {0}")]
    Completion(String),

    /// Prompt template errors
    #[error("Template error: {0}")]
    Template(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenient Result type using OtrError
pub type Result<T> = std::result::Result<T, OtrError>;
