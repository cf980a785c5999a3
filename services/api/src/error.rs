//! services/api/src/error.rs
//!
//! Defines the primary error type for the API service, and how engine errors
//! are reported to HTTP callers.

use crate::config::ConfigError;
use axum::http::StatusCode;
use trivia_core::EngineError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a failure while applying the embedded migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// Maps an engine error to the status code and message returned by REST handlers.
pub fn engine_error_response(error: EngineError) -> (StatusCode, String) {
    let status = match &error {
        EngineError::TierLocked { .. }
        | EngineError::NotAuthorized { .. }
        | EngineError::NotAParticipant { .. } => StatusCode::FORBIDDEN,
        EngineError::TierComplete(_)
        | EngineError::AlreadyAnswered(_)
        | EngineError::InvalidState { .. } => StatusCode::CONFLICT,
        EngineError::InvalidOpponent(_)
        | EngineError::InvalidOption { .. }
        | EngineError::InvalidQuestionCount { .. }
        | EngineError::QuestionNotLive(_) => StatusCode::BAD_REQUEST,
        EngineError::ChallengeNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let message = match status {
        StatusCode::INTERNAL_SERVER_ERROR => "A storage error occurred".to_string(),
        _ => error.to_string(),
    };
    (status, message)
}
