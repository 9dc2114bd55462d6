//! Error types for pollbot.

use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
///
/// Domain outcomes are ordinary results of poll operations and are never
/// retried automatically; only the server errors at the bottom indicate an
/// operational problem.
#[derive(Debug, Error)]
pub enum AppError {
    // === Creation input errors ===
    #[error("question is empty")]
    EmptyQuestion,

    #[error("a poll needs at least 2 options")]
    TooFewOptions,

    #[error("a poll cannot have more than {0} options")]
    TooManyOptions(usize),

    #[error("option {0} is empty")]
    EmptyOption(usize),

    #[error("option {0} is too long (max {1} chars)")]
    OptionTooLong(usize, usize),

    // === Domain precondition errors ===
    #[error("poll not found: {0}")]
    PollNotFound(String),

    #[error("option {0} is not part of this poll")]
    OptionNotFound(i32),

    #[error("your vote is already recorded")]
    AlreadyVoted,

    #[error("poll is no longer accepting votes")]
    PollEnded,

    #[error("poll has already ended")]
    AlreadyEnded,

    #[error("forbidden: {0}")]
    Forbidden(String),

    // === Identifier generation ===
    #[error("poll id already exists: {0}")]
    PollIdExists(String),

    #[error("could not generate a unique poll id")]
    IdGenerationFailed,

    // === Server Errors ===
    #[error("database error: {0}")]
    Database(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the stable error code for this error.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyQuestion => "EMPTY_QUESTION",
            Self::TooFewOptions => "TOO_FEW_OPTIONS",
            Self::TooManyOptions(_) => "TOO_MANY_OPTIONS",
            Self::EmptyOption(_) => "EMPTY_OPTION",
            Self::OptionTooLong(_, _) => "OPTION_TOO_LONG",
            Self::PollNotFound(_) => "POLL_NOT_FOUND",
            Self::OptionNotFound(_) => "OPTION_NOT_FOUND",
            Self::AlreadyVoted => "ALREADY_VOTED",
            Self::PollEnded => "POLL_ENDED",
            Self::AlreadyEnded => "ALREADY_ENDED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::PollIdExists(_) => "POLL_ID_EXISTS",
            Self::IdGenerationFailed => "ID_GENERATION_FAILED",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns whether this error should be logged as an operational error
    /// rather than a normal domain outcome.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Config(_) | Self::Internal(_)
        )
    }
}

// === From implementations ===

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}
