//! Configuration errors.

use thiserror::Error;

/// Why a [`MailConfig`](super::MailConfig) could not be built.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// A required builder field was not set or was empty.
    #[error("{field} is required")]
    MissingField {
        /// Builder field name.
        field: &'static str,
    },

    /// The base URL does not parse or cannot carry a path.
    #[error("Invalid base URL {url:?}: {reason}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// A rate below or equal to zero, a non-finite rate, or a zero burst.
    #[error("Invalid rate limit: {reason}")]
    InvalidRateLimit {
        /// What was wrong.
        reason: String,
    },

    /// A required environment variable is unset.
    #[error("{variable} must be set")]
    MissingVariable {
        /// Variable name.
        variable: &'static str,
    },

    /// An environment variable does not parse.
    #[error("{variable} has an invalid value: {value:?}")]
    InvalidVariable {
        /// Variable name.
        variable: &'static str,
        /// Raw value.
        value: String,
    },
}
