//! Dispatch error types.

use thiserror::Error;

/// Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Dispatch errors.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A required input field was absent.
    #[error("Missing required field: {path}")]
    MissingField {
        /// Dotted path of the field that was not provided.
        path: String,
    },

    /// A field was present but could not be coerced to the expected shape.
    #[error("Invalid value for {field}: expected {expected}, got {value}")]
    InvalidType {
        /// Field name.
        field: String,
        /// Expected shape (e.g. "integer", "boolean").
        expected: &'static str,
        /// Offending value, rendered as text.
        value: String,
    },

    /// A field's value did not match any recognized enum variant.
    #[error("Unknown value for {field}: {value}")]
    UnknownEnumVariant {
        /// Field name.
        field: String,
        /// Offending value.
        value: String,
    },

    /// The requested action is not one of the supported set.
    #[error("{action} is not one of the supported actions {supported}")]
    UnsupportedAction {
        /// The action that was requested.
        action: String,
        /// The supported action set, rendered for the caller.
        supported: &'static str,
    },

    /// The external token lookup errored or returned nothing.
    #[error("Token resolution failed: {0}")]
    TokenResolution(String),

    /// Provider rejection, wrapping the provider's own code and message.
    #[error("FCM code {code}, with reason: {message}")]
    Provider {
        /// Provider error code (e.g. "UNREGISTERED", "404").
        code: String,
        /// Provider error message.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error.
    #[error("Network error: {0}")]
    Network(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Timeout error.
    #[error("Operation timed out")]
    Timeout,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatchError {
    /// Convenience constructor for [`DispatchError::MissingField`].
    pub fn missing(path: impl Into<String>) -> Self {
        Self::MissingField { path: path.into() }
    }

    /// Check if this error originated in the input rather than downstream.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::MissingField { .. }
                | Self::InvalidType { .. }
                | Self::UnknownEnumVariant { .. }
                | Self::UnsupportedAction { .. }
        )
    }
}

impl From<reqwest::Error> for DispatchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Network(err.to_string())
        } else {
            Self::Provider {
                code: err
                    .status()
                    .map(|s| s.as_u16().to_string())
                    .unwrap_or_else(|| "UNKNOWN".to_string()),
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
