//! Error types and handling for the Alliant Energy poller
//!
//! Only [`AlliantError::Auth`] and transport-level failures are expected to
//! escape a fetch cycle. Everything else the provider gets wrong degrades into
//! absent snapshot fields instead of an error.

use thiserror::Error;

/// Result type alias for Alliant Energy operations
pub type Result<T> = std::result::Result<T, AlliantError>;

/// Main error type
#[derive(Debug, Error)]
pub enum AlliantError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Transport failures talking to the provider
    #[error("Network error: {message}")]
    Network { message: String },

    /// Unexpected provider payloads
    #[error("API error: {message}")]
    Api { message: String },

    /// Rejected credentials or failed account discovery
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Credential cache failures
    #[error("Cache error: {message}")]
    Cache { message: String },
}

impl AlliantError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        AlliantError::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        AlliantError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        AlliantError::Io {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        AlliantError::Network {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        AlliantError::Api {
            message: message.into(),
        }
    }

    /// Create a new auth error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        AlliantError::Auth {
            message: message.into(),
        }
    }

    /// Create a new cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        AlliantError::Cache {
            message: message.into(),
        }
    }

    /// Whether the host should treat this as a credential failure
    pub fn is_auth(&self) -> bool {
        matches!(self, AlliantError::Auth { .. })
    }
}

impl From<std::io::Error> for AlliantError {
    fn from(err: std::io::Error) -> Self {
        AlliantError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for AlliantError {
    fn from(err: serde_yaml::Error) -> Self {
        AlliantError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AlliantError {
    fn from(err: serde_json::Error) -> Self {
        AlliantError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for AlliantError {
    fn from(err: reqwest::Error) -> Self {
        AlliantError::network(err.to_string())
    }
}
