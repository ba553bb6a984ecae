//! Centralized error types for the Hoenn map.
//!
//! This module provides a typed error hierarchy that:
//! - Enables precise error handling throughout the workspace
//! - Provides user-friendly messages suitable for display
//! - Preserves full error context for logging

use thiserror::Error;

/// Top-level application error type.
///
/// Use `user_message()` to get a display-appropriate message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Location catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Storage(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Catalog(e) => e.user_message(),
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Unable to connect. Check your internet connection."
            }
            NetworkError::Timeout => "The request timed out. Please try again.",
            NetworkError::ServerError { status, .. } if *status == 401 => {
                "The weather API key was rejected. Check your settings."
            }
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "The weather service is experiencing issues. Please try again later."
            }
            NetworkError::ServerError { .. } => "The request failed. Please try again.",
            NetworkError::InvalidResponse(_) => {
                "Received an unexpected response. Please try again."
            }
        }
    }
}

/// Durable key-value storage errors (SQLite, local state).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage open failed: {0}")]
    OpenFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Data corruption detected: {0}")]
    Corruption(String),
}

impl StorageError {
    pub fn user_message(&self) -> &'static str {
        match self {
            StorageError::OpenFailed(_) => {
                "Unable to open the weather cache. Try restarting the app."
            }
            StorageError::QueryFailed(_) => "A cache operation failed. Please try again.",
            StorageError::Corruption(_) => {
                "The weather cache may be corrupted. Consider deleting it."
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NotFound(_) => "Configuration not found. Using defaults.",
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}

/// Location catalog defects. All of these are fatal at load time.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog contains no locations")]
    Empty,

    #[error("Duplicate location name: {0}")]
    DuplicateName(String),

    #[error("Location {0} declares no possible conditions")]
    NoConditions(String),

    #[error("Location {location} lists condition {condition} more than once")]
    DuplicateCondition { location: String, condition: String },

    #[error("Default condition {default} of location {location} is not one of its possible conditions")]
    DefaultNotAllowed { location: String, default: String },

    #[error("Location {location} has out-of-range proxy coordinates ({lat}, {lon})")]
    InvalidCoordinates { location: String, lat: f64, lon: f64 },

    #[error("Catalog parse error: {0}")]
    Parse(String),

    #[error("Catalog read error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    pub fn user_message(&self) -> &'static str {
        match self {
            CatalogError::Parse(_) => "The location catalog is malformed. Check the catalog file.",
            CatalogError::Io(_) => "The location catalog could not be read.",
            _ => "The location catalog is invalid. Check the catalog file.",
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_connect() {
            NetworkError::ConnectionFailed(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}

/// Extension trait for converting rusqlite errors to our error types.
pub trait RusqliteErrorExt {
    fn into_storage_error(self) -> StorageError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_storage_error(self) -> StorageError {
        match &self {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("corrupt") => {
                StorageError::Corruption(self.to_string())
            }
            _ => StorageError::QueryFailed(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_conversion() {
        let catalog_err = CatalogError::Empty;
        let app_err: AppError = catalog_err.into();
        assert!(matches!(app_err, AppError::Catalog(CatalogError::Empty)));
    }

    #[test]
    fn test_user_message_propagation() {
        let app_err = AppError::Network(NetworkError::Timeout);
        assert_eq!(
            app_err.user_message(),
            "The request timed out. Please try again."
        );
    }

    #[test]
    fn test_rejected_api_key_message() {
        let err = NetworkError::ServerError {
            status: 401,
            message: "Invalid API key".into(),
        };
        assert!(err.user_message().contains("API key"));
    }

    #[test]
    fn test_default_not_allowed_display_names_both_sides() {
        let err = CatalogError::DefaultNotAllowed {
            location: "mt-chimney".into(),
            default: "fog".into(),
        };
        let text = err.to_string();
        assert!(text.contains("mt-chimney"));
        assert!(text.contains("fog"));
    }

    #[test]
    fn test_corrupt_sqlite_maps_to_corruption() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(11),
            Some("database disk image is malformed: corrupt".into()),
        );
        assert!(matches!(err.into_storage_error(), StorageError::Corruption(_)));
    }
}
