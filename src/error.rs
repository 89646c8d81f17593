// src/error.rs

//! Unified error handling for the harvester.

use std::fmt;

use thiserror::Error;

use crate::services::FetchError;

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Storage call failed
    #[error("database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    /// Remote fetch failed after classification
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Request never produced a response
    #[error("transport error: {0}")]
    Transport(String),

    /// Payload did not have the expected shape
    #[error("transform error: {0}")]
    Transform(String),

    /// Stored value could not be decoded
    #[error("date/time parse error: {0}")]
    DateParse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Seed lookup error
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Listing an entity's records failed
    #[error("Listing error for {player}: {message}")]
    Listing { player: String, message: String },
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a discovery error.
    pub fn discovery(message: impl Into<String>) -> Self {
        Self::Discovery(message.into())
    }

    /// Create a transport error.
    pub fn transport(message: impl fmt::Display) -> Self {
        Self::Transport(message.to_string())
    }

    /// Create a transform error.
    pub fn transform(message: impl fmt::Display) -> Self {
        Self::Transform(message.to_string())
    }

    /// Create a listing error with the player it concerns.
    pub fn listing(player: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Listing {
            player: player.into(),
            message: message.to_string(),
        }
    }

    /// Whether the engine must stop: only a lost storage connection qualifies.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Database(tokio_rusqlite::Error::ConnectionClosed)
                | Self::Database(tokio_rusqlite::Error::Close(_))
        )
    }
}
