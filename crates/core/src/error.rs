//! Error types for the backdrop-core library.
//!
//! This module provides granular error variants for the different failure
//! modes of the client: configuration, the segmentation round trip, image
//! decoding and export encoding.

use thiserror::Error;

/// Notice shown when the segmentation service cannot be reached or rejects a request.
pub const SERVICE_FAILURE_NOTICE: &str = "Failed to process image. Make sure backend is running.";

/// Notice shown when a selected file or a service response is not a readable image.
pub const DECODE_FAILURE_NOTICE: &str = "The image could not be read. Try a different file.";

/// Errors that can occur within the backdrop-core library.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (invalid URL, bad timeout value).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A colour string could not be parsed.
    #[error("Invalid colour: {0}")]
    InvalidColor(String),

    /// Transport failure while talking to the segmentation service.
    #[error("Network error: {0}")]
    Network(String),

    /// The segmentation service answered with a non-success status.
    #[error("Segmentation service returned HTTP {status}: {body}")]
    ServiceStatus {
        /// HTTP status code of the response.
        status: u16,
        /// Leading part of the response body, for diagnostics.
        body: String,
    },

    /// Bytes could not be decoded as an image.
    #[error("Image decode failed: {0}")]
    Decode(String),

    /// The composited raster could not be encoded.
    #[error("Image encode failed: {0}")]
    Encode(String),

    /// An export was requested before a processed image is available.
    #[error("No processed image is available yet")]
    NotReady,

    /// UI-related errors (window creation, clipboard, dialogs).
    #[error("UI error: {0}")]
    Ui(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An unclassified error.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AppError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a network error with the given message.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Creates a decode error with the given message.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Creates an encode error with the given message.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Creates a UI error with the given message.
    pub fn ui(msg: impl Into<String>) -> Self {
        Self::Ui(msg.into())
    }

    /// Returns the text shown to the user when this error ends a submission.
    ///
    /// Transport details stay in the logs; the notice only says what the
    /// user can do about it.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Network(_) | Self::ServiceStatus { .. } => SERVICE_FAILURE_NOTICE,
            Self::Decode(_) => DECODE_FAILURE_NOTICE,
            Self::NotReady => "Nothing to export yet.",
            Self::Encode(_) | Self::Io(_) => "Could not save the result.",
            Self::Config(_) | Self::InvalidColor(_) | Self::Ui(_) | Self::Unknown(_) => {
                "Something went wrong."
            }
        }
    }
}

/// A convenient alias for Result with [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
