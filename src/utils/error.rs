//! Error Handling Module
//!
//! Defines the error types used across the leafsight library.
//! Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for leafsight operations
#[derive(Error, Debug)]
pub enum LeafsightError {
    /// Error loading or decoding an image file
    #[error("Failed to load image at '{0}': {1}")]
    ImageLoad(PathBuf, String),

    /// Error processing image data
    #[error("Image error: {0}")]
    Image(String),

    /// Error loading or validating the taxonomy artifact
    #[error("Taxonomy error: {0}")]
    Taxonomy(String),

    /// Error with model construction or checkpoint handling
    #[error("Model error: {0}")]
    Model(String),

    /// Error during the forward or backward pass
    #[error("Inference error: {0}")]
    Inference(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for LeafsightError {
    fn from(err: serde_json::Error) -> Self {
        LeafsightError::Serialization(err.to_string())
    }
}

impl From<image::ImageError> for LeafsightError {
    fn from(err: image::ImageError) -> Self {
        LeafsightError::Image(err.to_string())
    }
}

/// Convenience Result type for leafsight operations
pub type Result<T> = std::result::Result<T, LeafsightError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LeafsightError::Taxonomy("bad key".to_string());
        assert_eq!(format!("{}", err), "Taxonomy error: bad key");
    }

    #[test]
    fn test_image_load_error() {
        let path = PathBuf::from("/path/to/leaf.jpg");
        let err = LeafsightError::ImageLoad(path.clone(), "file not found".to_string());
        assert!(format!("{}", err).contains("leaf.jpg"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: LeafsightError = io_err.into();
        assert!(matches!(err, LeafsightError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: LeafsightError = json_err.into();
        assert!(matches!(err, LeafsightError::Serialization(_)));
    }
}
