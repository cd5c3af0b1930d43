//! Error types shared by every stage of the light field pipeline

use std::path::PathBuf;

use thiserror::Error;

/// Result type for light field operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while ingesting poses, building cameras or rendering
#[derive(Error, Debug)]
pub enum Error {
    /// A required field is missing or the file structure is malformed
    #[error("Format error: {0}")]
    Format(String),

    /// Camera intrinsics model outside the supported pinhole families
    #[error("Unsupported camera model: {0}")]
    UnsupportedModel(String),

    /// No rasterization context could be created or none was supplied
    #[error("No rasterization context available: {0}")]
    UnavailableContext(String),

    /// Malformed image buffer or pose handed to a constructor
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid field of view, clip planes or render settings
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An image file could not be opened or decoded
    #[error("Cannot read image {}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl Error {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    /// True for failures that stem from the structure of an input file
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Error::Format(_) | Error::Json(_) | Error::Io(_) | Error::Image { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = Error::UnsupportedModel("FOV".to_string());
        assert_eq!(err.to_string(), "Unsupported camera model: FOV");

        let err = Error::config("near plane must be positive");
        assert_eq!(err.to_string(), "Configuration error: near plane must be positive");
    }

    #[test]
    fn test_json_errors_count_as_format_errors() {
        let json_err = serde_json::from_str::<serde_json::Value>("{ not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(err.is_format_error());
        assert!(!Error::InvalidInput("x".into()).is_format_error());
    }

    #[test]
    fn test_image_errors_count_as_format_errors() {
        let source = image::open("/definitely/not/here.png").unwrap_err();
        let err = Error::Image {
            path: PathBuf::from("here.png"),
            source,
        };
        assert!(err.is_format_error());
        assert!(err.to_string().starts_with("Cannot read image here.png"));
    }
}
