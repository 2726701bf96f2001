use tokio::task::JoinError;
use exif::Error as ExifError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use tantivy::TantivyError;
use actix_web::{HttpResponse, ResponseError, http::StatusCode};

const GENERIC_SERVER_MESSAGE: &str = "Something went wrong";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("EXIF error: {0}")]
    Exif(#[from] ExifError),

    #[error("Tantivy error: {0}")]
    Tantivy(#[from] TantivyError),

    #[error("Tantivy directory error: {0}")]
    TantivyDirectory(#[from] tantivy::directory::error::OpenDirectoryError),

    #[error("JSON error: {0}")]
    Json(#[from] SerdeJsonError),

    #[error("Tokio join error: {0}")]
    Join(#[from] JoinError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Failed to process {name}: {reason}")]
    Processing { name: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Batch failed for: {}", failed.join(", "))]
    BatchFailed { failed: Vec<String> },
}

impl AppError {
    /// Tags an error raised while processing a single file with that file's name.
    pub fn processing(name: &str, err: impl std::fmt::Display) -> Self {
        AppError::Processing {
            name: name.to_string(),
            reason: err.to_string(),
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let message = if self.is_client_error() {
            self.to_string()
        } else {
            GENERIC_SERVER_MESSAGE.to_string()
        };
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({
                "error": message,
            }))
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Image(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Exif(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Tantivy(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::TantivyDirectory(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Processing { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BatchFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_request_errors() {
        let err = AppError::Validation("ids parameter is missing".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.is_client_error());
    }

    #[test]
    fn batch_failures_are_server_errors() {
        let err = AppError::BatchFailed { failed: vec!["a.jpg".into()] };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.is_client_error());
        assert_eq!(err.to_string(), "Batch failed for: a.jpg");
    }

    #[test]
    fn configuration_errors_are_server_errors() {
        let err: AppError = config::ConfigError::Message("missing upload_directory".into()).into();
        assert!(matches!(err, AppError::Config(_)));
        assert!(!err.is_client_error());
    }

    #[test]
    fn processing_errors_carry_the_file_name() {
        let err = AppError::processing("b.png", "not an image");
        match err {
            AppError::Processing { ref name, ref reason } => {
                assert_eq!(name, "b.png");
                assert_eq!(reason, "not an image");
            }
            _ => panic!("expected a processing error"),
        }
    }
}
