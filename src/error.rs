//! Error taxonomy for the OCR pipeline.
//!
//! Validation and input errors map to 400, engine and unexpected failures
//! to 500. Every variant serializes as `{"detail": message}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    /// Missing or ambiguous file source, unknown language, empty payload.
    #[error("{0}")]
    InvalidInput(String),

    /// URL fetch failed (network, timeout, non-2xx).
    #[error("failed to download file: {0}")]
    Download(String),

    /// Byte stream claimed to be a PDF but could not be parsed.
    #[error("failed to convert PDF: {0}")]
    Conversion(String),

    /// Unparseable page-selection expression.
    #[error("invalid page expression: {0}")]
    InvalidPageExpression(String),

    /// Selection still exceeds the page cap after clamping.
    #[error("page limit exceeded: {0}")]
    PageLimitExceeded(String),

    /// OCR engine failure not attributable to input shape.
    #[error("OCR engine error: {0}")]
    Engine(String),

    /// Catch-all; message is surfaced to the caller (internal service).
    #[error("unexpected error: {0}")]
    Unexpected(#[from] anyhow::Error),
}

impl OcrError {
    pub fn status(&self) -> StatusCode {
        match self {
            OcrError::InvalidInput(_)
            | OcrError::Download(_)
            | OcrError::Conversion(_)
            | OcrError::InvalidPageExpression(_)
            | OcrError::PageLimitExceeded(_) => StatusCode::BAD_REQUEST,
            OcrError::Engine(_) | OcrError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for OcrError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }
        (status, Json(serde_json::json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_are_400() {
        for err in [
            OcrError::InvalidInput("no file".into()),
            OcrError::Download("timed out".into()),
            OcrError::Conversion("not a pdf".into()),
            OcrError::InvalidPageExpression("1-x".into()),
            OcrError::PageLimitExceeded("60 > 50".into()),
        ] {
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_engine_errors_are_500() {
        assert_eq!(
            OcrError::Engine("corrupt image".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            OcrError::Unexpected(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_message_includes_cause() {
        let err = OcrError::Download("connection refused".into());
        assert_eq!(err.to_string(), "failed to download file: connection refused");
    }
}
