use annotation::AnnotationError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use monitor::MonitorError;
use serde_json::json;
use store::StoreError;

/// Handler error rendered as `{"error": message, "code": CODE}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Annotation(#[from] AnnotationError),

    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error("Database error: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Annotation(err) => match err {
                AnnotationError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                AnnotationError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
                AnnotationError::Busy(_) => (StatusCode::CONFLICT, "BUSY"),
                AnnotationError::Processing(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "PROCESSING_ERROR")
                }
                AnnotationError::SourceUnavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "SOURCE_UNAVAILABLE")
                }
            },
            AppError::Monitor(MonitorError::SourceUnavailable(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SOURCE_UNAVAILABLE")
            }
            AppError::Monitor(MonitorError::Spawn(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
            AppError::Store(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        if status.is_server_error() {
            tracing::error!(error = %self, code, "Request failed");
        } else {
            tracing::debug!(error = %self, code, "Request rejected");
        }

        let body = json!({
            "error": self.to_string(),
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                AppError::from(AnnotationError::NotFound("e".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::from(AnnotationError::InvalidInput("x".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::from(AnnotationError::Busy("e".into())),
                StatusCode::CONFLICT,
            ),
            (
                AppError::from(AnnotationError::Processing("disk".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::from(MonitorError::SourceUnavailable("cam".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AppError::from(AnnotationError::SourceUnavailable("cam".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (AppError::BadRequest("b".into()), StatusCode::BAD_REQUEST),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
