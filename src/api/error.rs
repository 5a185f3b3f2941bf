//! Uniform error responses with machine-readable reason codes.

use crate::pipeline::IngestError;
use crate::validate::RejectReason;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Error response body: `{ "error": "<CODE>", "message": "..." }`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", message)
    }

    fn validation_failed(kind: &str, message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("VALIDATION_FAILED:{kind}"),
            message,
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.code,
            message: self.message,
        };
        (self.status, axum::Json(body)).into_response()
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match &err {
            IngestError::BadSourceUrl { .. } => {
                Self::new(StatusCode::BAD_REQUEST, "BAD_SOURCE_URL", err.to_string())
            }
            IngestError::BadCoordinates { .. } => {
                Self::new(StatusCode::BAD_REQUEST, "BAD_COORDS", err.to_string())
            }
            IngestError::Unlocatable(geocode) => Self::validation_failed(
                match geocode {
                    crate::geo::GeocodeError::Ambiguous { .. } => "ambiguous_location",
                    crate::geo::GeocodeError::NoMatch => "no_location",
                },
                err.to_string(),
            ),
            IngestError::Rejected(reason) => {
                let kind = match reason {
                    RejectReason::OutOfBounds { .. } => "bounds".to_string(),
                    other => other.code(),
                };
                Self::validation_failed(&kind, err.to_string())
            }
            IngestError::TriggerRejected(reason) => {
                Self::validation_failed("trigger", reason.clone())
            }
            IngestError::Store(_) => Self::internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_reasons_map_to_422_with_kind() {
        let err: ApiError = IngestError::Rejected(RejectReason::ForeignKeyword {
            token: "ukraina".to_string(),
        })
        .into();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code, "VALIDATION_FAILED:foreign_keyword:ukraina");

        let err: ApiError = IngestError::Rejected(RejectReason::OutOfBounds {
            lat: 41.88,
            lon: -87.63,
        })
        .into();
        assert_eq!(err.code, "VALIDATION_FAILED:bounds");
    }

    #[test]
    fn url_and_coordinate_errors_are_400s() {
        let err: ApiError = IngestError::BadSourceUrl {
            url: "http://localhost/x".to_string(),
            reason: "placeholder host".to_string(),
        }
        .into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "BAD_SOURCE_URL");

        let err: ApiError = IngestError::BadCoordinates {
            lat: 91.0,
            lon: 0.0,
        }
        .into();
        assert_eq!(err.code, "BAD_COORDS");
    }
}
