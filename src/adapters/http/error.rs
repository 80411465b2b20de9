//! JSON error body and the dispatch error → status mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::dispatch::DispatchError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    pub message: String,
    /// Expected race outcome the client shows as "offer gone".
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub offer_gone: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            offer_gone: false,
            retryable: false,
        }
    }
}

/// Dispatch failure rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse::new(code, message),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        let status = match &err {
            DispatchError::TripNotFound(_) => StatusCode::NOT_FOUND,
            DispatchError::AlreadyAssigned
            | DispatchError::Expired
            | DispatchError::Cancelled
            | DispatchError::CycleInProgress(_) => StatusCode::CONFLICT,
            DispatchError::NotDispatchable(_) | DispatchError::NotEligible { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            DispatchError::PersistenceFailure { .. } | DispatchError::ArbiterUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            DispatchError::ChannelDeliveryFailure { .. } => StatusCode::BAD_GATEWAY,
            DispatchError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
        }
        Self {
            status,
            body: ErrorResponse {
                error_code: err.code().to_string(),
                message: err.to_string(),
                offer_gone: err.is_offer_gone(),
                retryable: err.is_retryable(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::TripId;

    #[test]
    fn not_found_maps_to_404() {
        let err = ApiError::from(DispatchError::TripNotFound(TripId::new()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn offer_gone_and_cycle_in_progress_map_to_409() {
        for err in [
            DispatchError::AlreadyAssigned,
            DispatchError::Expired,
            DispatchError::CycleInProgress(TripId::new()),
        ] {
            assert_eq!(ApiError::from(err).status(), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn persistence_failure_maps_to_503_and_is_retryable() {
        let err = ApiError::from(DispatchError::PersistenceFailure {
            attempts: 3,
            message: "timeout".into(),
        });
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.body.retryable);
    }

    #[test]
    fn flags_are_omitted_when_false() {
        let json = serde_json::to_value(ErrorResponse::new("X", "y")).unwrap();
        assert!(json.get("offerGone").is_none());
        assert_eq!(json["errorCode"], "X");
    }
}
