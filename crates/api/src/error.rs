//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fulfillment::FulfillmentError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed path parameter or identity header.
    #[error("{0}")]
    BadRequest(String),

    /// No caller identity on the request.
    #[error("{0}")]
    Unauthorized(String),

    #[error(transparent)]
    Fulfillment(#[from] FulfillmentError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Fulfillment(err) => match err {
                FulfillmentError::NotFound(_) => StatusCode::NOT_FOUND,
                FulfillmentError::Forbidden(_) => StatusCode::FORBIDDEN,
                FulfillmentError::Validation(_) => StatusCode::BAD_REQUEST,
                FulfillmentError::InvalidState(_)
                | FulfillmentError::AdjustmentConflict(_)
                | FulfillmentError::Conflict(_) => StatusCode::CONFLICT,
                FulfillmentError::InsufficientStock { .. }
                | FulfillmentError::QuantityExceedsAvailable { .. }
                | FulfillmentError::WindowExpired { .. }
                | FulfillmentError::NoMerchantAccount(_) => StatusCode::UNPROCESSABLE_ENTITY,
                FulfillmentError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        metrics::counter!("api_errors_total", "status" => status.as_u16().to_string()).increment(1);
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "internal server error");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}
