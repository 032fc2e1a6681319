//! HTTP rendering of domain errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::errors::{ImportError, OrderError};
use crate::export::ExportError;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    /// Set when the order was persisted even though the request failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<i32>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: code.to_string(),
                message: message.into(),
                order_id: None,
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", "Staff access required")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        if err.is_client_error() {
            warn!("Rejected order request: {}", err);
        } else {
            error!("Order request failed: {}", err);
        }
        let status = StatusCode::from_u16(err.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut api = ApiError::new(status, err.error_code(), err.to_string());
        api.body.order_id = err.saved_order_id();
        api
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            error!("Import failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        ApiError::new(status, err.error_code(), err.to_string())
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        error!("Export failed: {}", err);
        ApiError::internal(err.to_string())
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(err: sea_orm::DbErr) -> Self {
        OrderError::Transaction(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consolidation_failure_reports_saved_order() {
        let err: ApiError = OrderError::ConsolidationFailed {
            order_id: 11,
            destination_id: 3,
            source: sea_orm::DbErr::Custom("busy".to_string()),
        }
        .into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body.order_id, Some(11));
        assert_eq!(err.body.error, "CONSOLIDATION_FAILED");
    }

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err: ApiError = OrderError::validation("Invalid quantity.").into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.body.order_id, None);
    }

    #[test]
    fn test_import_header_error_is_client_error() {
        let err: ApiError = ImportError::InvalidValue {
            field: "header",
            value: "quantity".to_string(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
