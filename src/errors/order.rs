//! Order operation errors
//!
//! `Validation` and `NotFound` are raised before any transaction opens.
//! `Transaction` wraps storage failures inside the save transaction, which is
//! rolled back. `ConsolidationFailed` is only produced after the order itself
//! has been committed, so it carries the persisted order id.

use thiserror::Error;

use super::ReconcileError;

#[derive(Error, Debug)]
pub enum OrderError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i32 },

    #[error("Data integrity violation: {0}")]
    DataIntegrity(String),

    #[error("Transaction failed: {0}")]
    Transaction(#[from] sea_orm::DbErr),

    /// The order was saved but its destination could not be consolidated
    #[error("Order {order_id} saved but consolidation of destination {destination_id} failed: {source}")]
    ConsolidationFailed {
        order_id: i32,
        destination_id: i32,
        #[source]
        source: sea_orm::DbErr,
    },
}

impl OrderError {
    pub fn not_found(entity: &'static str, id: i32) -> Self {
        OrderError::NotFound { entity, id }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        OrderError::Validation(message.into())
    }

    /// Caller supplied bad input (400/404) as opposed to a system failure
    pub fn is_client_error(&self) -> bool {
        matches!(self, OrderError::Validation(_) | OrderError::NotFound { .. })
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            OrderError::Validation(_) => "VALIDATION_FAILED",
            OrderError::NotFound { .. } => "NOT_FOUND",
            OrderError::DataIntegrity(_) => "DATA_INTEGRITY",
            OrderError::Transaction(_) => "TRANSACTION_FAILED",
            OrderError::ConsolidationFailed { .. } => "CONSOLIDATION_FAILED",
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            OrderError::Validation(_) => 400,
            OrderError::NotFound { .. } => 404,
            OrderError::DataIntegrity(_) => 409,
            OrderError::Transaction(_) | OrderError::ConsolidationFailed { .. } => 500,
        }
    }

    /// Id of an order that was persisted despite the error
    pub fn saved_order_id(&self) -> Option<i32> {
        match self {
            OrderError::ConsolidationFailed { order_id, .. } => Some(*order_id),
            _ => None,
        }
    }
}

impl From<ReconcileError> for OrderError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::NotFound { entity, key } => {
                OrderError::Validation(format!("{} not found for [{}]", entity, key))
            }
            ReconcileError::DataIntegrity { .. } => OrderError::DataIntegrity(err.to_string()),
            ReconcileError::Configuration { .. } => OrderError::DataIntegrity(err.to_string()),
            ReconcileError::Database(db_err) => OrderError::Transaction(db_err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = OrderError::validation("Invalid quantity.");
        assert_eq!(err.to_string(), "Validation failed: Invalid quantity.");
        assert!(err.is_client_error());
        assert_eq!(err.http_status_code(), 400);
    }

    #[test]
    fn test_not_found_error() {
        let err = OrderError::not_found("orders", 12);
        assert_eq!(err.to_string(), "orders 12 not found");
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[test]
    fn test_consolidation_failure_keeps_order_id() {
        let err = OrderError::ConsolidationFailed {
            order_id: 5,
            destination_id: 2,
            source: sea_orm::DbErr::Custom("locked".to_string()),
        };
        assert_eq!(err.saved_order_id(), Some(5));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_transaction_is_server_error() {
        let err: OrderError = sea_orm::DbErr::Custom("disk I/O error".to_string()).into();
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.saved_order_id(), None);
    }
}
