//! Domain-specific error types for aidlink
//!
//! Each domain gets its own `thiserror` enum so callers can tell "fix your input"
//! failures apart from failures that need operator attention.
//!
//! # Error Categories
//!
//! - **ReconcileError**: find-or-create resolution over natural keys
//! - **OrderError**: order save, consolidation and order queries
//! - **ImportError**: CSV import runs (file/format level; row failures are collected)
//!
//! # Examples
//!
//! ```rust
//! use aidlink::errors::{OrderError, ReconcileError};
//!
//! let err = OrderError::Validation("Invalid quantity".to_string());
//! assert!(err.is_client_error());
//!
//! let err = ReconcileError::Configuration {
//!     entity: "persons",
//!     field: "city_id".to_string(),
//! };
//! assert!(!err.is_client_error());
//! ```

pub mod import;
pub mod order;
pub mod reconcile;

pub use import::ImportError;
pub use order::OrderError;
pub use reconcile::ReconcileError;

/// Result type alias for find-or-create resolution
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Result type alias for order operations
pub type OrderResult<T> = Result<T, OrderError>;

/// Result type alias for import runs
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconcile_result_alias() {
        let result: ReconcileResult<i32> = Err(ReconcileError::NotFound {
            entity: "cities",
            key: "name=Porto Alegre".to_string(),
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_order_result_alias() {
        let result: OrderResult<i32> = Err(OrderError::not_found("orders", 7));
        assert!(result.is_err());
    }
}
