//! Find-or-create resolution errors
//!
//! Raised by the reconciliation primitive and the lookups built on it. A
//! `DataIntegrity` error means the natural key matched more than one row and
//! automatic resolution would be unsafe; a `Configuration` error means the
//! call site passed an incomplete key and is a bug.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcileError {
    /// Required reference row does not exist
    #[error("{entity} not found for key [{key}]")]
    NotFound {
        entity: &'static str,
        key: String,
    },

    /// Natural key matched several rows
    #[error("Multiple {entity} rows match key [{key}]: ids {matches:?}")]
    DataIntegrity {
        entity: &'static str,
        key: String,
        matches: Vec<i32>,
    },

    /// Natural key has an absent field
    #[error("Key field '{field}' is blank for {entity}")]
    Configuration { entity: &'static str, field: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl ReconcileError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, ReconcileError::NotFound { .. })
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ReconcileError::NotFound { .. } => "NOT_FOUND",
            ReconcileError::DataIntegrity { .. } => "DATA_INTEGRITY",
            ReconcileError::Configuration { .. } => "CONFIGURATION",
            ReconcileError::Database(_) => "TRANSACTION_FAILED",
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            ReconcileError::NotFound { .. } => 404,
            ReconcileError::DataIntegrity { .. } => 409,
            ReconcileError::Configuration { .. } | ReconcileError::Database(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_integrity_message_lists_matches() {
        let err = ReconcileError::DataIntegrity {
            entity: "persons",
            key: "name=Hospital Central, city_id=3".to_string(),
            matches: vec![4, 9],
        };
        assert_eq!(
            err.to_string(),
            "Multiple persons rows match key [name=Hospital Central, city_id=3]: ids [4, 9]"
        );
        assert_eq!(err.error_code(), "DATA_INTEGRITY");
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_configuration_is_operator_error() {
        let err = ReconcileError::Configuration {
            entity: "products",
            field: "name".to_string(),
        };
        assert_eq!(err.http_status_code(), 500);
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_not_found_is_client_error() {
        let err = ReconcileError::NotFound {
            entity: "cities",
            key: "name=Nowhere".to_string(),
        };
        assert!(err.is_client_error());
        assert_eq!(err.http_status_code(), 404);
    }
}
