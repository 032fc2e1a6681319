//! Import run errors
//!
//! Only failures that stop a whole run live here (unreadable input, broken
//! headers). Failures of a single row are recorded in the run report and the
//! run carries on with the next row.

use thiserror::Error;

use super::ReconcileError;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Row value could not be interpreted
    #[error("Invalid value for '{field}': {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl ImportError {
    pub fn is_client_error(&self) -> bool {
        match self {
            ImportError::Csv(_) | ImportError::InvalidValue { .. } => true,
            ImportError::Reconcile(err) => err.is_client_error(),
            ImportError::Io(_) | ImportError::Database(_) => false,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ImportError::Csv(_) => "CSV_ERROR",
            ImportError::Io(_) => "IO_ERROR",
            ImportError::InvalidValue { .. } => "INVALID_VALUE",
            ImportError::Reconcile(err) => err.error_code(),
            ImportError::Database(_) => "TRANSACTION_FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_value() {
        let err = ImportError::InvalidValue {
            field: "quantity",
            value: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid value for 'quantity': abc");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_reconcile_code_passes_through() {
        let err: ImportError = ReconcileError::DataIntegrity {
            entity: "units",
            key: "name=Litro(s)".to_string(),
            matches: vec![1, 2],
        }
        .into();
        assert_eq!(err.error_code(), "DATA_INTEGRITY");
        assert!(!err.is_client_error());
    }
}
