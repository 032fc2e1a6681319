use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Read;
use tracing::info;

use crate::errors::{ImportError, ImportResult};

#[cfg(feature = "server")]
use utoipa::ToSchema;

/// Rows between progress log lines
pub const PROGRESS_EVERY: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct RowFailure {
    /// 1-based line in the source file, header included
    pub line: usize,
    pub error_code: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ConsolidationFailure {
    pub destination_id: i32,
    pub message: String,
}

/// Outcome of an import run; row failures never abort the run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub created: usize,
    pub failures: Vec<RowFailure>,
    pub destinations: Vec<i32>,
    pub consolidation_failures: Vec<ConsolidationFailure>,
}

impl ImportReport {
    pub fn record_success(&mut self) {
        self.processed += 1;
        self.succeeded += 1;
        self.log_progress();
    }

    pub fn record_failure(&mut self, line: usize, error_code: &str, message: String) {
        self.processed += 1;
        self.failed += 1;
        self.failures.push(RowFailure {
            line,
            error_code: error_code.to_string(),
            message,
        });
        self.log_progress();
    }

    fn log_progress(&self) {
        if self.processed % PROGRESS_EVERY == 0 {
            info!("...processed {} rows...", self.processed);
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.consolidation_failures.is_empty()
    }
}

/// A parsed row with its source line, or the line and why it could not be read
pub type ParsedRow<T> = Result<(usize, T), (usize, ImportError)>;

/// Reads a headed CSV into typed rows.
///
/// A missing required header fails the whole file; a malformed row only
/// fails that row.
pub fn read_csv_rows<T, R>(reader: R, required_headers: &[&str]) -> ImportResult<Vec<ParsedRow<T>>>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();
    for required in required_headers {
        if !headers.iter().any(|h| h == *required) {
            return Err(ImportError::InvalidValue {
                field: "header",
                value: required.to_string(),
            });
        }
    }

    let mut rows = Vec::new();
    for (index, record) in rdr.records().enumerate() {
        let fallback_line = index + 2;
        let parsed = record.and_then(|record| {
            let line = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(fallback_line);
            record.deserialize::<T>(Some(&headers)).map(|row| (line, row))
        });
        rows.push(parsed.map_err(|e| (fallback_line, ImportError::from(e))));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Row {
        name: String,
        amount: Option<i32>,
    }

    #[test]
    fn test_read_csv_rows_keeps_bad_rows() {
        let data = "name,amount\nfirst,1\nsecond,abc\nthird,\n";
        let rows: Vec<ParsedRow<Row>> = read_csv_rows(data.as_bytes(), &["name"]).unwrap();
        assert_eq!(rows.len(), 3);
        let (line, first) = rows[0].as_ref().unwrap();
        assert_eq!(*line, 2);
        assert_eq!(first.name, "first");
        assert!(rows[1].is_err());
        assert_eq!(rows[2].as_ref().unwrap().1.amount, None);
    }

    #[test]
    fn test_read_csv_rows_missing_header() {
        let result = read_csv_rows::<Row, _>("title\nx\n".as_bytes(), &["name"]);
        assert!(matches!(
            result,
            Err(ImportError::InvalidValue { field: "header", .. })
        ));
    }

    #[test]
    fn test_counts() {
        let mut report = ImportReport::default();
        report.record_success();
        report.record_failure(3, "NOT_FOUND", "cities not found".to_string());
        assert_eq!(report.processed, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].line, 3);
        assert!(!report.is_clean());
    }
}
