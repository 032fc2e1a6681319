//! Common helpers for the CSV exporters
use csv::Writer;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Writes `headers` followed by one record per item
///
/// # Example
///
/// ```rust,ignore
/// let csv = export_to_csv(
///     rows.iter(),
///     &["Order ID", "Item"],
///     |row| vec![row.order_id.to_string(), row.product.clone()],
/// )?;
/// ```
pub fn export_to_csv<T, F>(
    items: impl IntoIterator<Item = T>,
    headers: &[&str],
    row_fn: F,
) -> Result<String, ExportError>
where
    F: Fn(T) -> Vec<String>,
{
    let mut wtr = Writer::from_writer(vec![]);
    wtr.write_record(headers)?;

    for item in items {
        wtr.write_record(&row_fn(item))?;
    }

    let data = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Line {
        id: i32,
        item: String,
    }

    fn lines() -> Vec<Line> {
        vec![
            Line {
                id: 2,
                item: "Agua, mineral".to_string(),
            },
            Line {
                id: 1,
                item: "Colchao".to_string(),
            },
        ]
    }

    #[test]
    fn test_export_quotes_separators() {
        let result = export_to_csv(lines().iter(), &["id", "item"], |line| {
            vec![line.id.to_string(), line.item.clone()]
        })
        .expect("CSV export should succeed");

        assert!(result.starts_with("id,item\n"));
        assert!(result.contains("2,\"Agua, mineral\""));
        assert!(result.contains("1,Colchao"));
    }

    #[test]
    fn test_export_empty() {
        let result = export_to_csv(Vec::<Line>::new(), &["id", "item"], |line| {
            vec![line.id.to_string(), line.item]
        })
        .expect("Empty CSV export should succeed");

        assert_eq!(result, "id,item\n");
    }
}
