use super::csv_common::{export_to_csv, ExportError};
use super::{format_date, format_quantity};
use crate::services::OrderExportRow;

pub const HEADERS: [&str; 13] = [
    "Order ID",
    "Type",
    "Category",
    "Date",
    "Destination",
    "Destination City",
    "Destination State",
    "Origin",
    "Origin City",
    "Origin State",
    "Item",
    "Unit",
    "Quantity",
];

/// One record per order line item
pub fn render(rows: &[OrderExportRow]) -> Result<String, ExportError> {
    export_to_csv(rows, &HEADERS, |row| {
        vec![
            row.order_id.to_string(),
            row.order_type.label().to_string(),
            row.category.clone(),
            format_date(row.effective_date),
            row.destination.name.clone(),
            row.destination.city.clone(),
            row.destination.state.clone(),
            row.origin.name.clone(),
            row.origin.city.clone(),
            row.origin.state.clone(),
            row.product.clone(),
            row.unit.clone(),
            format_quantity(row.quantity),
        ]
    })
}
