use super::csv_common::{export_to_csv, ExportError};
use super::{format_date, format_quantity};
use crate::services::OrderExportRow;

pub const HEADERS: [&str; 9] = [
    "Order ID",
    "Date",
    "Destination",
    "Destination City",
    "Item",
    "Parent Entity",
    "Origin",
    "Quantity",
    "Category",
];

/// Supply orders for the logistics team, one record per line item
pub fn render(rows: &[OrderExportRow]) -> Result<String, ExportError> {
    export_to_csv(rows, &HEADERS, |row| {
        vec![
            row.order_id.to_string(),
            format_date(row.effective_date),
            row.destination.name.clone(),
            row.destination.city_with_state(),
            row.product.clone(),
            row.origin.parent_name.clone().unwrap_or_default(),
            row.origin.name.clone(),
            format_quantity(row.quantity),
            row.category.clone(),
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::entities::OrderType;
    use crate::services::lookup::PersonSummary;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    #[test]
    fn test_render_supply_rows() {
        let rows = vec![OrderExportRow {
            order_id: 3,
            order_type: OrderType::Supply,
            category: String::new(),
            effective_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            destination: PersonSummary {
                name: "Abrigo Norte".to_string(),
                city: "Canoas".to_string(),
                state: "RS".to_string(),
                ..Default::default()
            },
            origin: PersonSummary {
                name: "Mercado Sul".to_string(),
                parent_name: Some("Rede Solidaria".to_string()),
                ..Default::default()
            },
            product: "Colchao".to_string(),
            unit: "Unidade(s)".to_string(),
            quantity: Decimal::from(40),
        }];

        let csv = render(&rows).unwrap();
        assert_eq!(
            csv.lines().nth(1),
            Some("3,01/05/2024,Abrigo Norte,Canoas - RS,Colchao,Rede Solidaria,Mercado Sul,40,")
        );
    }
}
