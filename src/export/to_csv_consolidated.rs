use super::csv_common::{export_to_csv, ExportError};
use super::format_quantity;
use crate::services::ConsolidatedRow;

pub const HEADERS: [&str; 10] = [
    "Source",
    "Destination",
    "Item",
    "Type",
    "Quantity",
    "Unit",
    "City",
    "Requester Type",
    "Priority",
    "Priority Flag",
];

const SOURCE: &str = "System";

fn item_type(consumable: bool) -> &'static str {
    if consumable {
        "SUPPLIES"
    } else {
        "EQUIPMENT"
    }
}

/// Outstanding requests per destination and product
pub fn render(rows: &[ConsolidatedRow]) -> Result<String, ExportError> {
    export_to_csv(rows, &HEADERS, |row| {
        vec![
            SOURCE.to_string(),
            format!("{} - {}", row.destination_name, row.destination_city),
            row.product_name.clone(),
            item_type(row.consumable).to_string(),
            format_quantity(row.request_quantity),
            row.unit_name.clone(),
            row.destination_city.clone(),
            row.person_type.clone().unwrap_or_default(),
            row.destination_priority.to_string(),
            if row.person_type_priority > 0 { "Yes" } else { "No" }.to_string(),
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn row(consumable: bool, person_type_priority: i32) -> ConsolidatedRow {
        ConsolidatedRow {
            id: 1,
            destination_id: 4,
            destination_name: "Abrigo Norte".to_string(),
            destination_city: "Canoas".to_string(),
            destination_state: "RS".to_string(),
            destination_priority: 2,
            person_type: Some("Shelter".to_string()),
            person_type_priority,
            product_id: 9,
            product_name: "Agua".to_string(),
            consumable,
            unit_id: 1,
            unit_name: "Litro(s)".to_string(),
            request_quantity: Decimal::from(8),
            supply_reserve_quantity: Decimal::ZERO,
            supply_transport_quantity: Decimal::ZERO,
        }
    }

    #[test]
    fn test_render_consolidated_rows() {
        let csv = render(&[row(true, 1), row(false, 0)]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            "System,Abrigo Norte - Canoas,Agua,SUPPLIES,8,Litro(s),Canoas,Shelter,2,Yes"
        );
        assert!(lines[2].contains(",EQUIPMENT,"));
        assert!(lines[2].ends_with(",No"));
    }
}
