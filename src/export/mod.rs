//! CSV renderings of order and consolidation data

pub mod csv_common;
pub mod to_csv_consolidated;
pub mod to_csv_orders;
pub mod to_csv_supply;

pub use csv_common::ExportError;

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// `DD/MM/YYYY`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Quantity without trailing zeros (`8.000` -> `8`)
pub fn format_quantity(quantity: Decimal) -> String {
    quantity.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 3).unwrap();
        assert_eq!(format_date(date), "03/05/2024");
    }

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(Decimal::from_str("8.000").unwrap()), "8");
        assert_eq!(format_quantity(Decimal::from_str("2.500").unwrap()), "2.5");
        assert_eq!(format_quantity(Decimal::ZERO), "0");
    }
}
