//! Reference data seeding: states with their cities, and the product catalogue

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set, TransactionTrait};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::info;

use super::import_report::{read_csv_rows, ImportReport, ParsedRow};
use super::order_import_service::{parse_flag, unit_labels};
use crate::database::entities::{cities, products, states, units};
use crate::errors::{ImportError, ImportResult};
use crate::reconcile::{NaturalKey, Reconciler, Resolution};

#[derive(Clone, Debug, Deserialize)]
pub struct CityImportRow {
    pub state_initials: String,
    pub state_name: String,
    pub city: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ProductImportRow {
    pub name: String,
    pub unit: String,
    #[serde(default)]
    pub consumable: Option<String>,
    #[serde(default)]
    pub request_form_active: Option<String>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
}

fn non_blank(field: &'static str, value: &str) -> ImportResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ImportError::InvalidValue {
            field,
            value: String::new(),
        });
    }
    Ok(value.to_string())
}

#[derive(Clone)]
pub struct ReferenceImportService {
    db: DatabaseConnection,
    reconciler: Reconciler,
}

impl ReferenceImportService {
    pub fn new(db: DatabaseConnection, reconciler: Reconciler) -> Self {
        Self { db, reconciler }
    }

    pub async fn import_cities_file(&self, path: impl AsRef<Path>) -> ImportResult<ImportReport> {
        info!("Importing cities from {}", path.as_ref().display());
        self.import_cities(std::fs::File::open(path.as_ref())?).await
    }

    pub async fn import_products_file(&self, path: impl AsRef<Path>) -> ImportResult<ImportReport> {
        info!("Importing products from {}", path.as_ref().display());
        self.import_products(std::fs::File::open(path.as_ref())?).await
    }

    pub async fn import_cities<R: Read>(&self, reader: R) -> ImportResult<ImportReport> {
        let rows: Vec<ParsedRow<CityImportRow>> =
            read_csv_rows(reader, &["state_initials", "state_name", "city"])?;
        let mut report = ImportReport::default();
        for row in rows {
            let outcome = match row {
                Ok((line, row)) => self.import_city(&row).await.map_err(|e| (line, e)),
                Err(failure) => Err(failure),
            };
            self.tally(&mut report, outcome);
        }
        info!(
            "City import finished: {} rows, {} created, {} failed",
            report.processed, report.created, report.failed
        );
        Ok(report)
    }

    async fn import_city(&self, row: &CityImportRow) -> ImportResult<usize> {
        let initials = non_blank("state_initials", &row.state_initials)?.to_uppercase();
        let state_name = non_blank("state_name", &row.state_name)?;
        let city_name = non_blank("city", &row.city)?;

        let txn = self.db.begin().await?;
        let state = self
            .reconciler
            .find_or_create(
                &txn,
                NaturalKey::<states::Entity>::new("states")
                    .name(states::Column::Initials, Some(initials.as_str())),
                || states::ActiveModel {
                    name: Set(state_name.clone()),
                    initials: Set(initials.clone()),
                    ..Default::default()
                },
            )
            .await?;
        let city = self
            .reconciler
            .find_or_create(
                &txn,
                NaturalKey::<cities::Entity>::new("cities")
                    .name(cities::Column::Name, Some(city_name.as_str()))
                    .exact(cities::Column::StateId, Some(state.id())),
                || cities::ActiveModel {
                    name: Set(city_name.clone()),
                    state_id: Set(state.id()),
                    ..Default::default()
                },
            )
            .await?;
        txn.commit().await?;

        Ok(usize::from(state.was_created()) + usize::from(city.was_created()))
    }

    /// Creates missing products and refreshes the catalogue fields of known ones
    pub async fn import_products<R: Read>(&self, reader: R) -> ImportResult<ImportReport> {
        let rows: Vec<ParsedRow<ProductImportRow>> = read_csv_rows(reader, &["name", "unit"])?;
        let mut report = ImportReport::default();
        for row in rows {
            let outcome = match row {
                Ok((line, row)) => self.import_product(&row).await.map_err(|e| (line, e)),
                Err(failure) => Err(failure),
            };
            self.tally(&mut report, outcome);
        }
        info!(
            "Product import finished: {} rows, {} created, {} failed",
            report.processed, report.created, report.failed
        );
        Ok(report)
    }

    async fn import_product(&self, row: &ProductImportRow) -> ImportResult<usize> {
        let name = non_blank("name", &row.name)?;
        let unit_name = non_blank("unit", &row.unit)?;
        let consumable = parse_flag(row.consumable.as_deref());
        let request_form_active = parse_flag(row.request_form_active.as_deref());
        let priority = row.priority.unwrap_or(0);
        let description = row
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        let now = Utc::now();

        let txn = self.db.begin().await?;
        let labels = unit_labels(&unit_name);
        let unit = self
            .reconciler
            .find_or_create(
                &txn,
                NaturalKey::<units::Entity>::new("units").name(units::Column::Name, Some(labels.name)),
                || units::ActiveModel {
                    name: Set(labels.name.to_string()),
                    name_singular: Set(labels.singular.to_string()),
                    name_plural: Set(labels.plural.to_string()),
                    ..Default::default()
                },
            )
            .await?;

        let product = self
            .reconciler
            .find_or_create(
                &txn,
                NaturalKey::<products::Entity>::new("products")
                    .name(products::Column::Name, Some(name.as_str())),
                || products::ActiveModel {
                    name: Set(name.clone()),
                    description: Set(description.clone()),
                    unit_id: Set(unit.id()),
                    consumable: Set(consumable),
                    request_form_active: Set(request_form_active),
                    priority: Set(priority),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                },
            )
            .await?;

        let created = usize::from(unit.was_created()) + usize::from(product.was_created());
        if let Resolution::Found(existing) = product {
            let mut active: products::ActiveModel = existing.into();
            active.unit_id = Set(unit.id());
            active.consumable = Set(consumable);
            active.request_form_active = Set(request_form_active);
            active.priority = Set(priority);
            if description.is_some() {
                active.description = Set(description);
            }
            active.updated_at = Set(now);
            active.update(&txn).await?;
        }
        txn.commit().await?;
        Ok(created)
    }

    fn tally(&self, report: &mut ImportReport, outcome: Result<usize, (usize, ImportError)>) {
        match outcome {
            Ok(created) => {
                report.created += created;
                report.record_success();
            }
            Err((line, err)) => {
                self.reconciler
                    .anomalies()
                    .error(format!("Row {} skipped: {}", line, err));
                report.record_failure(line, err.error_code(), err.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank_trims() {
        assert_eq!(non_blank("city", "  Canoas ").unwrap(), "Canoas");
        assert!(matches!(
            non_blank("city", "   "),
            Err(ImportError::InvalidValue { field: "city", .. })
        ));
    }

    #[test]
    fn test_product_row_optional_columns() {
        let data = "name,unit\nAgua mineral,Litro(s)\n";
        let rows: Vec<ParsedRow<ProductImportRow>> =
            read_csv_rows(data.as_bytes(), &["name", "unit"]).unwrap();
        let (line, row) = rows.into_iter().next().unwrap().unwrap();
        assert_eq!(line, 2);
        assert_eq!(row.name, "Agua mineral");
        assert!(row.consumable.is_none());
        assert!(row.priority.is_none());
    }
}
