//! Historical order import
//!
//! Each CSV row names a destination (person in a city), a product with its
//! unit, and a requested quantity. Rows are reconciled against the existing
//! reference data with find-or-create and the quantity is added to the
//! destination's aggregate request order. Re-running a file adds the
//! quantities again but never duplicates headers or line items.

use chrono::Utc;
use indexmap::IndexSet;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, TransactionTrait};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

use super::consolidation_service::ConsolidationService;
use super::import_report::{read_csv_rows, ConsolidationFailure, ImportReport};
use crate::database::entities::order_line_items::QUANTITY_SCALE;
use crate::database::entities::persons::LEGAL_TYPE_IMPORTED;
use crate::database::entities::{
    cities, order_line_items, orders, person_types, persons, products, units, OrderStatus,
    OrderType,
};
use crate::errors::{ImportError, ImportResult};
use crate::reconcile::{NaturalKey, Reconciler};

pub const REQUIRED_HEADERS: [&str; 6] = ["city", "person_type", "person", "unit", "product", "quantity"];

/// The one unit label the source data spells out; anything else is a volume
const COUNT_UNIT: &str = "Unidade(s)";

#[derive(Clone, Debug, Deserialize)]
pub struct OrderImportRow {
    pub city: String,
    pub person_type: String,
    pub person: String,
    #[serde(default)]
    pub priority: Option<i32>,
    pub unit: String,
    pub product: String,
    #[serde(default)]
    pub consumable: Option<String>,
    pub quantity: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitLabels {
    pub name: &'static str,
    pub singular: &'static str,
    pub plural: &'static str,
    pub recognized: bool,
}

/// Maps a unit name from the source data to its stored labels.
///
/// Only the count unit is recognized; every other name maps to litres.
pub fn unit_labels(raw: &str) -> UnitLabels {
    if raw.trim() == COUNT_UNIT {
        UnitLabels {
            name: COUNT_UNIT,
            singular: "Unidade",
            plural: "Unidades",
            recognized: true,
        }
    } else {
        UnitLabels {
            name: "Litro(s)",
            singular: "Litro",
            plural: "Litros",
            recognized: raw.trim() == "Litro(s)",
        }
    }
}

/// Parses a positive quantity, accepting `,` as decimal separator
pub fn parse_quantity(raw: &str) -> ImportResult<Decimal> {
    let normalized = raw.trim().replace(',', ".");
    let invalid = || ImportError::InvalidValue {
        field: "quantity",
        value: raw.to_string(),
    };
    let quantity = Decimal::from_str(&normalized)
        .map_err(|_| invalid())?
        .round_dp(QUANTITY_SCALE);
    if quantity <= Decimal::ZERO {
        return Err(invalid());
    }
    Ok(quantity)
}

pub fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|v| v.trim().to_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "y" | "sim" | "s" | "x")
    )
}

fn required<'a>(field: &'static str, value: &'a str) -> ImportResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ImportError::InvalidValue {
            field,
            value: String::new(),
        });
    }
    Ok(value)
}

struct RowOutcome {
    destination_id: i32,
    created: usize,
}

#[derive(Clone)]
pub struct OrderImportService {
    db: DatabaseConnection,
    reconciler: Reconciler,
}

impl OrderImportService {
    pub fn new(db: DatabaseConnection, reconciler: Reconciler) -> Self {
        Self { db, reconciler }
    }

    pub async fn import_file(&self, path: impl AsRef<Path>) -> ImportResult<ImportReport> {
        let file = std::fs::File::open(path.as_ref())?;
        info!("Importing orders from {}", path.as_ref().display());
        self.import_reader(file).await
    }

    /// Imports every row, then consolidates each destination the run touched
    pub async fn import_reader<R: Read>(&self, reader: R) -> ImportResult<ImportReport> {
        let rows = read_csv_rows::<OrderImportRow, _>(reader, &REQUIRED_HEADERS)?;

        let mut report = ImportReport::default();
        let mut touched: IndexSet<i32> = IndexSet::new();

        for row in rows {
            let outcome = match row {
                Ok((line, row)) => self.import_row(&row).await.map_err(|e| (line, e)),
                Err(failure) => Err(failure),
            };
            match outcome {
                Ok(outcome) => {
                    touched.insert(outcome.destination_id);
                    report.created += outcome.created;
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

        let consolidation = ConsolidationService::new(self.db.clone())
            .with_match_style(self.reconciler.match_style());
        for destination_id in &touched {
            if let Err(e) = consolidation.recompute_for_destination(*destination_id).await {
                warn!("Consolidation of destination {} failed: {}", destination_id, e);
                report.consolidation_failures.push(ConsolidationFailure {
                    destination_id: *destination_id,
                    message: e.to_string(),
                });
            }
        }
        report.destinations = touched.into_iter().collect();

        info!(
            "Order import finished: {} rows, {} imported, {} failed",
            report.processed, report.succeeded, report.failed
        );
        Ok(report)
    }

    /// Reconciles one row inside its own transaction
    async fn import_row(&self, row: &OrderImportRow) -> ImportResult<RowOutcome> {
        let city_name = required("city", &row.city)?;
        let person_type_name = required("person_type", &row.person_type)?;
        let person_name = required("person", &row.person)?;
        let unit_name = required("unit", &row.unit)?;
        let product_name = required("product", &row.product)?;
        let quantity = parse_quantity(&row.quantity)?;
        let priority = row.priority.unwrap_or(0);
        let consumable = parse_flag(row.consumable.as_deref());
        let notes = row
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        let anomalies = self.reconciler.anomalies();
        let now = Utc::now();
        let mut created = 0;
        let txn = self.db.begin().await?;

        let city = self
            .reconciler
            .find_existing(
                &txn,
                NaturalKey::<cities::Entity>::new("cities").name(cities::Column::Name, Some(city_name)),
            )
            .await?;

        let person_type = self
            .reconciler
            .find_or_create(
                &txn,
                NaturalKey::<person_types::Entity>::new("person_types")
                    .name(person_types::Column::Name, Some(person_type_name))
                    .exact(person_types::Column::CityId, Some(city.id)),
                || person_types::ActiveModel {
                    name: Set(person_type_name.to_string()),
                    city_id: Set(Some(city.id)),
                    priority: Set(priority),
                    ..Default::default()
                },
            )
            .await?;
        created += usize::from(person_type.was_created());

        let person = self
            .reconciler
            .find_or_create(
                &txn,
                NaturalKey::<persons::Entity>::new("persons")
                    .name(persons::Column::Name, Some(person_name))
                    .exact(persons::Column::CityId, Some(city.id)),
                || persons::ActiveModel {
                    name: Set(person_name.to_string()),
                    city_id: Set(city.id),
                    person_type_id: Set(Some(person_type.id())),
                    parent_id: Set(None),
                    legal_type: Set(LEGAL_TYPE_IMPORTED),
                    priority: Set(priority),
                    export_ignore: Set(false),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                },
            )
            .await?;
        if person.was_created() {
            created += 1;
            anomalies.warning(format!(
                "Incomplete person created:\nid: {}\nname: {}\ncity_id: {}\npriority: {}\nlegal_type: {}",
                person.id(),
                person_name,
                city.id,
                priority,
                LEGAL_TYPE_IMPORTED
            ));
        }

        let labels = unit_labels(unit_name);
        if !labels.recognized {
            anomalies.warning(format!(
                "Unit '{}' is not a known label, filed as {}",
                unit_name, labels.name
            ));
        }
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
        created += usize::from(unit.was_created());

        let product = self
            .reconciler
            .find_or_create(
                &txn,
                NaturalKey::<products::Entity>::new("products")
                    .name(products::Column::Name, Some(product_name)),
                || products::ActiveModel {
                    name: Set(product_name.to_string()),
                    description: Set(None),
                    unit_id: Set(unit.id()),
                    consumable: Set(consumable),
                    request_form_active: Set(false),
                    priority: Set(0),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                },
            )
            .await?;
        if product.was_created() {
            created += 1;
            anomalies.warning(format!(
                "Incomplete product created:\nid: {}\nname: {}\nunit_id: {}\nconsumable: {}",
                product.id(),
                product_name,
                unit.id(),
                consumable
            ));
        }

        let order = self
            .reconciler
            .find_or_create(
                &txn,
                NaturalKey::<orders::Entity>::new("orders")
                    .exact(orders::Column::DestinationId, Some(person.id()))
                    .exact(orders::Column::OrderType, Some(OrderType::Request)),
                || orders::ActiveModel {
                    order_type: Set(OrderType::Request),
                    status: Set(OrderStatus::IMPORTED),
                    origin_id: Set(None),
                    origin_contact_id: Set(None),
                    destination_id: Set(person.id()),
                    destination_contact_id: Set(None),
                    category_id: Set(None),
                    effective_date: Set(now.date_naive()),
                    notes: Set(None),
                    internal_notes: Set(None),
                    needs_review: Set(true),
                    creator_id: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                },
            )
            .await?;
        if order.was_created() {
            created += 1;
            anomalies.warning(format!(
                "Incomplete order created:\nid: {}\ndestination_id: {}\ntype: {}\nstatus: {:?}",
                order.id(),
                person.id(),
                OrderType::Request.label(),
                OrderStatus::IMPORTED
            ));
        }

        let line_item = self
            .reconciler
            .find_or_create(
                &txn,
                NaturalKey::<order_line_items::Entity>::new("order_line_items")
                    .exact(order_line_items::Column::OrderId, Some(order.id()))
                    .exact(order_line_items::Column::ProductId, Some(product.id()))
                    .exact(order_line_items::Column::UnitId, Some(unit.id())),
                || order_line_items::ActiveModel {
                    order_id: Set(order.id()),
                    product_id: Set(product.id()),
                    unit_id: Set(unit.id()),
                    quantity: Set(Decimal::ZERO),
                    notes: Set(notes.clone()),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                },
            )
            .await?;
        created += usize::from(line_item.was_created());

        order_line_items::Entity::update_many()
            .col_expr(
                order_line_items::Column::Quantity,
                Expr::col(order_line_items::Column::Quantity).add(quantity),
            )
            .col_expr(order_line_items::Column::UpdatedAt, Expr::value(now))
            .filter(order_line_items::Column::Id.eq(line_item.id()))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(RowOutcome {
            destination_id: person.id(),
            created,
        })
    }
}
