use chrono::Utc;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use sea_orm::sea_query::Condition;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

#[cfg(feature = "server")]
use utoipa::ToSchema;

use super::access::{AccessService, Actor};
use super::lookup::{LookupRequest, ReferenceLookup};
use super::paging::{page_number, PageMeta, DEFAULT_PAGE_SIZE};
use crate::database::entities::order_line_items::QUANTITY_SCALE;
use crate::database::entities::{
    order_consolidated, order_line_items, orders, persons, products, OrderStatus, OrderType,
};
use crate::errors::OrderResult;
use crate::reconcile::MatchStyle;

/// Which consolidated quantity a line item contributes to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bucket {
    Request,
    SupplyReserve,
    SupplyTransport,
}

impl Bucket {
    pub fn for_order(order_type: OrderType, status: OrderStatus) -> Option<Self> {
        match (order_type, status) {
            (_, OrderStatus::Canceled) => None,
            (OrderType::Request, _) => Some(Bucket::Request),
            (OrderType::Supply, OrderStatus::New | OrderStatus::UnderReview) => {
                Some(Bucket::SupplyReserve)
            }
            (OrderType::Supply, OrderStatus::ReviewOk | OrderStatus::Processed) => {
                Some(Bucket::SupplyTransport)
            }
            (OrderType::Supply, OrderStatus::Delivered) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Totals {
    pub request: Decimal,
    pub supply_reserve: Decimal,
    pub supply_transport: Decimal,
}

impl Totals {
    fn add(&mut self, bucket: Bucket, quantity: Decimal) {
        match bucket {
            Bucket::Request => self.request += quantity,
            Bucket::SupplyReserve => self.supply_reserve += quantity,
            Bucket::SupplyTransport => self.supply_transport += quantity,
        }
    }

    fn rounded(self) -> Self {
        Self {
            request: self.request.round_dp(QUANTITY_SCALE),
            supply_reserve: self.supply_reserve.round_dp(QUANTITY_SCALE),
            supply_transport: self.supply_transport.round_dp(QUANTITY_SCALE),
        }
    }

    fn of(row: &order_consolidated::Model) -> Self {
        Self {
            request: row.request_quantity,
            supply_reserve: row.supply_reserve_quantity,
            supply_transport: row.supply_transport_quantity,
        }
    }
}

/// Sums line items per (product, unit) under the consolidation policy
pub fn consolidate(
    orders: &[(orders::Model, Vec<order_line_items::Model>)],
) -> IndexMap<(i32, i32), Totals> {
    let mut totals: IndexMap<(i32, i32), Totals> = IndexMap::new();
    for (order, items) in orders {
        let Some(bucket) = Bucket::for_order(order.order_type, order.status) else {
            continue;
        };
        for item in items {
            totals
                .entry((item.product_id, item.unit_id))
                .or_default()
                .add(bucket, item.quantity);
        }
    }
    for value in totals.values_mut() {
        *value = value.rounded();
    }
    totals
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct RecomputeSummary {
    pub destination_id: i32,
    pub inserted: usize,
    pub updated: usize,
    pub zeroed: usize,
    pub unchanged: usize,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ConsolidatedFilter {
    /// Product name prefix
    pub q: Option<String>,
    #[serde(rename = "destinationId")]
    pub destination_id: Option<i32>,
    #[serde(rename = "showOnlyWithQuantity", default)]
    pub show_only_with_quantity: bool,
    pub page: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedRow {
    pub id: i32,
    pub destination_id: i32,
    pub destination_name: String,
    pub destination_city: String,
    pub destination_state: String,
    pub destination_priority: i32,
    pub person_type: Option<String>,
    pub person_type_priority: i32,
    pub product_id: i32,
    pub product_name: String,
    pub consumable: bool,
    pub unit_id: i32,
    pub unit_name: String,
    pub request_quantity: Decimal,
    pub supply_reserve_quantity: Decimal,
    pub supply_transport_quantity: Decimal,
}

#[derive(Clone)]
pub struct ConsolidationService {
    db: DatabaseConnection,
    match_style: MatchStyle,
}

impl ConsolidationService {
    pub fn new(db: DatabaseConnection) -> Self {
        let match_style = MatchStyle::for_backend(db.get_database_backend());
        Self { db, match_style }
    }

    pub fn with_match_style(mut self, match_style: MatchStyle) -> Self {
        self.match_style = match_style;
        self
    }

    /// Rewrites the consolidated rows of one destination from its current orders.
    ///
    /// Only rows with `destination_id` equal to the argument are read or
    /// written. Keys that no longer occur are zeroed, never deleted. Rows whose
    /// totals did not change are left untouched, so a second call is a no-op.
    pub async fn recompute<C: ConnectionTrait>(
        conn: &C,
        destination_id: i32,
    ) -> Result<RecomputeSummary, DbErr> {
        let scanned = orders::Entity::find()
            .filter(orders::Column::DestinationId.eq(destination_id))
            .filter(orders::Column::Status.ne(OrderStatus::Canceled))
            .order_by_asc(orders::Column::Id)
            .find_with_related(order_line_items::Entity)
            .all(conn)
            .await?;
        let mut fresh = consolidate(&scanned);

        let existing = order_consolidated::Entity::find()
            .filter(order_consolidated::Column::DestinationId.eq(destination_id))
            .order_by_asc(order_consolidated::Column::Id)
            .all(conn)
            .await?;

        let now = Utc::now();
        let mut summary = RecomputeSummary {
            destination_id,
            ..Default::default()
        };

        for row in existing {
            let target = fresh
                .shift_remove(&(row.product_id, row.unit_id))
                .unwrap_or_default();
            if Totals::of(&row) == target {
                summary.unchanged += 1;
                continue;
            }
            if target == Totals::default() {
                summary.zeroed += 1;
            } else {
                summary.updated += 1;
            }
            let mut active: order_consolidated::ActiveModel = row.into();
            active.request_quantity = Set(target.request);
            active.supply_reserve_quantity = Set(target.supply_reserve);
            active.supply_transport_quantity = Set(target.supply_transport);
            active.updated_at = Set(now);
            active.update(conn).await?;
        }

        for ((product_id, unit_id), totals) in fresh {
            order_consolidated::ActiveModel {
                destination_id: Set(destination_id),
                product_id: Set(product_id),
                unit_id: Set(unit_id),
                request_quantity: Set(totals.request),
                supply_reserve_quantity: Set(totals.supply_reserve),
                supply_transport_quantity: Set(totals.supply_transport),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(conn)
            .await?;
            summary.inserted += 1;
        }

        debug!(
            "Consolidated destination {}: {} inserted, {} updated, {} zeroed, {} unchanged",
            destination_id, summary.inserted, summary.updated, summary.zeroed, summary.unchanged
        );
        Ok(summary)
    }

    /// Runs [`Self::recompute`] in its own transaction
    pub async fn recompute_for_destination(
        &self,
        destination_id: i32,
    ) -> Result<RecomputeSummary, DbErr> {
        let txn = self.db.begin().await?;
        let summary = Self::recompute(&txn, destination_id).await?;
        txn.commit().await?;
        info!("Recomputed consolidation for destination {}", destination_id);
        Ok(summary)
    }

    fn filtered_query(
        &self,
        filter: &ConsolidatedFilter,
        allowed_destinations: Option<Vec<i32>>,
    ) -> sea_orm::Select<order_consolidated::Entity> {
        let mut query = order_consolidated::Entity::find()
            .join(JoinType::InnerJoin, order_consolidated::Relation::Products.def())
            .join(JoinType::InnerJoin, order_consolidated::Relation::Destination.def())
            .filter(products::Column::RequestFormActive.eq(true))
            .filter(persons::Column::ExportIgnore.eq(false));

        if let Some(allowed) = allowed_destinations {
            query = query.filter(order_consolidated::Column::DestinationId.is_in(allowed));
        }
        if let Some(destination_id) = filter.destination_id {
            query = query.filter(order_consolidated::Column::DestinationId.eq(destination_id));
        }
        if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            query = query.filter(self.match_style.starts_with(products::Column::Name, q));
        }
        if filter.show_only_with_quantity {
            query = query.filter(
                Condition::any()
                    .add(order_consolidated::Column::RequestQuantity.ne(Decimal::ZERO))
                    .add(order_consolidated::Column::SupplyReserveQuantity.ne(Decimal::ZERO))
                    .add(order_consolidated::Column::SupplyTransportQuantity.ne(Decimal::ZERO)),
            );
        }
        query
    }

    async fn allowed_destinations(&self, actor: &Actor) -> OrderResult<Option<Vec<i32>>> {
        if actor.is_staff() {
            return Ok(None);
        }
        let allowed = AccessService::new(self.db.clone())
            .allowed_person_ids(actor.user_id)
            .await?;
        Ok(Some(allowed))
    }

    pub async fn list(
        &self,
        actor: &Actor,
        filter: &ConsolidatedFilter,
    ) -> OrderResult<(Vec<ConsolidatedRow>, PageMeta)> {
        let allowed = self.allowed_destinations(actor).await?;
        let page = page_number(filter.page);

        let paginator = self
            .filtered_query(filter, allowed)
            .order_by_desc(order_consolidated::Column::CreatedAt)
            .order_by_desc(order_consolidated::Column::Id)
            .paginate(&self.db, DEFAULT_PAGE_SIZE);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page - 1).await?;

        let rows = self.describe(rows).await?;
        Ok((rows, PageMeta::new(page, DEFAULT_PAGE_SIZE, total)))
    }

    pub async fn export_rows(
        &self,
        actor: &Actor,
        filter: &ConsolidatedFilter,
    ) -> OrderResult<Vec<ConsolidatedRow>> {
        let allowed = self.allowed_destinations(actor).await?;
        let rows = self
            .filtered_query(filter, allowed)
            .order_by_asc(order_consolidated::Column::DestinationId)
            .order_by_asc(order_consolidated::Column::Id)
            .all(&self.db)
            .await?;
        self.describe(rows).await
    }

    async fn describe(
        &self,
        rows: Vec<order_consolidated::Model>,
    ) -> OrderResult<Vec<ConsolidatedRow>> {
        let request = LookupRequest {
            person_ids: rows.iter().map(|r| r.destination_id).collect(),
            product_ids: rows.iter().map(|r| r.product_id).collect(),
            unit_ids: rows.iter().map(|r| r.unit_id).collect(),
            category_ids: BTreeSet::new(),
        };
        let lookup = ReferenceLookup::load(&self.db, &request).await?;
        let consumable: HashMap<i32, bool> = request
            .product_ids
            .iter()
            .filter_map(|id| lookup.product(*id).map(|p| (*id, p.consumable)))
            .collect();

        Ok(rows
            .into_iter()
            .map(|row| {
                let destination = lookup.person(row.destination_id).cloned().unwrap_or_default();
                ConsolidatedRow {
                    id: row.id,
                    destination_id: row.destination_id,
                    destination_name: destination.name,
                    destination_city: destination.city,
                    destination_state: destination.state,
                    destination_priority: destination.priority,
                    person_type: destination.person_type,
                    person_type_priority: destination.person_type_priority,
                    product_id: row.product_id,
                    product_name: lookup.product_name(row.product_id),
                    consumable: consumable.get(&row.product_id).copied().unwrap_or(false),
                    unit_id: row.unit_id,
                    unit_name: lookup.unit_name(row.unit_id),
                    request_quantity: row.request_quantity,
                    supply_reserve_quantity: row.supply_reserve_quantity,
                    supply_transport_quantity: row.supply_transport_quantity,
                }
            })
            .collect())
    }
}
