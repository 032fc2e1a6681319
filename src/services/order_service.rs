use chrono::{NaiveDate, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Condition, Query, SelectStatement};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, Select, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

#[cfg(feature = "server")]
use utoipa::ToSchema;

use super::access::{AccessService, Actor};
use super::consolidation_service::ConsolidationService;
use super::lookup::{LookupRequest, PersonSummary, ReferenceLookup};
use super::order_views::OrderView;
use super::paging::{page_number, PageMeta, DEFAULT_PAGE_SIZE};
use crate::database::entities::order_line_items::QUANTITY_SCALE;
use crate::database::entities::{
    order_categories, order_history, order_line_items, orders, persons, products, OrderStatus,
    OrderType,
};
use crate::errors::{OrderError, OrderResult};

/// Desired state of an order header plus its full line-item list
#[derive(Clone, Debug, Deserialize, Serialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub origin_id: i32,
    pub origin_contact_id: i32,
    pub destination_id: i32,
    pub destination_contact_id: i32,
    pub category_id: Option<i32>,
    pub effective_date: NaiveDate,
    pub notes: Option<String>,
    /// Staff only
    pub internal_notes: Option<String>,
    /// Staff only
    pub needs_review: Option<bool>,
    #[serde(default)]
    pub products: Vec<LineItemPayload>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct LineItemPayload {
    pub product_id: i32,
    pub quantity: Decimal,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct OrderFilter {
    /// Numeric id search
    pub q: Option<String>,
    #[serde(rename = "destinationId")]
    pub destination_id: Option<i32>,
    #[serde(rename = "originId")]
    pub origin_id: Option<i32>,
    #[serde(rename = "categoryId")]
    pub category_id: Option<i32>,
    pub status: Option<OrderStatus>,
    #[serde(rename = "type")]
    pub order_type: Option<OrderType>,
    pub page: Option<u64>,
}

/// One exported line: an order header repeated for each of its line items
#[derive(Clone, Debug, PartialEq)]
pub struct OrderExportRow {
    pub order_id: i32,
    pub order_type: OrderType,
    pub category: String,
    pub effective_date: NaiveDate,
    pub destination: PersonSummary,
    pub origin: PersonSummary,
    pub product: String,
    pub unit: String,
    pub quantity: Decimal,
}

/// Validated references needed by the save transaction
struct SavePlan {
    existing: Option<orders::Model>,
    /// product id -> (unit id, item), in payload order; a repeated product keeps its last entry
    items: IndexMap<i32, (i32, LineItemPayload)>,
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Appends a snapshot of `order` to its history
pub async fn record_history<C: ConnectionTrait>(
    conn: &C,
    order: &orders::Model,
    actor_id: i32,
    is_creation: bool,
) -> Result<order_history::Model, DbErr> {
    let snapshot = serde_json::to_value(order).map_err(|e| DbErr::Json(e.to_string()))?;
    order_history::ActiveModel {
        order_id: Set(order.id),
        actor_id: Set(actor_id),
        is_creation: Set(is_creation),
        snapshot: Set(snapshot),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await
}

#[derive(Clone)]
pub struct OrderService {
    db: DatabaseConnection,
    access: AccessService,
    consolidation: ConsolidationService,
}

impl OrderService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            access: AccessService::new(db.clone()),
            consolidation: ConsolidationService::new(db.clone()),
            db,
        }
    }

    /// Creates (`id == None`) or replaces an order and its line items.
    ///
    /// Validation runs before any write. The header, history snapshot and
    /// line-item diff are committed together; the destination is then
    /// consolidated in a second transaction. A consolidation failure is
    /// returned as [`OrderError::ConsolidationFailed`] with the order kept.
    pub async fn save_order(
        &self,
        actor: &Actor,
        id: Option<i32>,
        payload: OrderPayload,
    ) -> OrderResult<i32> {
        let plan = self.validate_save(actor, id, &payload).await?;
        let previous_destination = plan.existing.as_ref().map(|o| o.destination_id);

        let order = self.persist(actor, plan, &payload).await?;
        info!(
            "Saved order {} for destination {} ({} line items)",
            order.id,
            order.destination_id,
            payload.products.len()
        );

        let mut destinations = vec![order.destination_id];
        if let Some(previous) = previous_destination.filter(|d| *d != order.destination_id) {
            destinations.push(previous);
        }
        for destination_id in destinations {
            if let Err(source) = self
                .consolidation
                .recompute_for_destination(destination_id)
                .await
            {
                warn!(
                    "Order {} saved but consolidation of destination {} failed: {}",
                    order.id, destination_id, source
                );
                return Err(OrderError::ConsolidationFailed {
                    order_id: order.id,
                    destination_id,
                    source,
                });
            }
        }

        Ok(order.id)
    }

    async fn validate_save(
        &self,
        actor: &Actor,
        id: Option<i32>,
        payload: &OrderPayload,
    ) -> OrderResult<SavePlan> {
        if !actor.is_staff() && !OrderStatus::ACCOUNT_SETTABLE.contains(&payload.status) {
            return Err(OrderError::validation(format!(
                "Status {:?} can only be set by staff.",
                payload.status
            )));
        }

        let existing = match id {
            Some(id) => Some(self.find_visible(actor, id).await?),
            None => None,
        };

        for item in &payload.products {
            if item.quantity.round_dp(QUANTITY_SCALE) <= Decimal::ZERO {
                return Err(OrderError::validation(format!(
                    "Invalid quantity {} for product {}.",
                    item.quantity, item.product_id
                )));
            }
        }

        let product_ids: BTreeSet<i32> = payload.products.iter().map(|i| i.product_id).collect();
        let product_units: HashMap<i32, i32> = if product_ids.is_empty() {
            HashMap::new()
        } else {
            products::Entity::find()
                .filter(products::Column::Id.is_in(product_ids.iter().copied()))
                .filter(products::Column::RequestFormActive.eq(true))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|p| (p.id, p.unit_id))
                .collect()
        };

        let mut items = IndexMap::new();
        for item in &payload.products {
            let unit_id = product_units.get(&item.product_id).copied().ok_or_else(|| {
                OrderError::validation(format!(
                    "Product {} not found or not available in the order form.",
                    item.product_id
                ))
            })?;
            items.insert(item.product_id, (unit_id, item.clone()));
        }

        self.access
            .ensure_can_edit_person(actor, payload.origin_id, "Origin")
            .await?;
        self.access
            .ensure_contact_of(payload.origin_contact_id, payload.origin_id, "Origin")
            .await?;
        self.access
            .ensure_can_edit_person(actor, payload.destination_id, "Destination")
            .await?;
        self.access
            .ensure_contact_of(
                payload.destination_contact_id,
                payload.destination_id,
                "Destination",
            )
            .await?;

        if let Some(category_id) = payload.category_id {
            order_categories::Entity::find_by_id(category_id)
                .one(&self.db)
                .await?
                .ok_or_else(|| {
                    OrderError::validation(format!("Order category {} not found.", category_id))
                })?;
        }

        Ok(SavePlan { existing, items })
    }

    async fn persist(
        &self,
        actor: &Actor,
        plan: SavePlan,
        payload: &OrderPayload,
    ) -> OrderResult<orders::Model> {
        let now = Utc::now();
        let notes = trimmed(payload.notes.as_deref());
        let txn = self.db.begin().await?;

        let is_creation = plan.existing.is_none();
        let mut order: orders::ActiveModel = match plan.existing {
            Some(existing) => {
                record_history(&txn, &existing, actor.user_id, false).await?;
                existing.into()
            }
            None => orders::ActiveModel {
                creator_id: Set(Some(actor.user_id)),
                needs_review: Set(notes.is_some()),
                internal_notes: Set(None),
                created_at: Set(now),
                ..Default::default()
            },
        };

        order.order_type = Set(payload.order_type);
        order.status = Set(payload.status.normalized());
        order.origin_id = Set(Some(payload.origin_id));
        order.origin_contact_id = Set(Some(payload.origin_contact_id));
        order.destination_id = Set(payload.destination_id);
        order.destination_contact_id = Set(Some(payload.destination_contact_id));
        order.category_id = Set(payload.category_id);
        order.effective_date = Set(payload.effective_date);
        order.notes = Set(notes);
        order.updated_at = Set(now);

        if actor.is_staff() {
            order.internal_notes = Set(trimmed(payload.internal_notes.as_deref()));
            if let Some(needs_review) = payload.needs_review {
                order.needs_review = Set(needs_review);
            }
        }

        let order = if is_creation {
            let order = order.insert(&txn).await?;
            record_history(&txn, &order, actor.user_id, true).await?;
            order
        } else {
            order.update(&txn).await?
        };

        let current: HashMap<i32, order_line_items::Model> = order_line_items::Entity::find()
            .filter(order_line_items::Column::OrderId.eq(order.id))
            .order_by_asc(order_line_items::Column::Id)
            .all(&txn)
            .await?
            .into_iter()
            .map(|item| (item.product_id, item))
            .collect();

        let mut kept = Vec::with_capacity(plan.items.len());
        for (product_id, (unit_id, item)) in plan.items {
            let saved = match current.get(&product_id) {
                Some(existing) => {
                    let mut active: order_line_items::ActiveModel = existing.clone().into();
                    active.unit_id = Set(unit_id);
                    active.quantity = Set(item.quantity);
                    active.notes = Set(trimmed(item.notes.as_deref()));
                    active.updated_at = Set(now);
                    active.update(&txn).await?
                }
                None => {
                    order_line_items::ActiveModel {
                        order_id: Set(order.id),
                        product_id: Set(product_id),
                        unit_id: Set(unit_id),
                        quantity: Set(item.quantity),
                        notes: Set(trimmed(item.notes.as_deref())),
                        created_at: Set(now),
                        updated_at: Set(now),
                        ..Default::default()
                    }
                    .insert(&txn)
                    .await?
                }
            };
            kept.push(saved.id);
        }

        // Row by row so the delete hooks run for every removed item
        let removed = order_line_items::Entity::find()
            .filter(order_line_items::Column::OrderId.eq(order.id))
            .filter(order_line_items::Column::Id.is_not_in(kept))
            .all(&txn)
            .await?;
        let removed_count = removed.len();
        for item in removed {
            item.delete(&txn).await?;
        }

        txn.commit().await?;
        debug!("Order {} line items: {} removed", order.id, removed_count);
        Ok(order)
    }

    /// Loads an order, hiding orders an account user has no access to
    async fn find_visible(&self, actor: &Actor, id: i32) -> OrderResult<orders::Model> {
        let order = orders::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| OrderError::not_found("orders", id))?;

        if actor.is_staff() {
            return Ok(order);
        }

        let allowed = self.access.allowed_person_ids(actor.user_id).await?;
        let visible = allowed.contains(&order.destination_id)
            && order.origin_id.map_or(false, |origin| allowed.contains(&origin));
        if !visible {
            return Err(OrderError::not_found("orders", id));
        }
        Ok(order)
    }

    async fn filtered_query(
        &self,
        actor: &Actor,
        filter: &OrderFilter,
    ) -> OrderResult<Select<orders::Entity>> {
        let mut query = orders::Entity::find();

        let numeric_q = filter
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty() && q.chars().all(|c| c.is_ascii_digit()))
            .and_then(|q| q.parse::<i32>().ok());
        if let Some(q) = numeric_q {
            let mut any = Condition::any().add(orders::Column::Id.eq(q));
            if actor.is_staff() {
                any = any
                    .add(orders::Column::DestinationId.eq(q))
                    .add(orders::Column::DestinationContactId.eq(q))
                    .add(orders::Column::OriginId.eq(q))
                    .add(orders::Column::OriginContactId.eq(q));
            }
            query = query.filter(any);
        }

        if actor.is_staff() {
            if let Some(destination_id) = filter.destination_id {
                query = query.filter(orders::Column::DestinationId.eq(destination_id));
            }
            if let Some(origin_id) = filter.origin_id {
                query = query.filter(orders::Column::OriginId.eq(origin_id));
            }
            if let Some(category_id) = filter.category_id {
                query = query.filter(orders::Column::CategoryId.eq(category_id));
            }
        } else {
            let allowed = self.access.allowed_person_ids(actor.user_id).await?;
            query = query
                .filter(orders::Column::DestinationId.is_in(allowed.clone()))
                .filter(orders::Column::OriginId.is_in(allowed));
        }

        if let Some(status) = filter.status {
            query = query.filter(orders::Column::Status.eq(status));
        }
        if let Some(order_type) = filter.order_type {
            query = query.filter(orders::Column::OrderType.eq(order_type));
        }

        Ok(query
            .order_by_desc(orders::Column::CreatedAt)
            .order_by_desc(orders::Column::Id))
    }

    async fn line_items_by_order(
        &self,
        order_ids: &[i32],
    ) -> OrderResult<HashMap<i32, Vec<order_line_items::Model>>> {
        let mut grouped: HashMap<i32, Vec<order_line_items::Model>> = HashMap::new();
        if order_ids.is_empty() {
            return Ok(grouped);
        }
        let items = order_line_items::Entity::find()
            .filter(order_line_items::Column::OrderId.is_in(order_ids.iter().copied()))
            .order_by_asc(order_line_items::Column::Id)
            .all(&self.db)
            .await?;
        for item in items {
            grouped.entry(item.order_id).or_default().push(item);
        }
        Ok(grouped)
    }

    pub async fn list_orders(
        &self,
        actor: &Actor,
        filter: &OrderFilter,
    ) -> OrderResult<(Vec<OrderView>, PageMeta)> {
        let page = page_number(filter.page);
        let paginator = self
            .filtered_query(actor, filter)
            .await?
            .paginate(&self.db, DEFAULT_PAGE_SIZE);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page - 1).await?;

        let ids: Vec<i32> = rows.iter().map(|o| o.id).collect();
        let mut items = self.line_items_by_order(&ids).await?;
        let views = rows
            .into_iter()
            .map(|order| {
                let order_items = items.remove(&order.id).unwrap_or_default();
                OrderView::project(actor.role, order, order_items)
            })
            .collect();

        Ok((views, PageMeta::new(page, DEFAULT_PAGE_SIZE, total)))
    }

    pub async fn get_order(&self, actor: &Actor, id: i32) -> OrderResult<OrderView> {
        let order = self.find_visible(actor, id).await?;
        let items = order
            .find_related(order_line_items::Entity)
            .order_by_asc(order_line_items::Column::Id)
            .all(&self.db)
            .await?;
        Ok(OrderView::project(actor.role, order, items))
    }

    /// Deletes an order; its line items go with it through the storage cascade
    pub async fn delete_order(&self, actor: &Actor, id: i32) -> OrderResult<OrderView> {
        let order = self.find_visible(actor, id).await?;
        let items = order
            .find_related(order_line_items::Entity)
            .all(&self.db)
            .await?;
        let view = OrderView::project(actor.role, order.clone(), items);
        let destination_id = order.destination_id;

        let txn = self.db.begin().await?;
        order.delete(&txn).await?;
        txn.commit().await?;
        info!("Deleted order {}", id);

        self.consolidation
            .recompute_for_destination(destination_id)
            .await
            .map_err(|source| OrderError::ConsolidationFailed {
                order_id: id,
                destination_id,
                source,
            })?;
        Ok(view)
    }

    pub async fn history(&self, actor: &Actor, id: i32) -> OrderResult<Vec<order_history::Model>> {
        if !actor.is_staff() {
            self.find_visible(actor, id).await?;
        }
        Ok(order_history::Entity::find()
            .filter(order_history::Column::OrderId.eq(id))
            .order_by_asc(order_history::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Ids of persons that may appear in exports
    fn exportable_persons() -> SelectStatement {
        Query::select()
            .column(persons::Column::Id)
            .from(persons::Entity)
            .and_where(persons::Column::ExportIgnore.eq(false))
            .to_owned()
    }

    /// Rows for the order export; `supply_only` restricts to supply orders.
    ///
    /// Orders without an origin, or whose origin or destination is flagged
    /// `export_ignore`, are left out.
    pub async fn export_rows(
        &self,
        actor: &Actor,
        filter: &OrderFilter,
        supply_only: bool,
    ) -> OrderResult<Vec<OrderExportRow>> {
        let mut filter = filter.clone();
        if supply_only {
            filter.order_type = Some(OrderType::Supply);
        }
        let orders = self
            .filtered_query(actor, &filter)
            .await?
            .filter(orders::Column::OriginId.in_subquery(Self::exportable_persons()))
            .filter(orders::Column::DestinationId.in_subquery(Self::exportable_persons()))
            .all(&self.db)
            .await?;
        let ids: Vec<i32> = orders.iter().map(|o| o.id).collect();
        let mut items = self.line_items_by_order(&ids).await?;

        let mut request = LookupRequest::default();
        for order in &orders {
            request.person_ids.insert(order.destination_id);
            request.person_ids.extend(order.origin_id);
            request.category_ids.extend(order.category_id);
        }
        for item in items.values().flatten() {
            request.product_ids.insert(item.product_id);
            request.unit_ids.insert(item.unit_id);
        }
        let lookup = ReferenceLookup::load(&self.db, &request).await?;

        let mut rows = Vec::new();
        for order in orders {
            let destination = lookup.person(order.destination_id).cloned().unwrap_or_default();
            let origin = order
                .origin_id
                .and_then(|id| lookup.person(id).cloned())
                .unwrap_or_default();
            let category = lookup.category_name(order.category_id);
            for item in items.remove(&order.id).unwrap_or_default() {
                rows.push(OrderExportRow {
                    order_id: order.id,
                    order_type: order.order_type,
                    category: category.clone(),
                    effective_date: order.effective_date,
                    destination: destination.clone(),
                    origin: origin.clone(),
                    product: lookup.product_name(item.product_id),
                    unit: lookup.unit_name(item.unit_id),
                    quantity: item.quantity,
                });
            }
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trimmed_notes() {
        assert_eq!(trimmed(Some("  ")), None);
        assert_eq!(trimmed(None), None);
        assert_eq!(trimmed(Some(" mask ")), Some("mask".to_string()));
    }

    #[test]
    fn test_payload_deserializes_camel_case() {
        let payload: OrderPayload = serde_json::from_str(
            r#"{
                "type": "REQUEST",
                "status": "NEW",
                "originId": 1,
                "originContactId": 2,
                "destinationId": 3,
                "destinationContactId": 4,
                "effectiveDate": "2020-05-03",
                "notes": "please hurry",
                "products": [{"productId": 7, "quantity": "2.5"}]
            }"#,
        )
        .unwrap();
        assert_eq!(payload.order_type, OrderType::Request);
        assert_eq!(payload.products.len(), 1);
        assert_eq!(payload.products[0].quantity, Decimal::new(25, 1));
        assert_eq!(payload.category_id, None);
    }
}
