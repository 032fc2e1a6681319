use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Json, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use super::csv_attachment;
use crate::database::entities::order_history;
use crate::export::{to_csv_orders, to_csv_supply};
use crate::server::app::AppState;
use crate::server::error::ApiError;
use crate::services::{Actor, OrderFilter, OrderPayload, OrderView, PageMeta};

#[derive(Debug, Serialize, ToSchema)]
pub struct SavedEntity {
    pub id: i32,
}

/// Save acknowledgement: `{"entity": {"id": N}}`
#[derive(Debug, Serialize, ToSchema)]
pub struct SavedOrder {
    pub entity: SavedEntity,
}

impl SavedOrder {
    fn new(id: i32) -> Self {
        Self {
            entity: SavedEntity { id },
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderPage {
    pub data: Vec<OrderView>,
    pub meta: PageMeta,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: i32,
    pub order_id: i32,
    pub actor_id: i32,
    pub is_creation: bool,
    /// Order header as it was when the entry was written
    #[schema(value_type = Object)]
    pub snapshot: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<order_history::Model> for HistoryEntry {
    fn from(model: order_history::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            actor_id: model.actor_id,
            is_creation: model.is_creation,
            snapshot: model.snapshot,
            created_at: model.created_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(
        ("q" = Option<String>, Query, description = "Order id (staff: also person or contact id)"),
        ("destinationId" = Option<i32>, Query, description = "Destination person"),
        ("originId" = Option<i32>, Query, description = "Origin person"),
        ("categoryId" = Option<i32>, Query, description = "Order category"),
        ("status" = Option<crate::database::entities::OrderStatus>, Query, description = "Order status"),
        ("type" = Option<crate::database::entities::OrderType>, Query, description = "Order type"),
        ("page" = Option<u64>, Query, description = "One-based page number")
    ),
    responses(
        (status = 200, description = "Orders visible to the caller, newest first", body = OrderPage),
        (status = 401, description = "Unknown user", body = crate::server::error::ErrorBody)
    )
)]
pub async fn list_orders(
    State(state): State<AppState>,
    actor: Actor,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<OrderPage>, ApiError> {
    let (data, meta) = state.orders().list_orders(&actor, &filter).await?;
    Ok(Json(OrderPage { data, meta }))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = crate::services::OrderPayload,
    responses(
        (status = 201, description = "Order created", body = SavedOrder),
        (status = 400, description = "Validation failed", body = crate::server::error::ErrorBody),
        (status = 500, description = "Save or consolidation failed", body = crate::server::error::ErrorBody)
    )
)]
pub async fn create_order(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<OrderPayload>,
) -> Result<(StatusCode, Json<SavedOrder>), ApiError> {
    let id = state.orders().save_order(&actor, None, payload).await?;
    info!("Order {} created by user {}", id, actor.user_id);
    Ok((StatusCode::CREATED, Json(SavedOrder::new(id))))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with its line items", body = OrderView),
        (status = 404, description = "Order not found", body = crate::server::error::ErrorBody)
    )
)]
pub async fn get_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
) -> Result<Json<OrderView>, ApiError> {
    Ok(Json(state.orders().get_order(&actor, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}",
    params(("id" = i32, Path, description = "Order ID")),
    request_body = crate::services::OrderPayload,
    responses(
        (status = 200, description = "Order updated", body = SavedOrder),
        (status = 400, description = "Validation failed", body = crate::server::error::ErrorBody),
        (status = 404, description = "Order not found", body = crate::server::error::ErrorBody)
    )
)]
pub async fn update_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
    Json(payload): Json<OrderPayload>,
) -> Result<Json<SavedOrder>, ApiError> {
    let id = state.orders().save_order(&actor, Some(id), payload).await?;
    info!("Order {} updated by user {}", id, actor.user_id);
    Ok(Json(SavedOrder::new(id)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}",
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Deleted order", body = OrderView),
        (status = 404, description = "Order not found", body = crate::server::error::ErrorBody)
    )
)]
pub async fn delete_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
) -> Result<Json<OrderView>, ApiError> {
    let deleted = state.orders().delete_order(&actor, id).await?;
    info!("Order {} deleted by user {}", id, actor.user_id);
    Ok(Json(deleted))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/history",
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Prior states of the order, oldest first", body = [HistoryEntry]),
        (status = 404, description = "Order not found", body = crate::server::error::ErrorBody)
    )
)]
pub async fn order_history(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let entries = state.orders().history(&actor, id).await?;
    Ok(Json(entries.into_iter().map(HistoryEntry::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/export/orders",
    responses(
        (status = 200, description = "Orders as CSV, one row per line item", body = String, content_type = "text/csv")
    )
)]
pub async fn export_orders(
    State(state): State<AppState>,
    actor: Actor,
    Query(filter): Query<OrderFilter>,
) -> Result<Response, ApiError> {
    let rows = state.orders().export_rows(&actor, &filter, false).await?;
    Ok(csv_attachment("orders.csv", to_csv_orders::render(&rows)?))
}

#[utoipa::path(
    get,
    path = "/api/v1/export/supply",
    responses(
        (status = 200, description = "Supply orders as CSV", body = String, content_type = "text/csv")
    )
)]
pub async fn export_supply(
    State(state): State<AppState>,
    actor: Actor,
    Query(filter): Query<OrderFilter>,
) -> Result<Response, ApiError> {
    let rows = state.orders().export_rows(&actor, &filter, true).await?;
    Ok(csv_attachment("supply.csv", to_csv_supply::render(&rows)?))
}
