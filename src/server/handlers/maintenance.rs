//! Staff-only data maintenance: CSV imports and forced consolidation

use axum::{
    extract::{Path, State},
    response::Json,
};
use sea_orm::EntityTrait;
use tracing::info;

use crate::database::entities::persons;
use crate::errors::OrderError;
use crate::server::app::AppState;
use crate::server::error::ApiError;
use crate::server::extract::require_staff;
use crate::services::{
    Actor, ImportReport, OrderImportService, RecomputeSummary, ReferenceImportService,
};

#[utoipa::path(
    post,
    path = "/api/v1/maintenance/import/orders",
    request_body(content = String, content_type = "text/csv"),
    responses(
        (status = 200, description = "Import finished; see the report for row failures", body = ImportReport),
        (status = 400, description = "Unreadable CSV or missing headers", body = crate::server::error::ErrorBody),
        (status = 403, description = "Staff access required", body = crate::server::error::ErrorBody)
    )
)]
pub async fn import_orders(
    State(state): State<AppState>,
    actor: Actor,
    body: String,
) -> Result<Json<ImportReport>, ApiError> {
    require_staff(&actor)?;
    info!("Order import started by user {}", actor.user_id);
    let report = OrderImportService::new(state.db.clone(), state.reconciler())
        .import_reader(body.as_bytes())
        .await?;
    Ok(Json(report))
}

#[utoipa::path(
    post,
    path = "/api/v1/maintenance/import/cities",
    request_body(content = String, content_type = "text/csv"),
    responses(
        (status = 200, description = "Import finished", body = ImportReport),
        (status = 403, description = "Staff access required", body = crate::server::error::ErrorBody)
    )
)]
pub async fn import_cities(
    State(state): State<AppState>,
    actor: Actor,
    body: String,
) -> Result<Json<ImportReport>, ApiError> {
    require_staff(&actor)?;
    let report = ReferenceImportService::new(state.db.clone(), state.reconciler())
        .import_cities(body.as_bytes())
        .await?;
    Ok(Json(report))
}

#[utoipa::path(
    post,
    path = "/api/v1/maintenance/import/products",
    request_body(content = String, content_type = "text/csv"),
    responses(
        (status = 200, description = "Import finished", body = ImportReport),
        (status = 403, description = "Staff access required", body = crate::server::error::ErrorBody)
    )
)]
pub async fn import_products(
    State(state): State<AppState>,
    actor: Actor,
    body: String,
) -> Result<Json<ImportReport>, ApiError> {
    require_staff(&actor)?;
    let report = ReferenceImportService::new(state.db.clone(), state.reconciler())
        .import_products(body.as_bytes())
        .await?;
    Ok(Json(report))
}

#[utoipa::path(
    put,
    path = "/api/v1/maintenance/consolidate/{destination_id}",
    params(("destination_id" = i32, Path, description = "Destination person ID")),
    responses(
        (status = 200, description = "Consolidation rewritten", body = RecomputeSummary),
        (status = 404, description = "Destination not found", body = crate::server::error::ErrorBody)
    )
)]
pub async fn consolidate_destination(
    State(state): State<AppState>,
    actor: Actor,
    Path(destination_id): Path<i32>,
) -> Result<Json<RecomputeSummary>, ApiError> {
    require_staff(&actor)?;
    persons::Entity::find_by_id(destination_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| OrderError::not_found("persons", destination_id))?;
    let summary = state
        .consolidation()
        .recompute_for_destination(destination_id)
        .await?;
    Ok(Json(summary))
}
