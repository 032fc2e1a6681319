use axum::{
    extract::{Query, State},
    response::{Json, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

use super::csv_attachment;
use crate::export::to_csv_consolidated;
use crate::server::app::AppState;
use crate::server::error::ApiError;
use crate::services::{Actor, ConsolidatedFilter, ConsolidatedRow, PageMeta};

#[derive(Debug, Serialize, ToSchema)]
pub struct ConsolidatedPage {
    pub data: Vec<ConsolidatedRow>,
    pub meta: PageMeta,
}

#[utoipa::path(
    get,
    path = "/api/v1/consolidated",
    params(
        ("q" = Option<String>, Query, description = "Product name prefix"),
        ("destinationId" = Option<i32>, Query, description = "Destination person"),
        ("showOnlyWithQuantity" = Option<bool>, Query, description = "Hide rows with nothing requested"),
        ("page" = Option<u64>, Query, description = "One-based page number")
    ),
    responses(
        (status = 200, description = "Consolidated quantities", body = ConsolidatedPage)
    )
)]
pub async fn list_consolidated(
    State(state): State<AppState>,
    actor: Actor,
    Query(filter): Query<ConsolidatedFilter>,
) -> Result<Json<ConsolidatedPage>, ApiError> {
    let (data, meta) = state.consolidation().list(&actor, &filter).await?;
    Ok(Json(ConsolidatedPage { data, meta }))
}

#[utoipa::path(
    get,
    path = "/api/v1/export/consolidated",
    responses(
        (status = 200, description = "Consolidated quantities as CSV", body = String, content_type = "text/csv")
    )
)]
pub async fn export_consolidated(
    State(state): State<AppState>,
    actor: Actor,
    Query(filter): Query<ConsolidatedFilter>,
) -> Result<Response, ApiError> {
    let rows = state.consolidation().export_rows(&actor, &filter).await?;
    Ok(csv_attachment(
        "consolidated.csv",
        to_csv_consolidated::render(&rows)?,
    ))
}
