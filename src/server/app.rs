use axum::{
    http::HeaderValue,
    routing::{get, post, put},
    Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use anyhow::Result;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{consolidated, health, maintenance, orders};
use crate::reconcile::{AnomalySink, MatchStyle, Reconciler};
use crate::services::{ConsolidationService, OrderService};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub match_style: MatchStyle,
    pub anomalies: Arc<dyn AnomalySink>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, match_style: MatchStyle, anomalies: Arc<dyn AnomalySink>) -> Self {
        Self {
            db,
            match_style,
            anomalies,
        }
    }

    pub fn orders(&self) -> OrderService {
        OrderService::new(self.db.clone())
    }

    pub fn consolidation(&self) -> ConsolidationService {
        ConsolidationService::new(self.db.clone()).with_match_style(self.match_style)
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.match_style, self.anomalies.clone())
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        orders::list_orders,
        orders::create_order,
        orders::get_order,
        orders::update_order,
        orders::delete_order,
        orders::order_history,
        orders::export_orders,
        orders::export_supply,
        consolidated::list_consolidated,
        consolidated::export_consolidated,
        maintenance::import_orders,
        maintenance::import_cities,
        maintenance::import_products,
        maintenance::consolidate_destination,
    ),
    components(schemas(
        crate::services::OrderPayload,
        crate::services::LineItemPayload,
        crate::services::OrderView,
        crate::services::StaffOrderView,
        crate::services::AccountOrderView,
        crate::services::LineItemView,
        crate::services::PageMeta,
        crate::services::ConsolidatedRow,
        crate::services::RecomputeSummary,
        crate::services::ImportReport,
        crate::services::RowFailure,
        crate::services::ConsolidationFailure,
        crate::database::entities::OrderType,
        crate::database::entities::OrderStatus,
        orders::SavedOrder,
        orders::SavedEntity,
        orders::OrderPage,
        orders::HistoryEntry,
        consolidated::ConsolidatedPage,
        super::error::ErrorBody,
    )),
    tags((name = "aidlink", description = "Donation logistics back office"))
)]
pub struct ApiDoc;

pub fn create_app(state: AppState, cors_origin: Option<&str>) -> Result<Router> {
    let cors = match cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api_v1_routes())
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state);

    Ok(app)
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        // Orders
        .route("/orders", get(orders::list_orders).post(orders::create_order))
        .route(
            "/orders/:id",
            get(orders::get_order)
                .put(orders::update_order)
                .delete(orders::delete_order),
        )
        .route("/orders/:id/history", get(orders::order_history))

        // Consolidation
        .route("/consolidated", get(consolidated::list_consolidated))

        // CSV exports
        .route("/export/orders", get(orders::export_orders))
        .route("/export/supply", get(orders::export_supply))
        .route("/export/consolidated", get(consolidated::export_consolidated))

        // Maintenance
        .route("/maintenance/import/orders", post(maintenance::import_orders))
        .route("/maintenance/import/cities", post(maintenance::import_cities))
        .route("/maintenance/import/products", post(maintenance::import_products))
        .route(
            "/maintenance/consolidate/:destination_id",
            put(maintenance::consolidate_destination),
        )
}
