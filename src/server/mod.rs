#[cfg(feature = "server")]
pub mod app;
#[cfg(feature = "server")]
pub mod error;
#[cfg(feature = "server")]
pub mod extract;
#[cfg(feature = "server")]
pub mod handlers;

use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum MigrateDirection {
    Up,
    Down,
    Fresh,
}

use crate::database::{connection::*, migrations::Migrator};
use anyhow::Result;
use sea_orm_migration::prelude::*;
use tracing::info;

#[cfg(feature = "server")]
pub async fn start_server(config: &crate::config::AppConfig) -> Result<()> {
    use crate::reconcile::{FileAnomalyLog, MatchStyle};
    use sea_orm::ConnectionTrait;
    use std::sync::Arc;

    let database_url = get_database_url(Some(config.database()));
    let db = establish_connection(&database_url).await?;

    Migrator::up(&db, None).await?;
    info!("Database migrations completed");

    let match_style = config
        .match_style
        .unwrap_or_else(|| MatchStyle::for_backend(db.get_database_backend()));
    let anomalies = Arc::new(FileAnomalyLog::new(config.anomaly_log()));
    let state = app::AppState::new(db, match_style, anomalies);
    let app = app::create_app(state, config.cors_origin.as_deref())?;

    let port = config.port();
    log_routes();

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Server running on http://0.0.0.0:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(feature = "server")]
fn log_routes() {
    info!("API Endpoints:");
    info!("  /health                          - Health check");
    info!("  /docs                            - Swagger UI documentation");
    info!("  /api/v1/orders                   - Orders (list, create, update, delete, history)");
    info!("  /api/v1/consolidated             - Consolidated quantities per destination");
    info!("  /api/v1/export/*                 - CSV exports (orders, supply, consolidated)");
    info!("  /api/v1/maintenance/*            - Imports and consolidation (staff only)");
}

pub async fn migrate_database(database_path: &str, direction: MigrateDirection) -> Result<()> {
    let database_url = get_database_url(Some(database_path));
    let db = establish_connection(&database_url).await?;

    match direction {
        MigrateDirection::Up => {
            info!("Running migrations up");
            Migrator::up(&db, None).await?;
        }
        MigrateDirection::Down => {
            info!("Running migrations down");
            Migrator::down(&db, None).await?;
        }
        MigrateDirection::Fresh => {
            info!("Running fresh migrations (down then up)");
            Migrator::down(&db, None).await?;
            Migrator::up(&db, None).await?;
        }
    }

    info!("Database migration completed");
    Ok(())
}
