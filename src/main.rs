use aidlink::config::AppConfig;
use aidlink::database::{establish_connection, get_database_url, migrations::Migrator, seed_data};
use aidlink::reconcile::{FileAnomalyLog, MatchStyle, Reconciler};
use aidlink::server;
use aidlink::services::{ConsolidationService, ImportReport, OrderImportService, ReferenceImportService};

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use sea_orm::{ConnectionTrait, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// YAML configuration file
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Serve {
        #[clap(short, long)]
        port: Option<u16>,
        #[clap(short, long)]
        database: Option<String>,
        #[clap(long)]
        cors_origin: Option<String>,
    },
    Db {
        #[clap(subcommand)]
        command: DbCommands,
    },
    Import {
        #[clap(subcommand)]
        command: ImportCommands,
        #[clap(short, long, global = true)]
        database: Option<String>,
        /// Anomaly log file (warnings and skipped rows)
        #[clap(long, global = true)]
        anomaly_log: Option<PathBuf>,
    },
    /// Rewrite the consolidated quantities of one destination
    Consolidate {
        destination_id: i32,
        #[clap(short, long)]
        database: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum DbCommands {
    Init {
        #[clap(short, long)]
        database: Option<String>,
        #[clap(long, default_value = "admin@aidlink.local")]
        admin_email: String,
        #[clap(long, default_value = "Administrator")]
        admin_name: String,
    },
    Migrate {
        #[clap(subcommand)]
        direction: server::MigrateDirection,
        #[clap(short, long)]
        database: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ImportCommands {
    /// Historical request orders
    Orders { file: PathBuf },
    /// States and cities
    Cities { file: PathBuf },
    /// Product catalogue
    Products { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let config = AppConfig::load_optional(args.config.as_deref())?.merge(AppConfig {
        log_level: args.log_level.clone(),
        ..Default::default()
    });
    setup_logging(config.log_level());

    match args.command {
        Commands::Serve {
            port,
            database,
            cors_origin,
        } => {
            let config = config.merge(AppConfig {
                port,
                database,
                cors_origin,
                ..Default::default()
            });
            info!("Starting server on port {}", config.port());
            start_server(&config).await?;
        }
        Commands::Db { command } => match command {
            DbCommands::Init {
                database,
                admin_email,
                admin_name,
            } => {
                let config = config.merge(AppConfig {
                    database,
                    ..Default::default()
                });
                info!("Initializing database: {}", config.database());
                server::migrate_database(config.database(), server::MigrateDirection::Up).await?;
                let db = connect(&config).await?;
                seed_data::seed_initial_data(&db, &admin_email, &admin_name).await?;
            }
            DbCommands::Migrate {
                direction,
                database,
            } => {
                let config = config.merge(AppConfig {
                    database,
                    ..Default::default()
                });
                info!("Running database migration: {:?}", direction);
                server::migrate_database(config.database(), direction).await?;
            }
        },
        Commands::Import {
            command,
            database,
            anomaly_log,
        } => {
            let config = config.merge(AppConfig {
                database,
                anomaly_log,
                ..Default::default()
            });
            let db = connect(&config).await?;
            Migrator::up(&db, None).await?;
            let reconciler = Reconciler::new(
                match_style(&config, &db),
                Arc::new(FileAnomalyLog::new(config.anomaly_log())),
            );

            let (label, report) = match command {
                ImportCommands::Orders { file } => (
                    "orders",
                    OrderImportService::new(db, reconciler).import_file(&file).await?,
                ),
                ImportCommands::Cities { file } => (
                    "cities",
                    ReferenceImportService::new(db, reconciler)
                        .import_cities_file(&file)
                        .await?,
                ),
                ImportCommands::Products { file } => (
                    "products",
                    ReferenceImportService::new(db, reconciler)
                        .import_products_file(&file)
                        .await?,
                ),
            };
            print_report(label, &report, &config.anomaly_log());
        }
        Commands::Consolidate {
            destination_id,
            database,
        } => {
            let config = config.merge(AppConfig {
                database,
                ..Default::default()
            });
            let db = connect(&config).await?;
            let summary = ConsolidationService::new(db.clone())
                .with_match_style(match_style(&config, &db))
                .recompute_for_destination(destination_id)
                .await?;
            println!(
                "{} destination {}: {} inserted, {} updated, {} zeroed, {} unchanged",
                "Consolidated".green().bold(),
                destination_id,
                summary.inserted,
                summary.updated,
                summary.zeroed,
                summary.unchanged
            );
        }
    }

    Ok(())
}

#[cfg(feature = "server")]
async fn start_server(config: &AppConfig) -> Result<()> {
    server::start_server(config).await
}

#[cfg(not(feature = "server"))]
async fn start_server(_config: &AppConfig) -> Result<()> {
    anyhow::bail!("aidlink was built without the `server` feature")
}

async fn connect(config: &AppConfig) -> Result<DatabaseConnection> {
    let database_url = get_database_url(Some(config.database()));
    Ok(establish_connection(&database_url).await?)
}

fn match_style(config: &AppConfig, db: &DatabaseConnection) -> MatchStyle {
    config
        .match_style
        .unwrap_or_else(|| MatchStyle::for_backend(db.get_database_backend()))
}

fn print_report(label: &str, report: &ImportReport, anomaly_log: &std::path::Path) {
    println!("{} {}", "Import finished:".bold(), label);
    println!("  rows processed: {}", report.processed);
    println!("  imported:       {}", report.succeeded.to_string().green());
    println!("  rows created:   {}", report.created);
    if report.failed > 0 {
        println!("  failed:         {}", report.failed.to_string().red());
        for failure in &report.failures {
            println!(
                "    line {} [{}] {}",
                failure.line,
                failure.error_code.yellow(),
                failure.message
            );
        }
    }
    for failure in &report.consolidation_failures {
        println!(
            "  {} destination {}: {}",
            "consolidation failed for".red(),
            failure.destination_id,
            failure.message
        );
    }
    if !report.is_clean() {
        println!("  see {} for details", anomaly_log.display());
    }
}

fn setup_logging(log_level: &str) {
    let log_level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("sqlx=warn,sea_orm=warn,{}", log_level)))
        .init();
}
