pub mod config;
pub mod database;
pub mod errors;
pub mod export;
pub mod reconcile;
pub mod server;
pub mod services;
