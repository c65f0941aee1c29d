//! # veil-db
//!
//! Credential Store (C1): a thin typed-operation layer over `sqlx::PgPool`.
//! Raw SQL never leaks past this crate — every other crate calls a named
//! repository function and gets back a domain type from `veil-common::models`.

pub mod postgres;
pub mod repository;

use anyhow::Result;
use veil_common::config::AppConfig;

/// Shared database handle, cloned into every crate that needs the store.
#[derive(Clone)]
pub struct Database {
    pub pg: sqlx::PgPool,
}

impl Database {
    /// Connect using the URL in `config.database.url`.
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        tracing::info!("connecting to PostgreSQL");
        let pg = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .connect(&config.database.url)
            .await?;
        tracing::info!("connected to PostgreSQL");
        Ok(Self { pg })
    }

    /// Run pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("running database migrations");
        sqlx::migrate!("./migrations").run(&self.pg).await?;
        tracing::info!("migrations complete");
        Ok(())
    }
}
