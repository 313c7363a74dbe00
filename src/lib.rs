//! Library catalog service.
//!
//! Wires the book and stats modules into the shelf kernel, applies their
//! migrations and serves them over HTTP.

pub mod modules;

use anyhow::Context;
use axum::Router;
use shelf_kernel::{settings::Settings, Database, InitCtx, ModuleRegistry};

/// A connected, migrated and initialized application.
pub struct Application {
    settings: Settings,
    registry: ModuleRegistry,
    db: Database,
}

impl Application {
    /// Connect to the store, register modules, apply pending migrations and
    /// initialize every module.
    pub async fn bootstrap(settings: Settings) -> anyhow::Result<Self> {
        tracing::info!(
            env = ?settings.environment,
            db = %settings.database.url,
            "shelf bootstrap starting"
        );

        let db = Database::connect(&settings.database)
            .await
            .context("failed to connect to the book store")?;

        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, &db);

        let applied = db
            .run_migrations(&registry.collect_migrations())
            .await
            .context("failed to apply migrations")?;
        tracing::info!(applied, "migrations up to date");

        registry
            .init_modules(&InitCtx {
                settings: &settings,
                db: &db,
            })
            .await?;

        tracing::info!("shelf bootstrap complete");
        Ok(Self {
            settings,
            registry,
            db,
        })
    }

    /// The complete HTTP router, middleware included.
    pub fn router(&self) -> Router {
        shelf_http::build_router(&self.registry, &self.settings, &self.db)
    }

    /// Start modules and serve HTTP until shutdown, then stop modules and
    /// close the store.
    pub async fn serve(self) -> anyhow::Result<()> {
        let ctx = InitCtx {
            settings: &self.settings,
            db: &self.db,
        };
        self.registry.start_modules(&ctx).await?;

        let served = shelf_http::start_server(&self.registry, &self.settings, &self.db).await;

        if let Err(e) = self.registry.stop_modules().await {
            tracing::error!(error = %format!("{e:#}"), "module shutdown failed");
        }
        self.db.close().await;

        served
    }
}

/// Apply pending migrations without starting the server. Returns how many ran.
pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
    let db = Database::connect(&settings.database)
        .await
        .context("failed to connect to the book store")?;

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, &db);

    let applied = db.run_migrations(&registry.collect_migrations()).await;
    db.close().await;
    applied
}
