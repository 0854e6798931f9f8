//! Service wiring: picks the ledger store from configuration and seeds demo data.

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use fablab_infra::{
    AppConfig, InMemoryLedgerStore, InMemoryUserDirectory, InventoryLedger, LedgerStore,
    PostgresLedgerStore, PostgresUserDirectory, StoreBackend, UserDirectory, demo_admin,
    seed_demo_inventory,
};

/// Ledger with type-erased store and user directory.
pub type DynLedger = InventoryLedger<dyn LedgerStore, dyn UserDirectory>;

/// Shared application services handed to every handler.
#[derive(Clone)]
pub struct AppServices {
    ledger: DynLedger,
}

impl AppServices {
    pub fn new(ledger: DynLedger) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &DynLedger {
        &self.ledger
    }

    /// In-memory services, optionally pre-loaded with the demo inventory.
    pub async fn in_memory(seed: bool) -> anyhow::Result<Self> {
        let users = Arc::new(InMemoryUserDirectory::new());
        if seed {
            users.register(demo_admin()).await;
        }

        let store: Arc<dyn LedgerStore> = Arc::new(InMemoryLedgerStore::new());
        let users: Arc<dyn UserDirectory> = users;
        let services = Self::new(InventoryLedger::new(store, users));
        if seed {
            services.seed().await?;
        }
        Ok(services)
    }

    async fn postgres(database_url: &str, seed: bool) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("failed to connect to Postgres")?;

        let store = PostgresLedgerStore::new(pool.clone());
        store.migrate().await.context("failed to apply schema")?;

        let users = PostgresUserDirectory::new(pool);
        if seed {
            users
                .register(&demo_admin(), "ADMIN")
                .await
                .context("failed to register demo admin")?;
        }

        let store: Arc<dyn LedgerStore> = Arc::new(store);
        let users: Arc<dyn UserDirectory> = Arc::new(users);
        let services = Self::new(InventoryLedger::new(store, users));
        if seed {
            services.seed().await?;
        }
        Ok(services)
    }

    async fn seed(&self) -> anyhow::Result<()> {
        seed_demo_inventory(&self.ledger, demo_admin().id)
            .await
            .context("failed to seed demo inventory")?;
        Ok(())
    }
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    match &config.store {
        StoreBackend::InMemory => {
            tracing::info!("using in-memory inventory store");
            AppServices::in_memory(config.seed_demo_data).await
        }
        StoreBackend::Postgres { database_url } => {
            tracing::info!("using Postgres inventory store");
            AppServices::postgres(database_url, config.seed_demo_data).await
        }
    }
}
