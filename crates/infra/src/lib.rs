//! Infrastructure layer: record stores, user directory, configuration, and the
//! inventory ledger service that ties the domain rules to a transactional store.

pub mod config;
pub mod ledger;
pub mod seed;
pub mod store;
pub mod users;

pub use config::{AppConfig, AppEnv, ConfigError, StoreBackend};
pub use ledger::{InventoryLedger, LedgerError, LedgerResult};
pub use seed::{demo_admin, seed_demo_inventory};
pub use store::{
    InMemoryLedgerStore, LedgerStore, LedgerTransaction, PostgresLedgerStore, StoreError, TxHandle,
    with_transaction,
};
pub use users::{InMemoryUserDirectory, PostgresUserDirectory, UserDirectory};
