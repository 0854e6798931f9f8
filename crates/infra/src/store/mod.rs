//! Transactional record store for inventory items and their audit log.
//!
//! Every mutation goes through a [`LedgerTransaction`] obtained from
//! [`LedgerStore::begin`]. A transaction is only made durable by
//! [`LedgerTransaction::commit`]; dropping it without committing rolls back every
//! write it made. [`with_transaction`] wraps that protocol for callers.

use std::future::Future;

use async_trait::async_trait;
use thiserror::Error;

use fablab_core::RecordId;
use fablab_inventory::{
    InventoryItem, InventoryLogEntry, InventoryStats, ItemFilter, Page, PageRequest,
};

mod in_memory;
mod postgres;

pub use in_memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;
pub(crate) use postgres::map_sqlx_error as postgres_error;

/// Boxed open transaction.
pub type TxHandle = Box<dyn LedgerTransaction>;

/// Store-level failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique constraint (the item business key) was violated.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A write targeted a row that does not exist inside the transaction.
    #[error("record missing: {0}")]
    MissingRecord(RecordId),

    /// Anything else the backend reported (connection loss, corrupt row, ...).
    #[error("store backend error: {0}")]
    Backend(String),
}

/// One open unit of work against the store.
///
/// Rows returned by [`lock_item`](Self::lock_item) stay locked until the
/// transaction commits or is dropped, so a read-modify-write inside one
/// transaction never loses a concurrent update.
#[async_trait]
pub trait LedgerTransaction: Send {
    /// Read an item and hold its lock for the rest of the transaction.
    async fn lock_item(&mut self, id: RecordId) -> Result<Option<InventoryItem>, StoreError>;

    /// Insert a new item. Fails with `UniqueViolation` when the business key is taken.
    async fn insert_item(&mut self, item: &InventoryItem) -> Result<(), StoreError>;

    /// Overwrite an existing item (matched by record id).
    async fn update_item(&mut self, item: &InventoryItem) -> Result<(), StoreError>;

    /// Hard-delete an item. Its audit entries are kept.
    async fn delete_item(&mut self, id: RecordId) -> Result<(), StoreError>;

    /// Append one audit entry.
    async fn append_log(&mut self, entry: &InventoryLogEntry) -> Result<(), StoreError>;

    /// Make every write of this transaction durable and release its locks.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Read side of the store plus the transaction factory.
///
/// Reads are not required to be linearizable with concurrent transactions.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn begin(&self) -> Result<TxHandle, StoreError>;

    async fn find_item(&self, id: RecordId) -> Result<Option<InventoryItem>, StoreError>;

    /// Filtered page of items, newest-created first. `total` counts every match.
    async fn list_items(
        &self,
        filter: &ItemFilter,
        page: PageRequest,
    ) -> Result<Page<InventoryItem>, StoreError>;

    /// Items whose status is `LOW_STOCK` or `OUT_OF_STOCK`, ascending by quantity.
    async fn low_stock_items(&self) -> Result<Vec<InventoryItem>, StoreError>;

    async fn stats(&self) -> Result<InventoryStats, StoreError>;

    /// Most recent audit entries for one record id, newest first.
    async fn recent_logs(
        &self,
        item: RecordId,
        limit: u32,
    ) -> Result<Vec<InventoryLogEntry>, StoreError>;
}

/// Run `work` inside a fresh transaction.
///
/// `work` receives the open transaction and hands it back together with its
/// result; the transaction is committed only then. If `work` fails, the handle
/// is dropped with the future and every write is rolled back.
pub async fn with_transaction<S, T, E, F, Fut>(store: &S, work: F) -> Result<T, E>
where
    S: LedgerStore + ?Sized,
    E: From<StoreError>,
    F: FnOnce(TxHandle) -> Fut,
    Fut: Future<Output = Result<(TxHandle, T), E>>,
{
    let tx = store.begin().await?;
    let (tx, value) = work(tx).await?;
    tx.commit().await?;
    Ok(value)
}
