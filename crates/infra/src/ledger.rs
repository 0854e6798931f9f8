//! Inventory ledger service.
//!
//! `InventoryLedger` is the only writer of inventory records. Every mutation
//! (create, update, delete, stock adjustment) runs inside one store transaction
//! that covers both the item write and its audit entry, so a caller can never
//! observe an item change without its log line or the other way round.
//!
//! ## Concurrency
//!
//! Mutations read the current row through [`LedgerTransaction::lock_item`],
//! which holds the row until commit. Two adjustments racing on the same item
//! are therefore applied one after the other and neither is lost.
//!
//! ## Generic Parameters
//!
//! - `S`: record store (`InMemoryLedgerStore` for tests/dev, `PostgresLedgerStore` in production)
//! - `U`: user directory used to decorate history with display identities
//!
//! Both may be unsized so the HTTP layer can hold `dyn` handles.
//!
//! [`LedgerTransaction::lock_item`]: crate::store::LedgerTransaction::lock_item

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use fablab_core::{DomainError, RecordId, UserId};
use fablab_inventory::{
    InventoryItem, InventoryLogEntry, InventoryStats, ItemDetail, ItemFilter, ItemPatch,
    LogEntryView, NewItem, Page, PageRequest, plan_adjustment,
};

use crate::store::{LedgerStore, StoreError, with_transaction};
use crate::users::UserDirectory;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Failure of a ledger operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The business key is already taken.
    #[error("item id '{0}' already exists")]
    DuplicateKey(String),

    /// No item with the given record id.
    #[error("inventory item not found")]
    NotFound,

    /// The adjustment would drive the quantity below zero.
    #[error("insufficient stock (available: {available}, requested delta: {delta})")]
    InsufficientStock { available: i64, delta: i64 },

    /// Input failed validation before touching the store.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DomainError> for LedgerError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                LedgerError::Validation(msg)
            }
            DomainError::InsufficientStock { available, delta } => {
                LedgerError::InsufficientStock { available, delta }
            }
        }
    }
}

/// Transactional inventory service.
pub struct InventoryLedger<S: ?Sized, U: ?Sized> {
    store: Arc<S>,
    users: Arc<U>,
}

impl<S: ?Sized, U: ?Sized> Clone for InventoryLedger<S, U> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            users: Arc::clone(&self.users),
        }
    }
}

impl<S: ?Sized, U: ?Sized> InventoryLedger<S, U> {
    pub fn new(store: Arc<S>, users: Arc<U>) -> Self {
        Self { store, users }
    }
}

impl<S, U> InventoryLedger<S, U>
where
    S: LedgerStore + ?Sized,
    U: UserDirectory + ?Sized,
{
    /// Create an item and its `CREATED` entry.
    #[instrument(skip_all, fields(item_id = %candidate.item_id, actor = %actor), err)]
    pub async fn create(&self, candidate: NewItem, actor: UserId) -> LedgerResult<InventoryItem> {
        candidate.validate()?;

        let item = candidate.into_item(RecordId::new(), Some(actor), Utc::now());
        let key = item.item_id.clone();

        let created = with_transaction(&*self.store, |mut tx| async move {
            tx.insert_item(&item).await.map_err(|e| match e {
                StoreError::UniqueViolation(_) => LedgerError::DuplicateKey(key),
                other => LedgerError::Store(other),
            })?;
            tx.append_log(&InventoryLogEntry::created(&item, Some(actor), item.created_at))
                .await?;
            Ok::<_, LedgerError>((tx, item))
        })
        .await?;

        info!(record_id = %created.id, "inventory item created");
        Ok(created)
    }

    /// Merge `patch` into an existing item and log `UPDATED` with both snapshots.
    #[instrument(skip_all, fields(record_id = %id, actor = %actor), err)]
    pub async fn update(
        &self,
        id: RecordId,
        patch: ItemPatch,
        actor: UserId,
    ) -> LedgerResult<InventoryItem> {
        patch.validate()?;

        let updated = with_transaction(&*self.store, |mut tx| async move {
            let before = tx.lock_item(id).await?.ok_or(LedgerError::NotFound)?;
            let mut after = before.clone();
            patch.apply_to(&mut after, Utc::now());

            tx.update_item(&after).await?;
            tx.append_log(&InventoryLogEntry::updated(
                &before,
                &after,
                Some(actor),
                after.updated_at,
            ))
            .await?;
            Ok::<_, LedgerError>((tx, after))
        })
        .await?;

        info!("inventory item updated");
        Ok(updated)
    }

    /// Hard-delete an item. The `DELETED` entry keeps the last known state.
    #[instrument(skip_all, fields(record_id = %id, actor = %actor), err)]
    pub async fn delete(&self, id: RecordId, actor: UserId) -> LedgerResult<()> {
        with_transaction(&*self.store, |mut tx| async move {
            let item = tx.lock_item(id).await?.ok_or(LedgerError::NotFound)?;
            tx.append_log(&InventoryLogEntry::deleted(&item, Some(actor), Utc::now()))
                .await?;
            tx.delete_item(id).await?;
            Ok::<_, LedgerError>((tx, ()))
        })
        .await?;

        info!("inventory item deleted");
        Ok(())
    }

    /// Apply a signed quantity delta and re-derive the status.
    ///
    /// Rejected adjustments leave both the item and its history untouched.
    #[instrument(skip_all, fields(record_id = %id, delta = delta, actor = %actor), err)]
    pub async fn adjust(
        &self,
        id: RecordId,
        delta: i64,
        notes: Option<String>,
        actor: UserId,
    ) -> LedgerResult<InventoryItem> {
        let result = with_transaction(&*self.store, |mut tx| async move {
            let mut item = tx.lock_item(id).await?.ok_or(LedgerError::NotFound)?;
            let plan = plan_adjustment(&item, delta)?;

            plan.apply_to(&mut item);
            item.updated_at = Utc::now();

            tx.update_item(&item).await?;
            tx.append_log(&InventoryLogEntry::stock_adjusted(
                id,
                &plan,
                notes,
                Some(actor),
                item.updated_at,
            ))
            .await?;
            Ok::<_, LedgerError>((tx, item))
        })
        .await;

        match &result {
            Ok(item) => info!(
                quantity = item.quantity,
                status = item.status.as_str(),
                "stock adjusted"
            ),
            Err(LedgerError::InsufficientStock { available, .. }) => {
                warn!(available = *available, "stock adjustment rejected")
            }
            Err(_) => {}
        }
        result
    }

    /// Fetch one item with its `history` most recent entries, newest first.
    #[instrument(skip_all, fields(record_id = %id, history = history), err)]
    pub async fn get(&self, id: RecordId, history: u32) -> LedgerResult<ItemDetail> {
        let item = self.store.find_item(id).await?.ok_or(LedgerError::NotFound)?;

        let entries = if history == 0 {
            Vec::new()
        } else {
            self.store.recent_logs(id, history).await?
        };

        let mut actors: Vec<UserId> = entries.iter().filter_map(|e| e.user_id).collect();
        actors.sort();
        actors.dedup();
        let users = if actors.is_empty() {
            HashMap::new()
        } else {
            self.users.summaries(&actors).await?
        };

        let logs = entries
            .into_iter()
            .map(|entry| LogEntryView {
                user: entry.user_id.and_then(|u| users.get(&u).cloned()),
                entry,
            })
            .collect();

        Ok(ItemDetail { item, logs })
    }

    pub async fn list(
        &self,
        filter: &ItemFilter,
        page: PageRequest,
    ) -> LedgerResult<Page<InventoryItem>> {
        Ok(self.store.list_items(filter, page).await?)
    }

    pub async fn low_stock_alerts(&self) -> LedgerResult<Vec<InventoryItem>> {
        Ok(self.store.low_stock_items().await?)
    }

    pub async fn stats(&self) -> LedgerResult<InventoryStats> {
        Ok(self.store.stats().await?)
    }
}
