use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use fablab_core::RecordId;
use fablab_inventory::{
    InventoryItem, InventoryLogEntry, InventoryStats, ItemFilter, Page, PageRequest,
};

use super::{LedgerStore, LedgerTransaction, StoreError, TxHandle};

#[derive(Debug, Default)]
struct Tables {
    items: HashMap<RecordId, InventoryItem>,
    /// Business key -> record id.
    keys: HashMap<String, RecordId>,
    logs: Vec<InventoryLogEntry>,
}

impl Tables {
    fn put(&mut self, item: InventoryItem) {
        self.keys.insert(item.item_id.clone(), item.id);
        self.items.insert(item.id, item);
    }

    fn remove(&mut self, id: RecordId) -> Option<InventoryItem> {
        let item = self.items.remove(&id)?;
        self.keys.remove(&item.item_id);
        Some(item)
    }
}

/// In-memory ledger store.
///
/// Intended for tests/dev. A transaction holds the whole store exclusively from
/// `begin` until commit or drop, so transactions are fully serialized.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Inverse of one write, replayed in reverse order on rollback.
#[derive(Debug)]
enum Undo {
    Remove(RecordId),
    Restore(InventoryItem),
}

struct InMemoryTransaction {
    tables: OwnedMutexGuard<Tables>,
    undo: Vec<Undo>,
    log_mark: usize,
    committed: bool,
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let dirty = !self.undo.is_empty() || self.tables.logs.len() > self.log_mark;
        let log_mark = self.log_mark;
        self.tables.logs.truncate(log_mark);
        while let Some(step) = self.undo.pop() {
            match step {
                Undo::Remove(id) => {
                    self.tables.remove(id);
                }
                Undo::Restore(item) => self.tables.put(item),
            }
        }
        if dirty {
            tracing::debug!("in-memory transaction rolled back");
        }
    }
}

#[async_trait]
impl LedgerTransaction for InMemoryTransaction {
    async fn lock_item(&mut self, id: RecordId) -> Result<Option<InventoryItem>, StoreError> {
        Ok(self.tables.items.get(&id).cloned())
    }

    async fn insert_item(&mut self, item: &InventoryItem) -> Result<(), StoreError> {
        if self.tables.keys.contains_key(&item.item_id) {
            return Err(StoreError::UniqueViolation(format!(
                "item_id '{}' already exists",
                item.item_id
            )));
        }
        self.tables.put(item.clone());
        self.undo.push(Undo::Remove(item.id));
        Ok(())
    }

    async fn update_item(&mut self, item: &InventoryItem) -> Result<(), StoreError> {
        let previous = self
            .tables
            .items
            .get(&item.id)
            .cloned()
            .ok_or(StoreError::MissingRecord(item.id))?;
        // The business key is immutable, so the key index stays valid.
        self.tables.items.insert(item.id, item.clone());
        self.undo.push(Undo::Restore(previous));
        Ok(())
    }

    async fn delete_item(&mut self, id: RecordId) -> Result<(), StoreError> {
        let previous = self
            .tables
            .remove(id)
            .ok_or(StoreError::MissingRecord(id))?;
        self.undo.push(Undo::Restore(previous));
        Ok(())
    }

    async fn append_log(&mut self, entry: &InventoryLogEntry) -> Result<(), StoreError> {
        self.tables.logs.push(entry.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut tx = self;
        tx.committed = true;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn begin(&self) -> Result<TxHandle, StoreError> {
        let tables = Arc::clone(&self.tables).lock_owned().await;
        let log_mark = tables.logs.len();
        Ok(Box::new(InMemoryTransaction {
            tables,
            undo: Vec::new(),
            log_mark,
            committed: false,
        }))
    }

    async fn find_item(&self, id: RecordId) -> Result<Option<InventoryItem>, StoreError> {
        Ok(self.tables.lock().await.items.get(&id).cloned())
    }

    async fn list_items(
        &self,
        filter: &ItemFilter,
        page: PageRequest,
    ) -> Result<Page<InventoryItem>, StoreError> {
        let tables = self.tables.lock().await;
        let mut matches: Vec<&InventoryItem> =
            tables.items.values().filter(|i| filter.matches(i)).collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matches.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let items = matches
            .into_iter()
            .skip(offset)
            .take(page.page_size() as usize)
            .cloned()
            .collect();

        Ok(Page {
            items,
            page: page.page(),
            page_size: page.page_size(),
            total,
        })
    }

    async fn low_stock_items(&self) -> Result<Vec<InventoryItem>, StoreError> {
        let tables = self.tables.lock().await;
        let mut items: Vec<InventoryItem> = tables
            .items
            .values()
            .filter(|i| i.status.needs_restock())
            .cloned()
            .collect();
        items.sort_by(|a, b| a.quantity.cmp(&b.quantity).then_with(|| a.item_id.cmp(&b.item_id)));
        Ok(items)
    }

    async fn stats(&self) -> Result<InventoryStats, StoreError> {
        let tables = self.tables.lock().await;
        Ok(InventoryStats::from_items(tables.items.values()))
    }

    async fn recent_logs(
        &self,
        item: RecordId,
        limit: u32,
    ) -> Result<Vec<InventoryLogEntry>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .logs
            .iter()
            .rev()
            .filter(|e| e.item_id == item)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
