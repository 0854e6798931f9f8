//! Postgres-backed ledger store.
//!
//! ## Locking
//!
//! [`LedgerTransaction::lock_item`] issues `SELECT ... FOR UPDATE`, so two
//! transactions adjusting the same item are serialized by the row lock and the
//! second one reads the quantity committed by the first.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `UniqueViolation` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / other | N/A | `Backend` |

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use fablab_core::{LogEntryId, RecordId, UserId};
use fablab_inventory::{
    InventoryItem, InventoryLogEntry, InventoryStats, ItemFilter, Page, PageRequest,
};

use super::{LedgerStore, LedgerTransaction, StoreError, TxHandle};

const SCHEMA: &str = include_str!("../../migrations/0001_inventory.sql");

const ITEM_COLUMNS: &str = "id, item_id, name, type, price, quantity, min_stock, status, \
                            notes, image_url, created_by, created_at, updated_at";

/// Postgres-backed ledger store.
///
/// Cloning is cheap; the pool is shared.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

struct PgLedgerTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTransaction for PgLedgerTransaction {
    async fn lock_item(&mut self, id: RecordId) -> Result<Option<InventoryItem>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = $1 FOR UPDATE"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_item", e))?;

        row.map(|r| item_from_row(&r)).transpose()
    }

    async fn insert_item(&mut self, item: &InventoryItem) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO inventory_items
                (id, item_id, name, type, price, quantity, min_stock, status,
                 notes, image_url, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(Uuid::from(item.id))
        .bind(&item.item_id)
        .bind(&item.name)
        .bind(item.item_type.as_str())
        .bind(item.price)
        .bind(item.quantity)
        .bind(item.min_stock)
        .bind(item.status.as_str())
        .bind(&item.notes)
        .bind(&item.image_url)
        .bind(item.created_by.map(Uuid::from))
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_item", e))?;
        Ok(())
    }

    async fn update_item(&mut self, item: &InventoryItem) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE inventory_items
            SET name = $2, type = $3, price = $4, quantity = $5, min_stock = $6,
                status = $7, notes = $8, image_url = $9, updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(Uuid::from(item.id))
        .bind(&item.name)
        .bind(item.item_type.as_str())
        .bind(item.price)
        .bind(item.quantity)
        .bind(item.min_stock)
        .bind(item.status.as_str())
        .bind(&item.notes)
        .bind(&item.image_url)
        .bind(item.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_item", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::MissingRecord(item.id));
        }
        Ok(())
    }

    async fn delete_item(&mut self, id: RecordId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM inventory_items WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_item", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::MissingRecord(id));
        }
        Ok(())
    }

    async fn append_log(&mut self, entry: &InventoryLogEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO inventory_logs
                (id, item_id, user_id, action, quantity, notes, old_value, new_value, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(Uuid::from(entry.id))
        .bind(Uuid::from(entry.item_id))
        .bind(entry.user_id.map(Uuid::from))
        .bind(entry.action.as_str())
        .bind(entry.quantity)
        .bind(&entry.notes)
        .bind(&entry.old_value)
        .bind(&entry.new_value)
        .bind(entry.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("append_log", e))?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn begin(&self) -> Result<TxHandle, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;
        Ok(Box::new(PgLedgerTransaction { tx }))
    }

    #[instrument(skip(self), fields(record_id = %id), err)]
    async fn find_item(&self, id: RecordId) -> Result<Option<InventoryItem>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_item", e))?;

        row.map(|r| item_from_row(&r)).transpose()
    }

    #[instrument(skip(self, filter), err)]
    async fn list_items(
        &self,
        filter: &ItemFilter,
        page: PageRequest,
    ) -> Result<Page<InventoryItem>, StoreError> {
        let mut count =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM inventory_items WHERE TRUE");
        push_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_items.count", e))?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE TRUE"
        ));
        push_filter(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(page.page_size()))
            .push(" OFFSET ")
            .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));

        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_items", e))?;

        let items = rows
            .iter()
            .map(item_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            page: page.page(),
            page_size: page.page_size(),
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    #[instrument(skip(self), err)]
    async fn low_stock_items(&self) -> Result<Vec<InventoryItem>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items \
             WHERE status IN ('LOW_STOCK', 'OUT_OF_STOCK') \
             ORDER BY quantity ASC, item_id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("low_stock_items", e))?;

        rows.iter().map(item_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn stats(&self) -> Result<InventoryStats, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'IN_STOCK') AS in_stock,
                COUNT(*) FILTER (WHERE status = 'LOW_STOCK') AS low_stock,
                COUNT(*) FILTER (WHERE status = 'OUT_OF_STOCK') AS out_of_stock,
                LEAST(COALESCE(SUM(quantity), 0), 9223372036854775807)::BIGINT AS total_quantity
            FROM inventory_items
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("stats", e))?;

        let count = |column: &str| -> Result<u64, StoreError> {
            let n: i64 = row
                .try_get(column)
                .map_err(|e| map_sqlx_error("stats", e))?;
            Ok(u64::try_from(n).unwrap_or_default())
        };

        Ok(InventoryStats {
            total: count("total")?,
            in_stock: count("in_stock")?,
            low_stock: count("low_stock")?,
            out_of_stock: count("out_of_stock")?,
            total_quantity: row
                .try_get("total_quantity")
                .map_err(|e| map_sqlx_error("stats", e))?,
        })
    }

    #[instrument(skip(self), fields(record_id = %item), err)]
    async fn recent_logs(
        &self,
        item: RecordId,
        limit: u32,
    ) -> Result<Vec<InventoryLogEntry>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, item_id, user_id, action, quantity, notes, old_value, new_value, created_at
            FROM inventory_logs
            WHERE item_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(Uuid::from(item))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("recent_logs", e))?;

        rows.iter().map(log_from_row).collect()
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ItemFilter) {
    if let Some(needle) = filter.needle() {
        let pattern = format!("%{}%", escape_like(&needle));
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR item_id ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR notes ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(item_type) = filter.item_type {
        qb.push(" AND type = ").push_bind(item_type.as_str());
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
}

/// Escape `LIKE` metacharacters so the needle matches literally.
fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Internal row type for deserializing `inventory_items` rows.
struct ItemRow {
    id: Uuid,
    item_id: String,
    name: String,
    item_type: String,
    price: Decimal,
    quantity: i64,
    min_stock: i64,
    status: String,
    notes: Option<String>,
    image_url: Option<String>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ItemRow {
            id: row.try_get("id")?,
            item_id: row.try_get("item_id")?,
            name: row.try_get("name")?,
            item_type: row.try_get("type")?,
            price: row.try_get("price")?,
            quantity: row.try_get("quantity")?,
            min_stock: row.try_get("min_stock")?,
            status: row.try_get("status")?,
            notes: row.try_get("notes")?,
            image_url: row.try_get("image_url")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<ItemRow> for InventoryItem {
    type Error = StoreError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(InventoryItem {
            id: RecordId::from_uuid(row.id),
            item_type: row.item_type.parse().map_err(corrupt_row)?,
            status: row.status.parse().map_err(corrupt_row)?,
            item_id: row.item_id,
            name: row.name,
            price: row.price,
            quantity: row.quantity,
            min_stock: row.min_stock,
            notes: row.notes,
            image_url: row.image_url,
            created_by: row.created_by.map(UserId::from_uuid),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn item_from_row(row: &PgRow) -> Result<InventoryItem, StoreError> {
    ItemRow::from_row(row)
        .map_err(|e| map_sqlx_error("item_from_row", e))?
        .try_into()
}

/// Internal row type for deserializing `inventory_logs` rows.
struct LogRow {
    id: Uuid,
    item_id: Uuid,
    user_id: Option<Uuid>,
    action: String,
    quantity: Option<i64>,
    notes: Option<String>,
    old_value: Option<JsonValue>,
    new_value: Option<JsonValue>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for LogRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(LogRow {
            id: row.try_get("id")?,
            item_id: row.try_get("item_id")?,
            user_id: row.try_get("user_id")?,
            action: row.try_get("action")?,
            quantity: row.try_get("quantity")?,
            notes: row.try_get("notes")?,
            old_value: row.try_get("old_value")?,
            new_value: row.try_get("new_value")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<LogRow> for InventoryLogEntry {
    type Error = StoreError;

    fn try_from(row: LogRow) -> Result<Self, Self::Error> {
        Ok(InventoryLogEntry {
            id: LogEntryId::from_uuid(row.id),
            item_id: RecordId::from_uuid(row.item_id),
            user_id: row.user_id.map(UserId::from_uuid),
            action: row.action.parse().map_err(corrupt_row)?,
            quantity: row.quantity,
            notes: row.notes,
            old_value: row.old_value,
            new_value: row.new_value,
            created_at: row.created_at,
        })
    }
}

fn log_from_row(row: &PgRow) -> Result<InventoryLogEntry, StoreError> {
    LogRow::from_row(row)
        .map_err(|e| map_sqlx_error("log_from_row", e))?
        .try_into()
}

fn corrupt_row(err: fablab_core::DomainError) -> StoreError {
    StoreError::Backend(format!("corrupt row: {err}"))
}

pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // Unique violation
                Some("23505") => StoreError::UniqueViolation(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
