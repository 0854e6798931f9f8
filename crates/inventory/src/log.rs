//! Audit log model.
//!
//! Entries are append-only: once written they are never mutated or deleted,
//! and they outlive the item they reference.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use fablab_core::{DomainError, LogEntryId, RecordId, UserId};

use crate::item::InventoryItem;
use crate::stock::StockAdjustment;

/// Kind of mutation recorded by an audit entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogAction {
    Created,
    Updated,
    Deleted,
    StockAdded,
    StockRemoved,
}

impl LogAction {
    pub const ALL: [LogAction; 5] = [
        LogAction::Created,
        LogAction::Updated,
        LogAction::Deleted,
        LogAction::StockAdded,
        LogAction::StockRemoved,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LogAction::Created => "CREATED",
            LogAction::Updated => "UPDATED",
            LogAction::Deleted => "DELETED",
            LogAction::StockAdded => "STOCK_ADDED",
            LogAction::StockRemoved => "STOCK_REMOVED",
        }
    }
}

impl core::str::FromStr for LogAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogAction::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown log action '{s}'")))
    }
}

/// Immutable record of one mutation to an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryLogEntry {
    pub id: LogEntryId,
    /// Record id of the item (not the business key).
    pub item_id: RecordId,
    pub user_id: Option<UserId>,
    pub action: LogAction,
    pub quantity: Option<i64>,
    pub notes: Option<String>,
    pub old_value: Option<JsonValue>,
    pub new_value: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}

impl InventoryLogEntry {
    fn base(
        item_id: RecordId,
        user_id: Option<UserId>,
        action: LogAction,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LogEntryId::new(),
            item_id,
            user_id,
            action,
            quantity: None,
            notes: None,
            old_value: None,
            new_value: None,
            created_at: at,
        }
    }

    pub fn created(item: &InventoryItem, user_id: Option<UserId>, at: DateTime<Utc>) -> Self {
        Self {
            new_value: Some(item.snapshot()),
            ..Self::base(item.id, user_id, LogAction::Created, at)
        }
    }

    pub fn updated(
        before: &InventoryItem,
        after: &InventoryItem,
        user_id: Option<UserId>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            old_value: Some(before.snapshot()),
            new_value: Some(after.snapshot()),
            ..Self::base(after.id, user_id, LogAction::Updated, at)
        }
    }

    pub fn deleted(item: &InventoryItem, user_id: Option<UserId>, at: DateTime<Utc>) -> Self {
        Self {
            old_value: Some(item.snapshot()),
            ..Self::base(item.id, user_id, LogAction::Deleted, at)
        }
    }

    pub fn stock_adjusted(
        item_id: RecordId,
        adjustment: &StockAdjustment,
        notes: Option<String>,
        user_id: Option<UserId>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            quantity: Some(adjustment.magnitude()),
            notes,
            old_value: Some(adjustment.old_value()),
            new_value: Some(adjustment.new_value()),
            ..Self::base(item_id, user_id, adjustment.action, at)
        }
    }
}

/// Display identity of the user behind an audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Audit entry joined with its actor's display identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntryView {
    #[serde(flatten)]
    pub entry: InventoryLogEntry,
    pub user: Option<UserSummary>,
}

/// An item together with its most recent history (newest first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetail {
    #[serde(flatten)]
    pub item: InventoryItem,
    pub logs: Vec<LogEntryView>,
}
