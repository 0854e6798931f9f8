use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

use fablab_core::DomainError;
use fablab_inventory::{InventoryItem, ItemFilter, ItemType, Page, PageRequest, StockStatus};

use crate::app::errors;

/// History entries returned with a single item unless `?history=` says otherwise.
pub const DEFAULT_HISTORY: u32 = 10;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    /// Signed delta.
    pub quantity: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Raw list query. Everything arrives as text so malformed numbers and unknown
/// enum values produce a validation error instead of a generic rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ListItemsQuery {
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub status: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ListItemsQuery {
    pub fn into_parts(self) -> Result<(ItemFilter, PageRequest), axum::response::Response> {
        let item_type = non_empty(self.item_type)
            .map(|t| t.parse::<ItemType>())
            .transpose()
            .map_err(|e: DomainError| bad_request(e.to_string()))?;
        let status = non_empty(self.status)
            .map(|s| s.parse::<StockStatus>())
            .transpose()
            .map_err(|e: DomainError| bad_request(e.to_string()))?;

        let page = parse_u32("page", self.page, 1)?;
        let limit = parse_u32("limit", self.limit, PageRequest::DEFAULT_PAGE_SIZE)?;
        let page = PageRequest::new(page, limit).map_err(|e| bad_request(e.to_string()))?;

        let filter = ItemFilter {
            search: non_empty(self.search),
            item_type,
            status,
        };
        Ok((filter, page))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemDetailQuery {
    pub history: Option<String>,
}

impl ItemDetailQuery {
    pub fn history(self) -> Result<u32, axum::response::Response> {
        parse_u32("history", self.history, DEFAULT_HISTORY)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_u32(
    field: &'static str,
    raw: Option<String>,
    default: u32,
) -> Result<u32, axum::response::Response> {
    match non_empty(raw) {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse::<u32>()
            .map_err(|_| bad_request(format!("{field} must be a non-negative integer"))),
    }
}

fn bad_request(message: String) -> axum::response::Response {
    errors::json_error(StatusCode::BAD_REQUEST, "validation_error", message)
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

#[derive(Debug, Serialize)]
pub struct ItemList {
    pub items: Vec<InventoryItem>,
    pub pagination: Pagination,
}

impl From<Page<InventoryItem>> for ItemList {
    fn from(page: Page<InventoryItem>) -> Self {
        let pagination = Pagination {
            page: page.page,
            limit: page.page_size,
            total: page.total,
            pages: page.pages(),
        };
        Self {
            items: page.items,
            pagination,
        }
    }
}

/// Success envelope: `{ "success": true, "data": ..., "message"?: ... }`.
pub fn envelope(data: impl Serialize, message: Option<&str>) -> JsonValue {
    let mut body = json!({
        "success": true,
        "data": serde_json::to_value(data).unwrap_or(JsonValue::Null),
    });
    if let Some(message) = message {
        body["message"] = JsonValue::from(message);
    }
    body
}
