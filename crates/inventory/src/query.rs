//! List filters, pagination and aggregate stats over inventory items.

use serde::{Deserialize, Serialize};

use fablab_core::{DomainError, DomainResult};

use crate::item::{InventoryItem, ItemType, StockStatus};

/// Filter applied by the item listing.
///
/// `search` is a case-insensitive substring match over name, item id and notes
/// (OR-combined). `item_type` and `status` are exact matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub search: Option<String>,
    pub item_type: Option<ItemType>,
    pub status: Option<StockStatus>,
}

impl ItemFilter {
    /// Trimmed, lower-cased search needle. `None` when absent or blank.
    pub fn needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    pub fn matches(&self, item: &InventoryItem) -> bool {
        if let Some(t) = self.item_type {
            if item.item_type != t {
                return false;
            }
        }
        if let Some(s) = self.status {
            if item.status != s {
                return false;
            }
        }
        match self.needle() {
            None => true,
            Some(needle) => {
                item.name.to_lowercase().contains(&needle)
                    || item.item_id.to_lowercase().contains(&needle)
                    || item
                        .notes
                        .as_deref()
                        .is_some_and(|n| n.to_lowercase().contains(&needle))
            }
        }
    }
}

/// 1-based page request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    pub const DEFAULT_PAGE_SIZE: u32 = 50;

    pub fn new(page: u32, page_size: u32) -> DomainResult<Self> {
        if page == 0 {
            return Err(DomainError::validation("page must be at least 1"));
        }
        if page_size == 0 {
            return Err(DomainError::validation("page size must be at least 1"));
        }
        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of results plus the filter-wide total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

impl<T> Page<T> {
    /// `ceil(total / page_size)`.
    pub fn pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.page_size))
    }
}

/// Aggregate counts across all items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryStats {
    pub total: u64,
    pub in_stock: u64,
    pub low_stock: u64,
    pub out_of_stock: u64,
    /// Sum of quantities over every item, saturating at `i64::MAX`.
    pub total_quantity: i64,
}

impl InventoryStats {
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a InventoryItem>) -> Self {
        items.into_iter().fold(Self::default(), |mut acc, item| {
            acc.total += 1;
            match item.status {
                StockStatus::InStock => acc.in_stock += 1,
                StockStatus::LowStock => acc.low_stock += 1,
                StockStatus::OutOfStock => acc.out_of_stock += 1,
                StockStatus::Discontinued => {}
            }
            acc.total_quantity = acc.total_quantity.saturating_add(item.quantity);
            acc
        })
    }
}
