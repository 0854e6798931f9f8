//! Inventory domain module.
//!
//! This crate contains business rules for the FabLab inventory, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod item;
pub mod log;
pub mod query;
pub mod stock;

pub use item::{InventoryItem, ItemPatch, ItemType, NewItem, StockStatus};
pub use log::{InventoryLogEntry, ItemDetail, LogAction, LogEntryView, UserSummary};
pub use query::{InventoryStats, ItemFilter, Page, PageRequest};
pub use stock::{StockAdjustment, derive_status, plan_adjustment};
