use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

use fablab_core::{DomainError, DomainResult, RecordId, UserId};

/// Product family an item belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    Chocolate,
    Soap,
    Pins,
    Drones,
    Tools,
    Materials,
    Other,
}

impl ItemType {
    pub const ALL: [ItemType; 7] = [
        ItemType::Chocolate,
        ItemType::Soap,
        ItemType::Pins,
        ItemType::Drones,
        ItemType::Tools,
        ItemType::Materials,
        ItemType::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::Chocolate => "CHOCOLATE",
            ItemType::Soap => "SOAP",
            ItemType::Pins => "PINS",
            ItemType::Drones => "DRONES",
            ItemType::Tools => "TOOLS",
            ItemType::Materials => "MATERIALS",
            ItemType::Other => "OTHER",
        }
    }
}

impl FromStr for ItemType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown item type '{s}'")))
    }
}

/// Stock status of an item.
///
/// `InStock`, `LowStock` and `OutOfStock` are derived from quantity vs. minimum
/// stock; `Discontinued` is only ever set explicitly.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
    Discontinued,
}

impl StockStatus {
    pub const ALL: [StockStatus; 4] = [
        StockStatus::InStock,
        StockStatus::LowStock,
        StockStatus::OutOfStock,
        StockStatus::Discontinued,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StockStatus::InStock => "IN_STOCK",
            StockStatus::LowStock => "LOW_STOCK",
            StockStatus::OutOfStock => "OUT_OF_STOCK",
            StockStatus::Discontinued => "DISCONTINUED",
        }
    }

    /// Whether the status should raise a restock alert.
    pub fn needs_restock(self) -> bool {
        matches!(self, StockStatus::LowStock | StockStatus::OutOfStock)
    }
}

impl FromStr for StockStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StockStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown stock status '{s}'")))
    }
}

/// One inventory record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    /// System-assigned record identity.
    pub id: RecordId,
    /// Human-assigned business key (unique, immutable after creation).
    pub item_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub price: Decimal,
    pub quantity: i64,
    pub min_stock: i64,
    pub status: StockStatus,
    pub notes: Option<String>,
    pub image_url: Option<String>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Full JSON snapshot used as `oldValue`/`newValue` in audit entries.
    pub fn snapshot(&self) -> JsonValue {
        json!({
            "id": self.id,
            "itemId": self.item_id,
            "name": self.name,
            "type": self.item_type,
            "price": self.price,
            "quantity": self.quantity,
            "minStock": self.min_stock,
            "status": self.status,
            "notes": self.notes,
            "imageUrl": self.image_url,
            "createdBy": self.created_by,
            "createdAt": self.created_at,
            "updatedAt": self.updated_at,
        })
    }
}

/// Candidate for a new inventory item (validated before any store interaction).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub item_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub price: Decimal,
    pub quantity: i64,
    #[serde(default)]
    pub min_stock: i64,
    pub status: StockStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl NewItem {
    pub fn validate(&self) -> DomainResult<()> {
        if self.item_id.trim().is_empty() {
            return Err(DomainError::validation("itemId is required"));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name is required"));
        }
        validate_price(self.price)?;
        validate_non_negative("quantity", self.quantity)?;
        validate_non_negative("minStock", self.min_stock)?;
        if let Some(url) = &self.image_url {
            validate_image_url(url)?;
        }
        Ok(())
    }

    /// Materialize the candidate into a record.
    pub fn into_item(
        self,
        id: RecordId,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> InventoryItem {
        InventoryItem {
            id,
            item_id: self.item_id.trim().to_string(),
            name: self.name,
            item_type: self.item_type,
            price: self.price,
            quantity: self.quantity,
            min_stock: self.min_stock,
            status: self.status,
            notes: self.notes,
            image_url: self.image_url,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of an item. The business key (`itemId`) is not patchable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub item_type: Option<ItemType>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub min_stock: Option<i64>,
    #[serde(default)]
    pub status: Option<StockStatus>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl ItemPatch {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name cannot be empty"));
            }
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(quantity) = self.quantity {
            validate_non_negative("quantity", quantity)?;
        }
        if let Some(min_stock) = self.min_stock {
            validate_non_negative("minStock", min_stock)?;
        }
        if let Some(url) = &self.image_url {
            validate_image_url(url)?;
        }
        Ok(())
    }

    /// Merge the provided fields into `item`, leaving the rest untouched.
    pub fn apply_to(&self, item: &mut InventoryItem, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(item_type) = self.item_type {
            item.item_type = item_type;
        }
        if let Some(price) = self.price {
            item.price = price;
        }
        if let Some(quantity) = self.quantity {
            item.quantity = quantity;
        }
        if let Some(min_stock) = self.min_stock {
            item.min_stock = min_stock;
        }
        if let Some(status) = self.status {
            item.status = status;
        }
        if let Some(notes) = &self.notes {
            item.notes = Some(notes.clone());
        }
        if let Some(url) = &self.image_url {
            item.image_url = Some(url.clone());
        }
        item.updated_at = now;
    }
}

/// Prices are stored as `NUMERIC(10, 2)`: at most two decimals, below 10^8.
const PRICE_SCALE: u32 = 2;
const PRICE_LIMIT: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

fn validate_price(price: Decimal) -> DomainResult<()> {
    if price.is_zero() || price.is_sign_negative() {
        return Err(DomainError::validation("price must be positive"));
    }
    if price.normalize().scale() > PRICE_SCALE {
        return Err(DomainError::validation("price cannot have more than two decimal places"));
    }
    if price >= PRICE_LIMIT {
        return Err(DomainError::validation("price must be below 100000000"));
    }
    Ok(())
}

fn validate_non_negative(field: &str, value: i64) -> DomainResult<()> {
    if value < 0 {
        return Err(DomainError::validation(format!("{field} cannot be negative")));
    }
    Ok(())
}

fn validate_image_url(url: &str) -> DomainResult<()> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| DomainError::validation("imageUrl must be an http(s) URL"))?;
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() || url.chars().any(char::is_whitespace) {
        return Err(DomainError::validation("imageUrl must be an http(s) URL"));
    }
    Ok(())
}
