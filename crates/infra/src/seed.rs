//! Demo inventory loaded into fresh development environments.

use rust_decimal::Decimal;
use tracing::info;

use fablab_core::UserId;
use fablab_inventory::{ItemType, NewItem, StockStatus, UserSummary};

use crate::ledger::{InventoryLedger, LedgerError, LedgerResult};
use crate::store::LedgerStore;
use crate::users::UserDirectory;

/// Email of the seeded administrator account.
pub const DEMO_ADMIN_EMAIL: &str = "admin@fablab.com";

/// Fixed id of the seeded administrator, so dev tokens stay valid across restarts.
pub const DEMO_ADMIN_ID: uuid::Uuid =
    uuid::Uuid::from_u128(0x0190_0000_0000_7000_8000_0000_0000_0001);

pub fn demo_admin() -> UserSummary {
    UserSummary {
        id: UserId::from_uuid(DEMO_ADMIN_ID),
        first_name: "Admin".to_string(),
        last_name: "User".to_string(),
        email: DEMO_ADMIN_EMAIL.to_string(),
    }
}

struct DemoItem {
    item_id: &'static str,
    name: &'static str,
    item_type: ItemType,
    price_cents: i64,
    quantity: i64,
    min_stock: i64,
    status: StockStatus,
    notes: Option<&'static str>,
}

const DEMO_ITEMS: [DemoItem; 6] = [
    DemoItem {
        item_id: "CHOC-001",
        name: "Chocolate Melter",
        item_type: ItemType::Chocolate,
        price_cents: 500,
        quantity: 2,
        min_stock: 1,
        status: StockStatus::InStock,
        notes: Some("For melting chocolate"),
    },
    DemoItem {
        item_id: "SOAP-001",
        name: "Dental Vacuum Molder",
        item_type: ItemType::Soap,
        price_cents: 500,
        quantity: 1,
        min_stock: 1,
        status: StockStatus::InStock,
        notes: None,
    },
    DemoItem {
        item_id: "CHOC-002",
        name: "White Chocolate",
        item_type: ItemType::Chocolate,
        price_cents: 500,
        quantity: 3,
        min_stock: 2,
        status: StockStatus::InStock,
        notes: Some("3 bags"),
    },
    DemoItem {
        item_id: "PINS-001",
        name: "Pin Press",
        item_type: ItemType::Pins,
        price_cents: 500,
        quantity: 1,
        min_stock: 1,
        status: StockStatus::InStock,
        notes: None,
    },
    DemoItem {
        item_id: "DRONE-001",
        name: "Drones",
        item_type: ItemType::Drones,
        price_cents: 500,
        quantity: 4,
        min_stock: 2,
        status: StockStatus::InStock,
        notes: None,
    },
    DemoItem {
        item_id: "MAT-001",
        name: "3D Printer Filament",
        item_type: ItemType::Materials,
        price_cents: 2500,
        quantity: 5,
        min_stock: 10,
        status: StockStatus::LowStock,
        notes: Some("PLA - Various colors"),
    },
];

impl DemoItem {
    fn to_new_item(&self) -> NewItem {
        NewItem {
            item_id: self.item_id.to_string(),
            name: self.name.to_string(),
            item_type: self.item_type,
            price: Decimal::new(self.price_cents, 2),
            quantity: self.quantity,
            min_stock: self.min_stock,
            status: self.status,
            notes: self.notes.map(str::to_string),
            image_url: None,
        }
    }
}

pub fn demo_inventory() -> Vec<NewItem> {
    DEMO_ITEMS.iter().map(DemoItem::to_new_item).collect()
}

/// Create the demo items through the ledger. Items whose key already exists are
/// skipped, so seeding twice is harmless. Returns how many were created.
pub async fn seed_demo_inventory<S, U>(
    ledger: &InventoryLedger<S, U>,
    actor: UserId,
) -> LedgerResult<usize>
where
    S: LedgerStore + ?Sized,
    U: UserDirectory + ?Sized,
{
    let mut created = 0;
    for candidate in demo_inventory() {
        match ledger.create(candidate, actor).await {
            Ok(_) => created += 1,
            Err(LedgerError::DuplicateKey(_)) => {}
            Err(e) => return Err(e),
        }
    }
    info!(created, "demo inventory seeded");
    Ok(created)
}
