//! Finished-goods inventory keyed by (product, batch, location)

use shared::{InventoryKey, InventoryRecord, InventorySummary};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::{LedgerTx, SharedStore};

/// Inventory ledger service
#[derive(Clone)]
pub struct InventoryLedger {
    store: SharedStore,
}

impl InventoryLedger {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Per-location totals and per-(product, batch) positions
    pub async fn summary(&self) -> AppResult<InventorySummary> {
        let mut tx = self.store.begin().await?;
        let records = tx.list_inventory(None).await?;
        InventorySummary::from_records(&records)
            .ok_or_else(|| AppError::Internal("inventory totals overflow".to_string()))
    }

    pub async fn records_for_product(&self, product_id: Uuid) -> AppResult<Vec<InventoryRecord>> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_inventory(Some(product_id)).await?)
    }

    /// Take `quantity` out of the record at `key`. The current quantity is
    /// read under the row lock, and the record never goes below zero.
    pub(crate) async fn debit_in(
        tx: &mut dyn LedgerTx,
        key: InventoryKey,
        quantity: i64,
    ) -> AppResult<InventoryRecord> {
        let insufficient = |available: i64| AppError::InsufficientInventory {
            location: key.location,
            requested: quantity,
            available,
        };

        let mut record = tx.lock_inventory(key).await?.ok_or_else(|| insufficient(0))?;
        if record.quantity < quantity {
            return Err(insufficient(record.quantity));
        }

        record.quantity -= quantity;
        tx.set_inventory_quantity(record.id, record.quantity).await?;
        Ok(record)
    }

    /// Add `quantity` to the record at `key`, creating it if absent
    pub(crate) async fn credit_in(
        tx: &mut dyn LedgerTx,
        key: InventoryKey,
        quantity: i64,
    ) -> AppResult<InventoryRecord> {
        Ok(tx.add_inventory(key, quantity).await?)
    }
}
