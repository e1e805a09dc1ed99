//! In-process ledger store
//!
//! Transactions take an exclusive lock over the whole ledger and work on a
//! private copy; commit swaps the copy in. Every transaction is therefore
//! serialized with every other one, which trivially gives the row-level
//! guarantees the Postgres store provides with `FOR UPDATE`.
//!
//! Intended for tests and for running the server without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{
    BatchStatus, Fund, FundStatus, FundUsage, InventoryKey, InventoryRecord, InventoryTransfer,
    ManufacturingBatch, MaterialLine, MaterialUsage, Notification, Product, Purchase, RawMaterial,
    TransferStatus,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{
    LedgerStore, LedgerTx, NewBatch, NewFund, NewFundUsage, NewMaterial, NewNotification,
    NewProduct, NewPurchase, NewTransfer, StoreError, StoreResult,
};

/// A write that can be forced to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    InsertPurchase,
    InsertFundUsage,
    InsertMaterialUsage,
    InsertTransfer,
    InsertNotification,
    AddInventory,
    SetBatchStatus,
}

#[derive(Debug, Clone, Default)]
struct LedgerState {
    products: Vec<Product>,
    materials: Vec<RawMaterial>,
    purchases: Vec<Purchase>,
    funds: Vec<Fund>,
    fund_usages: Vec<FundUsage>,
    batches: Vec<ManufacturingBatch>,
    material_usages: Vec<MaterialUsage>,
    inventory: Vec<InventoryRecord>,
    transfers: Vec<InventoryTransfer>,
    notifications: Vec<Notification>,
}

/// Number of committed rows per relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowCounts {
    pub products: usize,
    pub materials: usize,
    pub purchases: usize,
    pub funds: usize,
    pub fund_usages: usize,
    pub batches: usize,
    pub material_usages: usize,
    pub inventory: usize,
    pub transfers: usize,
    pub notifications: usize,
}

/// In-memory ledger store
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<LedgerState>>,
    fail_points: Arc<StdMutex<HashSet<FailPoint>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write at `point` fail until cleared
    pub fn fail_on(&self, point: FailPoint) {
        self.fail_points
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(point);
    }

    pub fn clear_fail_points(&self) {
        self.fail_points
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    /// Committed row counts, for asserting that nothing partial was persisted
    pub async fn row_counts(&self) -> RowCounts {
        let state = self.state.lock().await;
        RowCounts {
            products: state.products.len(),
            materials: state.materials.len(),
            purchases: state.purchases.len(),
            funds: state.funds.len(),
            fund_usages: state.fund_usages.len(),
            batches: state.batches.len(),
            material_usages: state.material_usages.len(),
            inventory: state.inventory.len(),
            transfers: state.transfers.len(),
            notifications: state.notifications.len(),
        }
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            working,
            fail_points: self.fail_points.clone(),
        }))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<LedgerState>,
    working: LedgerState,
    fail_points: Arc<StdMutex<HashSet<FailPoint>>>,
}

impl MemoryTx {
    fn check(&self, point: FailPoint) -> StoreResult<()> {
        let armed = self
            .fail_points
            .lock()
            .map(|points| points.contains(&point))
            .unwrap_or(false);
        if armed {
            return Err(StoreError::FailPoint(point));
        }
        Ok(())
    }

    fn missing(what: &str, id: Uuid) -> StoreError {
        StoreError::Corrupt(format!("{} {} does not exist", what, id))
    }
}

fn newest_first<T: Clone>(rows: impl DoubleEndedIterator<Item = T>) -> Vec<T> {
    rows.rev().collect()
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn insert_product(&mut self, new: NewProduct) -> StoreResult<Product> {
        if self.working.products.iter().any(|p| p.sku == new.sku) {
            return Err(StoreError::Duplicate("sku".to_string()));
        }
        let product = Product {
            id: Uuid::new_v4(),
            name: new.name,
            sku: new.sku,
            created_at: Utc::now(),
        };
        self.working.products.push(product.clone());
        Ok(product)
    }

    async fn get_product(&mut self, id: Uuid) -> StoreResult<Option<Product>> {
        Ok(self.working.products.iter().find(|p| p.id == id).cloned())
    }

    async fn list_products(&mut self) -> StoreResult<Vec<Product>> {
        let mut products = self.working.products.clone();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn insert_material(&mut self, new: NewMaterial) -> StoreResult<RawMaterial> {
        let now = Utc::now();
        let material = RawMaterial {
            id: Uuid::new_v4(),
            name: new.name,
            unit: new.unit,
            stock_quantity: new.stock_quantity,
            min_stock_level: new.min_stock_level,
            created_at: now,
            updated_at: now,
        };
        self.working.materials.push(material.clone());
        Ok(material)
    }

    async fn get_material(&mut self, id: Uuid) -> StoreResult<Option<RawMaterial>> {
        Ok(self.working.materials.iter().find(|m| m.id == id).cloned())
    }

    async fn lock_material(&mut self, id: Uuid) -> StoreResult<Option<RawMaterial>> {
        self.get_material(id).await
    }

    async fn set_material_stock(&mut self, id: Uuid, stock_quantity: Decimal) -> StoreResult<()> {
        let material = self
            .working
            .materials
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| Self::missing("material", id))?;
        material.stock_quantity = stock_quantity;
        material.updated_at = Utc::now();
        Ok(())
    }

    async fn list_materials(&mut self) -> StoreResult<Vec<RawMaterial>> {
        let mut materials = self.working.materials.clone();
        materials.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(materials)
    }

    async fn insert_purchase(&mut self, new: NewPurchase) -> StoreResult<Purchase> {
        self.check(FailPoint::InsertPurchase)?;
        let purchase = Purchase {
            id: Uuid::new_v4(),
            material_id: new.material_id,
            quantity: new.quantity,
            unit_price: new.unit_price,
            total_amount: new.total_amount,
            fund_id: new.fund_id,
            vendor_name: new.vendor_name,
            vendor_contact: new.vendor_contact,
            invoice_number: new.invoice_number,
            purchase_date: new.purchase_date,
            notes: new.notes,
            purchased_by: new.purchased_by,
            created_at: Utc::now(),
        };
        self.working.purchases.push(purchase.clone());
        Ok(purchase)
    }

    async fn list_purchases(&mut self, material_id: Option<Uuid>) -> StoreResult<Vec<Purchase>> {
        Ok(newest_first(
            self.working
                .purchases
                .iter()
                .filter(|p| material_id.map_or(true, |id| p.material_id == id))
                .cloned(),
        ))
    }

    async fn insert_fund(&mut self, new: NewFund) -> StoreResult<Fund> {
        let fund = Fund {
            id: Uuid::new_v4(),
            to_user_id: new.to_user_id,
            amount: new.amount,
            balance: new.amount,
            status: FundStatus::Active,
            purpose: new.purpose,
            allocated_by: new.allocated_by,
            created_at: Utc::now(),
        };
        self.working.funds.push(fund.clone());
        Ok(fund)
    }

    async fn get_fund(&mut self, id: Uuid) -> StoreResult<Option<Fund>> {
        Ok(self.working.funds.iter().find(|f| f.id == id).cloned())
    }

    async fn lock_fund(&mut self, id: Uuid) -> StoreResult<Option<Fund>> {
        self.get_fund(id).await
    }

    async fn set_fund_balance(&mut self, id: Uuid, balance: Decimal, status: FundStatus) -> StoreResult<()> {
        let fund = self
            .working
            .funds
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| Self::missing("fund", id))?;
        if balance < Decimal::ZERO || balance > fund.amount {
            return Err(StoreError::Corrupt(format!(
                "fund {} balance {} outside 0..={}",
                id, balance, fund.amount
            )));
        }
        fund.balance = balance;
        fund.status = status;
        Ok(())
    }

    async fn insert_fund_usage(&mut self, new: NewFundUsage) -> StoreResult<FundUsage> {
        self.check(FailPoint::InsertFundUsage)?;
        let usage = FundUsage {
            id: Uuid::new_v4(),
            fund_id: new.fund_id,
            amount: new.amount,
            usage_type: new.usage_type,
            used_by: new.used_by,
            reference_id: new.reference_id,
            notes: new.notes,
            used_at: Utc::now(),
        };
        self.working.fund_usages.push(usage.clone());
        Ok(usage)
    }

    async fn list_fund_usages(&mut self, fund_id: Uuid) -> StoreResult<Vec<FundUsage>> {
        Ok(newest_first(
            self.working
                .fund_usages
                .iter()
                .filter(|u| u.fund_id == fund_id)
                .cloned(),
        ))
    }

    async fn funds_owned_by(&mut self, user_id: Uuid) -> StoreResult<Vec<Fund>> {
        Ok(self
            .working
            .funds
            .iter()
            .filter(|f| f.to_user_id == user_id)
            .cloned()
            .collect())
    }

    async fn total_used_by(&mut self, user_id: Uuid) -> StoreResult<Decimal> {
        Ok(self
            .working
            .fund_usages
            .iter()
            .filter(|u| u.used_by == user_id)
            .try_fold(Decimal::ZERO, |acc, u| acc.checked_add(u.amount))
            .ok_or_else(|| StoreError::Corrupt(format!("usage total for {} overflows", user_id)))?)
    }

    async fn next_batch_sequence(&mut self, day_prefix: &str) -> StoreResult<i64> {
        let existing = self
            .working
            .batches
            .iter()
            .filter(|b| b.batch_number.starts_with(day_prefix))
            .count() as i64;
        Ok(existing + 1)
    }

    async fn insert_batch(&mut self, new: NewBatch) -> StoreResult<ManufacturingBatch> {
        if self
            .working
            .batches
            .iter()
            .any(|b| b.batch_number == new.batch_number)
        {
            return Err(StoreError::Duplicate("batch_number".to_string()));
        }
        let now = Utc::now();
        let batch = ManufacturingBatch {
            id: Uuid::new_v4(),
            batch_number: new.batch_number,
            product_id: new.product_id,
            quantity_produced: new.quantity_produced,
            status: BatchStatus::Pending,
            start_date: new.start_date,
            expected_completion_date: new.expected_completion_date,
            completion_date: None,
            notes: new.notes,
            created_by: new.created_by,
            created_at: now,
            updated_at: now,
        };
        self.working.batches.push(batch.clone());
        Ok(batch)
    }

    async fn get_batch(&mut self, id: Uuid) -> StoreResult<Option<ManufacturingBatch>> {
        Ok(self.working.batches.iter().find(|b| b.id == id).cloned())
    }

    async fn lock_batch(&mut self, id: Uuid) -> StoreResult<Option<ManufacturingBatch>> {
        self.get_batch(id).await
    }

    async fn set_batch_status(
        &mut self,
        id: Uuid,
        status: BatchStatus,
        completion_date: Option<DateTime<Utc>>,
    ) -> StoreResult<ManufacturingBatch> {
        self.check(FailPoint::SetBatchStatus)?;
        let batch = self
            .working
            .batches
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| Self::missing("batch", id))?;
        batch.status = status;
        batch.completion_date = completion_date;
        batch.updated_at = Utc::now();
        Ok(batch.clone())
    }

    async fn list_batches(&mut self) -> StoreResult<Vec<ManufacturingBatch>> {
        Ok(newest_first(self.working.batches.iter().cloned()))
    }

    async fn insert_material_usage(&mut self, batch_id: Uuid, line: &MaterialLine) -> StoreResult<MaterialUsage> {
        self.check(FailPoint::InsertMaterialUsage)?;
        let usage = MaterialUsage {
            id: Uuid::new_v4(),
            batch_id,
            material_id: line.material_id,
            quantity_required: line.quantity,
            created_at: Utc::now(),
        };
        self.working.material_usages.push(usage.clone());
        Ok(usage)
    }

    async fn list_material_usages(&mut self, batch_id: Uuid) -> StoreResult<Vec<MaterialUsage>> {
        Ok(self
            .working
            .material_usages
            .iter()
            .filter(|u| u.batch_id == batch_id)
            .cloned()
            .collect())
    }

    async fn lock_inventory(&mut self, key: InventoryKey) -> StoreResult<Option<InventoryRecord>> {
        Ok(self
            .working
            .inventory
            .iter()
            .find(|r| r.key() == key)
            .cloned())
    }

    async fn set_inventory_quantity(&mut self, id: Uuid, quantity: i64) -> StoreResult<()> {
        if quantity < 0 {
            return Err(StoreError::Corrupt(format!(
                "inventory {} quantity {} is negative",
                id, quantity
            )));
        }
        let record = self
            .working
            .inventory
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Self::missing("inventory record", id))?;
        record.quantity = quantity;
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn add_inventory(&mut self, key: InventoryKey, quantity: i64) -> StoreResult<InventoryRecord> {
        self.check(FailPoint::AddInventory)?;
        let now = Utc::now();
        if let Some(record) = self.working.inventory.iter_mut().find(|r| r.key() == key) {
            record.quantity = record
                .quantity
                .checked_add(quantity)
                .ok_or_else(|| StoreError::Corrupt(format!("inventory record {} overflows", record.id)))?;
            record.updated_at = now;
            return Ok(record.clone());
        }
        let record = InventoryRecord {
            id: Uuid::new_v4(),
            product_id: key.product_id,
            batch_id: key.batch_id,
            location: key.location,
            quantity,
            updated_at: now,
        };
        self.working.inventory.push(record.clone());
        Ok(record)
    }

    async fn list_inventory(&mut self, product_id: Option<Uuid>) -> StoreResult<Vec<InventoryRecord>> {
        let mut records: Vec<InventoryRecord> = self
            .working
            .inventory
            .iter()
            .filter(|r| product_id.map_or(true, |id| r.product_id == id))
            .cloned()
            .collect();
        records.sort_by_key(|r| r.key());
        Ok(records)
    }

    async fn insert_transfer(&mut self, new: NewTransfer) -> StoreResult<InventoryTransfer> {
        self.check(FailPoint::InsertTransfer)?;
        let transfer = InventoryTransfer {
            id: Uuid::new_v4(),
            product_id: new.product_id,
            batch_id: new.batch_id,
            quantity: new.quantity,
            from_location: new.from_location,
            to_location: new.to_location,
            initiated_by: new.initiated_by,
            shopkeeper_id: new.shopkeeper_id,
            status: TransferStatus::Pending,
            notes: new.notes,
            transfer_date: Utc::now(),
        };
        self.working.transfers.push(transfer.clone());
        Ok(transfer)
    }

    async fn lock_transfer(&mut self, id: Uuid) -> StoreResult<Option<InventoryTransfer>> {
        Ok(self.working.transfers.iter().find(|t| t.id == id).cloned())
    }

    async fn set_transfer_status(&mut self, id: Uuid, status: TransferStatus) -> StoreResult<InventoryTransfer> {
        let transfer = self
            .working
            .transfers
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Self::missing("transfer", id))?;
        transfer.status = status;
        Ok(transfer.clone())
    }

    async fn list_transfers(&mut self) -> StoreResult<Vec<InventoryTransfer>> {
        Ok(newest_first(self.working.transfers.iter().cloned()))
    }

    async fn insert_notification(&mut self, new: NewNotification) -> StoreResult<Notification> {
        self.check(FailPoint::InsertNotification)?;
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            title: new.title,
            message: new.message,
            entity_type: new.entity_type,
            entity_id: new.entity_id,
            is_read: false,
            created_at: Utc::now(),
        };
        self.working.notifications.push(notification.clone());
        Ok(notification)
    }

    async fn list_notifications(&mut self, user_id: Uuid) -> StoreResult<Vec<Notification>> {
        Ok(newest_first(
            self.working
                .notifications
                .iter()
                .filter(|n| n.user_id == user_id)
                .cloned(),
        ))
    }

    async fn mark_notification_read(&mut self, id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        match self
            .working
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
        {
            Some(notification) => {
                notification.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTx {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }
}
