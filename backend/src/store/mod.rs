//! Ledger store abstraction
//!
//! A [`LedgerStore`] hands out [`LedgerTx`] transactions. Every ledger use
//! case opens exactly one transaction, performs its reads and writes through
//! it and commits once; dropping a transaction without committing discards
//! all of its writes.
//!
//! The `lock_*` methods return the current row and hold it against
//! concurrent writers until the transaction ends, so balances and quantities
//! are always checked against the value they will be written over.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::{
    BatchStatus, Fund, FundStatus, FundUsage, InventoryKey, InventoryRecord, InventoryTransfer,
    Location, ManufacturingBatch, MaterialLine, MaterialUsage, Notification, Product, Purchase,
    RawMaterial, TransferStatus, UnknownVariant, UsageType,
};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::{FailPoint, MemoryStore, RowCounts};
pub use postgres::PgStore;

/// Errors raised by a store implementation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(sqlx::Error),

    /// Deadlock, serialization failure or lock timeout
    #[error("transaction aborted: {0}")]
    Retryable(String),

    /// A unique constraint rejected the write
    #[error("duplicate value for {0}")]
    Duplicate(String),

    /// A stored value could not be mapped back onto a domain type
    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("fail point triggered: {0:?}")]
    FailPoint(FailPoint),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &error {
            // deadlock_detected, serialization_failure, lock_not_available
            match db.code().as_deref() {
                Some("40P01") | Some("40001") | Some("55P03") => {
                    return StoreError::Retryable(db.message().to_string());
                }
                // unique_violation
                Some("23505") => {
                    return StoreError::Duplicate(db.constraint().unwrap_or("unique key").to_string());
                }
                _ => {}
            }
        }
        match &error {
            sqlx::Error::PoolTimedOut => {
                return StoreError::Retryable("connection pool timed out".to_string());
            }
            // The server rolls back a transaction whose connection drops
            sqlx::Error::Io(io) => return StoreError::Retryable(io.to_string()),
            _ => {}
        }
        StoreError::Database(error)
    }
}

impl From<UnknownVariant> for StoreError {
    fn from(error: UnknownVariant) -> Self {
        StoreError::Corrupt(error.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Parse an enum stored as text
pub(crate) fn parse_column<T>(value: &str) -> StoreResult<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    Ok(value.parse::<T>()?)
}

// ============================================================================
// Insert payloads
// ============================================================================

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub sku: String,
}

#[derive(Debug, Clone)]
pub struct NewMaterial {
    pub name: String,
    pub unit: String,
    pub stock_quantity: Decimal,
    pub min_stock_level: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub material_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_amount: Decimal,
    pub fund_id: Uuid,
    pub vendor_name: String,
    pub vendor_contact: Option<String>,
    pub invoice_number: Option<String>,
    pub purchase_date: NaiveDate,
    pub notes: Option<String>,
    pub purchased_by: Uuid,
}

#[derive(Debug, Clone)]
pub struct NewFund {
    pub to_user_id: Uuid,
    pub amount: Decimal,
    pub purpose: Option<String>,
    pub allocated_by: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewFundUsage {
    pub fund_id: Uuid,
    pub amount: Decimal,
    pub usage_type: UsageType,
    pub used_by: Uuid,
    pub reference_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewBatch {
    pub batch_number: String,
    pub product_id: Uuid,
    pub quantity_produced: i64,
    pub start_date: NaiveDate,
    pub expected_completion_date: NaiveDate,
    pub notes: Option<String>,
    pub created_by: Uuid,
}

#[derive(Debug, Clone)]
pub struct NewTransfer {
    pub product_id: Uuid,
    pub batch_id: Option<Uuid>,
    pub quantity: i64,
    pub from_location: Location,
    pub to_location: Location,
    pub initiated_by: Uuid,
    pub shopkeeper_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
}

// ============================================================================
// Traits
// ============================================================================

/// Handle to the shared ledger store
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Open a transaction
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>>;

    /// Check the store is reachable
    async fn ping(&self) -> StoreResult<()>;
}

/// One open transaction against the ledger store
#[async_trait]
pub trait LedgerTx: Send {
    // Products
    async fn insert_product(&mut self, new: NewProduct) -> StoreResult<Product>;
    async fn get_product(&mut self, id: Uuid) -> StoreResult<Option<Product>>;
    async fn list_products(&mut self) -> StoreResult<Vec<Product>>;

    // Raw materials and purchases
    async fn insert_material(&mut self, new: NewMaterial) -> StoreResult<RawMaterial>;
    async fn get_material(&mut self, id: Uuid) -> StoreResult<Option<RawMaterial>>;
    async fn lock_material(&mut self, id: Uuid) -> StoreResult<Option<RawMaterial>>;
    async fn set_material_stock(&mut self, id: Uuid, stock_quantity: Decimal) -> StoreResult<()>;
    async fn list_materials(&mut self) -> StoreResult<Vec<RawMaterial>>;
    async fn insert_purchase(&mut self, new: NewPurchase) -> StoreResult<Purchase>;
    /// Newest first
    async fn list_purchases(&mut self, material_id: Option<Uuid>) -> StoreResult<Vec<Purchase>>;

    // Funds
    async fn insert_fund(&mut self, new: NewFund) -> StoreResult<Fund>;
    async fn get_fund(&mut self, id: Uuid) -> StoreResult<Option<Fund>>;
    async fn lock_fund(&mut self, id: Uuid) -> StoreResult<Option<Fund>>;
    async fn set_fund_balance(&mut self, id: Uuid, balance: Decimal, status: FundStatus) -> StoreResult<()>;
    async fn insert_fund_usage(&mut self, new: NewFundUsage) -> StoreResult<FundUsage>;
    /// Newest first
    async fn list_fund_usages(&mut self, fund_id: Uuid) -> StoreResult<Vec<FundUsage>>;
    async fn funds_owned_by(&mut self, user_id: Uuid) -> StoreResult<Vec<Fund>>;
    async fn total_used_by(&mut self, user_id: Uuid) -> StoreResult<Decimal>;

    // Manufacturing batches
    /// Next 1-based sequence for batch numbers starting with `day_prefix`.
    /// Concurrent callers with the same prefix are serialized.
    async fn next_batch_sequence(&mut self, day_prefix: &str) -> StoreResult<i64>;
    async fn insert_batch(&mut self, new: NewBatch) -> StoreResult<ManufacturingBatch>;
    async fn get_batch(&mut self, id: Uuid) -> StoreResult<Option<ManufacturingBatch>>;
    async fn lock_batch(&mut self, id: Uuid) -> StoreResult<Option<ManufacturingBatch>>;
    async fn set_batch_status(
        &mut self,
        id: Uuid,
        status: BatchStatus,
        completion_date: Option<DateTime<Utc>>,
    ) -> StoreResult<ManufacturingBatch>;
    async fn list_batches(&mut self) -> StoreResult<Vec<ManufacturingBatch>>;
    async fn insert_material_usage(&mut self, batch_id: Uuid, line: &MaterialLine) -> StoreResult<MaterialUsage>;
    async fn list_material_usages(&mut self, batch_id: Uuid) -> StoreResult<Vec<MaterialUsage>>;

    // Finished-goods inventory
    async fn lock_inventory(&mut self, key: InventoryKey) -> StoreResult<Option<InventoryRecord>>;
    async fn set_inventory_quantity(&mut self, id: Uuid, quantity: i64) -> StoreResult<()>;
    /// Increment the record for `key`, creating it if absent
    async fn add_inventory(&mut self, key: InventoryKey, quantity: i64) -> StoreResult<InventoryRecord>;
    async fn list_inventory(&mut self, product_id: Option<Uuid>) -> StoreResult<Vec<InventoryRecord>>;

    // Transfers and notifications
    async fn insert_transfer(&mut self, new: NewTransfer) -> StoreResult<InventoryTransfer>;
    async fn lock_transfer(&mut self, id: Uuid) -> StoreResult<Option<InventoryTransfer>>;
    async fn set_transfer_status(&mut self, id: Uuid, status: TransferStatus) -> StoreResult<InventoryTransfer>;
    /// Newest first
    async fn list_transfers(&mut self) -> StoreResult<Vec<InventoryTransfer>>;
    async fn insert_notification(&mut self, new: NewNotification) -> StoreResult<Notification>;
    /// Newest first
    async fn list_notifications(&mut self, user_id: Uuid) -> StoreResult<Vec<Notification>>;
    /// Returns false when no notification with that id belongs to the user
    async fn mark_notification_read(&mut self, id: Uuid, user_id: Uuid) -> StoreResult<bool>;

    /// Make every write of this transaction durable
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// Shared store handle
pub type SharedStore = Arc<dyn LedgerStore>;
