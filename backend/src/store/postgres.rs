//! PostgreSQL ledger store
//!
//! Each [`PgTx`] wraps one database transaction. Rows that are checked and
//! then rewritten are read with `SELECT ... FOR UPDATE`, and every
//! transaction sets a `lock_timeout` so contention surfaces as a retryable
//! error rather than an unbounded wait.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::{
    BatchStatus, Fund, FundStatus, FundUsage, InventoryKey, InventoryRecord, InventoryTransfer,
    ManufacturingBatch, MaterialLine, MaterialUsage, Notification, Product, Purchase, RawMaterial,
    TransferStatus,
};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool, Postgres, Transaction};
use std::time::Duration;
use uuid::Uuid;

use super::{
    parse_column, LedgerStore, LedgerTx, NewBatch, NewFund, NewFundUsage, NewMaterial,
    NewNotification, NewProduct, NewPurchase, NewTransfer, StoreError, StoreResult,
};
use crate::config::DatabaseConfig;

/// Ledger store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    lock_timeout_ms: u64,
}

impl PgStore {
    pub fn new(pool: PgPool, lock_timeout_ms: u64) -> Self {
        Self {
            pool,
            lock_timeout_ms,
        }
    }

    /// Create the connection pool described by the database configuration
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&config.url)
            .await?;

        Ok(Self::new(pool, config.lock_timeout_ms))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>> {
        let mut tx = self.pool.begin().await?;

        // SET does not take bind parameters
        sqlx::query(&format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout_ms))
            .execute(&mut *tx)
            .await?;

        Ok(Box::new(PgTx { tx }))
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// One open PostgreSQL transaction. Rolled back on drop unless committed.
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    sku: String,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            sku: row.sku,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MaterialRow {
    id: Uuid,
    name: String,
    unit: String,
    stock_quantity: Decimal,
    min_stock_level: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MaterialRow> for RawMaterial {
    fn from(row: MaterialRow) -> Self {
        RawMaterial {
            id: row.id,
            name: row.name,
            unit: row.unit,
            stock_quantity: row.stock_quantity,
            min_stock_level: row.min_stock_level,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct PurchaseRow {
    id: Uuid,
    material_id: Uuid,
    quantity: Decimal,
    unit_price: Decimal,
    total_amount: Decimal,
    fund_id: Uuid,
    vendor_name: String,
    vendor_contact: Option<String>,
    invoice_number: Option<String>,
    purchase_date: NaiveDate,
    notes: Option<String>,
    purchased_by: Uuid,
    created_at: DateTime<Utc>,
}

impl From<PurchaseRow> for Purchase {
    fn from(row: PurchaseRow) -> Self {
        Purchase {
            id: row.id,
            material_id: row.material_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_amount: row.total_amount,
            fund_id: row.fund_id,
            vendor_name: row.vendor_name,
            vendor_contact: row.vendor_contact,
            invoice_number: row.invoice_number,
            purchase_date: row.purchase_date,
            notes: row.notes,
            purchased_by: row.purchased_by,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct FundRow {
    id: Uuid,
    to_user_id: Uuid,
    amount: Decimal,
    balance: Decimal,
    status: String,
    purpose: Option<String>,
    allocated_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<FundRow> for Fund {
    type Error = StoreError;

    fn try_from(row: FundRow) -> StoreResult<Self> {
        Ok(Fund {
            id: row.id,
            to_user_id: row.to_user_id,
            amount: row.amount,
            balance: row.balance,
            status: parse_column(&row.status)?,
            purpose: row.purpose,
            allocated_by: row.allocated_by,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct FundUsageRow {
    id: Uuid,
    fund_id: Uuid,
    amount: Decimal,
    usage_type: String,
    used_by: Uuid,
    reference_id: Option<String>,
    notes: Option<String>,
    used_at: DateTime<Utc>,
}

impl TryFrom<FundUsageRow> for FundUsage {
    type Error = StoreError;

    fn try_from(row: FundUsageRow) -> StoreResult<Self> {
        Ok(FundUsage {
            id: row.id,
            fund_id: row.fund_id,
            amount: row.amount,
            usage_type: parse_column(&row.usage_type)?,
            used_by: row.used_by,
            reference_id: row.reference_id,
            notes: row.notes,
            used_at: row.used_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct BatchRow {
    id: Uuid,
    batch_number: String,
    product_id: Uuid,
    quantity_produced: i64,
    status: String,
    start_date: NaiveDate,
    expected_completion_date: NaiveDate,
    completion_date: Option<DateTime<Utc>>,
    notes: Option<String>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BatchRow> for ManufacturingBatch {
    type Error = StoreError;

    fn try_from(row: BatchRow) -> StoreResult<Self> {
        Ok(ManufacturingBatch {
            id: row.id,
            batch_number: row.batch_number,
            product_id: row.product_id,
            quantity_produced: row.quantity_produced,
            status: parse_column(&row.status)?,
            start_date: row.start_date,
            expected_completion_date: row.expected_completion_date,
            completion_date: row.completion_date,
            notes: row.notes,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MaterialUsageRow {
    id: Uuid,
    batch_id: Uuid,
    material_id: Uuid,
    quantity_required: Decimal,
    created_at: DateTime<Utc>,
}

impl From<MaterialUsageRow> for MaterialUsage {
    fn from(row: MaterialUsageRow) -> Self {
        MaterialUsage {
            id: row.id,
            batch_id: row.batch_id,
            material_id: row.material_id,
            quantity_required: row.quantity_required,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct InventoryRow {
    id: Uuid,
    product_id: Uuid,
    batch_id: Option<Uuid>,
    location: String,
    quantity: i64,
    updated_at: DateTime<Utc>,
}

impl TryFrom<InventoryRow> for InventoryRecord {
    type Error = StoreError;

    fn try_from(row: InventoryRow) -> StoreResult<Self> {
        Ok(InventoryRecord {
            id: row.id,
            product_id: row.product_id,
            batch_id: row.batch_id,
            location: parse_column(&row.location)?,
            quantity: row.quantity,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TransferRow {
    id: Uuid,
    product_id: Uuid,
    batch_id: Option<Uuid>,
    quantity: i64,
    from_location: String,
    to_location: String,
    initiated_by: Uuid,
    shopkeeper_id: Option<Uuid>,
    status: String,
    notes: Option<String>,
    transfer_date: DateTime<Utc>,
}

impl TryFrom<TransferRow> for InventoryTransfer {
    type Error = StoreError;

    fn try_from(row: TransferRow) -> StoreResult<Self> {
        Ok(InventoryTransfer {
            id: row.id,
            product_id: row.product_id,
            batch_id: row.batch_id,
            quantity: row.quantity,
            from_location: parse_column(&row.from_location)?,
            to_location: parse_column(&row.to_location)?,
            initiated_by: row.initiated_by,
            shopkeeper_id: row.shopkeeper_id,
            status: parse_column(&row.status)?,
            notes: row.notes,
            transfer_date: row.transfer_date,
        })
    }
}

#[derive(Debug, FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    message: String,
    entity_type: Option<String>,
    entity_id: Option<Uuid>,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Notification {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            message: row.message,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            is_read: row.is_read,
            created_at: row.created_at,
        }
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

const MATERIAL_COLUMNS: &str =
    "id, name, unit, stock_quantity, min_stock_level, created_at, updated_at";
const PURCHASE_COLUMNS: &str = "id, material_id, quantity, unit_price, total_amount, fund_id, \
     vendor_name, vendor_contact, invoice_number, purchase_date, notes, purchased_by, created_at";
const FUND_COLUMNS: &str =
    "id, to_user_id, amount, balance, status, purpose, allocated_by, created_at";
const FUND_USAGE_COLUMNS: &str =
    "id, fund_id, amount, usage_type, used_by, reference_id, notes, used_at";
const BATCH_COLUMNS: &str = "id, batch_number, product_id, quantity_produced, status, start_date, \
     expected_completion_date, completion_date, notes, created_by, created_at, updated_at";
const INVENTORY_COLUMNS: &str = "id, product_id, batch_id, location, quantity, updated_at";
const TRANSFER_COLUMNS: &str = "id, product_id, batch_id, quantity, from_location, to_location, \
     initiated_by, shopkeeper_id, status, notes, transfer_date";
const NOTIFICATION_COLUMNS: &str =
    "id, user_id, title, message, entity_type, entity_id, is_read, created_at";

#[async_trait]
impl LedgerTx for PgTx {
    // ------------------------------------------------------------------------
    // Products
    // ------------------------------------------------------------------------

    async fn insert_product(&mut self, new: NewProduct) -> StoreResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            INSERT INTO products (name, sku)
            VALUES ($1, $2)
            RETURNING id, name, sku, created_at
            "#,
        )
        .bind(&new.name)
        .bind(&new.sku)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn get_product(&mut self, id: Uuid) -> StoreResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, sku, created_at FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Product::from))
    }

    async fn list_products(&mut self) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, sku, created_at FROM products ORDER BY name",
        )
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    // ------------------------------------------------------------------------
    // Raw materials and purchases
    // ------------------------------------------------------------------------

    async fn insert_material(&mut self, new: NewMaterial) -> StoreResult<RawMaterial> {
        let row = sqlx::query_as::<_, MaterialRow>(&format!(
            r#"
            INSERT INTO raw_materials (name, unit, stock_quantity, min_stock_level)
            VALUES ($1, $2, $3, $4)
            RETURNING {MATERIAL_COLUMNS}
            "#
        ))
        .bind(&new.name)
        .bind(&new.unit)
        .bind(new.stock_quantity)
        .bind(new.min_stock_level)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn get_material(&mut self, id: Uuid) -> StoreResult<Option<RawMaterial>> {
        let row = sqlx::query_as::<_, MaterialRow>(&format!(
            "SELECT {MATERIAL_COLUMNS} FROM raw_materials WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(RawMaterial::from))
    }

    async fn lock_material(&mut self, id: Uuid) -> StoreResult<Option<RawMaterial>> {
        let row = sqlx::query_as::<_, MaterialRow>(&format!(
            "SELECT {MATERIAL_COLUMNS} FROM raw_materials WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(RawMaterial::from))
    }

    async fn set_material_stock(&mut self, id: Uuid, stock_quantity: Decimal) -> StoreResult<()> {
        sqlx::query(
            "UPDATE raw_materials SET stock_quantity = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(stock_quantity)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn list_materials(&mut self) -> StoreResult<Vec<RawMaterial>> {
        let rows = sqlx::query_as::<_, MaterialRow>(&format!(
            "SELECT {MATERIAL_COLUMNS} FROM raw_materials ORDER BY name"
        ))
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(RawMaterial::from).collect())
    }

    async fn insert_purchase(&mut self, new: NewPurchase) -> StoreResult<Purchase> {
        let row = sqlx::query_as::<_, PurchaseRow>(&format!(
            r#"
            INSERT INTO material_purchases (
                material_id, quantity, unit_price, total_amount, fund_id, vendor_name,
                vendor_contact, invoice_number, purchase_date, notes, purchased_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {PURCHASE_COLUMNS}
            "#
        ))
        .bind(new.material_id)
        .bind(new.quantity)
        .bind(new.unit_price)
        .bind(new.total_amount)
        .bind(new.fund_id)
        .bind(&new.vendor_name)
        .bind(&new.vendor_contact)
        .bind(&new.invoice_number)
        .bind(new.purchase_date)
        .bind(&new.notes)
        .bind(new.purchased_by)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn list_purchases(&mut self, material_id: Option<Uuid>) -> StoreResult<Vec<Purchase>> {
        let rows = sqlx::query_as::<_, PurchaseRow>(&format!(
            r#"
            SELECT {PURCHASE_COLUMNS}
            FROM material_purchases
            WHERE $1::uuid IS NULL OR material_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(material_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(Purchase::from).collect())
    }

    // ------------------------------------------------------------------------
    // Funds
    // ------------------------------------------------------------------------

    async fn insert_fund(&mut self, new: NewFund) -> StoreResult<Fund> {
        let row = sqlx::query_as::<_, FundRow>(&format!(
            r#"
            INSERT INTO funds (to_user_id, amount, balance, status, purpose, allocated_by)
            VALUES ($1, $2, $2, $3, $4, $5)
            RETURNING {FUND_COLUMNS}
            "#
        ))
        .bind(new.to_user_id)
        .bind(new.amount)
        .bind(FundStatus::Active.as_str())
        .bind(&new.purpose)
        .bind(new.allocated_by)
        .fetch_one(&mut *self.tx)
        .await?;

        row.try_into()
    }

    async fn get_fund(&mut self, id: Uuid) -> StoreResult<Option<Fund>> {
        let row = sqlx::query_as::<_, FundRow>(&format!(
            "SELECT {FUND_COLUMNS} FROM funds WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Fund::try_from).transpose()
    }

    async fn lock_fund(&mut self, id: Uuid) -> StoreResult<Option<Fund>> {
        let row = sqlx::query_as::<_, FundRow>(&format!(
            "SELECT {FUND_COLUMNS} FROM funds WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Fund::try_from).transpose()
    }

    async fn set_fund_balance(&mut self, id: Uuid, balance: Decimal, status: FundStatus) -> StoreResult<()> {
        sqlx::query("UPDATE funds SET balance = $2, status = $3 WHERE id = $1")
            .bind(id)
            .bind(balance)
            .bind(status.as_str())
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn insert_fund_usage(&mut self, new: NewFundUsage) -> StoreResult<FundUsage> {
        let row = sqlx::query_as::<_, FundUsageRow>(&format!(
            r#"
            INSERT INTO fund_usages (fund_id, amount, usage_type, used_by, reference_id, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {FUND_USAGE_COLUMNS}
            "#
        ))
        .bind(new.fund_id)
        .bind(new.amount)
        .bind(new.usage_type.as_str())
        .bind(new.used_by)
        .bind(&new.reference_id)
        .bind(&new.notes)
        .fetch_one(&mut *self.tx)
        .await?;

        row.try_into()
    }

    async fn list_fund_usages(&mut self, fund_id: Uuid) -> StoreResult<Vec<FundUsage>> {
        let rows = sqlx::query_as::<_, FundUsageRow>(&format!(
            "SELECT {FUND_USAGE_COLUMNS} FROM fund_usages WHERE fund_id = $1 ORDER BY used_at DESC"
        ))
        .bind(fund_id)
        .fetch_all(&mut *self.tx)
        .await?;

        convert_all(rows)
    }

    async fn funds_owned_by(&mut self, user_id: Uuid) -> StoreResult<Vec<Fund>> {
        let rows = sqlx::query_as::<_, FundRow>(&format!(
            "SELECT {FUND_COLUMNS} FROM funds WHERE to_user_id = $1 ORDER BY created_at"
        ))
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;

        convert_all(rows)
    }

    async fn total_used_by(&mut self, user_id: Uuid) -> StoreResult<Decimal> {
        let total = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(amount), 0) FROM fund_usages WHERE used_by = $1",
        )
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(total)
    }

    // ------------------------------------------------------------------------
    // Manufacturing batches
    // ------------------------------------------------------------------------

    async fn next_batch_sequence(&mut self, day_prefix: &str) -> StoreResult<i64> {
        // Held until commit, so two batches created on the same day queue here
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(day_prefix)
            .execute(&mut *self.tx)
            .await?;

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM manufacturing_batches WHERE batch_number LIKE $1 || '%'",
        )
        .bind(day_prefix)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(existing + 1)
    }

    async fn insert_batch(&mut self, new: NewBatch) -> StoreResult<ManufacturingBatch> {
        let row = sqlx::query_as::<_, BatchRow>(&format!(
            r#"
            INSERT INTO manufacturing_batches (
                batch_number, product_id, quantity_produced, status, start_date,
                expected_completion_date, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {BATCH_COLUMNS}
            "#
        ))
        .bind(&new.batch_number)
        .bind(new.product_id)
        .bind(new.quantity_produced)
        .bind(BatchStatus::Pending.as_str())
        .bind(new.start_date)
        .bind(new.expected_completion_date)
        .bind(&new.notes)
        .bind(new.created_by)
        .fetch_one(&mut *self.tx)
        .await?;

        row.try_into()
    }

    async fn get_batch(&mut self, id: Uuid) -> StoreResult<Option<ManufacturingBatch>> {
        let row = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {BATCH_COLUMNS} FROM manufacturing_batches WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(ManufacturingBatch::try_from).transpose()
    }

    async fn lock_batch(&mut self, id: Uuid) -> StoreResult<Option<ManufacturingBatch>> {
        let row = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {BATCH_COLUMNS} FROM manufacturing_batches WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(ManufacturingBatch::try_from).transpose()
    }

    async fn set_batch_status(
        &mut self,
        id: Uuid,
        status: BatchStatus,
        completion_date: Option<DateTime<Utc>>,
    ) -> StoreResult<ManufacturingBatch> {
        let row = sqlx::query_as::<_, BatchRow>(&format!(
            r#"
            UPDATE manufacturing_batches
            SET status = $2, completion_date = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {BATCH_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(completion_date)
        .fetch_one(&mut *self.tx)
        .await?;

        row.try_into()
    }

    async fn list_batches(&mut self) -> StoreResult<Vec<ManufacturingBatch>> {
        let rows = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {BATCH_COLUMNS} FROM manufacturing_batches ORDER BY created_at DESC"
        ))
        .fetch_all(&mut *self.tx)
        .await?;

        convert_all(rows)
    }

    async fn insert_material_usage(&mut self, batch_id: Uuid, line: &MaterialLine) -> StoreResult<MaterialUsage> {
        let row = sqlx::query_as::<_, MaterialUsageRow>(
            r#"
            INSERT INTO batch_material_usages (batch_id, material_id, quantity_required)
            VALUES ($1, $2, $3)
            RETURNING id, batch_id, material_id, quantity_required, created_at
            "#,
        )
        .bind(batch_id)
        .bind(line.material_id)
        .bind(line.quantity)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn list_material_usages(&mut self, batch_id: Uuid) -> StoreResult<Vec<MaterialUsage>> {
        let rows = sqlx::query_as::<_, MaterialUsageRow>(
            r#"
            SELECT id, batch_id, material_id, quantity_required, created_at
            FROM batch_material_usages
            WHERE batch_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(batch_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(MaterialUsage::from).collect())
    }

    // ------------------------------------------------------------------------
    // Finished-goods inventory
    // ------------------------------------------------------------------------

    async fn lock_inventory(&mut self, key: InventoryKey) -> StoreResult<Option<InventoryRecord>> {
        let row = sqlx::query_as::<_, InventoryRow>(&format!(
            r#"
            SELECT {INVENTORY_COLUMNS}
            FROM inventory
            WHERE product_id = $1 AND batch_id IS NOT DISTINCT FROM $2 AND location = $3
            FOR UPDATE
            "#
        ))
        .bind(key.product_id)
        .bind(key.batch_id)
        .bind(key.location.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(InventoryRecord::try_from).transpose()
    }

    async fn set_inventory_quantity(&mut self, id: Uuid, quantity: i64) -> StoreResult<()> {
        sqlx::query("UPDATE inventory SET quantity = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(quantity)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn add_inventory(&mut self, key: InventoryKey, quantity: i64) -> StoreResult<InventoryRecord> {
        let row = sqlx::query_as::<_, InventoryRow>(&format!(
            r#"
            INSERT INTO inventory (product_id, batch_id, location, quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (product_id, location, (COALESCE(batch_id, '00000000-0000-0000-0000-000000000000'::uuid)))
            DO UPDATE SET quantity = inventory.quantity + EXCLUDED.quantity, updated_at = NOW()
            RETURNING {INVENTORY_COLUMNS}
            "#
        ))
        .bind(key.product_id)
        .bind(key.batch_id)
        .bind(key.location.as_str())
        .bind(quantity)
        .fetch_one(&mut *self.tx)
        .await?;

        row.try_into()
    }

    async fn list_inventory(&mut self, product_id: Option<Uuid>) -> StoreResult<Vec<InventoryRecord>> {
        let rows = sqlx::query_as::<_, InventoryRow>(&format!(
            r#"
            SELECT {INVENTORY_COLUMNS}
            FROM inventory
            WHERE $1::uuid IS NULL OR product_id = $1
            ORDER BY product_id, batch_id NULLS FIRST, location
            "#
        ))
        .bind(product_id)
        .fetch_all(&mut *self.tx)
        .await?;

        convert_all(rows)
    }

    // ------------------------------------------------------------------------
    // Transfers and notifications
    // ------------------------------------------------------------------------

    async fn insert_transfer(&mut self, new: NewTransfer) -> StoreResult<InventoryTransfer> {
        let row = sqlx::query_as::<_, TransferRow>(&format!(
            r#"
            INSERT INTO inventory_transfers (
                product_id, batch_id, quantity, from_location, to_location,
                initiated_by, shopkeeper_id, status, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {TRANSFER_COLUMNS}
            "#
        ))
        .bind(new.product_id)
        .bind(new.batch_id)
        .bind(new.quantity)
        .bind(new.from_location.as_str())
        .bind(new.to_location.as_str())
        .bind(new.initiated_by)
        .bind(new.shopkeeper_id)
        .bind(TransferStatus::Pending.as_str())
        .bind(&new.notes)
        .fetch_one(&mut *self.tx)
        .await?;

        row.try_into()
    }

    async fn lock_transfer(&mut self, id: Uuid) -> StoreResult<Option<InventoryTransfer>> {
        let row = sqlx::query_as::<_, TransferRow>(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM inventory_transfers WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(InventoryTransfer::try_from).transpose()
    }

    async fn set_transfer_status(&mut self, id: Uuid, status: TransferStatus) -> StoreResult<InventoryTransfer> {
        let row = sqlx::query_as::<_, TransferRow>(&format!(
            "UPDATE inventory_transfers SET status = $2 WHERE id = $1 RETURNING {TRANSFER_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_one(&mut *self.tx)
        .await?;

        row.try_into()
    }

    async fn list_transfers(&mut self) -> StoreResult<Vec<InventoryTransfer>> {
        let rows = sqlx::query_as::<_, TransferRow>(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM inventory_transfers ORDER BY transfer_date DESC"
        ))
        .fetch_all(&mut *self.tx)
        .await?;

        convert_all(rows)
    }

    async fn insert_notification(&mut self, new: NewNotification) -> StoreResult<Notification> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            INSERT INTO notifications (user_id, title, message, entity_type, entity_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(new.user_id)
        .bind(&new.title)
        .bind(&new.message)
        .bind(&new.entity_type)
        .bind(new.entity_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn list_notifications(&mut self, user_id: Uuid) -> StoreResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(Notification::from).collect())
    }

    async fn mark_notification_read(&mut self, id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
