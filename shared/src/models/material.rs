//! Raw material and purchase models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A raw material with its on-hand stock
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawMaterial {
    pub id: Uuid,
    pub name: String,
    /// Unit of measure (e.g., "m", "kg", "pcs")
    pub unit: String,
    pub stock_quantity: Decimal,
    pub min_stock_level: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RawMaterial {
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.min_stock_level
    }
}

/// A recorded purchase of raw material paid from a fund. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Purchase {
    pub id: Uuid,
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
    pub created_at: DateTime<Utc>,
}

/// Total cost of a purchase line, `None` if it does not fit in a `Decimal`
pub fn purchase_total(quantity: Decimal, unit_price: Decimal) -> Option<Decimal> {
    quantity.checked_mul(unit_price)
}
