//! Finished-goods inventory, transfer and notification models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

use crate::types::{Location, UnknownVariant};

/// Quantity of a product (optionally tied to a batch) at one location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryRecord {
    pub id: Uuid,
    pub product_id: Uuid,
    pub batch_id: Option<Uuid>,
    pub location: Location,
    pub quantity: i64,
    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    pub fn key(&self) -> InventoryKey {
        InventoryKey {
            product_id: self.product_id,
            batch_id: self.batch_id,
            location: self.location,
        }
    }
}

/// Identity of an inventory record. `batch_id: None` is its own key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InventoryKey {
    pub product_id: Uuid,
    pub batch_id: Option<Uuid>,
    pub location: Location,
}

impl InventoryKey {
    pub fn new(product_id: Uuid, batch_id: Option<Uuid>, location: Location) -> Self {
        Self {
            product_id,
            batch_id,
            location,
        }
    }

    /// Same product and batch at another location
    pub fn at(&self, location: Location) -> Self {
        Self { location, ..*self }
    }
}

/// Status of an inventory transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Confirmed => "confirmed",
            TransferStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for TransferStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransferStatus::Pending),
            "confirmed" => Ok(TransferStatus::Confirmed),
            "cancelled" => Ok(TransferStatus::Cancelled),
            _ => Err(UnknownVariant::new("transfer status", s)),
        }
    }
}

/// A movement of inventory between two locations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryTransfer {
    pub id: Uuid,
    pub product_id: Uuid,
    pub batch_id: Option<Uuid>,
    pub quantity: i64,
    pub from_location: Location,
    pub to_location: Location,
    pub initiated_by: Uuid,
    pub shopkeeper_id: Option<Uuid>,
    pub status: TransferStatus,
    pub notes: Option<String>,
    pub transfer_date: DateTime<Utc>,
}

/// In-app notification for a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Total quantity held at a location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocationTotal {
    pub location: Location,
    pub quantity: i64,
}

/// Quantities of one (product, batch) across all locations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockPosition {
    pub product_id: Uuid,
    pub batch_id: Option<Uuid>,
    pub manufacturing: i64,
    pub transit: i64,
    pub wholesale: i64,
    pub total: i64,
}

/// Inventory dashboard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventorySummary {
    pub by_location: Vec<LocationTotal>,
    pub positions: Vec<StockPosition>,
    pub total_quantity: i64,
}

/// Sum unit counts, `None` on overflow
fn checked_units<'a>(mut quantities: impl Iterator<Item = &'a i64>) -> Option<i64> {
    quantities.try_fold(0i64, |acc, q| acc.checked_add(*q))
}

impl InventorySummary {
    /// Returns `None` if any total overflows `i64`
    pub fn from_records(records: &[InventoryRecord]) -> Option<Self> {
        let by_location = Location::ALL
            .iter()
            .map(|location| {
                let quantity = checked_units(
                    records
                        .iter()
                        .filter(|r| r.location == *location)
                        .map(|r| &r.quantity),
                )?;
                Some(LocationTotal {
                    location: *location,
                    quantity,
                })
            })
            .collect::<Option<Vec<_>>>()?;

        let mut grouped: BTreeMap<(Uuid, Option<Uuid>), StockPosition> = BTreeMap::new();
        for record in records {
            let position = grouped
                .entry((record.product_id, record.batch_id))
                .or_insert_with(|| StockPosition {
                    product_id: record.product_id,
                    batch_id: record.batch_id,
                    manufacturing: 0,
                    transit: 0,
                    wholesale: 0,
                    total: 0,
                });
            let slot = match record.location {
                Location::Manufacturing => &mut position.manufacturing,
                Location::Transit => &mut position.transit,
                Location::Wholesale => &mut position.wholesale,
            };
            *slot = slot.checked_add(record.quantity)?;
            position.total = position.total.checked_add(record.quantity)?;
        }

        Some(Self {
            by_location,
            total_quantity: checked_units(records.iter().map(|r| &r.quantity))?,
            positions: grouped.into_values().collect(),
        })
    }

    /// Cross-location total for one (product, batch)
    pub fn total_for(&self, product_id: Uuid, batch_id: Option<Uuid>) -> i64 {
        self.positions
            .iter()
            .find(|p| p.product_id == product_id && p.batch_id == batch_id)
            .map(|p| p.total)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(product_id: Uuid, batch_id: Option<Uuid>, location: Location, quantity: i64) -> InventoryRecord {
        InventoryRecord {
            id: Uuid::new_v4(),
            product_id,
            batch_id,
            location,
            quantity,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_key_at_keeps_product_and_batch() {
        let key = InventoryKey::new(Uuid::new_v4(), Some(Uuid::new_v4()), Location::Manufacturing);
        let moved = key.at(Location::Transit);
        assert_eq!(moved.product_id, key.product_id);
        assert_eq!(moved.batch_id, key.batch_id);
        assert_eq!(moved.location, Location::Transit);
    }

    #[test]
    fn test_summary_groups_by_product_and_batch() {
        let product = Uuid::new_v4();
        let batch = Uuid::new_v4();
        let records = vec![
            record(product, Some(batch), Location::Manufacturing, 60),
            record(product, Some(batch), Location::Transit, 40),
            record(product, None, Location::Wholesale, 5),
        ];

        let summary = InventorySummary::from_records(&records).unwrap();

        assert_eq!(summary.total_quantity, 105);
        assert_eq!(summary.positions.len(), 2);
        assert_eq!(summary.total_for(product, Some(batch)), 100);
        assert_eq!(summary.total_for(product, None), 5);
        let transit = summary
            .by_location
            .iter()
            .find(|t| t.location == Location::Transit)
            .unwrap();
        assert_eq!(transit.quantity, 40);
    }

    #[test]
    fn test_summary_overflow_is_none() {
        let product = Uuid::new_v4();
        let half = i64::MAX / 2 + 1;
        let records = vec![
            record(product, Some(Uuid::new_v4()), Location::Manufacturing, half),
            record(product, Some(Uuid::new_v4()), Location::Manufacturing, half),
        ];

        assert!(InventorySummary::from_records(&records).is_none());
        assert!(InventorySummary::from_records(&records[..1]).is_some());
    }
}
