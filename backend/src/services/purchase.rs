//! Purchase recording: stock increment plus fund debit in one transaction

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{Purchase, UsageType};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::fund::{FundLedger, RecordUsageInput};
use crate::services::material::MaterialStockStore;
use crate::store::{NewPurchase, SharedStore};

/// Purchase recorder service
#[derive(Clone)]
pub struct PurchaseRecorder {
    store: SharedStore,
}

/// Input for recording a raw material purchase
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RecordPurchaseInput {
    pub material_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    #[validate(length(min = 1, max = 200, message = "Vendor name is required"))]
    pub vendor_name: String,
    #[validate(length(max = 100, message = "Vendor contact must be at most 100 characters"))]
    pub vendor_contact: Option<String>,
    #[validate(length(max = 50, message = "Invoice number must be at most 50 characters"))]
    pub invoice_number: Option<String>,
    pub purchase_date: NaiveDate,
    pub fund_id: Uuid,
    pub notes: Option<String>,
}

impl PurchaseRecorder {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Record a purchase, restock the material and debit the paying fund.
    /// Either all three writes persist or none do.
    pub async fn record_purchase(&self, purchased_by: Uuid, input: RecordPurchaseInput) -> AppResult<Purchase> {
        shared::validate_positive_decimal(input.quantity).map_err(|e| AppError::validation("quantity", e))?;
        shared::validate_positive_decimal(input.unit_price)
            .map_err(|e| AppError::validation("unit_price", e))?;
        let vendor_name = input.vendor_name.trim().to_string();
        if vendor_name.is_empty() {
            return Err(AppError::validation("vendor_name", "Vendor name is required"));
        }

        let total_amount = shared::purchase_total(input.quantity, input.unit_price)
            .ok_or_else(|| AppError::validation("quantity", "Quantity times unit price is too large"))?;

        let mut tx = self.store.begin().await?;

        let fund = tx
            .lock_fund(input.fund_id)
            .await?
            .ok_or(AppError::FundNotFound(input.fund_id))?;
        if !fund.is_active() || fund.balance < total_amount {
            return Err(AppError::InsufficientFunds {
                fund_id: fund.id,
                requested: total_amount,
                available: if fund.is_active() { fund.balance } else { Decimal::ZERO },
            });
        }

        let material = MaterialStockStore::restock_in(tx.as_mut(), input.material_id, input.quantity).await?;

        let purchase = tx
            .insert_purchase(NewPurchase {
                material_id: material.id,
                quantity: input.quantity,
                unit_price: input.unit_price,
                total_amount,
                fund_id: fund.id,
                vendor_name,
                vendor_contact: input.vendor_contact,
                invoice_number: input.invoice_number,
                purchase_date: input.purchase_date,
                notes: input.notes,
                purchased_by,
            })
            .await?;

        let usage = RecordUsageInput {
            fund_id: fund.id,
            amount: total_amount,
            usage_type: UsageType::Purchase,
            reference_id: Some(purchase.id.to_string()),
            notes: Some(format!("Purchase of {} {}", purchase.quantity, material.unit)),
        };
        let (usage, fund) = FundLedger::record_usage_in(tx.as_mut(), purchased_by, usage)
            .await
            .map_err(|e| match e {
                AppError::InsufficientBalance {
                    fund_id,
                    requested,
                    available,
                } => AppError::InsufficientFunds {
                    fund_id,
                    requested,
                    available,
                },
                AppError::FundInactive(fund_id) => AppError::InsufficientFunds {
                    fund_id,
                    requested: total_amount,
                    available: Decimal::ZERO,
                },
                other => other,
            })?;

        tx.commit().await?;

        tracing::info!(
            purchase_id = %purchase.id,
            material_id = %material.id,
            fund_id = %fund.id,
            usage_id = %usage.id,
            total_amount = %total_amount,
            stock_quantity = %material.stock_quantity,
            "purchase recorded"
        );
        Ok(purchase)
    }

    /// Purchases, newest first, optionally for one material
    pub async fn list_purchases(&self, material_id: Option<Uuid>) -> AppResult<Vec<Purchase>> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_purchases(material_id).await?)
    }
}
