//! Seeding helpers shared by the ledger integration tests

#![allow(dead_code)]

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::{BatchStatus, Fund, ManufacturingBatch, MaterialLine, Product, RawMaterial};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use factory_ledger::config::LedgerConfig;
use factory_ledger::services::{
    AllocateFundInput, CreateBatchInput, LedgerService, RegisterMaterialInput, RegisterProductInput,
};
use factory_ledger::store::MemoryStore;

/// Helper to create Decimal from string
pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// A ledger over a fresh in-memory store
pub struct Harness {
    pub store: MemoryStore,
    pub ledger: LedgerService,
    pub actor: Uuid,
}

impl Harness {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let ledger = LedgerService::new(Arc::new(store.clone()), LedgerConfig::default());
        Self {
            store,
            ledger,
            actor: Uuid::new_v4(),
        }
    }

    pub async fn product(&self, sku: &str) -> Product {
        self.ledger
            .catalog()
            .register_product(RegisterProductInput {
                name: format!("Product {}", sku),
                sku: sku.to_string(),
            })
            .await
            .unwrap()
    }

    pub async fn material(&self, name: &str, stock: &str) -> RawMaterial {
        self.ledger
            .materials()
            .register_material(RegisterMaterialInput {
                name: name.to_string(),
                unit: "m".to_string(),
                min_stock_level: dec("10"),
                opening_stock: dec(stock),
            })
            .await
            .unwrap()
    }

    pub async fn fund(&self, owner: Uuid, amount: &str) -> Fund {
        self.ledger
            .funds()
            .allocate(
                Some(self.actor),
                AllocateFundInput {
                    to_user_id: owner,
                    amount: dec(amount),
                    purpose: Some("test allocation".to_string()),
                },
            )
            .await
            .unwrap()
    }

    pub fn batch_input(&self, product_id: Uuid, quantity_produced: i64, materials: Vec<(Uuid, &str)>) -> CreateBatchInput {
        CreateBatchInput {
            product_id,
            quantity_produced,
            materials: materials
                .into_iter()
                .map(|(material_id, quantity)| MaterialLine {
                    material_id,
                    quantity: dec(quantity),
                })
                .collect(),
            start_date: today(),
            expected_completion_date: today() + Duration::days(7),
            notes: None,
        }
    }

    /// Create a batch and walk it through every stage up to `target`
    pub async fn batch_at(&self, product_id: Uuid, quantity_produced: i64, target: BatchStatus) -> ManufacturingBatch {
        let material = self.material(&format!("Fabric {}", Uuid::new_v4()), "1000").await;
        let detail = self
            .ledger
            .batches()
            .create_batch(
                self.actor,
                self.batch_input(product_id, quantity_produced, vec![(material.id, "1")]),
            )
            .await
            .unwrap();

        let mut batch = detail.batch;
        while batch.status != target {
            let next = batch.status.next().unwrap();
            batch = self
                .ledger
                .batches()
                .advance_status(batch.id, next, self.actor)
                .await
                .unwrap();
        }
        batch
    }

    /// Put `quantity` finished units of a fresh batch into manufacturing
    pub async fn stocked_batch(&self, product_id: Uuid, quantity: i64) -> ManufacturingBatch {
        self.batch_at(product_id, quantity, BatchStatus::Completed).await
    }

    pub async fn quantity_at(&self, product_id: Uuid, batch_id: Option<Uuid>, location: shared::Location) -> i64 {
        self.ledger
            .inventory()
            .records_for_product(product_id)
            .await
            .unwrap()
            .into_iter()
            .find(|r| r.batch_id == batch_id && r.location == location)
            .map(|r| r.quantity)
            .unwrap_or(0)
    }
}
