//! Manufacturing batch lifecycle
//!
//! Creating a batch debits its raw materials immediately. Advancing a batch
//! moves it exactly one stage forward; reaching `completed` puts its
//! produced units into manufacturing inventory in the same transaction.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use shared::{
    BatchDetail, BatchPipeline, BatchStatus, InventoryKey, Location, ManufacturingBatch, MaterialLine,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::inventory::InventoryLedger;
use crate::services::material::MaterialStockStore;
use crate::store::{NewBatch, SharedStore};

/// Batch lifecycle service
#[derive(Clone)]
pub struct BatchLifecycle {
    store: SharedStore,
    batch_number_prefix: String,
}

/// Input for creating a batch
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBatchInput {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity produced must be greater than zero"))]
    pub quantity_produced: i64,
    #[validate(length(min = 1, message = "At least one material is required"))]
    pub materials: Vec<MaterialLine>,
    pub start_date: NaiveDate,
    pub expected_completion_date: NaiveDate,
    pub notes: Option<String>,
}

impl BatchLifecycle {
    pub fn new(store: SharedStore, batch_number_prefix: impl Into<String>) -> Self {
        Self {
            store,
            batch_number_prefix: batch_number_prefix.into(),
        }
    }

    pub async fn create_batch(&self, created_by: Uuid, input: CreateBatchInput) -> AppResult<BatchDetail> {
        shared::validate_unit_quantity(input.quantity_produced)
            .map_err(|e| AppError::validation("quantity_produced", e))?;
        shared::validate_date_order(input.start_date, input.expected_completion_date)
            .map_err(|e| AppError::validation("expected_completion_date", e))?;
        shared::validate_material_lines(&input.materials).map_err(|e| AppError::validation("materials", e))?;

        let mut tx = self.store.begin().await?;

        if tx.get_product(input.product_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Product {}", input.product_id)));
        }

        // Lock materials in id order so concurrent creations cannot deadlock
        let mut lines = input.materials;
        lines.sort_by_key(|line| line.material_id);
        for line in &lines {
            MaterialStockStore::consume_in(tx.as_mut(), line.material_id, line.quantity).await?;
        }

        let today = Utc::now().date_naive();
        let day_prefix = format!("{}-{}-", self.batch_number_prefix, today.format("%Y%m%d"));
        let sequence = tx.next_batch_sequence(&day_prefix).await?;
        let batch_number = shared::generate_batch_number(&self.batch_number_prefix, today, sequence);

        let batch = tx
            .insert_batch(NewBatch {
                batch_number,
                product_id: input.product_id,
                quantity_produced: input.quantity_produced,
                start_date: input.start_date,
                expected_completion_date: input.expected_completion_date,
                notes: input.notes,
                created_by,
            })
            .await?;

        let mut materials = Vec::with_capacity(lines.len());
        for line in &lines {
            materials.push(tx.insert_material_usage(batch.id, line).await?);
        }

        tx.commit().await?;

        tracing::info!(
            batch_id = %batch.id,
            batch_number = %batch.batch_number,
            product_id = %batch.product_id,
            materials = materials.len(),
            "batch created"
        );
        Ok(BatchDetail { batch, materials })
    }

    /// Move a batch to the immediate successor of its current status
    pub async fn advance_status(
        &self,
        batch_id: Uuid,
        new_status: BatchStatus,
        actor: Uuid,
    ) -> AppResult<ManufacturingBatch> {
        let mut tx = self.store.begin().await?;

        let batch = tx
            .lock_batch(batch_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Batch {}", batch_id)))?;

        if !batch.status.can_advance_to(new_status) {
            return Err(AppError::InvalidTransition {
                from: batch.status.to_string(),
                to: new_status.to_string(),
            });
        }

        let completion_date = new_status.is_terminal().then(Utc::now);
        let batch = tx.set_batch_status(batch.id, new_status, completion_date).await?;

        if new_status.is_terminal() {
            let key = InventoryKey::new(batch.product_id, Some(batch.id), Location::Manufacturing);
            let record = InventoryLedger::credit_in(tx.as_mut(), key, batch.quantity_produced).await?;
            tracing::debug!(
                batch_id = %batch.id,
                inventory_id = %record.id,
                quantity = record.quantity,
                "finished goods entered manufacturing inventory"
            );
        }

        tx.commit().await?;

        tracing::info!(
            batch_id = %batch.id,
            status = %batch.status,
            actor = %actor,
            "batch status advanced"
        );
        Ok(batch)
    }

    /// A batch with its material usages
    pub async fn get_batch(&self, batch_id: Uuid) -> AppResult<BatchDetail> {
        let mut tx = self.store.begin().await?;
        let batch = tx
            .get_batch(batch_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Batch {}", batch_id)))?;
        let materials = tx.list_material_usages(batch_id).await?;

        Ok(BatchDetail { batch, materials })
    }

    pub async fn list_batches(&self) -> AppResult<Vec<ManufacturingBatch>> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_batches().await?)
    }

    /// Status counts and urgency of every in-flight batch as of `now`
    pub async fn pipeline(&self, now: DateTime<Utc>) -> AppResult<BatchPipeline> {
        let batches = self.list_batches().await?;
        Ok(BatchPipeline::build(&batches, now))
    }
}
