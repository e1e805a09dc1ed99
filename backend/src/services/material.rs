//! Raw material stock

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::RawMaterial;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::store::{LedgerTx, NewMaterial, SharedStore};

/// Raw material stock service
#[derive(Clone)]
pub struct MaterialStockStore {
    store: SharedStore,
}

/// Input for registering a raw material
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterMaterialInput {
    #[validate(length(min = 1, max = 200, message = "Material name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 20, message = "Unit is required"))]
    pub unit: String,
    #[serde(default)]
    pub min_stock_level: Decimal,
    #[serde(default)]
    pub opening_stock: Decimal,
}

impl MaterialStockStore {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn register_material(&self, input: RegisterMaterialInput) -> AppResult<RawMaterial> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("name", "Material name is required"));
        }
        let unit = input.unit.trim();
        if unit.is_empty() {
            return Err(AppError::validation("unit", "Unit is required"));
        }
        shared::validate_stock_level(input.min_stock_level)
            .map_err(|e| AppError::validation("min_stock_level", e))?;
        shared::validate_stock_level(input.opening_stock)
            .map_err(|e| AppError::validation("opening_stock", e))?;

        let mut tx = self.store.begin().await?;
        let material = tx
            .insert_material(NewMaterial {
                name: name.to_string(),
                unit: unit.to_string(),
                stock_quantity: input.opening_stock,
                min_stock_level: input.min_stock_level,
            })
            .await?;
        tx.commit().await?;

        tracing::info!(material_id = %material.id, name = %material.name, "material registered");
        Ok(material)
    }

    pub async fn get_material(&self, material_id: Uuid) -> AppResult<RawMaterial> {
        let mut tx = self.store.begin().await?;
        tx.get_material(material_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Material {}", material_id)))
    }

    pub async fn list_materials(&self) -> AppResult<Vec<RawMaterial>> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_materials().await?)
    }

    /// Materials at or below their minimum stock level
    pub async fn low_stock(&self) -> AppResult<Vec<RawMaterial>> {
        Ok(self
            .list_materials()
            .await?
            .into_iter()
            .filter(RawMaterial::is_low_stock)
            .collect())
    }

    /// Decrement stock under a row lock, refusing to go below zero
    pub(crate) async fn consume_in(
        tx: &mut dyn LedgerTx,
        material_id: Uuid,
        quantity: Decimal,
    ) -> AppResult<RawMaterial> {
        let mut material = tx
            .lock_material(material_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Material {}", material_id)))?;

        if quantity > material.stock_quantity {
            return Err(AppError::InsufficientStock {
                material_id,
                requested: quantity,
                available: material.stock_quantity,
            });
        }

        material.stock_quantity -= quantity;
        tx.set_material_stock(material_id, material.stock_quantity).await?;
        Ok(material)
    }

    /// Increment stock under a row lock
    pub(crate) async fn restock_in(
        tx: &mut dyn LedgerTx,
        material_id: Uuid,
        quantity: Decimal,
    ) -> AppResult<RawMaterial> {
        let mut material = tx
            .lock_material(material_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Material {}", material_id)))?;

        material.stock_quantity = material
            .stock_quantity
            .checked_add(quantity)
            .ok_or_else(|| AppError::validation("quantity", "Restock would exceed the largest stock level"))?;
        tx.set_material_stock(material_id, material.stock_quantity).await?;
        Ok(material)
    }
}
