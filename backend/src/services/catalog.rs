//! Product catalog

use serde::Deserialize;
use shared::Product;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::store::{NewProduct, SharedStore};

#[derive(Clone)]
pub struct Catalog {
    store: SharedStore,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterProductInput {
    #[validate(length(min = 1, max = 200, message = "Product name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 50, message = "SKU is required"))]
    pub sku: String,
}

impl Catalog {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn register_product(&self, input: RegisterProductInput) -> AppResult<Product> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("name", "Product name is required"));
        }
        let sku = input.sku.trim().to_ascii_uppercase();
        if sku.is_empty() {
            return Err(AppError::validation("sku", "SKU is required"));
        }

        let mut tx = self.store.begin().await?;
        let product = tx
            .insert_product(NewProduct {
                name: name.to_string(),
                sku,
            })
            .await?;
        tx.commit().await?;

        tracing::info!(product_id = %product.id, sku = %product.sku, "product registered");
        Ok(product)
    }

    pub async fn get_product(&self, product_id: Uuid) -> AppResult<Product> {
        let mut tx = self.store.begin().await?;
        tx.get_product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {}", product_id)))
    }

    pub async fn list_products(&self) -> AppResult<Vec<Product>> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_products().await?)
    }
}
