//! Ledger services
//!
//! Each service opens one store transaction per use case. Services that
//! compose (a purchase debits a fund) pass the open transaction down rather
//! than committing independently.

pub mod batch;
pub mod catalog;
pub mod fund;
pub mod inventory;
pub mod material;
pub mod purchase;
pub mod transfer;

pub use batch::{BatchLifecycle, CreateBatchInput};
pub use catalog::{Catalog, RegisterProductInput};
pub use fund::{AllocateFundInput, FundLedger, RecordUsageInput};
pub use inventory::InventoryLedger;
pub use material::{MaterialStockStore, RegisterMaterialInput};
pub use purchase::{PurchaseRecorder, RecordPurchaseInput};
pub use transfer::{InitiateTransferInput, TransferCoordinator};

use crate::config::LedgerConfig;
use crate::error::AppResult;
use crate::store::SharedStore;

/// Entry point to every ledger component, built once at startup
#[derive(Clone)]
pub struct LedgerService {
    store: SharedStore,
    config: LedgerConfig,
}

impl LedgerService {
    pub fn new(store: SharedStore, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn funds(&self) -> FundLedger {
        FundLedger::new(self.store.clone())
    }

    pub fn materials(&self) -> MaterialStockStore {
        MaterialStockStore::new(self.store.clone())
    }

    pub fn purchases(&self) -> PurchaseRecorder {
        PurchaseRecorder::new(self.store.clone())
    }

    pub fn inventory(&self) -> InventoryLedger {
        InventoryLedger::new(self.store.clone())
    }

    pub fn transfers(&self) -> TransferCoordinator {
        TransferCoordinator::new(self.store.clone())
    }

    pub fn batches(&self) -> BatchLifecycle {
        BatchLifecycle::new(self.store.clone(), self.config.batch_number_prefix.clone())
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::new(self.store.clone())
    }

    /// Check the underlying store is reachable
    pub async fn ping(&self) -> AppResult<()> {
        Ok(self.store.ping().await?)
    }
}
