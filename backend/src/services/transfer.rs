//! Inventory transfers between locations, and the notifications they raise

use serde::Deserialize;
use shared::{InventoryKey, InventoryTransfer, Location, Notification, TransferStatus};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::inventory::InventoryLedger;
use crate::store::{LedgerTx, NewNotification, NewTransfer, SharedStore};

/// Transfer coordinator service
#[derive(Clone)]
pub struct TransferCoordinator {
    store: SharedStore,
}

/// Input for moving inventory between locations
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct InitiateTransferInput {
    pub product_id: Uuid,
    pub batch_id: Option<Uuid>,
    #[validate(range(min = 1, message = "Quantity must be greater than zero"))]
    pub quantity: i64,
    pub from_location: String,
    pub to_location: String,
    pub shopkeeper_id: Option<Uuid>,
    pub notes: Option<String>,
}

fn parse_location(value: &str) -> AppResult<Location> {
    value
        .parse::<Location>()
        .map_err(|_| AppError::InvalidLocation(value.to_string()))
}

impl TransferCoordinator {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Move `quantity` units from one location to another and record a
    /// pending transfer. The shopkeeper, if any, is notified in the same
    /// transaction.
    pub async fn initiate(&self, initiated_by: Uuid, input: InitiateTransferInput) -> AppResult<InventoryTransfer> {
        shared::validate_unit_quantity(input.quantity).map_err(|e| AppError::validation("quantity", e))?;
        let from = parse_location(&input.from_location)?;
        let to = parse_location(&input.to_location)?;
        shared::validate_transfer_route(from, to).map_err(|_| AppError::SameLocation(from))?;

        let source = InventoryKey::new(input.product_id, input.batch_id, from);

        let mut tx = self.store.begin().await?;
        Self::move_in(tx.as_mut(), source, to, input.quantity).await?;

        let transfer = tx
            .insert_transfer(NewTransfer {
                product_id: input.product_id,
                batch_id: input.batch_id,
                quantity: input.quantity,
                from_location: from,
                to_location: to,
                initiated_by,
                shopkeeper_id: input.shopkeeper_id,
                notes: input.notes,
            })
            .await?;

        if let Some(shopkeeper_id) = transfer.shopkeeper_id {
            tx.insert_notification(NewNotification {
                user_id: shopkeeper_id,
                title: "Incoming inventory transfer".to_string(),
                message: format!(
                    "{} units are on their way from {} to {}",
                    transfer.quantity, transfer.from_location, transfer.to_location
                ),
                entity_type: Some("inventory_transfer".to_string()),
                entity_id: Some(transfer.id),
            })
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            transfer_id = %transfer.id,
            product_id = %transfer.product_id,
            quantity = transfer.quantity,
            from = %from,
            to = %to,
            "transfer initiated"
        );
        Ok(transfer)
    }

    /// Mark a pending transfer as received. Quantities already moved at
    /// initiation.
    pub async fn confirm(&self, transfer_id: Uuid, actor: Uuid) -> AppResult<InventoryTransfer> {
        let mut tx = self.store.begin().await?;
        let transfer = Self::lock_pending(tx.as_mut(), transfer_id, TransferStatus::Confirmed).await?;
        let transfer = tx.set_transfer_status(transfer.id, TransferStatus::Confirmed).await?;
        tx.commit().await?;

        tracing::info!(transfer_id = %transfer.id, actor = %actor, "transfer confirmed");
        Ok(transfer)
    }

    /// Cancel a pending transfer and move its quantity back to the source
    pub async fn cancel(&self, transfer_id: Uuid, actor: Uuid) -> AppResult<InventoryTransfer> {
        let mut tx = self.store.begin().await?;
        let transfer = Self::lock_pending(tx.as_mut(), transfer_id, TransferStatus::Cancelled).await?;

        let destination = InventoryKey::new(transfer.product_id, transfer.batch_id, transfer.to_location);
        Self::move_in(tx.as_mut(), destination, transfer.from_location, transfer.quantity).await?;

        let transfer = tx.set_transfer_status(transfer.id, TransferStatus::Cancelled).await?;
        tx.commit().await?;

        tracing::info!(
            transfer_id = %transfer.id,
            actor = %actor,
            quantity = transfer.quantity,
            "transfer cancelled and reversed"
        );
        Ok(transfer)
    }

    /// Transfers, newest first
    pub async fn list_transfers(&self) -> AppResult<Vec<InventoryTransfer>> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_transfers().await?)
    }

    /// Notifications addressed to a user, newest first
    pub async fn notifications_for(&self, user_id: Uuid) -> AppResult<Vec<Notification>> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_notifications(user_id).await?)
    }

    pub async fn mark_notification_read(&self, notification_id: Uuid, user_id: Uuid) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        if !tx.mark_notification_read(notification_id, user_id).await? {
            return Err(AppError::NotFound(format!("Notification {}", notification_id)));
        }
        tx.commit().await?;
        Ok(())
    }

    /// Debit `source` and credit the same product and batch at `to`
    async fn move_in(tx: &mut dyn LedgerTx, source: InventoryKey, to: Location, quantity: i64) -> AppResult<()> {
        InventoryLedger::debit_in(tx, source, quantity).await?;
        InventoryLedger::credit_in(tx, source.at(to), quantity).await?;
        Ok(())
    }

    async fn lock_pending(
        tx: &mut dyn LedgerTx,
        transfer_id: Uuid,
        target: TransferStatus,
    ) -> AppResult<InventoryTransfer> {
        let transfer = tx
            .lock_transfer(transfer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transfer {}", transfer_id)))?;

        if transfer.status != TransferStatus::Pending {
            return Err(AppError::InvalidTransition {
                from: transfer.status.as_str().to_string(),
                to: target.as_str().to_string(),
            });
        }
        Ok(transfer)
    }
}
