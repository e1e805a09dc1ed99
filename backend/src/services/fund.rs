//! Fund ledger: allocations, usage debits and per-user summaries

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{Fund, FundStatus, FundSummary, FundUsage, UsageType};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::store::{LedgerTx, NewFund, NewFundUsage, SharedStore};

/// Fund ledger service
#[derive(Clone)]
pub struct FundLedger {
    store: SharedStore,
}

/// Input for debiting a fund
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RecordUsageInput {
    pub fund_id: Uuid,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub usage_type: UsageType,
    #[validate(length(max = 100, message = "Reference must be at most 100 characters"))]
    pub reference_id: Option<String>,
    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

/// Input for allocating a new fund
#[derive(Debug, Clone, Deserialize)]
pub struct AllocateFundInput {
    pub to_user_id: Uuid,
    pub amount: Decimal,
    pub purpose: Option<String>,
}

impl FundLedger {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Create an active fund whose balance is the full amount
    pub async fn allocate(&self, allocated_by: Option<Uuid>, input: AllocateFundInput) -> AppResult<Fund> {
        shared::validate_positive_decimal(input.amount).map_err(|e| AppError::validation("amount", e))?;

        let mut tx = self.store.begin().await?;
        let fund = tx
            .insert_fund(NewFund {
                to_user_id: input.to_user_id,
                amount: input.amount,
                purpose: input.purpose,
                allocated_by,
            })
            .await?;
        tx.commit().await?;

        tracing::info!(fund_id = %fund.id, owner = %fund.to_user_id, amount = %fund.amount, "fund allocated");
        Ok(fund)
    }

    /// Debit a fund and append the usage row, as one transaction
    pub async fn record_usage(&self, used_by: Uuid, input: RecordUsageInput) -> AppResult<FundUsage> {
        shared::validate_positive_decimal(input.amount).map_err(|e| AppError::validation("amount", e))?;

        let mut tx = self.store.begin().await?;
        let (usage, fund) = Self::record_usage_in(tx.as_mut(), used_by, input).await?;
        tx.commit().await?;

        tracing::info!(
            fund_id = %fund.id,
            usage_id = %usage.id,
            amount = %usage.amount,
            balance = %fund.balance,
            status = fund.status.as_str(),
            "fund usage recorded"
        );
        Ok(usage)
    }

    /// Debit within a caller's transaction. Returns the usage and the fund as
    /// it stands after the debit.
    pub(crate) async fn record_usage_in(
        tx: &mut dyn LedgerTx,
        used_by: Uuid,
        input: RecordUsageInput,
    ) -> AppResult<(FundUsage, Fund)> {
        let mut fund = tx
            .lock_fund(input.fund_id)
            .await?
            .ok_or(AppError::FundNotFound(input.fund_id))?;

        if fund.status == FundStatus::Returned {
            return Err(AppError::FundInactive(fund.id));
        }

        let (balance, status) = fund
            .debit(input.amount)
            .ok_or(AppError::InsufficientBalance {
                fund_id: fund.id,
                requested: input.amount,
                available: fund.balance,
            })?;

        tx.set_fund_balance(fund.id, balance, status).await?;
        let usage = tx
            .insert_fund_usage(NewFundUsage {
                fund_id: fund.id,
                amount: input.amount,
                usage_type: input.usage_type,
                used_by,
                reference_id: input.reference_id,
                notes: input.notes,
            })
            .await?;

        fund.balance = balance;
        fund.status = status;
        Ok((usage, fund))
    }

    /// Hand a fund back. Its residual balance is kept on record but can no
    /// longer be spent.
    pub async fn return_fund(&self, fund_id: Uuid, actor: Uuid) -> AppResult<Fund> {
        let mut tx = self.store.begin().await?;
        let mut fund = tx
            .lock_fund(fund_id)
            .await?
            .ok_or(AppError::FundNotFound(fund_id))?;

        if fund.status == FundStatus::Returned {
            return Err(AppError::FundInactive(fund.id));
        }

        tx.set_fund_balance(fund.id, fund.balance, FundStatus::Returned).await?;
        tx.commit().await?;

        fund.status = FundStatus::Returned;
        tracing::info!(fund_id = %fund.id, actor = %actor, balance = %fund.balance, "fund returned");
        Ok(fund)
    }

    /// Dashboard figures for one user
    pub async fn summarize(&self, user_id: Uuid) -> AppResult<FundSummary> {
        let mut tx = self.store.begin().await?;
        let funds = tx.funds_owned_by(user_id).await?;
        let total_used = tx.total_used_by(user_id).await?;

        FundSummary::from_funds(user_id, &funds, total_used)
            .ok_or_else(|| AppError::Internal("fund totals overflow".to_string()))
    }

    pub async fn get_fund(&self, fund_id: Uuid) -> AppResult<Fund> {
        let mut tx = self.store.begin().await?;
        tx.get_fund(fund_id)
            .await?
            .ok_or(AppError::FundNotFound(fund_id))
    }

    /// Usages of one fund, newest first
    pub async fn list_usages(&self, fund_id: Uuid) -> AppResult<Vec<FundUsage>> {
        let mut tx = self.store.begin().await?;
        if tx.get_fund(fund_id).await?.is_none() {
            return Err(AppError::FundNotFound(fund_id));
        }
        Ok(tx.list_fund_usages(fund_id).await?)
    }
}
