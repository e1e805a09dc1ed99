//! Fund allocation and usage models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::types::UnknownVariant;

/// A money allocation to a user, spent down by usages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fund {
    pub id: Uuid,
    /// Owner of the allocation
    pub to_user_id: Uuid,
    /// Original allocation
    pub amount: Decimal,
    /// Remaining balance, always within `0..=amount`
    pub balance: Decimal,
    pub status: FundStatus,
    pub purpose: Option<String>,
    pub allocated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Fund {
    /// Balance and status after debiting `amount`, or `None` if the debit
    /// would take the balance below zero.
    pub fn debit(&self, amount: Decimal) -> Option<(Decimal, FundStatus)> {
        if amount > self.balance {
            return None;
        }
        let balance = self.balance - amount;
        let status = if balance.is_zero() {
            FundStatus::Depleted
        } else {
            self.status
        };
        Some((balance, status))
    }

    pub fn is_active(&self) -> bool {
        self.status == FundStatus::Active
    }
}

/// Lifecycle status of a fund
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundStatus {
    Active,
    Depleted,
    Returned,
}

impl FundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FundStatus::Active => "active",
            FundStatus::Depleted => "depleted",
            FundStatus::Returned => "returned",
        }
    }
}

impl FromStr for FundStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(FundStatus::Active),
            "depleted" => Ok(FundStatus::Depleted),
            "returned" => Ok(FundStatus::Returned),
            _ => Err(UnknownVariant::new("fund status", s)),
        }
    }
}

/// Business classification of a fund usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageType {
    Purchase,
    Expense,
    Other,
}

impl UsageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageType::Purchase => "purchase",
            UsageType::Expense => "expense",
            UsageType::Other => "other",
        }
    }
}

impl FromStr for UsageType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchase" => Ok(UsageType::Purchase),
            "expense" => Ok(UsageType::Expense),
            "other" => Ok(UsageType::Other),
            _ => Err(UnknownVariant::new("usage type", s)),
        }
    }
}

/// One debit against a fund. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FundUsage {
    pub id: Uuid,
    pub fund_id: Uuid,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub usage_type: UsageType,
    pub used_by: Uuid,
    pub reference_id: Option<String>,
    pub notes: Option<String>,
    pub used_at: DateTime<Utc>,
}

/// Per-user fund dashboard figures
///
/// Allocation figures are scoped to funds the user owns, while `total_used`
/// is scoped to usages the user recorded, across any fund. `overdraft` is
/// the positive part of `total_used - total_allocated`; it is a reporting
/// figure and never implies a negative fund balance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FundSummary {
    pub user_id: Uuid,
    pub total_funds: i64,
    pub active_funds: i64,
    pub depleted_funds: i64,
    pub returned_funds: i64,
    pub total_allocated: Decimal,
    pub total_balance: Decimal,
    pub total_used: Decimal,
    pub overdraft: Decimal,
}

impl FundSummary {
    /// Returns `None` if the allocated or remaining totals overflow
    pub fn from_funds(user_id: Uuid, funds: &[Fund], total_used: Decimal) -> Option<Self> {
        let count = |status: FundStatus| funds.iter().filter(|f| f.status == status).count() as i64;
        let total_allocated = funds
            .iter()
            .try_fold(Decimal::ZERO, |acc, f| acc.checked_add(f.amount))?;
        let total_balance = funds
            .iter()
            .try_fold(Decimal::ZERO, |acc, f| acc.checked_add(f.balance))?;

        Some(Self {
            user_id,
            total_funds: funds.len() as i64,
            active_funds: count(FundStatus::Active),
            depleted_funds: count(FundStatus::Depleted),
            returned_funds: count(FundStatus::Returned),
            total_allocated,
            total_balance,
            total_used,
            overdraft: (total_used - total_allocated).max(Decimal::ZERO),
        })
    }
}
