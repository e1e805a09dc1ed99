//! Validation utilities for ledger inputs
//!
//! These checks run before any store transaction is opened.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashSet;

use crate::models::MaterialLine;
use crate::types::Location;

// ============================================================================
// Quantities and Money
// ============================================================================

/// Validate a money amount or material quantity is strictly positive
pub fn validate_positive_decimal(value: Decimal) -> Result<(), &'static str> {
    if value <= Decimal::ZERO {
        return Err("Value must be greater than zero");
    }
    Ok(())
}

/// Largest finished-goods unit count a single batch or transfer may carry
pub const MAX_UNITS: i64 = 1_000_000_000;

/// Validate a finished-goods unit count is strictly positive and at most
/// [`MAX_UNITS`]
pub fn validate_unit_quantity(units: i64) -> Result<(), &'static str> {
    if units <= 0 {
        return Err("Quantity must be greater than zero");
    }
    if units > MAX_UNITS {
        return Err("Quantity cannot exceed 1000000000 units");
    }
    Ok(())
}

/// Validate a stock level is not negative
pub fn validate_stock_level(value: Decimal) -> Result<(), &'static str> {
    if value < Decimal::ZERO {
        return Err("Stock level cannot be negative");
    }
    Ok(())
}

// ============================================================================
// Batches
// ============================================================================

/// Validate the expected completion date is not before the start date
pub fn validate_date_order(start: NaiveDate, expected_completion: NaiveDate) -> Result<(), &'static str> {
    if expected_completion < start {
        return Err("Expected completion date cannot be before the start date");
    }
    Ok(())
}

/// Validate a bill of materials: non-empty, positive quantities, each
/// material listed once
pub fn validate_material_lines(lines: &[MaterialLine]) -> Result<(), &'static str> {
    if lines.is_empty() {
        return Err("At least one material is required");
    }

    let mut seen = HashSet::new();
    for line in lines {
        if line.quantity <= Decimal::ZERO {
            return Err("Material quantity must be greater than zero");
        }
        if !seen.insert(line.material_id) {
            return Err("Each material may only be listed once");
        }
    }
    Ok(())
}

/// Validate batch number prefix (2-12 uppercase alphanumeric)
pub fn validate_batch_prefix(prefix: &str) -> Result<(), &'static str> {
    if prefix.len() < 2 {
        return Err("Batch prefix must be at least 2 characters");
    }
    if prefix.len() > 12 {
        return Err("Batch prefix must be at most 12 characters");
    }
    if !prefix.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        return Err("Batch prefix must be uppercase alphanumeric only");
    }
    Ok(())
}

// ============================================================================
// Transfers
// ============================================================================

/// Validate a transfer moves between two different locations
pub fn validate_transfer_route(from: Location, to: Location) -> Result<(), &'static str> {
    if from == to {
        return Err("Source and destination locations must differ");
    }
    Ok(())
}
