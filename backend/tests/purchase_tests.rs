//! Purchase recording and material stock tests
//!
//! A purchase restocks its material and debits its fund together, or not
//! at all.

mod common;

use common::{dec, today, Harness};
use factory_ledger::error::AppError;
use factory_ledger::services::{RecordPurchaseInput, RegisterProductInput};
use factory_ledger::store::FailPoint;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::UsageType;
use uuid::Uuid;

fn purchase(material_id: Uuid, fund_id: Uuid, quantity: &str, unit_price: &str) -> RecordPurchaseInput {
    RecordPurchaseInput {
        material_id,
        quantity: dec(quantity),
        unit_price: dec(unit_price),
        vendor_name: "Textile Mills Ltd".to_string(),
        vendor_contact: Some("+91 98765 43210".to_string()),
        invoice_number: Some("INV-2024-118".to_string()),
        purchase_date: today(),
        fund_id,
        notes: None,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[tokio::test]
    async fn test_purchase_restocks_and_debits_fund() {
        let h = Harness::new();
        let cotton = h.material("Cotton", "20").await;
        let fund = h.fund(h.actor, "1000").await;

        let recorded = h
            .ledger
            .purchases()
            .record_purchase(h.actor, purchase(cotton.id, fund.id, "10", "12.50"))
            .await
            .unwrap();
        assert_eq!(recorded.total_amount, dec("125.00"));

        let cotton = h.ledger.materials().get_material(cotton.id).await.unwrap();
        assert_eq!(cotton.stock_quantity, dec("30"));

        let funds = h.ledger.funds();
        assert_eq!(funds.get_fund(fund.id).await.unwrap().balance, dec("875"));

        let usages = funds.list_usages(fund.id).await.unwrap();
        assert_eq!(usages.len(), 1);
        assert_eq!(usages[0].usage_type, UsageType::Purchase);
        assert_eq!(usages[0].amount, dec("125"));
        assert_eq!(usages[0].reference_id, Some(recorded.id.to_string()));
    }

    #[tokio::test]
    async fn test_purchase_beyond_balance_is_rejected() {
        let h = Harness::new();
        let cotton = h.material("Cotton", "20").await;
        let fund = h.fund(h.actor, "100").await;
        let before = h.store.row_counts().await;

        let err = h
            .ledger
            .purchases()
            .record_purchase(h.actor, purchase(cotton.id, fund.id, "10", "12.50"))
            .await
            .unwrap_err();

        match err {
            AppError::InsufficientFunds {
                fund_id,
                requested,
                available,
            } => {
                assert_eq!(fund_id, fund.id);
                assert_eq!(requested, dec("125"));
                assert_eq!(available, dec("100"));
            }
            other => panic!("expected InsufficientFunds, got {:?}", other),
        }

        assert_eq!(h.store.row_counts().await, before);
        let cotton = h.ledger.materials().get_material(cotton.id).await.unwrap();
        assert_eq!(cotton.stock_quantity, dec("20"));
    }

    #[tokio::test]
    async fn test_returned_fund_cannot_pay() {
        let h = Harness::new();
        let cotton = h.material("Cotton", "20").await;
        let fund = h.fund(h.actor, "1000").await;
        h.ledger.funds().return_fund(fund.id, h.actor).await.unwrap();

        let err = h
            .ledger
            .purchases()
            .record_purchase(h.actor, purchase(cotton.id, fund.id, "1", "1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientFunds { available, .. } if available == Decimal::ZERO));
    }

    /// Fund debit failing leaves neither the purchase row nor the restock
    #[tokio::test]
    async fn test_fund_usage_failure_rolls_back_purchase() {
        let h = Harness::new();
        let cotton = h.material("Cotton", "20").await;
        let fund = h.fund(h.actor, "1000").await;
        let before = h.store.row_counts().await;
        h.store.fail_on(FailPoint::InsertFundUsage);

        let err = h
            .ledger
            .purchases()
            .record_purchase(h.actor, purchase(cotton.id, fund.id, "10", "12.50"))
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        h.store.clear_fail_points();
        assert_eq!(h.store.row_counts().await, before);
        let cotton = h.ledger.materials().get_material(cotton.id).await.unwrap();
        assert_eq!(cotton.stock_quantity, dec("20"));
        assert_eq!(h.ledger.funds().get_fund(fund.id).await.unwrap().balance, dec("1000"));
    }

    #[tokio::test]
    async fn test_purchase_row_failure_rolls_back_restock() {
        let h = Harness::new();
        let cotton = h.material("Cotton", "20").await;
        let fund = h.fund(h.actor, "1000").await;
        h.store.fail_on(FailPoint::InsertPurchase);

        h.ledger
            .purchases()
            .record_purchase(h.actor, purchase(cotton.id, fund.id, "5", "2"))
            .await
            .unwrap_err();

        h.store.clear_fail_points();
        let cotton = h.ledger.materials().get_material(cotton.id).await.unwrap();
        assert_eq!(cotton.stock_quantity, dec("20"));
        assert_eq!(h.store.row_counts().await.purchases, 0);
    }

    #[tokio::test]
    async fn test_unknown_fund_or_material() {
        let h = Harness::new();
        let cotton = h.material("Cotton", "20").await;
        let fund = h.fund(h.actor, "1000").await;
        let purchases = h.ledger.purchases();

        let err = purchases
            .record_purchase(h.actor, purchase(cotton.id, Uuid::new_v4(), "1", "1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::FundNotFound(_)));

        let err = purchases
            .record_purchase(h.actor, purchase(Uuid::new_v4(), fund.id, "1", "1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(h.ledger.funds().get_fund(fund.id).await.unwrap().balance, dec("1000"));
    }

    #[tokio::test]
    async fn test_invalid_purchase_fields() {
        let h = Harness::new();
        let cotton = h.material("Cotton", "20").await;
        let fund = h.fund(h.actor, "1000").await;
        let purchases = h.ledger.purchases();

        let err = purchases
            .record_purchase(h.actor, purchase(cotton.id, fund.id, "0", "5"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "quantity"));

        let err = purchases
            .record_purchase(h.actor, purchase(cotton.id, fund.id, "3", "-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "unit_price"));

        let mut blank_vendor = purchase(cotton.id, fund.id, "3", "1");
        blank_vendor.vendor_name = "   ".to_string();
        let err = purchases.record_purchase(h.actor, blank_vendor).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "vendor_name"));
    }

    #[tokio::test]
    async fn test_oversized_total_is_rejected_before_any_write() {
        let h = Harness::new();
        let cotton = h.material("Cotton", "20").await;
        let fund = h.fund(h.actor, "1000").await;

        let err = h
            .ledger
            .purchases()
            .record_purchase(h.actor, purchase(cotton.id, fund.id, "79228162514264337593543950335", "2"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "quantity"));

        let counts = h.store.row_counts().await;
        assert_eq!(counts.purchases, 0);
        assert_eq!(counts.fund_usages, 0);
        assert_eq!(h.ledger.materials().get_material(cotton.id).await.unwrap().stock_quantity, dec("20"));
    }

    #[tokio::test]
    async fn test_restock_past_largest_stock_level_rolls_back() {
        let h = Harness::new();
        let cotton = h.material("Cotton", "79228162514264337593543950335").await;
        let fund = h.fund(h.actor, "1000").await;

        let err = h
            .ledger
            .purchases()
            .record_purchase(h.actor, purchase(cotton.id, fund.id, "1", "1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "quantity"));

        let cotton = h.ledger.materials().get_material(cotton.id).await.unwrap();
        assert_eq!(cotton.stock_quantity, Decimal::MAX);
        assert_eq!(h.ledger.funds().get_fund(fund.id).await.unwrap().balance, dec("1000"));
        assert_eq!(h.store.row_counts().await.fund_usages, 0);
    }

    #[tokio::test]
    async fn test_list_purchases_filters_by_material() {
        let h = Harness::new();
        let cotton = h.material("Cotton", "0").await;
        let thread = h.material("Thread", "0").await;
        let fund = h.fund(h.actor, "1000").await;
        let purchases = h.ledger.purchases();

        purchases
            .record_purchase(h.actor, purchase(cotton.id, fund.id, "1", "1"))
            .await
            .unwrap();
        purchases
            .record_purchase(h.actor, purchase(thread.id, fund.id, "2", "1"))
            .await
            .unwrap();
        purchases
            .record_purchase(h.actor, purchase(cotton.id, fund.id, "3", "1"))
            .await
            .unwrap();

        assert_eq!(purchases.list_purchases(None).await.unwrap().len(), 3);
        let cotton_only = purchases.list_purchases(Some(cotton.id)).await.unwrap();
        assert_eq!(cotton_only.len(), 2);
        assert!(cotton_only.iter().all(|p| p.material_id == cotton.id));
    }

    #[tokio::test]
    async fn test_low_stock_tracks_purchases_and_consumption() {
        let h = Harness::new();
        let product = h.product("SHIRT-01").await;
        let cotton = h.material("Cotton", "10").await;
        let thread = h.material("Thread", "50").await;
        let fund = h.fund(h.actor, "1000").await;

        let low = h.ledger.materials().low_stock().await.unwrap();
        assert_eq!(low.iter().map(|m| m.id).collect::<Vec<_>>(), vec![cotton.id]);

        h.ledger
            .purchases()
            .record_purchase(h.actor, purchase(cotton.id, fund.id, "5", "1"))
            .await
            .unwrap();
        h.ledger
            .batches()
            .create_batch(h.actor, h.batch_input(product.id, 10, vec![(thread.id, "45")]))
            .await
            .unwrap();

        let low = h.ledger.materials().low_stock().await.unwrap();
        assert_eq!(low.iter().map(|m| m.id).collect::<Vec<_>>(), vec![thread.id]);
    }

    #[tokio::test]
    async fn test_duplicate_sku_is_a_conflict() {
        let h = Harness::new();
        h.product("SHIRT-01").await;

        let err = h
            .ledger
            .catalog()
            .register_product(RegisterProductInput {
                name: "Another shirt".to_string(),
                sku: " shirt-01 ".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "DUPLICATE");
        assert!(!err.is_retryable());
        assert_eq!(h.ledger.catalog().list_products().await.unwrap().len(), 1);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(30))]

        /// Stock rises by exactly what was bought, and the fund falls by
        /// exactly what was paid, across accepted and rejected purchases
        #[test]
        fn prop_stock_and_fund_move_together(
            allocation in 50i64..2_000,
            orders in prop::collection::vec((1i64..40, 1i64..30), 1..10)
        ) {
            let (stock, balance, bought, paid) = tokio_test::block_on(async {
                let h = Harness::new();
                let cotton = h.material("Cotton", "0").await;
                let fund = h.fund(h.actor, &allocation.to_string()).await;
                let mut bought = Decimal::ZERO;
                let mut paid = Decimal::ZERO;

                for (quantity, unit_price) in &orders {
                    let input = purchase(cotton.id, fund.id, &quantity.to_string(), &unit_price.to_string());
                    if let Ok(recorded) = h.ledger.purchases().record_purchase(h.actor, input).await {
                        bought += recorded.quantity;
                        paid += recorded.total_amount;
                    }
                }

                let stock = h.ledger.materials().get_material(cotton.id).await.unwrap().stock_quantity;
                let balance = h.ledger.funds().get_fund(fund.id).await.unwrap().balance;
                (stock, balance, bought, paid)
            });

            prop_assert_eq!(stock, bought);
            prop_assert_eq!(balance, Decimal::from(allocation) - paid);
            prop_assert!(balance >= Decimal::ZERO);
        }
    }
}
