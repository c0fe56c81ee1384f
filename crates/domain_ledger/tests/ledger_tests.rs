//! Integration tests for domain_ledger

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use core_kernel::{ActorId, Currency, DistributorId, LedgerEntryId, Money, ProductId, TransferId, VariantId};

use domain_ledger::{
    CostSource, DescriptionCodec, FixedIdentity, InMemoryLedger, LedgerConfig, LedgerEntry,
    LedgerError, LedgerService, LineItem, MockCatalog, MockInventory, NewEntry, PaymentDetails,
    PaymentMethod, PaymentRegistration, PaymentStateMachine, PaymentStatus, Product,
    RegisterDebit, RegisterPayment, ReturnMatcher, RevertOutcome, RevertRequest, SourceType,
    Variant,
};

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    service: LedgerService,
    ledger: Arc<InMemoryLedger>,
    catalog: Arc<MockCatalog>,
    inventory: Arc<MockInventory>,
    distributor: DistributorId,
    product: Product,
    variant: Variant,
}

impl Harness {
    fn new() -> Self {
        Self::with_variant_cost(Some(dec!(12.50)))
    }

    fn with_variant_cost(variant_cost: Option<Decimal>) -> Self {
        let product = Product {
            id: ProductId::new(),
            name: "Pantalón Sendero".to_string(),
            price: dec!(57.50),
            distributor_cost: Some(dec!(30.00)),
        };
        let variant = Variant {
            id: VariantId::new(),
            product_id: product.id,
            name: "Negro/M".to_string(),
            price: None,
            distributor_cost: variant_cost,
        };
        let ledger = Arc::new(InMemoryLedger::new());
        let catalog = Arc::new(
            MockCatalog::new()
                .with_product(product.clone())
                .with_variant(variant.clone()),
        );
        let inventory = Arc::new(MockInventory::new());
        let identity = Arc::new(FixedIdentity::new(ActorId::new("admin-1").unwrap()));
        let service = LedgerService::new(
            ledger.clone(),
            catalog.clone(),
            inventory.clone(),
            identity,
            LedgerConfig::default(),
        )
        .unwrap();

        Self {
            service,
            ledger,
            catalog,
            inventory,
            distributor: DistributorId::new(),
            product,
            variant,
        }
    }

    fn item(&self) -> LineItem {
        LineItem::new(self.product.id, self.variant.id, &self.product.name, &self.variant.name)
    }

    async fn transfer(&self, quantity: u32, amount: Decimal) -> LedgerEntry {
        self.service
            .register_debit(RegisterDebit::for_transfer(
                self.distributor,
                TransferId::new(),
                amount,
                quantity,
                &self.product.name,
                &self.variant.name,
            ))
            .await
            .unwrap()
    }

    fn revert(&self, quantity: u32) -> RevertRequest {
        RevertRequest {
            distributor_id: self.distributor,
            item: self.item(),
            quantity,
            notes: None,
        }
    }
}

fn cash() -> PaymentDetails {
    PaymentDetails::new(PaymentMethod::Cash, Utc::now())
}

fn usd(amount: Decimal) -> Money {
    Money::new(amount, Currency::USD)
}

fn book(entry: NewEntry) -> LedgerEntry {
    entry.into_entry(LedgerEntryId::new_v7(), Utc::now(), ActorId::new("t").unwrap())
}

// ============================================================================
// Scenarios
// ============================================================================

mod scenario_tests {
    use super::*;

    #[tokio::test]
    async fn scenario_a_partial_manual_payment() {
        let h = Harness::new();
        let debit = h
            .service
            .register_debit(RegisterDebit {
                distributor_id: h.distributor,
                amount: dec!(100.00),
                description: "Transferencia de 4 x Gorra (Azul)".to_string(),
                source_type: SourceType::Transfer,
                source_id: Uuid::new_v4(),
                due_date: None,
                related_transfer_id: None,
            })
            .await
            .unwrap();

        let receipt = h.service.mark_debit_as_paid(debit.id, dec!(40.00), cash()).await.unwrap();

        let tracking = receipt.debit.tracking.as_ref().unwrap();
        assert_eq!(tracking.payment_status, PaymentStatus::Partial);
        assert_eq!(tracking.remaining_amount.amount(), dec!(60.00));
        assert_eq!(receipt.view.remaining_amount.amount(), dec!(60.00));
        assert_eq!(receipt.credit.source_type, SourceType::ManualPayment);
        assert_eq!(receipt.credit.settles_debit_id, Some(debit.id));
        assert_eq!(receipt.credit.amount.amount(), dec!(40.00));
    }

    #[tokio::test]
    async fn scenario_b_full_text_matched_return() {
        let distributor = DistributorId::new();
        let debit = book(NewEntry::debit(
            distributor,
            usd(dec!(50.00)),
            "transferencia de 2 x Pantalón Sendero (Negro/M)",
            SourceType::Transfer,
            Uuid::new_v4(),
        ));
        let credit = book(NewEntry::credit(
            distributor,
            usd(dec!(50.00)),
            "devolución de 2 x Pantalón Sendero (Negro/M)",
            SourceType::Transfer,
            Uuid::new_v4(),
        ));
        let ledger = InMemoryLedger::with_entries(vec![debit.clone(), credit]).await;
        let entries = domain_ledger::LedgerPort::list_entries(&ledger, distributor).await.unwrap();

        let view = ReturnMatcher::new("devolución").assess(&debit, &entries);
        assert_eq!(view.remaining_amount.amount(), dec!(0.00));
        assert_eq!(view.payment_status, PaymentStatus::Paid);
        assert!(view.returns.is_complete_return);
        assert!(view.manual_paid.is_zero());
    }

    #[tokio::test]
    async fn scenario_c_no_matching_debit_rejects_without_inventory_call() {
        let h = Harness::new();
        // Debt exists, but for a different variant
        h.service
            .register_debit(RegisterDebit::for_transfer(
                h.distributor,
                TransferId::new(),
                dec!(100),
                4,
                &h.product.name,
                "Negro/L",
            ))
            .await
            .unwrap();

        let result = h.service.revert_transfer(h.revert(1)).await;
        match result {
            Err(LedgerError::InsufficientBalance { available, required }) => {
                assert_eq!(available, Decimal::ZERO);
                assert_eq!(required, dec!(14.38));
            }
            other => panic!("expected insufficient balance, got {:?}", other),
        }
        assert_eq!(h.inventory.calls(), 0);
    }

    #[tokio::test]
    async fn scenario_d_variant_cost_short_circuits() {
        let h = Harness::new();
        h.transfer(2, dec!(28.75)).await;

        let quote = h.service.can_revert(h.distributor, &h.item(), 2).await.unwrap();
        assert_eq!(quote.unit_cost.amount, dec!(12.50));
        assert_eq!(quote.unit_cost.source, CostSource::VariantDistributorCost);
        assert_eq!(quote.return_value.amount(), dec!(28.75));
        assert_eq!(h.catalog.product_lookups(), 0);
    }

    #[tokio::test]
    async fn scenario_e_ledger_failure_after_stock_moved_is_degraded() {
        let h = Harness::new();
        let debit = h.transfer(2, dec!(28.75)).await;
        let before = h.ledger.len().await;

        let quote = h.service.can_revert(h.distributor, &h.item(), 2).await.unwrap();
        h.ledger.set_fail_writes(true);
        let outcome = h
            .service
            .reverts()
            .execute_revert(&h.revert(2), quote)
            .await
            .unwrap();

        assert!(outcome.is_degraded());
        assert!(outcome.warning().unwrap().contains("not recorded"));
        match &outcome {
            RevertOutcome::Degraded {
                stock_returned,
                booked,
                pending_credits,
                ..
            } => {
                assert_eq!(*stock_returned, 2);
                assert!(booked.is_empty());
                assert_eq!(pending_credits.len(), 1);
                assert_eq!(pending_credits[0].amount.amount(), dec!(28.75));
                assert_eq!(pending_credits[0].source_type, SourceType::StockReturn);
                assert_eq!(pending_credits[0].settles_debit_id, Some(debit.id));
            }
            other => panic!("expected degraded outcome, got {:?}", other),
        }
        assert_eq!(h.inventory.returned_units(h.variant.id).await, 2);
        assert_eq!(h.ledger.len().await, before);
    }
}

// ============================================================================
// Revert workflow
// ============================================================================

mod revert_tests {
    use super::*;

    #[tokio::test]
    async fn test_completed_revert_books_linked_credit() {
        let h = Harness::new();
        let debit = h.transfer(2, dec!(28.75)).await;

        let outcome = h.service.revert_transfer(h.revert(2)).await.unwrap();
        let credit = match outcome {
            RevertOutcome::Completed { mut credits, quote } => {
                assert_eq!(quote.settling_debit_id, Some(debit.id));
                assert_eq!(credits.len(), 1);
                credits.remove(0)
            }
            other => panic!("expected completion, got {:?}", other),
        };
        assert_eq!(credit.source_type, SourceType::StockReturn);
        assert_eq!(credit.settles_debit_id, Some(debit.id));
        assert_eq!(credit.description, "Devolución de 2 x Pantalón Sendero (Negro/M)");
        assert!(DescriptionCodec::same_line_item(&credit.description, &debit.description));

        let views = h.service.debit_views(h.distributor).await.unwrap();
        assert_eq!(views.len(), 1);
        assert!(views[0].is_settled());
        assert!(views[0].returns.is_complete_return);
        assert_eq!(h.inventory.returned_units(h.variant.id).await, 2);
    }

    fn completed_credits(outcome: RevertOutcome) -> Vec<LedgerEntry> {
        match outcome {
            RevertOutcome::Completed { credits, .. } => credits,
            other => panic!("expected completion, got {:?}", other),
        }
    }

    async fn remaining_total(h: &Harness) -> Decimal {
        h.service
            .debit_views(h.distributor)
            .await
            .unwrap()
            .iter()
            .map(|view| view.remaining_amount.amount())
            .sum()
    }

    #[tokio::test]
    async fn test_return_spread_over_debits_links_each_share() {
        let h = Harness::new();
        let older = h.transfer(1, dec!(14.38)).await;
        let newer = h.transfer(1, dec!(14.38)).await;

        let quote = h.service.can_revert(h.distributor, &h.item(), 2).await.unwrap();
        assert_eq!(quote.available.amount(), dec!(28.76));
        assert_eq!(quote.matched_debit_ids, vec![older.id, newer.id]);
        assert!(quote.settling_debit_id.is_none());
        let shares: Vec<_> = quote
            .allocations
            .iter()
            .map(|a| (a.debit_id, a.amount.amount(), a.quantity))
            .collect();
        assert_eq!(shares, vec![(older.id, dec!(14.38), 1), (newer.id, dec!(14.37), 1)]);

        let before = remaining_total(&h).await;
        let credits = completed_credits(h.service.revert_transfer(h.revert(2)).await.unwrap());
        assert_eq!(credits.len(), 2);
        for (credit, debit) in credits.iter().zip([&older, &newer]) {
            assert_eq!(credit.source_type, SourceType::StockReturn);
            assert_eq!(credit.settles_debit_id, Some(debit.id));
            assert_eq!(credit.description, "Devolución de 1 x Pantalón Sendero (Negro/M)");
        }
        let credited: Decimal = credits.iter().map(|c| c.amount.amount()).sum();
        assert_eq!(credited, dec!(28.75));
        assert_eq!(before - remaining_total(&h).await, credited);

        let views = h.service.debit_views(h.distributor).await.unwrap();
        let view_of = |id| views.iter().find(|v| v.debit.id == id).unwrap();
        assert!(view_of(older.id).is_settled());
        assert_eq!(view_of(newer.id).remaining_amount.amount(), dec!(0.01));
        assert_eq!(view_of(newer.id).payment_status, PaymentStatus::Partial);

        let summary = h.service.distributor_summary(h.distributor).await.unwrap();
        assert_eq!(summary.balance.amount(), dec!(0.01));
        assert_eq!(summary.pending_amount.amount(), summary.balance.amount());
    }

    #[tokio::test]
    async fn test_split_return_leaves_later_debits_untouched() {
        let h = Harness::new();
        let first = h.transfer(1, dec!(10.00)).await;
        let second = h.transfer(1, dec!(10.00)).await;

        let credits = completed_credits(h.service.revert_transfer(h.revert(1)).await.unwrap());
        let booked: Vec<_> = credits
            .iter()
            .map(|c| (c.settles_debit_id, c.amount.amount(), c.description.as_str()))
            .collect();
        assert_eq!(
            booked,
            vec![
                (Some(first.id), dec!(10.00), "Devolución de 1 x Pantalón Sendero (Negro/M)"),
                (Some(second.id), dec!(4.38), "Devolución de 0 x Pantalón Sendero (Negro/M)"),
            ]
        );
        assert_eq!(remaining_total(&h).await, dec!(5.62));

        let summary = h.service.distributor_summary(h.distributor).await.unwrap();
        assert_eq!(summary.total_credit.amount(), dec!(14.38));
        assert_eq!(summary.balance.amount(), dec!(5.62));
        assert_eq!(summary.pending_amount.amount(), dec!(5.62));

        // A debit booked after the return owes its full amount
        let later = h.transfer(1, dec!(14.38)).await;
        let views = h.service.debit_views(h.distributor).await.unwrap();
        let later_view = views.iter().find(|v| v.debit.id == later.id).unwrap();
        assert_eq!(later_view.payment_status, PaymentStatus::Pending);
        assert_eq!(later_view.remaining_amount.amount(), dec!(14.38));

        let summary = h.service.distributor_summary(h.distributor).await.unwrap();
        assert_eq!(summary.pending_amount.amount(), dec!(20.00));
        assert_eq!(summary.pending_amount.amount(), summary.balance.amount());
    }

    #[tokio::test]
    async fn test_insufficient_balance_reports_amounts() {
        let h = Harness::new();
        h.transfer(1, dec!(10.00)).await;

        match h.service.can_revert(h.distributor, &h.item(), 1).await {
            Err(LedgerError::InsufficientBalance { available, required }) => {
                assert_eq!(available, dec!(10.00));
                assert_eq!(required, dec!(14.38));
            }
            other => panic!("expected insufficient balance, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_inventory_failure_leaves_ledger_untouched() {
        let h = Harness::new();
        h.transfer(2, dec!(28.75)).await;
        h.inventory.set_failing(true);

        let result = h.service.revert_transfer(h.revert(2)).await;
        assert!(matches!(result, Err(LedgerError::Upstream(_))));
        assert_eq!(h.ledger.len().await, 1);
    }

    #[tokio::test]
    async fn test_zero_quantity_is_rejected() {
        let h = Harness::new();
        let result = h.service.can_revert(h.distributor, &h.item(), 0).await;
        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    #[tokio::test]
    async fn test_catalog_outage_uses_base_price() {
        let h = Harness::new();
        h.transfer(1, dec!(100)).await;
        h.catalog.set_failing(true);

        let item = h.item().with_base_price(dec!(57.50));
        let quote = h.service.can_revert(h.distributor, &item, 1).await.unwrap();
        assert_eq!(quote.unit_cost.source, CostSource::BasePriceFallback);
        // 57.50 / 1.15 × 0.70 = 35.00, plus VAT
        assert_eq!(quote.return_value.amount(), dec!(40.25));
    }

    #[tokio::test]
    async fn test_revert_without_identity_moves_nothing() {
        let h = Harness::new();
        h.transfer(2, dec!(28.75)).await;
        let anonymous = h.service.for_identity(Arc::new(FixedIdentity::anonymous()));

        let result = anonymous.revert_transfer(h.revert(2)).await;
        assert!(matches!(result, Err(LedgerError::Authorization(_))));
        assert_eq!(h.inventory.calls(), 0);
    }
}

// ============================================================================
// Payments and summaries
// ============================================================================

mod payment_tests {
    use super::*;

    #[tokio::test]
    async fn test_payment_validated_against_return_adjusted_balance() {
        let h = Harness::new();
        let debit = h.transfer(4, dec!(57.50)).await;
        h.service.revert_transfer(h.revert(2)).await.unwrap();

        // 57.50 owed, 28.75 returned: 28.76 exceeds what is left
        let result = h.service.mark_debit_as_paid(debit.id, dec!(28.76), cash()).await;
        assert!(matches!(result, Err(LedgerError::Validation(_))));

        let receipt = h.service.mark_debit_as_paid(debit.id, dec!(28.75), cash()).await.unwrap();
        assert_eq!(receipt.view.payment_status, PaymentStatus::Paid);
        assert!(receipt.view.remaining_amount.is_zero());
        // Stored tracking is manual-only
        let tracking = receipt.debit.tracking.unwrap();
        assert_eq!(tracking.payment_status, PaymentStatus::Partial);
        assert_eq!(tracking.remaining_amount.amount(), dec!(28.75));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_payments_cannot_overpay() {
        for _ in 0..20 {
            let h = Harness::new();
            let debit_id = h.transfer(4, dec!(100.00)).await.id;

            let payments: Vec<_> = (0..2)
                .map(|_| {
                    let service = h.service.clone();
                    tokio::spawn(async move { service.mark_debit_as_paid(debit_id, dec!(60.00), cash()).await })
                })
                .collect();
            let mut succeeded = 0;
            for payment in payments {
                match payment.await.unwrap() {
                    Ok(receipt) => {
                        succeeded += 1;
                        assert_eq!(receipt.debit.manual_paid().amount(), dec!(60.00));
                    }
                    Err(LedgerError::Conflict(_)) | Err(LedgerError::Validation(_)) => {}
                    Err(other) => panic!("unexpected payment error {:?}", other),
                }
            }
            assert_eq!(succeeded, 1);

            let stored = h.service.ledger_snapshot(h.distributor).await.unwrap();
            let credited: Decimal = stored
                .iter()
                .filter(|e| e.is_credit())
                .map(|e| e.amount.amount())
                .sum();
            let debit = stored.iter().find(|e| e.id == debit_id).unwrap();
            assert_eq!(debit.manual_paid().amount(), credited);
            assert_eq!(credited, dec!(60.00));
        }
    }

    #[tokio::test]
    async fn test_mark_unknown_debit_is_not_found() {
        let h = Harness::new();
        let result = h
            .service
            .mark_debit_as_paid(LedgerEntryId::new_v7(), dec!(1), cash())
            .await;
        assert!(matches!(result, Err(LedgerError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_mark_credit_as_paid_is_rejected() {
        let h = Harness::new();
        let registration = h
            .service
            .register_payment(RegisterPayment {
                distributor_id: h.distributor,
                amount: dec!(5),
                description: "Abono a cuenta".to_string(),
                details: cash(),
            })
            .await
            .unwrap();
        let result = h
            .service
            .mark_debit_as_paid(registration.credit().id, dec!(1), cash())
            .await;
        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    #[tokio::test]
    async fn test_register_payment_with_parent_updates_debit() {
        let h = Harness::new();
        let debit = h.transfer(4, dec!(100)).await;
        let registration = h
            .service
            .register_payment(RegisterPayment {
                distributor_id: h.distributor,
                amount: dec!(100),
                description: String::new(),
                details: cash().for_debit(debit.id),
            })
            .await
            .unwrap();

        match registration {
            PaymentRegistration::AgainstDebit { receipt } => {
                assert_eq!(receipt.debit.tracking.unwrap().payment_status, PaymentStatus::Paid);
            }
            other => panic!("expected debit payment, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_register_debit_rejects_payment_source() {
        let h = Harness::new();
        let result = h
            .service
            .register_debit(RegisterDebit {
                distributor_id: h.distributor,
                amount: dec!(10),
                description: "x".to_string(),
                source_type: SourceType::ManualPayment,
                source_id: Uuid::new_v4(),
                due_date: None,
                related_transfer_id: None,
            })
            .await;
        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    #[tokio::test]
    async fn test_summary_after_payment_and_return() {
        let h = Harness::new();
        let now = Utc::now();
        let debit = h
            .service
            .register_debit(
                RegisterDebit::for_transfer(h.distributor, TransferId::new(), dec!(57.50), 4, &h.product.name, &h.variant.name)
                    .due(now - Duration::days(1)),
            )
            .await
            .unwrap();
        h.service.revert_transfer(h.revert(2)).await.unwrap();
        h.service.mark_debit_as_paid(debit.id, dec!(10), cash()).await.unwrap();

        let summary = h.service.distributor_summary(h.distributor).await.unwrap();
        assert_eq!(summary.total_debit.amount(), dec!(57.50));
        assert_eq!(summary.total_credit.amount(), dec!(38.75));
        assert_eq!(summary.balance.amount(), dec!(18.75));
        assert_eq!(summary.pending_amount.amount(), dec!(18.75));
        assert_eq!(summary.paid_amount.amount(), dec!(38.75));
        assert_eq!(summary.overdue_amount.amount(), dec!(18.75));
        assert_eq!(summary.partial_payments, 1);
        assert_eq!(summary.total_transactions, 3);
        assert!(summary.last_payment_date.is_some());
    }

    #[tokio::test]
    async fn test_live_stream_reemits_full_snapshot() {
        let h = Harness::new();
        let mut subscription = h.service.get_ledger_entries(h.distributor).await.unwrap();
        assert!(subscription.current().is_empty());

        let debit = h.transfer(1, dec!(10)).await;
        let snapshot = subscription.changed().await.unwrap();
        assert_eq!(snapshot.len(), 1);

        h.service.mark_debit_as_paid(debit.id, dec!(4), cash()).await.unwrap();
        // Debit update and credit append each publish a snapshot
        let mut latest = subscription.changed().await.unwrap();
        while latest.len() < 2 {
            latest = subscription.changed().await.unwrap();
        }
        assert_eq!(latest.len(), 2);
        assert!(latest[0].created_at >= latest[1].created_at);

        subscription.unsubscribe();
        assert_eq!(h.ledger.len().await, 2);
    }
}

// ============================================================================
// Properties
// ============================================================================

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn debit(amount: Decimal) -> LedgerEntry {
        book(NewEntry::debit(
            DistributorId::new(),
            usd(amount),
            "Transferencia de 10 x Gorra (Azul)",
            SourceType::Transfer,
            Uuid::new_v4(),
        ))
    }

    fn linked_return(debit: &LedgerEntry, amount: Decimal) -> LedgerEntry {
        book(
            NewEntry::credit(
                debit.distributor_id,
                usd(amount),
                "Devolución de 1 x Gorra (Azul)",
                SourceType::StockReturn,
                Uuid::new_v4(),
            )
            .settles(debit.id),
        )
    }

    proptest! {
        #[test]
        fn remaining_stays_within_bounds(
            amount_cents in 1i64..1_000_000i64,
            paid_cents in 0i64..1_000_000i64,
            return_cents in proptest::collection::vec(1i64..500_000i64, 0..5)
        ) {
            let amount = Decimal::new(amount_cents, 2);
            let mut debit = debit(amount);
            if let Some(tracking) = debit.tracking.as_mut() {
                tracking.paid_amount = usd(Decimal::new(paid_cents.min(amount_cents), 2));
            }
            let mut entries = vec![debit.clone()];
            for cents in &return_cents {
                entries.push(linked_return(&debit, Decimal::new(*cents, 2)));
            }

            let view = ReturnMatcher::new("devolución").assess(&debit, &entries);
            prop_assert!(view.remaining_amount.amount() >= Decimal::ZERO);
            prop_assert!(view.remaining_amount.amount() <= amount);
            prop_assert_eq!(
                view.payment_status == PaymentStatus::Paid,
                view.remaining_amount.amount() <= Decimal::ZERO
            );
        }

        #[test]
        fn matching_is_idempotent_under_duplication(
            return_cents in proptest::collection::vec(1i64..5_000i64, 1..6),
            copies in 2usize..4usize
        ) {
            let debit = debit(dec!(1000.00));
            let returns: Vec<_> = return_cents
                .iter()
                .map(|cents| linked_return(&debit, Decimal::new(*cents, 2)))
                .collect();

            let mut once = vec![debit.clone()];
            once.extend(returns.iter().cloned());
            let mut repeated = vec![debit.clone()];
            for _ in 0..copies {
                repeated.extend(returns.iter().cloned());
            }

            let matcher = ReturnMatcher::new("devolución");
            prop_assert_eq!(
                matcher.assess(&debit, &once).remaining_amount,
                matcher.assess(&debit, &repeated).remaining_amount
            );
        }

        #[test]
        fn sequential_payments_keep_status_consistent(
            payments in proptest::collection::vec(1i64..5_000i64, 1..12)
        ) {
            let mut debit = debit(dec!(100.00));
            let matcher = ReturnMatcher::new("devolución");
            for cents in payments {
                let view = matcher.assess(&debit, &[debit.clone()]);
                let payment = usd(Decimal::new(cents, 2));
                match PaymentStateMachine::transition(&view, payment, &cash()) {
                    Ok(update) => {
                        prop_assert!(update.remaining_amount.amount() >= Decimal::ZERO);
                        prop_assert_eq!(
                            update.payment_status == PaymentStatus::Paid,
                            update.remaining_amount.is_zero()
                        );
                        debit.apply_payment_update(&update).unwrap();
                    }
                    Err(LedgerError::Validation(_)) => {
                        prop_assert!(payment.amount() > view.remaining_amount.amount());
                    }
                    Err(other) => prop_assert!(false, "unexpected error {:?}", other),
                }
            }
        }
    }

    #[test]
    fn hundred_tenths_settle_ten_dollars_exactly() {
        let debit = debit(dec!(10.00));
        let mut entries = vec![debit.clone()];
        for _ in 0..100 {
            entries.push(linked_return(&debit, dec!(0.1)));
        }
        let view = ReturnMatcher::new("devolución").assess(&debit, &entries);
        assert_eq!(view.remaining_amount.amount(), dec!(0.00));
        assert_eq!(view.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn tenths_paid_manually_settle_exactly() {
        let mut debit = debit(dec!(10.00));
        let matcher = ReturnMatcher::new("devolución");
        for _ in 0..100 {
            let view = matcher.assess(&debit, &[debit.clone()]);
            let update = PaymentStateMachine::transition(&view, usd(dec!(0.1)), &cash()).unwrap();
            debit.apply_payment_update(&update).unwrap();
        }
        let tracking = debit.tracking.as_ref().unwrap();
        assert_eq!(tracking.remaining_amount.amount(), dec!(0.00));
        assert_eq!(tracking.payment_status, PaymentStatus::Paid);
    }
}
