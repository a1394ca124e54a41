//! Stock ledger tests
//!
//! Property-based and unit tests for:
//! - Quantities never going negative
//! - All-or-nothing multi-item deductions
//! - Journal entries matching the quantity changes they record

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    ensure_available, Action, CounterSale, DocumentKind, InMemoryLedger, LineItem, MovementReason, NewCounterSale,
    NewStockItem, StockDemand, StockItem, StockLedger, TaxType, WorkflowError,
};

fn stock(workshop: &str, part_number: &str, qty: i32) -> StockItem {
    StockItem::new(
        NewStockItem {
            part_number: part_number.to_string(),
            part_name: format!("Part {}", part_number),
            brand: None,
            category: None,
            workshop: Some(workshop.to_string()),
            opening_quantity: qty,
            purchase_price: Decimal::from(80),
            selling_price: Decimal::from(100),
            tax_type: TaxType::None,
            tax_percent: Decimal::ZERO,
            rack_no: None,
            min_stock_level: 0,
            max_stock_level: None,
            location: None,
        },
        workshop,
    )
    .unwrap()
}

fn adjustment() -> MovementReason {
    MovementReason::new(DocumentKind::StockAdjustment, "ADJ24050001", Action::Adjust)
}

// ============================================================================
// Property Test Strategies
// ============================================================================

fn delta_strategy() -> impl Strategy<Value = i32> {
    -50i32..50
}

fn quantity_strategy() -> impl Strategy<Value = i32> {
    0i32..100
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_adjust_rejects_overdraw() {
        let item = stock("main", "BRK-001", 3);
        let id = item.id;
        let mut ledger = InMemoryLedger::with_items("main", [item]).unwrap();

        let err = ledger.adjust(id, -4, &adjustment()).unwrap_err();
        assert!(matches!(err, WorkflowError::InsufficientStock { available: 3, requested: 4, .. }));
        assert_eq!(ledger.quantity_of(id), Some(3));
        assert!(ledger.journal().is_empty());
    }

    #[test]
    fn test_adjust_by_minimum_delta_is_rejected() {
        let item = stock("main", "BRK-001", 3);
        let id = item.id;
        let mut ledger = InMemoryLedger::with_items("main", [item]).unwrap();

        let err = ledger.adjust(id, i32::MIN, &adjustment()).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::InsufficientStock { available: 3, requested: i32::MAX, .. }
        ));
        assert_eq!(ledger.quantity_of(id), Some(3));
        assert!(ledger.journal().is_empty());
    }

    #[test]
    fn test_same_part_lines_checked_together() {
        let item = stock("main", "OIL-5W30", 5);
        let id = item.id;
        let ledger = InMemoryLedger::with_items("main", [item]).unwrap();
        let demands = vec![
            StockDemand {
                stock_id: id,
                part_number: "OIL-5W30".to_string(),
                quantity: 3,
            },
            StockDemand {
                stock_id: id,
                part_number: "OIL-5W30".to_string(),
                quantity: 3,
            },
        ];
        assert!(ensure_available(&ledger, &demands).is_err());
    }

    #[test]
    fn test_sale_with_one_short_item_moves_nothing() {
        let pads = stock("main", "BRK-001", 10);
        let filter = stock("main", "FLT-002", 1);
        let (pads_id, filter_id) = (pads.id, filter.id);
        let mut ledger = InMemoryLedger::with_items("main", [pads, filter]).unwrap();

        let mut sale = CounterSale::new(
            "CS2405170001".to_string(),
            NewCounterSale {
                items: vec![
                    LineItem::new("BRK-001", "Brake pad", 2, Decimal::from(100)),
                    LineItem::new("FLT-002", "Oil filter", 2, Decimal::from(50)),
                ],
                ..Default::default()
            },
            None,
        )
        .unwrap();

        let err = sale.complete_sale(&mut ledger).unwrap_err();
        assert!(matches!(err, WorkflowError::InsufficientStock { .. }));
        assert_eq!(ledger.quantity_of(pads_id), Some(10));
        assert_eq!(ledger.quantity_of(filter_id), Some(1));
        assert!(ledger.journal().is_empty());
        assert!(!sale.stock_deducted);
    }

    #[test]
    fn test_journal_records_resulting_quantity() {
        let item = stock("main", "BRK-001", 10);
        let id = item.id;
        let mut ledger = InMemoryLedger::with_items("main", [item]).unwrap();
        ledger.adjust(id, -4, &adjustment()).unwrap();
        ledger.adjust(id, 2, &adjustment()).unwrap();

        let journal = ledger.take_journal();
        assert_eq!(journal.len(), 2);
        assert_eq!(journal[0].quantity_after, 6);
        assert_eq!(journal[1].quantity_after, 8);
        assert!(ledger.journal().is_empty());
    }

    #[test]
    fn test_unknown_part_is_not_found() {
        let ledger = InMemoryLedger::new("main");
        let err = ledger.lookup_part("main", "NOPE-1").unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound { .. }));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// No sequence of adjustments leaves a row below zero, and every
        /// rejected adjustment leaves the quantity where it was
        #[test]
        fn prop_quantity_never_negative(
            opening in quantity_strategy(),
            deltas in prop::collection::vec(delta_strategy(), 1..30)
        ) {
            let item = stock("main", "BRK-001", opening);
            let id = item.id;
            let mut ledger = InMemoryLedger::with_items("main", [item]).unwrap();
            let mut expected = opening;

            for delta in deltas {
                let before = ledger.quantity_of(id).unwrap();
                match ledger.adjust(id, delta, &adjustment()) {
                    Ok(row) => {
                        expected += delta;
                        prop_assert_eq!(row.quantity_on_hand, expected);
                    }
                    Err(_) => {
                        prop_assert!(before + delta < 0);
                        prop_assert_eq!(ledger.quantity_of(id).unwrap(), before);
                    }
                }
                prop_assert!(ledger.quantity_of(id).unwrap() >= 0);
            }
        }

        /// The journal sums to the net change in quantity
        #[test]
        fn prop_journal_sums_to_net_change(
            opening in quantity_strategy(),
            deltas in prop::collection::vec(delta_strategy(), 1..30)
        ) {
            let item = stock("main", "OIL-5W30", opening);
            let id = item.id;
            let mut ledger = InMemoryLedger::with_items("main", [item]).unwrap();
            for delta in deltas {
                let _ = ledger.adjust(id, delta, &adjustment());
            }
            let net: i32 = ledger.journal().iter().map(|m| m.delta).sum();
            prop_assert_eq!(ledger.quantity_of(id).unwrap(), opening + net);
        }

        /// A sale either deducts every line or leaves stock untouched
        #[test]
        fn prop_sale_completion_all_or_nothing(
            on_hand in prop::collection::vec(quantity_strategy(), 1..5),
            wanted in prop::collection::vec(1i32..20, 1..5)
        ) {
            let count = on_hand.len().min(wanted.len());
            let rows: Vec<StockItem> = (0..count)
                .map(|i| stock("main", &format!("PART-{}", i), on_hand[i]))
                .collect();
            let ids: Vec<_> = rows.iter().map(|r| r.id).collect();
            let mut ledger = InMemoryLedger::with_items("main", rows).unwrap();

            let items = (0..count)
                .map(|i| LineItem::new(format!("PART-{}", i), "Part", wanted[i], Decimal::from(10)))
                .collect();
            let mut sale = CounterSale::new(
                "CS2405170001".to_string(),
                NewCounterSale { items, ..Default::default() },
                None,
            )
            .unwrap();

            let coverable = (0..count).all(|i| on_hand[i] >= wanted[i]);
            let result = sale.complete_sale(&mut ledger);
            prop_assert_eq!(result.is_ok(), coverable);
            for i in 0..count {
                let expected = if coverable { on_hand[i] - wanted[i] } else { on_hand[i] };
                prop_assert_eq!(ledger.quantity_of(ids[i]).unwrap(), expected);
            }
        }
    }
}
