//! Document workflow tests
//!
//! Scenario and property tests for the stock-moving documents:
//! - Purchase order receiving and status derivation
//! - Stock inward verification against a purchase order
//! - Counter sales, cancellations and refunds
//! - Job-card issues and returns
//! - Inter-workshop transfer conservation
//! - Purchase return approval, shipment and return allowances
//! - Low-stock alert classification

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    assess, AlertPriority, AlertType, CounterSale, CounterSaleStatus, DispatchDetails, InMemoryLedger, IssueItem,
    ItemCondition, ItemReceipt, LineInput, LineItem, NewPurchaseOrder, NewPurchaseReturn, NewStockIssue,
    NewStockItem, NewStockTransfer, PartQuantity, Payment, PaymentMethod, PaymentStatus, PurchaseOrder,
    PurchaseOrderStatus, PurchaseReturn, PurchaseReturnStatus, QuickSale, ReturnAllowance, ReturnItem, ReturnLine,
    ReturnReason, ShipmentDetails, ShipmentMethod, ShipmentPatch, StockAlert, StockInward, StockInwardStatus,
    StockIssue, StockIssueStatus, StockItem, StockTransfer, StockTransferStatus, TaxType, TransferItemStatus,
    Vehicle, VendorContact, WorkflowError,
};

fn stock(workshop: &str, part_number: &str, qty: i32, min: i32) -> StockItem {
    StockItem::new(
        NewStockItem {
            part_number: part_number.to_string(),
            part_name: format!("Part {}", part_number),
            brand: Some("Bosch".to_string()),
            category: Some("Brakes".to_string()),
            workshop: Some(workshop.to_string()),
            opening_quantity: qty,
            purchase_price: Decimal::from(80),
            selling_price: Decimal::from(100),
            tax_type: TaxType::None,
            tax_percent: Decimal::ZERO,
            rack_no: None,
            min_stock_level: min,
            max_stock_level: None,
            location: None,
        },
        workshop,
    )
    .unwrap()
}

fn line(part_number: &str, qty: i32) -> LineItem {
    LineItem::new(part_number, format!("Part {}", part_number), qty, Decimal::from(80))
}

fn draft_order(parts: Vec<LineItem>) -> PurchaseOrder {
    PurchaseOrder::new(
        "PO24050001".to_string(),
        NewPurchaseOrder {
            vendor_name: "Apex Auto Spares".to_string(),
            vendor_contact: VendorContact::default(),
            job_card_no: None,
            reg_no: None,
            order_date: None,
            ordered_parts: parts,
            notes: None,
        },
        None,
    )
    .unwrap()
}

fn order(parts: Vec<LineItem>) -> PurchaseOrder {
    let mut order = draft_order(parts);
    order.submit().unwrap();
    order
}

fn quick_sale(ledger: &mut InMemoryLedger, lines: Vec<LineInput>, paid: i64) -> CounterSale {
    CounterSale::quick_sale(
        "CS24050001".to_string(),
        QuickSale {
            customer: None,
            reg_no: Some("KA01AB1234".to_string()),
            items: lines,
            payments: vec![Payment::new(Decimal::from(paid), PaymentMethod::Cash)],
            bill_discount: None,
            notes: None,
        },
        ledger,
        None,
    )
    .unwrap()
}

fn return_line(part_number: &str, qty: i32) -> ReturnLine {
    ReturnLine {
        part_number: part_number.to_string(),
        quantity: qty,
        reason: ReturnReason::Defective,
        reason_details: None,
        condition: ItemCondition::Unopened,
    }
}

fn return_item(part_number: &str, qty: i32) -> ReturnItem {
    ReturnItem {
        line: line(part_number, qty),
        reason: ReturnReason::Defective,
        reason_details: None,
        condition: ItemCondition::Unopened,
    }
}

fn issue(ledger: &InMemoryLedger, lines: &[LineInput]) -> StockIssue {
    let items = lines
        .iter()
        .map(|l| IssueItem::resolve(ledger, "main", l))
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    StockIssue::new(
        "ISS24050001".to_string(),
        NewStockIssue {
            job_card_no: Some("JC-1042".to_string()),
            job_card_id: None,
            reg_no: Some("KA01AB1234".to_string()),
            vehicle: Vehicle::default(),
            issued_to: Some("Bay 3".to_string()),
            issue_date: None,
            items,
            notes: None,
        },
        None,
    )
    .unwrap()
}

fn transfer(parts: Vec<LineItem>) -> StockTransfer {
    let mut transfer = StockTransfer::new(
        "STF24050001".to_string(),
        NewStockTransfer {
            from_workshop: "main".to_string(),
            to_workshop: "north".to_string(),
            transfer_date: None,
            items: parts,
            transfer_reason: None,
            notes: None,
        },
        None,
    )
    .unwrap();
    transfer.submit_for_approval().unwrap();
    transfer
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_purchase_order_receiving_updates_stock_and_status() {
        let pads = stock("main", "BRK-001", 2, 0);
        let pads_id = pads.id;
        let mut ledger = InMemoryLedger::with_items("main", [pads]).unwrap();
        let mut po = order(vec![line("BRK-001", 10)]);
        assert_eq!(po.status, PurchaseOrderStatus::Pending);

        po.inward_parts(&[PartQuantity::new("BRK-001", 4)], true, &mut ledger).unwrap();
        assert_eq!(po.status, PurchaseOrderStatus::PartiallyReceived);
        assert_eq!(ledger.quantity_of(pads_id), Some(6));
        assert_eq!(po.outstanding_qty("BRK-001"), 6);

        let err = po
            .inward_parts(&[PartQuantity::new("BRK-001", 7)], true, &mut ledger)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::ExceedsOrderedQuantity { max: 6, .. }));
        assert_eq!(ledger.quantity_of(pads_id), Some(6));

        po.reject_parts(&[PartQuantity::new("BRK-001", 6)]).unwrap();
        assert_eq!(po.status, PurchaseOrderStatus::Received);
        assert!(po.pending_parts.is_empty());
    }

    #[test]
    fn test_inward_without_stock_update_leaves_ledger() {
        let pads = stock("main", "BRK-001", 2, 0);
        let pads_id = pads.id;
        let mut ledger = InMemoryLedger::with_items("main", [pads]).unwrap();
        let mut po = order(vec![line("BRK-001", 3)]);

        po.inward_parts(&[PartQuantity::new("BRK-001", 3)], false, &mut ledger).unwrap();
        assert_eq!(po.status, PurchaseOrderStatus::Received);
        assert_eq!(ledger.quantity_of(pads_id), Some(2));
        assert!(ledger.journal().is_empty());
    }

    #[test]
    fn test_inward_verification_stocks_parts_and_fills_order() {
        let pads = stock("main", "BRK-001", 2, 0);
        let filter = stock("main", "FLT-002", 0, 0);
        let (pads_id, filter_id) = (pads.id, filter.id);
        let mut ledger = InMemoryLedger::with_items("main", [pads, filter]).unwrap();
        let mut po = order(vec![line("BRK-001", 10), line("FLT-002", 4)]);

        let mut inward =
            StockInward::from_purchase_order("INW24050001".to_string(), &po, Some("RC-881".to_string()), None).unwrap();
        assert_eq!(inward.purchase_order_id, Some(po.id));
        inward.submit_for_verification().unwrap();
        inward.verify_and_update_stock(&mut ledger, Some(&mut po), None).unwrap();

        assert_eq!(inward.status, StockInwardStatus::Verified);
        assert!(inward.stock_updated);
        assert_eq!(ledger.quantity_of(pads_id), Some(12));
        assert_eq!(ledger.quantity_of(filter_id), Some(4));
        assert_eq!(ledger.journal().len(), 2);
        assert_eq!(po.inwarded_qty("BRK-001"), 10);
        assert_eq!(po.inwarded_qty("FLT-002"), 4);
        assert_eq!(po.status, PurchaseOrderStatus::Received);

        let err = inward.verify_and_update_stock(&mut ledger, Some(&mut po), None).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
        assert_eq!(ledger.quantity_of(pads_id), Some(12));
    }

    #[test]
    fn test_inward_needs_a_submitted_order() {
        let po = draft_order(vec![line("BRK-001", 10)]);
        let err = StockInward::from_purchase_order("INW24050001".to_string(), &po, None, None).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
    }

    #[test]
    fn test_stale_inward_still_verifies_and_fills_only_outstanding() {
        let pads = stock("main", "BRK-001", 0, 0);
        let pads_id = pads.id;
        let mut ledger = InMemoryLedger::with_items("main", [pads]).unwrap();
        let mut po = order(vec![line("BRK-001", 10)]);

        let mut inward = StockInward::from_purchase_order("INW24050001".to_string(), &po, None, None).unwrap();
        assert_eq!(inward.items[0].quantity, 10);
        po.inward_parts(&[PartQuantity::new("BRK-001", 2)], true, &mut ledger).unwrap();
        assert_eq!(po.outstanding_qty("BRK-001"), 8);

        inward.submit_for_verification().unwrap();
        inward.verify_and_update_stock(&mut ledger, Some(&mut po), None).unwrap();

        assert_eq!(inward.status, StockInwardStatus::Verified);
        assert_eq!(ledger.quantity_of(pads_id), Some(12));
        assert_eq!(po.inwarded_qty("BRK-001"), 10);
        assert_eq!(po.outstanding_qty("BRK-001"), 0);
        assert_eq!(po.status, PurchaseOrderStatus::Received);
    }

    #[test]
    fn test_inward_against_cancelled_order_still_stocks_parts() {
        let pads = stock("main", "BRK-001", 0, 0);
        let pads_id = pads.id;
        let mut ledger = InMemoryLedger::with_items("main", [pads]).unwrap();
        let mut po = order(vec![line("BRK-001", 5)]);

        let mut inward = StockInward::from_purchase_order("INW24050001".to_string(), &po, None, None).unwrap();
        po.cancel(Some("vendor closed".to_string())).unwrap();
        inward.submit_for_verification().unwrap();
        inward.verify_and_update_stock(&mut ledger, Some(&mut po), None).unwrap();

        assert_eq!(ledger.quantity_of(pads_id), Some(5));
        assert_eq!(po.inwarded_qty("BRK-001"), 0);
        assert_eq!(po.status, PurchaseOrderStatus::Cancelled);
    }

    #[test]
    fn test_quick_sale_deducts_and_completes() {
        let pads = stock("main", "BRK-001", 10, 0);
        let pads_id = pads.id;
        let mut ledger = InMemoryLedger::with_items("main", [pads]).unwrap();

        let sale = quick_sale(&mut ledger, vec![LineInput::for_part("BRK-001", 3)], 300);

        assert_eq!(sale.status, CounterSaleStatus::Completed);
        assert!(sale.stock_deducted);
        assert_eq!(sale.items[0].stock_id, Some(pads_id));
        assert_eq!(sale.totals.total_amount, Decimal::from(300));
        assert_eq!(sale.totals.payment_status, PaymentStatus::Paid);
        assert_eq!(ledger.quantity_of(pads_id), Some(7));
    }

    #[test]
    fn test_quick_sale_short_item_moves_nothing() {
        let pads = stock("main", "BRK-001", 10, 0);
        let filter = stock("main", "FLT-002", 1, 0);
        let (pads_id, filter_id) = (pads.id, filter.id);
        let mut ledger = InMemoryLedger::with_items("main", [pads, filter]).unwrap();

        let err = CounterSale::quick_sale(
            "CS24050001".to_string(),
            QuickSale {
                items: vec![LineInput::for_part("BRK-001", 2), LineInput::for_part("FLT-002", 2)],
                ..QuickSale::default()
            },
            &mut ledger,
            None,
        )
        .unwrap_err();

        assert!(matches!(err, WorkflowError::InsufficientStock { available: 1, requested: 2, .. }));
        assert_eq!(ledger.quantity_of(pads_id), Some(10));
        assert_eq!(ledger.quantity_of(filter_id), Some(1));
        assert!(ledger.journal().is_empty());
    }

    #[test]
    fn test_counter_sale_cancel_restores_stock() {
        let pads = stock("main", "BRK-001", 10, 0);
        let pads_id = pads.id;
        let mut ledger = InMemoryLedger::with_items("main", [pads]).unwrap();
        let mut sale = quick_sale(&mut ledger, vec![LineInput::for_part("BRK-001", 3)], 300);

        sale.cancel(Some("customer left".to_string()), &mut ledger).unwrap();

        assert_eq!(sale.status, CounterSaleStatus::Cancelled);
        assert!(!sale.stock_deducted);
        assert_eq!(ledger.quantity_of(pads_id), Some(10));
        assert!(sale.refund(None, None, &mut ledger).is_err());
        assert_eq!(ledger.quantity_of(pads_id), Some(10));
    }

    #[test]
    fn test_counter_sale_refund_restores_stock() {
        let pads = stock("main", "BRK-001", 10, 0);
        let pads_id = pads.id;
        let mut ledger = InMemoryLedger::with_items("main", [pads]).unwrap();
        let mut sale = quick_sale(&mut ledger, vec![LineInput::for_part("BRK-001", 3)], 300);

        let err = sale.refund(None, Some(Decimal::from(500)), &mut ledger).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation { .. }));
        assert_eq!(ledger.quantity_of(pads_id), Some(7));

        sale.refund(Some("wrong part".to_string()), None, &mut ledger).unwrap();
        assert_eq!(sale.status, CounterSaleStatus::Refunded);
        assert_eq!(sale.refund_amount, Some(Decimal::from(300)));
        assert_eq!(ledger.quantity_of(pads_id), Some(10));
    }

    #[test]
    fn test_issue_beyond_on_hand_leaves_ledger() {
        let pads = stock("main", "BRK-001", 10, 0);
        let pads_id = pads.id;
        let mut ledger = InMemoryLedger::with_items("main", [pads]).unwrap();
        let mut doc = issue(&ledger, &[LineInput::for_part("BRK-001", 12)]);

        let err = doc
            .issue_parts(&[PartQuantity::new("BRK-001", 12)], &mut ledger, None)
            .unwrap_err();

        assert!(matches!(err, WorkflowError::InsufficientStock { available: 10, requested: 12, .. }));
        assert_eq!(ledger.quantity_of(pads_id), Some(10));
        assert!(ledger.journal().is_empty());
        assert_eq!(doc.status, StockIssueStatus::Pending);
        assert_eq!(doc.items[0].issued_qty, 0);
    }

    #[test]
    fn test_issue_and_return_bounds() {
        let pads = stock("main", "BRK-001", 10, 0);
        let pads_id = pads.id;
        let mut ledger = InMemoryLedger::with_items("main", [pads]).unwrap();
        let mut doc = issue(&ledger, &[LineInput::for_part("BRK-001", 5)]);

        doc.issue_parts(&[PartQuantity::new("BRK-001", 2)], &mut ledger, None).unwrap();
        assert_eq!(doc.status, StockIssueStatus::PartiallyIssued);
        assert_eq!(ledger.quantity_of(pads_id), Some(8));

        let err = doc
            .return_parts(&[PartQuantity::new("BRK-001", 3)], &mut ledger)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::ExceedsIssuedQuantity { max: 2, .. }));

        doc.return_parts(&[PartQuantity::new("BRK-001", 1)], &mut ledger).unwrap();
        assert_eq!(doc.status, StockIssueStatus::PartiallyReturned);
        assert_eq!(ledger.quantity_of(pads_id), Some(9));
    }

    #[test]
    fn test_issue_cancel_restores_outstanding() {
        let pads = stock("main", "BRK-001", 10, 0);
        let pads_id = pads.id;
        let mut ledger = InMemoryLedger::with_items("main", [pads]).unwrap();
        let mut doc = issue(&ledger, &[LineInput::for_part("BRK-001", 4)]);

        doc.issue_parts(&[PartQuantity::new("BRK-001", 4)], &mut ledger, None).unwrap();
        doc.return_parts(&[PartQuantity::new("BRK-001", 1)], &mut ledger).unwrap();
        doc.cancel(Some("job card closed".to_string()), &mut ledger).unwrap();

        assert_eq!(doc.status, StockIssueStatus::Cancelled);
        assert_eq!(ledger.quantity_of(pads_id), Some(10));
    }

    #[test]
    fn test_issue_requires_stocked_parts() {
        let ledger = InMemoryLedger::new("main");
        let err = IssueItem::resolve(&ledger, "main", &LineInput::for_part("NOPE-1", 1)).unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound { .. }));
    }

    #[test]
    fn test_issue_all_reports_shortfalls() {
        let pads = stock("main", "BRK-001", 10, 0);
        let filter = stock("main", "FLT-002", 0, 0);
        let (pads_id, filter_id) = (pads.id, filter.id);
        let mut ledger = InMemoryLedger::with_items("main", [pads, filter]).unwrap();
        let mut doc = issue(
            &ledger,
            &[LineInput::for_part("BRK-001", 3), LineInput::for_part("FLT-002", 2)],
        );

        let outcome = doc.issue_all_parts(&mut ledger, None).unwrap();
        assert_eq!(outcome.issued, vec![PartQuantity::new("BRK-001", 3)]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].part_number, "FLT-002");
        assert_eq!(ledger.quantity_of(pads_id), Some(7));
        assert_eq!(ledger.quantity_of(filter_id), Some(0));
        assert_eq!(doc.status, StockIssueStatus::PartiallyIssued);
    }

    #[test]
    fn test_transfer_dispatch_and_receive_with_damage() {
        let source = stock("main", "BRK-001", 10, 0);
        let destination = source.provision_for("north");
        let (source_id, destination_id) = (source.id, destination.id);
        let mut ledger = InMemoryLedger::with_items("main", [source, destination]).unwrap();
        let mut doc = transfer(vec![line("BRK-001", 6)]);

        doc.approve(&ledger, None).unwrap();
        doc.dispatch(&mut ledger, DispatchDetails::default(), None).unwrap();
        assert_eq!(doc.status, StockTransferStatus::InTransit);
        assert_eq!(ledger.quantity_of(source_id), Some(4));

        let receipts = [ItemReceipt {
            part_number: "BRK-001".to_string(),
            received_qty: None,
            damaged_qty: Some(1),
            remarks: Some("one box crushed".to_string()),
        }];
        doc.receive(&receipts, None, &mut ledger, None).unwrap();

        assert_eq!(doc.status, StockTransferStatus::Received);
        assert_eq!(doc.items[0].received_qty, 5);
        assert_eq!(doc.items[0].status, TransferItemStatus::Damaged);
        assert_eq!(ledger.quantity_of(destination_id), Some(5));
        assert_eq!(ledger.quantity_of(source_id), Some(4));
    }

    #[test]
    fn test_transfer_receipt_cannot_exceed_sent() {
        let source = stock("main", "BRK-001", 10, 0);
        let destination = source.provision_for("north");
        let mut ledger = InMemoryLedger::with_items("main", [source, destination]).unwrap();
        let mut doc = transfer(vec![line("BRK-001", 3)]);
        doc.approve(&ledger, None).unwrap();
        doc.dispatch(&mut ledger, DispatchDetails::default(), None).unwrap();

        let receipts = [ItemReceipt {
            part_number: "BRK-001".to_string(),
            received_qty: Some(3),
            damaged_qty: Some(1),
            remarks: None,
        }];
        let err = doc.receive(&receipts, None, &mut ledger, None).unwrap_err();
        assert!(matches!(err, WorkflowError::ExceedsSentQuantity { max: 3, .. }));
        assert_eq!(doc.status, StockTransferStatus::InTransit);
    }

    #[test]
    fn test_transfer_cancel_after_dispatch_restores_source() {
        let source = stock("main", "BRK-001", 10, 0);
        let source_id = source.id;
        let mut ledger = InMemoryLedger::with_items("main", [source]).unwrap();
        let mut doc = transfer(vec![line("BRK-001", 4)]);
        doc.approve(&ledger, None).unwrap();
        doc.dispatch(&mut ledger, DispatchDetails::default(), None).unwrap();
        assert_eq!(ledger.quantity_of(source_id), Some(6));

        doc.cancel(Some("vehicle breakdown".to_string()), &mut ledger).unwrap();
        assert_eq!(doc.status, StockTransferStatus::Cancelled);
        assert_eq!(ledger.quantity_of(source_id), Some(10));
        assert!(!doc.source_stock_deducted);
    }

    #[test]
    fn test_transfer_line_pinned_to_another_workshop_is_rejected() {
        let source = stock("main", "BRK-001", 10, 0);
        let mut destination = source.provision_for("north");
        destination.quantity_on_hand = 8;
        let (source_id, destination_id) = (source.id, destination.id);
        let mut ledger = InMemoryLedger::with_items("main", [source, destination]).unwrap();

        let mut pinned = transfer(vec![line("BRK-001", 5).with_stock_id(destination_id)]);
        let err = pinned.approve(&ledger, None).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation { .. }));
        assert_eq!(pinned.status, StockTransferStatus::PendingApproval);

        let mut repinned = transfer(vec![line("BRK-001", 5)]);
        repinned.approve(&ledger, None).unwrap();
        repinned.items[0].line.stock_id = Some(destination_id);
        let err = repinned
            .dispatch(&mut ledger, DispatchDetails::default(), None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation { .. }));

        assert_eq!(ledger.quantity_of(source_id), Some(10));
        assert_eq!(ledger.quantity_of(destination_id), Some(8));
        assert!(ledger.journal().is_empty());
    }

    #[test]
    fn test_transfer_dispatch_takes_from_source_workshop_only() {
        let source = stock("main", "BRK-001", 10, 0);
        let mut destination = source.provision_for("north");
        destination.quantity_on_hand = 8;
        let (source_id, destination_id) = (source.id, destination.id);
        let mut ledger = InMemoryLedger::with_items("main", [source, destination]).unwrap();

        let mut doc = transfer(vec![line("BRK-001", 5).with_stock_id(source_id)]);
        doc.approve(&ledger, None).unwrap();
        doc.dispatch(&mut ledger, DispatchDetails::default(), None).unwrap();
        assert_eq!(ledger.quantity_of(source_id), Some(5));
        assert_eq!(ledger.quantity_of(destination_id), Some(8));

        doc.cancel(None, &mut ledger).unwrap();
        assert_eq!(ledger.quantity_of(source_id), Some(10));
        assert_eq!(ledger.quantity_of(destination_id), Some(8));
    }

    #[test]
    fn test_transfer_approval_checks_source_stock() {
        let source = stock("main", "BRK-001", 2, 0);
        let ledger = InMemoryLedger::with_items("main", [source]).unwrap();
        let mut doc = transfer(vec![line("BRK-001", 3)]);

        let err = doc.approve(&ledger, None).unwrap_err();
        assert!(matches!(err, WorkflowError::InsufficientStock { .. }));
        assert_eq!(doc.status, StockTransferStatus::PendingApproval);
    }

    #[test]
    fn test_purchase_return_approve_then_cancel() {
        let pads = stock("main", "BRK-001", 5, 0);
        let pads_id = pads.id;
        let mut ledger = InMemoryLedger::with_items("main", [pads]).unwrap();
        let mut doc = PurchaseReturn::new(
            "PR24050001".to_string(),
            NewPurchaseReturn {
                vendor_name: "Apex Auto Spares".to_string(),
                vendor_contact: VendorContact::default(),
                job_card_no: None,
                reg_no: None,
                returned_date: None,
                items: vec![ReturnItem {
                    line: line("BRK-001", 2),
                    reason: ReturnReason::Defective,
                    reason_details: None,
                    condition: ItemCondition::Unopened,
                }],
                notes: None,
            },
            None,
        )
        .unwrap();
        doc.submit_for_approval().unwrap();

        doc.approve(&mut ledger, None).unwrap();
        assert_eq!(doc.status, PurchaseReturnStatus::Approved);
        assert_eq!(ledger.quantity_of(pads_id), Some(3));

        doc.cancel(None, &mut ledger).unwrap();
        assert_eq!(doc.status, PurchaseReturnStatus::Cancelled);
        assert_eq!(ledger.quantity_of(pads_id), Some(5));
    }

    #[test]
    fn test_purchase_return_shipment_can_be_corrected() {
        let pads = stock("main", "BRK-001", 5, 0);
        let mut ledger = InMemoryLedger::with_items("main", [pads]).unwrap();
        let mut doc = PurchaseReturn::new(
            "PR24050001".to_string(),
            NewPurchaseReturn {
                vendor_name: "Apex Auto Spares".to_string(),
                vendor_contact: VendorContact::default(),
                job_card_no: None,
                reg_no: None,
                returned_date: None,
                items: vec![return_item("BRK-001", 2)],
                notes: None,
            },
            None,
        )
        .unwrap();
        doc.submit_for_approval().unwrap();
        doc.approve(&mut ledger, None).unwrap();

        let early = doc.update_shipment(ShipmentPatch::default()).unwrap_err();
        assert!(matches!(early, WorkflowError::InvalidTransition { .. }));

        doc.mark_shipped(ShipmentDetails {
            method: Some(ShipmentMethod::Courier),
            courier_name: Some("Blue Dart".to_string()),
            tracking_no: Some("BD-1001".to_string()),
            shipping_cost: Decimal::from(120),
            ..ShipmentDetails::default()
        })
        .unwrap();
        let shipped_date = doc.shipment.shipped_date;

        doc.update_shipment(ShipmentPatch {
            tracking_no: Some("BD-1002".to_string()),
            shipping_cost: Some(Decimal::from(150)),
            ..ShipmentPatch::default()
        })
        .unwrap();
        assert_eq!(doc.status, PurchaseReturnStatus::Shipped);
        assert_eq!(doc.shipment.tracking_no.as_deref(), Some("BD-1002"));
        assert_eq!(doc.shipment.courier_name.as_deref(), Some("Blue Dart"));
        assert_eq!(doc.shipment.shipping_cost, Decimal::from(150));
        assert_eq!(doc.shipment.shipped_date, shipped_date);

        let negative = ShipmentPatch {
            shipping_cost: Some(Decimal::from(-1)),
            ..ShipmentPatch::default()
        };
        assert!(matches!(doc.update_shipment(negative), Err(WorkflowError::Validation { .. })));

        doc.mark_delivered(None).unwrap();
        doc.update_shipment(ShipmentPatch {
            notes: Some("signed by stores".to_string()),
            ..ShipmentPatch::default()
        })
        .unwrap();
        assert_eq!(doc.shipment.notes.as_deref(), Some("signed by stores"));
        assert!(doc.update_items(vec![return_item("BRK-001", 1)], None).is_err());
    }

    #[test]
    fn test_return_allowance_counts_earlier_returns() {
        let mut ledger = InMemoryLedger::new("main");
        let mut po = order(vec![line("BRK-001", 10)]);
        po.inward_parts(&[PartQuantity::new("BRK-001", 6)], false, &mut ledger).unwrap();

        let mut first =
            PurchaseReturn::from_purchase_order("PR24050001".to_string(), &po, &[], &[return_line("BRK-001", 4)], None)
                .unwrap();
        assert_eq!(first.order_no.as_deref(), Some("PO24050001"));

        let err = PurchaseReturn::from_purchase_order(
            "PR24050002".to_string(),
            &po,
            std::slice::from_ref(&first),
            &[return_line("BRK-001", 3)],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, WorkflowError::ExceedsIssuedQuantity { requested: 3, max: 2, .. }));

        let mut second = PurchaseReturn::from_purchase_order(
            "PR24050002".to_string(),
            &po,
            std::slice::from_ref(&first),
            &[return_line("BRK-001", 2)],
            None,
        )
        .unwrap();

        // editing the second return is bounded by the first one too
        let others = vec![first.clone(), second.clone()];
        let allowance = ReturnAllowance::for_purchase_order(&po, &others, Some(second.id));
        assert_eq!(allowance.remaining("BRK-001"), 2);
        let err = second
            .update_items(vec![return_item("BRK-001", 3)], Some(&allowance))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::ExceedsIssuedQuantity { max: 2, .. }));
        assert!(matches!(
            second.update_items(vec![return_item("BRK-001", 1)], None),
            Err(WorkflowError::Validation { .. })
        ));
        assert_eq!(second.items[0].line.quantity, 2);

        first.cancel(None, &mut ledger).unwrap();
        let others = vec![first.clone(), second.clone()];
        let allowance = ReturnAllowance::for_purchase_order(&po, &others, Some(second.id));
        assert_eq!(allowance.remaining("BRK-001"), 6);
        assert_eq!(allowance.remaining("FLT-002"), 0);
        second
            .update_items(vec![return_item("BRK-001", 6)], Some(&allowance))
            .unwrap();
        assert_eq!(second.items[0].line.quantity, 6);
    }

    #[test]
    fn test_alert_classification() {
        let out = stock("main", "BRK-001", 0, 4);
        let out_assessment = assess(&out).unwrap();
        assert_eq!(out_assessment.alert_type, AlertType::OutOfStock);
        assert_eq!(out_assessment.priority, AlertPriority::Critical);
        assert_eq!(out_assessment.reorder_qty, 8);

        let half = stock("main", "FLT-002", 2, 4);
        assert_eq!(assess(&half).unwrap().priority, AlertPriority::High);

        let near = stock("main", "OIL-5W30", 4, 5);
        assert_eq!(assess(&near).unwrap().priority, AlertPriority::Medium);

        let healthy = stock("main", "WPR-003", 9, 5);
        assert!(assess(&healthy).is_none());
        assert!(StockAlert::raise("ALT24050001".to_string(), &healthy).is_none());

        let untracked = stock("main", "BLB-004", 0, 0);
        assert!(assess(&untracked).is_none());
    }

    #[test]
    fn test_alert_lifecycle() {
        let low = stock("main", "BRK-001", 1, 4);
        let mut alert = StockAlert::raise("ALT24050001".to_string(), &low).unwrap();
        assert!(alert.status.is_open());

        alert.acknowledge(None).unwrap();
        alert.resolve(Some("reordered on PO24050002".to_string())).unwrap();
        assert!(!alert.status.is_open());
        assert!(alert.acknowledge(None).is_err());
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

        /// Units leaving the source equal units received plus units damaged
        /// or lost; only received units reach the destination
        #[test]
        fn prop_transfer_conserves_units(
            on_hand in 1i32..50,
            sent in 1i32..50,
            damaged in 0i32..50,
            received in 0i32..50
        ) {
            prop_assume!(sent <= on_hand);
            prop_assume!(damaged + received <= sent);

            let source = stock("main", "BRK-001", on_hand, 0);
            let destination = source.provision_for("north");
            let (source_id, destination_id) = (source.id, destination.id);
            let mut ledger = InMemoryLedger::with_items("main", [source, destination]).unwrap();

            let mut doc = transfer(vec![line("BRK-001", sent)]);
            doc.approve(&ledger, None).unwrap();
            doc.dispatch(&mut ledger, DispatchDetails::default(), None).unwrap();
            let receipts = [ItemReceipt {
                part_number: "BRK-001".to_string(),
                received_qty: Some(received),
                damaged_qty: Some(damaged),
                remarks: None,
            }];
            doc.receive(&receipts, None, &mut ledger, None).unwrap();

            prop_assert_eq!(ledger.quantity_of(source_id).unwrap(), on_hand - sent);
            prop_assert_eq!(ledger.quantity_of(destination_id).unwrap(), received);
            let item = &doc.items[0];
            prop_assert!(item.received_qty + item.damaged_qty <= item.sent_qty);
        }

        /// Purchase order status follows from what has been accounted for
        #[test]
        fn prop_purchase_order_status_derivation(
            ordered in 1i32..40,
            inwarded in 0i32..40,
            rejected in 0i32..40
        ) {
            prop_assume!(inwarded + rejected <= ordered);

            let pads = stock("main", "BRK-001", 0, 0);
            let mut ledger = InMemoryLedger::with_items("main", [pads]).unwrap();
            let mut po = order(vec![line("BRK-001", ordered)]);
            if inwarded > 0 {
                po.inward_parts(&[PartQuantity::new("BRK-001", inwarded)], true, &mut ledger).unwrap();
            }
            if rejected > 0 {
                po.reject_parts(&[PartQuantity::new("BRK-001", rejected)]).unwrap();
            }

            let expected = match inwarded + rejected {
                0 => PurchaseOrderStatus::Pending,
                n if n == ordered => PurchaseOrderStatus::Received,
                _ => PurchaseOrderStatus::PartiallyReceived,
            };
            prop_assert_eq!(po.status, expected);
            prop_assert_eq!(ledger.quantity_at("main", "BRK-001"), inwarded);
            prop_assert_eq!(po.outstanding_qty("BRK-001"), ordered - inwarded - rejected);
        }

        /// Net issued quantity stays between zero and the requested quantity
        #[test]
        fn prop_issue_return_bounds(
            requested in 1i32..20,
            ops in prop::collection::vec((any::<bool>(), 1i32..10), 1..15)
        ) {
            let pads = stock("main", "BRK-001", 100, 0);
            let pads_id = pads.id;
            let mut ledger = InMemoryLedger::with_items("main", [pads]).unwrap();
            let mut doc = issue(&ledger, &[LineInput::for_part("BRK-001", requested)]);

            for (is_issue, qty) in ops {
                let parts = [PartQuantity::new("BRK-001", qty)];
                let _ = if is_issue {
                    doc.issue_parts(&parts, &mut ledger, None)
                } else {
                    doc.return_parts(&parts, &mut ledger)
                };
                let item = &doc.items[0];
                prop_assert!(item.net_issued() >= 0);
                prop_assert!(item.issued_qty <= item.requested_qty);
                prop_assert_eq!(ledger.quantity_of(pads_id).unwrap(), 100 - item.net_issued());
            }
        }
    }
}
