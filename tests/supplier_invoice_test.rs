//! Supplier invoicing: tax math, duplicate references, the inventory
//! side-effect and its compensation path, and status/reconciliation rules.

mod common;

use assert_matches::assert_matches;
use chrono::Utc;
use common::TestApp;
use rust_decimal_macros::dec;
use uuid::Uuid;
use warehouse_api::{
    entities::inventory_item::ItemStatus,
    entities::supplier_invoice::InvoiceStatus,
    errors::ServiceError,
    services::supplier_invoices::{NewInvoiceLine, NewSupplierInvoice, SupplierInvoicePatch},
};

fn invoice(invoice_ref: &str, lines: Vec<NewInvoiceLine>) -> NewSupplierInvoice {
    NewSupplierInvoice {
        invoice_ref: invoice_ref.to_string(),
        supplier_id: Uuid::new_v4(),
        invoice_date: Utc::now(),
        items: lines,
        vat_rate: dec!(20),
        additional_taxes: vec![("eco levy".to_string(), dec!(1))],
    }
}

fn line(item_id: Uuid, quantity: i32, price: &str) -> NewInvoiceLine {
    NewInvoiceLine {
        item_id,
        quantity,
        buying_price: price.parse().unwrap(),
        tax_rate: dec!(10),
    }
}

#[tokio::test]
async fn totals_cover_lines_vat_and_additional_taxes() {
    let app = TestApp::new().await;
    let item_a = app.seed_item("INV-A", 0, 1, 100).await;
    let item_b = app.seed_item("INV-B", 0, 1, 100).await;
    let actor = Uuid::new_v4();

    let created = app
        .services
        .supplier_invoices
        .create(
            invoice(
                "REF-001",
                vec![line(item_a, 10, "2.50"), line(item_b, 4, "5.00")],
            ),
            actor,
        )
        .await
        .unwrap();

    // 10 * 2.50 + 4 * 5.00 = 45.00
    assert_eq!(created.subtotal, dec!(45.00));
    // 20% VAT on the subtotal
    assert_eq!(created.vat_amount, dec!(9.00));
    // 1% eco levy
    assert_eq!(created.additional_taxes.0[0].amount, dec!(0.45));
    assert_eq!(created.total_amount, dec!(54.45));
    assert_eq!(created.status, InvoiceStatus::Pending);

    // Per-line stored computations.
    let first = &created.items.0[0];
    assert_eq!(first.total_price, dec!(25.00));
    assert_eq!(first.tax_amount, dec!(2.50));
}

#[tokio::test]
async fn duplicate_reference_is_a_conflict() {
    let app = TestApp::new().await;
    let item = app.seed_item("INV-C", 0, 1, 100).await;
    let actor = Uuid::new_v4();

    app.services
        .supplier_invoices
        .create(invoice("REF-DUP", vec![line(item, 1, "1.00")]), actor)
        .await
        .unwrap();

    let err = app
        .services
        .supplier_invoices
        .create(invoice("REF-DUP", vec![line(item, 1, "1.00")]), actor)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn creation_receives_stock_and_overwrites_buying_price() {
    let app = TestApp::new().await;
    let item = app.seed_item("INV-D", 0, 5, 100).await;
    let actor = Uuid::new_v4();

    let before = app.services.inventory.get(item).await.unwrap();
    assert_eq!(before.status, ItemStatus::OutOfStock);

    app.services
        .supplier_invoices
        .create(invoice("REF-RECV", vec![line(item, 40, "3.25")]), actor)
        .await
        .unwrap();

    let after = app.services.inventory.get(item).await.unwrap();
    assert_eq!(after.current_stock, 40);
    assert_eq!(after.buying_price, dec!(3.25));
    // Status follows the stock-affecting write.
    assert_eq!(after.status, ItemStatus::InStock);
}

#[tokio::test]
async fn failed_inventory_update_compensates_by_deleting_the_invoice() {
    let app = TestApp::new().await;
    let actor = Uuid::new_v4();

    let err = app
        .services
        .supplier_invoices
        .create(
            invoice("REF-GONE", vec![line(Uuid::new_v4(), 5, "1.00")]),
            actor,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidOperation(_));

    let (invoices, total, _) = app
        .services
        .supplier_invoices
        .list(warehouse_api::services::supplier_invoices::SupplierInvoiceQuery {
            page: 1,
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(total, 0);
    assert!(invoices.is_empty());
}

#[tokio::test]
async fn rejects_non_positive_quantities_and_negative_rates() {
    let app = TestApp::new().await;
    let item = app.seed_item("INV-E", 0, 1, 100).await;
    let actor = Uuid::new_v4();

    let err = app
        .services
        .supplier_invoices
        .create(invoice("REF-Q", vec![line(item, 0, "1.00")]), actor)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let mut negative_vat = invoice("REF-V", vec![line(item, 1, "1.00")]);
    negative_vat.vat_rate = dec!(-1);
    let err = app
        .services
        .supplier_invoices
        .create(negative_vat, actor)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn status_transitions_and_reconciliation_are_guarded() {
    let app = TestApp::new().await;
    let item = app.seed_item("INV-F", 0, 1, 100).await;
    let actor = Uuid::new_v4();

    let created = app
        .services
        .supplier_invoices
        .create(invoice("REF-ST", vec![line(item, 1, "1.00")]), actor)
        .await
        .unwrap();

    // pending -> paid
    let paid = app
        .services
        .supplier_invoices
        .update(
            created.id,
            SupplierInvoicePatch {
                status: Some(InvoiceStatus::Paid),
                is_reconciled: None,
            },
            actor,
        )
        .await
        .unwrap();
    assert_eq!(paid.status, InvoiceStatus::Paid);

    // paid -> pending is refused
    let err = app
        .services
        .supplier_invoices
        .update(
            created.id,
            SupplierInvoicePatch {
                status: Some(InvoiceStatus::Pending),
                is_reconciled: None,
            },
            actor,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));

    // reconcile once, then never again, never backwards
    let reconciled = app
        .services
        .supplier_invoices
        .update(
            created.id,
            SupplierInvoicePatch {
                status: None,
                is_reconciled: Some(true),
            },
            actor,
        )
        .await
        .unwrap();
    assert!(reconciled.is_reconciled);
    assert_eq!(reconciled.reconciled_by, Some(actor));

    for repeat in [true, false] {
        let err = app
            .services
            .supplier_invoices
            .update(
                created.id,
                SupplierInvoicePatch {
                    status: None,
                    is_reconciled: Some(repeat),
                },
                actor,
            )
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::InvalidOperation(_));
    }

    // paid -> cancelled is the one allowed move; cancelled is then terminal
    let cancelled = app
        .services
        .supplier_invoices
        .update(
            created.id,
            SupplierInvoicePatch {
                status: Some(InvoiceStatus::Cancelled),
                is_reconciled: None,
            },
            actor,
        )
        .await
        .unwrap();
    assert_eq!(cancelled.status, InvoiceStatus::Cancelled);

    let err = app
        .services
        .supplier_invoices
        .update(
            created.id,
            SupplierInvoicePatch {
                status: Some(InvoiceStatus::Pending),
                is_reconciled: None,
            },
            actor,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));
}
