mod common;

use common::Harness;
use chrono::{Duration, Utc};
use loja_backend::{
    common::{error::AppError, validation::MAX_AMOUNT},
    models::sales::{DiscountInput, SaleFilter, SaleStatus},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[tokio::test]
async fn sale_with_a_short_line_changes_nothing() {
    let h = common::harness().await;
    let camisa = h.product("Camisa", 5, dec!(50)).await;
    let calca = h.product("Calça", 1, dec!(120)).await;

    let err = h
        .state
        .sale_service
        .create_sale(h.sale_input(None, &[(camisa.id, 2), (calca.id, 2)]), &h.seller)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InsufficientStock { product_id, .. } if product_id == calca.id));
    assert_eq!(h.quantity(camisa.id).await, 5);
    assert_eq!(h.quantity(calca.id).await, 1);

    let sales = h.state.sale_service.list_sales(SaleFilter::default()).await.unwrap();
    assert_eq!(sales.total, 0);
}

#[tokio::test]
async fn repeated_product_lines_are_checked_together() {
    let h = common::harness().await;
    let meia = h.product("Meia", 3, dec!(10)).await;

    let err = h
        .state
        .sale_service
        .create_sale(h.sale_input(None, &[(meia.id, 2), (meia.id, 2)]), &h.seller)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InsufficientStock { available: 3, required: 4, .. }));
    assert_eq!(h.quantity(meia.id).await, 3);
}

#[tokio::test]
async fn percent_discount_is_applied_to_the_total() {
    let h = common::harness().await;
    let casaco = h.product("Casaco", 2, dec!(75)).await;

    let mut input = h.sale_input(None, &[(casaco.id, 2)]);
    input.discount = DiscountInput { percent: Some(dec!(10)), amount: None };
    let detail = h.state.sale_service.create_sale(input, &h.seller).await.unwrap();

    assert_eq!(detail.sale.subtotal, dec!(150));
    assert_eq!(detail.sale.discount_amount, dec!(15.00));
    assert_eq!(detail.sale.total, dec!(135.00));
    assert_eq!(detail.sale.status, SaleStatus::Pending);
    assert_eq!(detail.balance.remaining, dec!(135.00));
}

#[tokio::test]
async fn cancel_restores_exactly_what_was_sold() {
    let h = common::harness().await;
    let camisa = h.product("Camisa Linho", 8, dec!(99)).await;
    let sale = h.sell(None, &[(camisa.id, 3)]).await;
    assert_eq!(h.quantity(camisa.id).await, 5);

    let cancelled = h
        .state
        .sale_service
        .cancel_sale(sale.sale.id, "erro no caixa", &h.seller)
        .await
        .unwrap();

    assert_eq!(cancelled.status, SaleStatus::Cancelled);
    assert!(cancelled.notes.unwrap_or_default().contains("Cancelada: erro no caixa"));
    assert_eq!(h.quantity(camisa.id).await, 8);

    let again = h
        .state
        .sale_service
        .cancel_sale(sale.sale.id, "de novo", &h.seller)
        .await
        .unwrap_err();
    assert!(matches!(again, AppError::AlreadyCancelled(id) if id == sale.sale.id));
    assert_eq!(h.quantity(camisa.id).await, 8);
}

#[tokio::test]
async fn payments_complete_the_sale_at_the_exact_total() {
    let h = common::harness().await;
    let tenis = h.product("Tênis", 2, dec!(100)).await;
    let sale = h.sell(None, &[(tenis.id, 1)]).await;

    let first = h
        .state
        .payment_service
        .record_payment(sale.sale.id, Harness::payment(dec!(40)), &h.seller)
        .await
        .unwrap();
    assert_eq!(first.sale_status, SaleStatus::Pending);
    assert_eq!(first.balance.remaining, dec!(60));

    let second = h
        .state
        .payment_service
        .record_payment(sale.sale.id, Harness::payment(dec!(60)), &h.seller)
        .await
        .unwrap();
    assert_eq!(second.sale_status, SaleStatus::Completed);
    assert_eq!(second.balance.remaining, dec!(0));

    let payments = h.state.payment_service.list_payments(sale.sale.id).await.unwrap();
    assert_eq!(payments.len(), 2);
}

#[tokio::test]
async fn payment_above_the_remaining_balance_is_refused() {
    let h = common::harness().await;
    let tenis = h.product("Tênis Corrida", 2, dec!(100)).await;
    let sale = h.sell(None, &[(tenis.id, 1)]).await;

    h.state
        .payment_service
        .record_payment(sale.sale.id, Harness::payment(dec!(40)), &h.seller)
        .await
        .unwrap();
    let err = h
        .state
        .payment_service
        .record_payment(sale.sale.id, Harness::payment(dec!(61)), &h.seller)
        .await
        .unwrap_err();

    match err {
        AppError::OverPayment { total, paid, attempted } => {
            assert_eq!(total, dec!(100));
            assert_eq!(paid, dec!(40));
            assert_eq!(attempted, dec!(61));
        }
        other => panic!("erro inesperado: {:?}", other),
    }

    let balance = h.state.payment_service.summary(sale.sale.id).await.unwrap();
    assert_eq!(balance.paid, dec!(40));
}

#[tokio::test]
async fn cancelled_sale_takes_no_payments() {
    let h = common::harness().await;
    let bone = h.product("Boné", 1, dec!(30)).await;
    let sale = h.sell(None, &[(bone.id, 1)]).await;
    h.state
        .sale_service
        .cancel_sale(sale.sale.id, "desistência", &h.seller)
        .await
        .unwrap();

    let err = h
        .state
        .payment_service
        .record_payment(sale.sale.id, Harness::payment(dec!(30)), &h.seller)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn repeated_lines_that_overflow_the_quantity_are_short_of_stock() {
    let h = common::harness().await;
    let meia = h.product("Meia Soquete", 3, dec!(10)).await;

    let err = h
        .state
        .sale_service
        .create_sale(h.sale_input(None, &[(meia.id, 1), (meia.id, i32::MAX)]), &h.seller)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InsufficientStock { available: 3, required: i32::MAX, .. }));
    assert_eq!(h.quantity(meia.id).await, 3);
}

#[tokio::test]
async fn override_price_beyond_the_money_column_is_refused() {
    let h = common::harness().await;
    let relogio = h.product("Relógio", 5, dec!(300)).await;

    let mut huge = h.sale_input(None, &[(relogio.id, 2)]);
    huge.lines[0].unit_price = Some(Decimal::MAX);
    let err = h.state.sale_service.create_sale(huge, &h.seller).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    // Preço válido, mas o total da linha não cabe em NUMERIC(12,2)
    let mut line_overflow = h.sale_input(None, &[(relogio.id, 2)]);
    line_overflow.lines[0].unit_price = Some(MAX_AMOUNT);
    let err = h.state.sale_service.create_sale(line_overflow, &h.seller).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let mut fraction = h.sale_input(None, &[(relogio.id, 1)]);
    fraction.lines[0].unit_price = Some(dec!(299.999));
    let err = h.state.sale_service.create_sale(fraction, &h.seller).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    assert_eq!(h.quantity(relogio.id).await, 5);
}

#[tokio::test]
async fn huge_payment_is_refused_without_panicking() {
    let h = common::harness().await;
    let tenis = h.product("Tênis Casual", 2, dec!(100)).await;
    let sale = h.sell(None, &[(tenis.id, 1)]).await;
    h.state
        .payment_service
        .record_payment(sale.sale.id, Harness::payment(dec!(40)), &h.seller)
        .await
        .unwrap();

    let err = h
        .state
        .payment_service
        .record_payment(sale.sale.id, Harness::payment(Decimal::MAX), &h.seller)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let balance = h.state.payment_service.summary(sale.sale.id).await.unwrap();
    assert_eq!(balance.paid, dec!(40));
}

#[tokio::test]
async fn sub_cent_payment_is_refused_and_the_sale_can_still_close() {
    let h = common::harness().await;
    let bolsa = h.product("Bolsa", 1, dec!(100)).await;
    let sale = h.sell(None, &[(bolsa.id, 1)]).await;
    h.state
        .payment_service
        .record_payment(sale.sale.id, Harness::payment(dec!(99.99)), &h.seller)
        .await
        .unwrap();

    let err = h
        .state
        .payment_service
        .record_payment(sale.sale.id, Harness::payment(dec!(0.005)), &h.seller)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let last = h
        .state
        .payment_service
        .record_payment(sale.sale.id, Harness::payment(dec!(0.01)), &h.seller)
        .await
        .unwrap();
    assert_eq!(last.sale_status, SaleStatus::Completed);
    assert_eq!(last.balance.remaining, dec!(0));
}

#[tokio::test]
async fn completed_sale_can_be_cancelled_and_restocks() {
    let h = common::harness().await;
    let vestido = h.product("Vestido Festa", 4, dec!(250)).await;
    let sale = h.sell(None, &[(vestido.id, 2)]).await;
    h.pay_in_full(&sale).await;
    assert_eq!(h.state.sale_service.get_sale(sale.sale.id).await.unwrap().sale.status, SaleStatus::Completed);

    let cancelled = h
        .state
        .sale_service
        .cancel_sale(sale.sale.id, "troca de loja", &h.seller)
        .await
        .unwrap();

    assert_eq!(cancelled.status, SaleStatus::Cancelled);
    assert_eq!(h.quantity(vestido.id).await, 4);
    assert!(h.state.ledger_service.audit(vestido.id).await.unwrap().consistent);
}

#[tokio::test]
async fn list_sales_filters_by_client_status_and_date() {
    let h = common::harness().await;
    let before = Utc::now() - Duration::seconds(1);
    let fernanda = h.client("Fernanda Lima").await;
    let rogerio = h.client("Rogério").await;
    let cueca = h.product("Cueca", 10, dec!(20)).await;

    let paid = h.sell(Some(fernanda.id), &[(cueca.id, 1)]).await;
    h.pay_in_full(&paid).await;
    h.sell(Some(fernanda.id), &[(cueca.id, 2)]).await;
    h.sell(Some(rogerio.id), &[(cueca.id, 1)]).await;
    h.sell(None, &[(cueca.id, 1)]).await;
    let after = Utc::now() + Duration::seconds(1);

    let by_name = h
        .state
        .sale_service
        .list_sales(SaleFilter { client_name: Some("fernanda".into()), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(by_name.total, 2);
    assert!(by_name.items.iter().all(|s| s.client_id == Some(fernanda.id)));
    assert_eq!(by_name.items[0].client_name.as_deref(), Some("Fernanda Lima"));

    let completed = h
        .state
        .sale_service
        .list_sales(SaleFilter {
            client_name: Some("fernanda".into()),
            status: Some(SaleStatus::Completed),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(completed.total, 1);
    assert_eq!(completed.items[0].id, paid.sale.id);

    let pending = h
        .state
        .sale_service
        .list_sales(SaleFilter { status: Some(SaleStatus::Pending), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(pending.total, 3);

    let in_window = h
        .state
        .sale_service
        .list_sales(SaleFilter { from: Some(before), to: Some(after), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(in_window.total, 4);

    let future = h
        .state
        .sale_service
        .list_sales(SaleFilter { from: Some(after), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(future.total, 0);
}
