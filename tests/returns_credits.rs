mod common;

use chrono::{Duration, Utc};
use loja_backend::{
    common::error::AppError,
    db::CreditRepository,
    models::{
        credits::{ApplyCredit, CreditOrigin, GrantCredit, NewCredit},
        returns::{CreateReturn, ReturnFilter, ReturnLine, ReturnStatus},
        sales::SaleStatus,
    },
};
use rust_decimal_macros::dec;

fn return_input(sale_id: i64, client_id: i64, lines: &[(i64, i32)]) -> CreateReturn {
    CreateReturn {
        sale_id,
        client_id,
        reason: "tamanho errado".to_string(),
        lines: lines
            .iter()
            .map(|&(sale_item_id, quantity)| ReturnLine { sale_item_id, quantity })
            .collect(),
    }
}

#[tokio::test]
async fn approval_restocks_and_issues_one_credit_for_the_total() {
    let h = common::harness().await;
    let maria = h.client("Maria").await;
    let blusa = h.product("Blusa", 5, dec!(37.75)).await;

    let sale = h.sell(Some(maria.id), &[(blusa.id, 2)]).await;
    h.pay_in_full(&sale).await;
    assert_eq!(h.quantity(blusa.id).await, 3);

    let item_id = sale.items[0].id;
    let opened = h
        .state
        .return_service
        .create_return(return_input(sale.sale.id, maria.id, &[(item_id, 2)]), &h.seller)
        .await
        .unwrap();
    assert_eq!(opened.header.status, ReturnStatus::Pending);
    assert_eq!(opened.header.total, dec!(75.50));
    assert_eq!(h.quantity(blusa.id).await, 3, "pendente não mexe no estoque");

    let approval = h
        .state
        .return_service
        .approve_return(opened.header.id, &h.seller)
        .await
        .unwrap();

    assert_eq!(approval.header.status, ReturnStatus::Approved);
    let credit = approval.credit.expect("crédito emitido");
    assert_eq!(credit.amount, dec!(75.50));
    assert_eq!(credit.origin, CreditOrigin::Return);
    assert_eq!(credit.return_id, Some(opened.header.id));
    assert_eq!(h.quantity(blusa.id).await, 5);
    assert!(h.state.ledger_service.audit(blusa.id).await.unwrap().consistent);

    let credits = h.state.credit_service.list_client_credits(maria.id).await.unwrap();
    assert_eq!(credits.credits.len(), 1);
    assert_eq!(credits.total, dec!(75.50));

    let again = h
        .state
        .return_service
        .approve_return(opened.header.id, &h.seller)
        .await
        .unwrap_err();
    assert!(matches!(again, AppError::InvalidState(_)));
}

#[tokio::test]
async fn returns_cannot_exceed_what_was_sold() {
    let h = common::harness().await;
    let joao = h.client("João").await;
    let calca = h.product("Calça", 4, dec!(100)).await;
    let sale = h.sell(Some(joao.id), &[(calca.id, 3)]).await;
    h.pay_in_full(&sale).await;
    let item_id = sale.items[0].id;

    h.state
        .return_service
        .create_return(return_input(sale.sale.id, joao.id, &[(item_id, 2)]), &h.seller)
        .await
        .unwrap();

    let err = h
        .state
        .return_service
        .create_return(return_input(sale.sale.id, joao.id, &[(item_id, 2)]), &h.seller)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidQuantity { requested: 2, max: 1, .. }));

    let pending = h
        .state
        .return_service
        .list_returns(ReturnFilter { status: Some(ReturnStatus::Pending), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(pending.total, 1);
}

#[tokio::test]
async fn pending_sale_cannot_be_returned() {
    let h = common::harness().await;
    let ana = h.client("Ana").await;
    let saia = h.product("Saia", 2, dec!(70)).await;
    let sale = h.sell(Some(ana.id), &[(saia.id, 1)]).await;

    let err = h
        .state
        .return_service
        .create_return(return_input(sale.sale.id, ana.id, &[(sale.items[0].id, 1)]), &h.seller)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn rejection_frees_the_quantity_and_keeps_stock() {
    let h = common::harness().await;
    let ana = h.client("Ana Paula").await;
    let saia = h.product("Saia Midi", 2, dec!(70)).await;
    let sale = h.sell(Some(ana.id), &[(saia.id, 1)]).await;
    h.pay_in_full(&sale).await;
    let item_id = sale.items[0].id;

    let opened = h
        .state
        .return_service
        .create_return(return_input(sale.sale.id, ana.id, &[(item_id, 1)]), &h.seller)
        .await
        .unwrap();
    let rejected = h
        .state
        .return_service
        .reject_return(opened.header.id, "peça usada", &h.seller)
        .await
        .unwrap();
    assert_eq!(rejected.status, ReturnStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("peça usada"));
    assert_eq!(h.quantity(saia.id).await, 1);

    // A quantidade recusada pode ser pedida de novo
    h.state
        .return_service
        .create_return(return_input(sale.sale.id, ana.id, &[(item_id, 1)]), &h.seller)
        .await
        .unwrap();
}

#[tokio::test]
async fn partial_use_splits_the_credit_and_full_use_consumes_it() {
    let h = common::harness().await;
    let carla = h.client("Carla").await;
    let jaqueta = h.product("Jaqueta", 3, dec!(100)).await;

    let granted = h
        .state
        .credit_service
        .grant_credit(carla.id, GrantCredit { amount: dec!(50), expires_at: None }, &h.admin)
        .await
        .unwrap();

    let sale = h.sell(Some(carla.id), &[(jaqueta.id, 1)]).await;

    let first = h
        .state
        .credit_service
        .apply_credit(
            sale.sale.id,
            ApplyCredit { client_id: carla.id, credit_id: granted.id, amount: dec!(30) },
            &h.seller,
        )
        .await
        .unwrap();

    let remainder = first.remainder.expect("saldo remanescente");
    assert_eq!(remainder.amount, dec!(20));
    assert_eq!(remainder.parent_credit_id, Some(granted.id));
    assert_eq!(first.sale_total, dec!(70));

    let available = h.state.credit_service.list_client_credits(carla.id).await.unwrap();
    assert_eq!(available.credits.len(), 1);
    assert_eq!(available.total, dec!(20));

    // O crédito original já foi consumido
    let reused = h
        .state
        .credit_service
        .apply_credit(
            sale.sale.id,
            ApplyCredit { client_id: carla.id, credit_id: granted.id, amount: dec!(10) },
            &h.seller,
        )
        .await
        .unwrap_err();
    assert!(matches!(reused, AppError::NotFound(_)));

    let second = h
        .state
        .credit_service
        .apply_credit(
            sale.sale.id,
            ApplyCredit { client_id: carla.id, credit_id: remainder.id, amount: dec!(20) },
            &h.seller,
        )
        .await
        .unwrap();
    assert!(second.remainder.is_none());
    assert_eq!(second.sale_total, dec!(50));
    assert_eq!(second.sale_status, SaleStatus::Pending);

    let available = h.state.credit_service.list_client_credits(carla.id).await.unwrap();
    assert!(available.credits.is_empty());
    assert_eq!(available.total, dec!(0));
}

#[tokio::test]
async fn credit_above_its_amount_or_from_another_client_is_refused() {
    let h = common::harness().await;
    let dono = h.client("Dono").await;
    let outro = h.client("Outro").await;
    let cinto = h.product("Cinto", 2, dec!(40)).await;

    let credit = h
        .state
        .credit_service
        .grant_credit(dono.id, GrantCredit { amount: dec!(25), expires_at: None }, &h.admin)
        .await
        .unwrap();
    let sale = h.sell(Some(dono.id), &[(cinto.id, 1)]).await;

    let err = h
        .state
        .credit_service
        .apply_credit(
            sale.sale.id,
            ApplyCredit { client_id: dono.id, credit_id: credit.id, amount: dec!(30) },
            &h.seller,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ExceedsCredit { .. }));

    let err = h
        .state
        .credit_service
        .apply_credit(
            sale.sale.id,
            ApplyCredit { client_id: outro.id, credit_id: credit.id, amount: dec!(10) },
            &h.seller,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn credit_covering_the_balance_completes_the_sale() {
    let h = common::harness().await;
    let bia = h.client("Bia").await;
    let lenco = h.product("Lenço", 1, dec!(30)).await;

    let credit = h
        .state
        .credit_service
        .grant_credit(bia.id, GrantCredit { amount: dec!(30), expires_at: None }, &h.admin)
        .await
        .unwrap();
    let sale = h.sell(Some(bia.id), &[(lenco.id, 1)]).await;

    let applied = h
        .state
        .credit_service
        .apply_credit(
            sale.sale.id,
            ApplyCredit { client_id: bia.id, credit_id: credit.id, amount: dec!(30) },
            &h.seller,
        )
        .await
        .unwrap();

    assert_eq!(applied.sale_total, dec!(0));
    assert_eq!(applied.sale_status, SaleStatus::Completed);
}

#[tokio::test]
async fn cancelling_after_an_approved_return_restocks_only_the_rest() {
    let h = common::harness().await;
    let lia = h.client("Lia").await;
    let camisa = h.product("Camisa Xadrez", 5, dec!(60)).await;
    let sale = h.sell(Some(lia.id), &[(camisa.id, 3)]).await;
    h.pay_in_full(&sale).await;

    let opened = h
        .state
        .return_service
        .create_return(return_input(sale.sale.id, lia.id, &[(sale.items[0].id, 1)]), &h.seller)
        .await
        .unwrap();
    h.state.return_service.approve_return(opened.header.id, &h.seller).await.unwrap();
    assert_eq!(h.quantity(camisa.id).await, 3);

    h.state
        .sale_service
        .cancel_sale(sale.sale.id, "cliente devolveu o resto", &h.seller)
        .await
        .unwrap();

    assert_eq!(h.quantity(camisa.id).await, 5);
    assert!(h.state.ledger_service.audit(camisa.id).await.unwrap().consistent);
}

#[tokio::test]
async fn decided_returns_cannot_be_decided_again() {
    let h = common::harness().await;
    let rui = h.client("Rui").await;
    let boina = h.product("Boina", 4, dec!(45)).await;
    let sale = h.sell(Some(rui.id), &[(boina.id, 2)]).await;
    h.pay_in_full(&sale).await;
    let item_id = sale.items[0].id;

    let approved = h
        .state
        .return_service
        .create_return(return_input(sale.sale.id, rui.id, &[(item_id, 1)]), &h.seller)
        .await
        .unwrap();
    h.state.return_service.approve_return(approved.header.id, &h.seller).await.unwrap();
    let err = h
        .state
        .return_service
        .reject_return(approved.header.id, "mudei de ideia", &h.seller)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    let rejected = h
        .state
        .return_service
        .create_return(return_input(sale.sale.id, rui.id, &[(item_id, 1)]), &h.seller)
        .await
        .unwrap();
    h.state
        .return_service
        .reject_return(rejected.header.id, "etiqueta removida", &h.seller)
        .await
        .unwrap();
    let err = h
        .state
        .return_service
        .approve_return(rejected.header.id, &h.seller)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
    assert_eq!(h.quantity(boina.id).await, 3);
}

#[tokio::test]
async fn rejection_needs_a_reason() {
    let h = common::harness().await;
    let eva = h.client("Eva").await;
    let luva = h.product("Luva", 2, dec!(35)).await;
    let sale = h.sell(Some(eva.id), &[(luva.id, 1)]).await;
    h.pay_in_full(&sale).await;

    let opened = h
        .state
        .return_service
        .create_return(return_input(sale.sale.id, eva.id, &[(sale.items[0].id, 1)]), &h.seller)
        .await
        .unwrap();
    let err = h
        .state
        .return_service
        .reject_return(opened.header.id, "   ", &h.seller)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let still = h.state.return_service.get_return(opened.header.id).await.unwrap();
    assert_eq!(still.header.status, ReturnStatus::Pending);
}

#[tokio::test]
async fn expired_credit_is_not_found() {
    let h = common::harness().await;
    let nina = h.client("Nina").await;
    let chale = h.product("Xale", 2, dec!(80)).await;

    let mut tx = h.state.store.begin().await.unwrap();
    let expired = tx
        .insert_credit(NewCredit {
            client_id: nina.id,
            amount: dec!(50),
            origin: CreditOrigin::Manual,
            return_id: None,
            parent_credit_id: None,
            expires_at: Some(Utc::now() - Duration::days(1)),
        })
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let sale = h.sell(Some(nina.id), &[(chale.id, 1)]).await;
    let err = h
        .state
        .credit_service
        .apply_credit(
            sale.sale.id,
            ApplyCredit { client_id: nina.id, credit_id: expired.id, amount: dec!(10) },
            &h.seller,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let credits = h.state.credit_service.list_client_credits(nina.id).await.unwrap();
    assert!(credits.credits.is_empty());
}

#[tokio::test]
async fn credit_only_applies_to_pending_sales() {
    let h = common::harness().await;
    let teo = h.client("Téo").await;
    let gravata = h.product("Gravata", 3, dec!(55)).await;
    let credit = h
        .state
        .credit_service
        .grant_credit(teo.id, GrantCredit { amount: dec!(20), expires_at: None }, &h.admin)
        .await
        .unwrap();

    let paid = h.sell(Some(teo.id), &[(gravata.id, 1)]).await;
    h.pay_in_full(&paid).await;
    let cancelled = h.sell(Some(teo.id), &[(gravata.id, 1)]).await;
    h.state
        .sale_service
        .cancel_sale(cancelled.sale.id, "desistência", &h.seller)
        .await
        .unwrap();

    for sale_id in [paid.sale.id, cancelled.sale.id] {
        let err = h
            .state
            .credit_service
            .apply_credit(
                sale_id,
                ApplyCredit { client_id: teo.id, credit_id: credit.id, amount: dec!(10) },
                &h.seller,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    // Nada foi consumido
    let credits = h.state.credit_service.list_client_credits(teo.id).await.unwrap();
    assert_eq!(credits.total, dec!(20));
}

#[tokio::test]
async fn credit_amounts_keep_two_decimal_places() {
    let h = common::harness().await;
    let ivo = h.client("Ivo").await;

    let err = h
        .state
        .credit_service
        .grant_credit(ivo.id, GrantCredit { amount: dec!(10.005), expires_at: None }, &h.admin)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}
