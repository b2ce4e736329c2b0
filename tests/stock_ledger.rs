mod common;

use loja_backend::{
    common::error::AppError,
    models::{
        ledger::{MovementFilter, MovementKind},
        pagination::PageParams,
    },
};
use chrono::{Duration, Utc};
use rust_decimal_macros::dec;

#[tokio::test]
async fn quantity_always_equals_the_sum_of_movements() {
    let h = common::harness().await;
    let camisa = h.product("Camisa Polo", 10, dec!(80)).await;

    let sale = h.sell(None, &[(camisa.id, 3)]).await;
    h.state
        .ledger_service
        .adjust_quantity(camisa.id, -2, MovementKind::Outbound, "avaria", &h.clerk)
        .await
        .unwrap();
    h.state
        .ledger_service
        .adjust_quantity(camisa.id, 5, MovementKind::Inbound, "entrada de mercadoria", &h.clerk)
        .await
        .unwrap();
    h.state
        .sale_service
        .cancel_sale(sale.sale.id, "cliente desistiu", &h.seller)
        .await
        .unwrap();

    assert_eq!(h.quantity(camisa.id).await, 10 - 3 - 2 + 5 + 3);

    let audit = h.state.ledger_service.audit(camisa.id).await.unwrap();
    assert!(audit.consistent);
    assert_eq!(audit.movement_balance, i64::from(audit.quantity));
}

#[tokio::test]
async fn outbound_beyond_stock_is_refused_without_side_effects() {
    let h = common::harness().await;
    let vestido = h.product("Vestido Longo", 2, dec!(150)).await;

    let err = h
        .state
        .ledger_service
        .adjust_quantity(vestido.id, -3, MovementKind::Outbound, "perda", &h.clerk)
        .await
        .unwrap_err();

    match err {
        AppError::InsufficientStock { available, required, .. } => {
            assert_eq!(available, 2);
            assert_eq!(required, 3);
        }
        other => panic!("erro inesperado: {:?}", other),
    }

    assert_eq!(h.quantity(vestido.id).await, 2);
    let history = h
        .state
        .ledger_service
        .history(MovementFilter { product_id: Some(vestido.id), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(history.total, 1, "só a entrada inicial");
}

#[tokio::test]
async fn sign_must_match_the_movement_kind() {
    let h = common::harness().await;
    let bermuda = h.product("Bermuda", 4, dec!(60)).await;

    let err = h
        .state
        .ledger_service
        .adjust_quantity(bermuda.id, 2, MovementKind::Outbound, "inventário", &h.clerk)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let err = h
        .state
        .ledger_service
        .adjust_quantity(bermuda.id, 0, MovementKind::Inbound, "nada", &h.clerk)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[tokio::test]
async fn history_filters_by_kind_and_pages() {
    let h = common::harness().await;
    let saia = h.product("Saia Jeans", 20, dec!(90)).await;
    for _ in 0..3 {
        h.sell(None, &[(saia.id, 1)]).await;
    }

    let outbound = h
        .state
        .ledger_service
        .history(MovementFilter {
            product_id: Some(saia.id),
            kind: Some(MovementKind::Outbound),
            page: PageParams::new(0, 2),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(outbound.total, 3);
    assert_eq!(outbound.items.len(), 2);
    assert!(outbound.items.iter().all(|m| m.kind == MovementKind::Outbound));
    assert!(outbound.items[0].reason.starts_with("venda #"));
}

#[tokio::test]
async fn import_merges_existing_name_and_size() {
    use loja_backend::models::catalog::{ImportRow, ProductSize};

    let h = common::harness().await;
    let blusa = h.product("Blusa Seda", 3, dec!(120)).await;

    let summary = h
        .state
        .catalog_service
        .import_products(
            vec![
                ImportRow { name: "blusa seda".into(), size: ProductSize::M, quantity: 4, price: dec!(130), supplier_id: None },
                ImportRow { name: "Blusa Seda".into(), size: ProductSize::G, quantity: 2, price: dec!(130), supplier_id: None },
            ],
            &h.clerk,
        )
        .await
        .unwrap();

    assert_eq!(summary.updated, 1);
    assert_eq!(summary.created, 1);

    let merged = h.state.catalog_service.get_product(blusa.id).await.unwrap();
    assert_eq!(merged.quantity, 7);
    assert_eq!(merged.price, dec!(130));
    assert!(h.state.ledger_service.audit(blusa.id).await.unwrap().consistent);
}

#[tokio::test]
async fn history_filters_by_date_range_and_product_name() {
    let h = common::harness().await;
    let before = Utc::now() - Duration::seconds(1);
    let regata = h.product("Regata Algodão", 4, dec!(35)).await;
    h.product("Bermuda", 6, dec!(60)).await;
    h.sell(None, &[(regata.id, 1)]).await;
    let after = Utc::now() + Duration::seconds(1);

    let by_name = h
        .state
        .ledger_service
        .history(MovementFilter { product_name: Some("regata".into()), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(by_name.total, 2);
    assert!(by_name.items.iter().all(|m| m.product_id == regata.id));

    let in_window = h
        .state
        .ledger_service
        .history(MovementFilter { from: Some(before), to: Some(after), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(in_window.total, 3);

    let future = h
        .state
        .ledger_service
        .history(MovementFilter { from: Some(after), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(future.total, 0);
    assert!(future.items.is_empty());

    let past = h
        .state
        .ledger_service
        .history(MovementFilter { to: Some(before), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(past.total, 0);
}

#[tokio::test]
async fn inbound_that_would_overflow_the_quantity_is_refused() {
    let h = common::harness().await;
    let meia = h.product("Meia Cano Alto", 5, dec!(15)).await;

    let err = h
        .state
        .ledger_service
        .adjust_quantity(meia.id, i32::MAX, MovementKind::Inbound, "entrada de mercadoria", &h.clerk)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidInput(_)));
    assert_eq!(h.quantity(meia.id).await, 5);
    assert!(h.state.ledger_service.audit(meia.id).await.unwrap().consistent);
}

#[tokio::test]
async fn suppliers_are_registered_and_linked_on_import() {
    use loja_backend::models::catalog::{ImportRow, NewSupplier, ProductSize};

    let h = common::harness().await;
    let supplier = h
        .state
        .catalog_service
        .create_supplier(NewSupplier { name: "  Tecelagem Sul ".into(), contact: Some("(51) 3333-0000".into()) })
        .await
        .unwrap();
    assert_eq!(supplier.name, "Tecelagem Sul");

    let suppliers = h.state.catalog_service.list_suppliers().await.unwrap();
    assert_eq!(suppliers.len(), 1);
    assert_eq!(suppliers[0].id, supplier.id);

    let empty = h
        .state
        .catalog_service
        .create_supplier(NewSupplier { name: "   ".into(), contact: None })
        .await
        .unwrap_err();
    assert!(matches!(empty, AppError::InvalidInput(_)));

    h.state
        .catalog_service
        .import_products(
            vec![ImportRow { name: "Lençol".into(), size: ProductSize::G, quantity: 3, price: dec!(89.90), supplier_id: Some(supplier.id) }],
            &h.clerk,
        )
        .await
        .unwrap();
    let imported = h
        .state
        .catalog_service
        .list_products(Default::default(), PageParams::default())
        .await
        .unwrap();
    assert_eq!(imported.items[0].supplier_id, Some(supplier.id));
}

#[tokio::test]
async fn import_with_an_unknown_supplier_creates_nothing() {
    use loja_backend::models::catalog::{ImportRow, ProductSize};

    let h = common::harness().await;
    let err = h
        .state
        .catalog_service
        .import_products(
            vec![
                ImportRow { name: "Fronha".into(), size: ProductSize::M, quantity: 2, price: dec!(25), supplier_id: None },
                ImportRow { name: "Toalha".into(), size: ProductSize::M, quantity: 2, price: dec!(40), supplier_id: Some(999) },
            ],
            &h.clerk,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    let products = h
        .state
        .catalog_service
        .list_products(Default::default(), PageParams::default())
        .await
        .unwrap();
    assert_eq!(products.total, 0);
}

#[tokio::test]
async fn prices_keep_two_decimal_places() {
    let h = common::harness().await;
    let camisa = h.product("Camisa Social", 1, dec!(150)).await;

    let err = h
        .state
        .catalog_service
        .update_price(camisa.id, dec!(149.995))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
    assert_eq!(h.state.catalog_service.get_product(camisa.id).await.unwrap().price, dec!(150));
}
