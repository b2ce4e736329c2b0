mod common;

use loja_backend::{
    common::error::AppError,
    models::{
        inventory_count::{Adjustment, CountEntry, CountItemState, CountStatus},
        pagination::PageParams,
    },
};
use rust_decimal_macros::dec;

fn entry(product_id: i64, physical_quantity: i32) -> CountEntry {
    CountEntry { product_id, physical_quantity, note: None }
}

#[tokio::test]
async fn only_one_count_in_progress() {
    let h = common::harness().await;
    h.product("Camisa", 3, dec!(40)).await;

    let started = h.state.count_service.start_count(&h.clerk).await.unwrap();
    assert_eq!(started.count.status, CountStatus::InProgress);
    assert_eq!(started.items.len(), 1);

    let err = h.state.count_service.start_count(&h.clerk).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn recording_the_same_count_twice_keeps_the_last_value() {
    let h = common::harness().await;
    let camisa = h.product("Camisa", 5, dec!(40)).await;
    let calca = h.product("Calça", 2, dec!(90)).await;
    h.state.count_service.start_count(&h.clerk).await.unwrap();

    h.state.count_service.record_counts(vec![entry(camisa.id, 4)]).await.unwrap();
    let recount = CountEntry {
        product_id: camisa.id,
        physical_quantity: 2,
        note: Some("recontado no depósito".into()),
    };
    let detail = h.state.count_service.record_counts(vec![recount]).await.unwrap();

    let camisa_item = detail.items.iter().find(|i| i.product_id == camisa.id).unwrap();
    assert_eq!(camisa_item.physical_quantity, Some(2));
    assert_eq!(camisa_item.note.as_deref(), Some("recontado no depósito"));
    assert_eq!(camisa_item.state(), CountItemState::Mismatch);

    // Não contados vêm primeiro
    assert_eq!(detail.items[0].product_id, calca.id);
    assert_eq!(detail.items[0].state(), CountItemState::Uncounted);
}

#[tokio::test]
async fn counting_without_an_open_count_is_not_found() {
    let h = common::harness().await;
    let camisa = h.product("Camisa", 5, dec!(40)).await;

    let err = h
        .state
        .count_service
        .record_counts(vec![entry(camisa.id, 1)])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn finalize_applies_recorded_counts_through_the_ledger() {
    let h = common::harness().await;
    let camisa = h.product("Camisa", 5, dec!(40)).await;
    let calca = h.product("Calça", 2, dec!(90)).await;
    let bone = h.product("Boné", 7, dec!(25)).await;

    h.state.count_service.start_count(&h.clerk).await.unwrap();
    h.state
        .count_service
        .record_counts(vec![entry(camisa.id, 3), entry(calca.id, 2)])
        .await
        .unwrap();

    let finalized = h.state.count_service.finalize(&h.clerk).await.unwrap();
    assert_eq!(finalized.count.status, CountStatus::Finished);
    assert!(finalized.count.finished_at.is_some());

    let camisa_adj = finalized.adjustments.iter().find(|a| a.product_id == camisa.id).unwrap();
    assert_eq!(camisa_adj.previous_quantity, 5);
    assert_eq!(camisa_adj.new_quantity, 3);
    assert!(camisa_adj.movement_id.is_some());

    let calca_adj = finalized.adjustments.iter().find(|a| a.product_id == calca.id).unwrap();
    assert!(calca_adj.movement_id.is_none(), "sem diferença, sem movimentação");

    assert_eq!(h.quantity(camisa.id).await, 3);
    assert_eq!(h.quantity(calca.id).await, 2);
    assert_eq!(h.quantity(bone.id).await, 7, "não contado fica como está");
    assert!(h.state.ledger_service.audit(camisa.id).await.unwrap().consistent);

    // Depois de finalizado, um novo inventário pode começar
    h.state.count_service.start_count(&h.clerk).await.unwrap();
    let history = h.state.count_service.history(PageParams::default()).await.unwrap();
    assert_eq!(history.total, 2);
}

#[tokio::test]
async fn explicit_adjustments_set_the_new_quantity() {
    let h = common::harness().await;
    let meia = h.product("Meia", 10, dec!(8)).await;

    h.state.count_service.start_count(&h.clerk).await.unwrap();
    let finalized = h
        .state
        .count_service
        .apply_adjustments(vec![Adjustment { product_id: meia.id, new_quantity: 12 }], &h.clerk)
        .await
        .unwrap();

    assert_eq!(finalized.adjustments.len(), 1);
    assert_eq!(h.quantity(meia.id).await, 12);

    let detail = h.state.count_service.detail(finalized.count.id).await.unwrap();
    assert_eq!(detail.count.status, CountStatus::Finished);
}
