mod common;

use loja_backend::{models::auth::Role, routes::app_router};

#[tokio::test]
async fn router_registers_every_route_without_conflicts() {
    let h = common::harness().await;
    let _router = app_router(h.state.clone());
}

#[tokio::test]
async fn issued_token_resolves_to_the_stored_user() {
    let h = common::harness().await;

    let token = h.state.auth_service.login("estoque@loja.com", "senha123").await.unwrap();
    let actor = h.state.auth_service.validate_token(&token).await.unwrap();

    assert_eq!(actor.user_id, h.clerk.user_id);
    assert_eq!(actor.role, Role::StockClerk);
}
