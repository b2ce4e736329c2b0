// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

pub fn app_router(app_state: AppState) -> Router {
    // Públicas
    let auth_routes = Router::new().route("/login", post(handlers::auth::login));

    // Protegidas pelo Bearer; o papel é checado em cada handler
    let me_routes = Router::new().route("/me", get(handlers::auth::get_me));

    let user_routes = Router::new().route("/", post(handlers::auth::create_user));

    let product_routes = Router::new()
        .route(
            "/",
            post(handlers::products::create_product).get(handlers::products::list_products),
        )
        .route("/import", post(handlers::products::import_products))
        .route("/{id}", get(handlers::products::get_product))
        .route("/{id}/price", put(handlers::products::update_price))
        .route("/{id}/adjust", post(handlers::products::adjust_quantity))
        .route("/{id}/audit", get(handlers::products::audit_product));

    let client_routes = Router::new()
        .route(
            "/",
            post(handlers::clients::create_client).get(handlers::clients::list_clients),
        )
        .route(
            "/{id}/credits",
            get(handlers::clients::list_client_credits).post(handlers::clients::grant_credit),
        );

    let supplier_routes = Router::new().route(
        "/",
        post(handlers::clients::create_supplier).get(handlers::clients::list_suppliers),
    );

    let sale_routes = Router::new()
        .route(
            "/",
            post(handlers::sales::create_sale).get(handlers::sales::list_sales),
        )
        .route("/{id}", get(handlers::sales::get_sale))
        .route("/{id}/cancel", post(handlers::sales::cancel_sale))
        .route(
            "/{id}/payments",
            post(handlers::sales::record_payment).get(handlers::sales::list_payments),
        )
        .route("/{id}/balance", get(handlers::sales::get_balance))
        .route("/{id}/credits", post(handlers::sales::apply_credit));

    let return_routes = Router::new()
        .route(
            "/",
            post(handlers::returns::create_return).get(handlers::returns::list_returns),
        )
        .route("/{id}", get(handlers::returns::get_return))
        .route("/{id}/approve", post(handlers::returns::approve_return))
        .route("/{id}/reject", post(handlers::returns::reject_return));

    let count_routes = Router::new()
        .route(
            "/",
            post(handlers::inventory_counts::start_count).get(handlers::inventory_counts::list_counts),
        )
        .route("/current/items", put(handlers::inventory_counts::record_counts))
        .route("/current/adjustments", post(handlers::inventory_counts::apply_adjustments))
        .route("/current/finalize", post(handlers::inventory_counts::finalize_count))
        .route("/{id}", get(handlers::inventory_counts::get_count));

    let protected = Router::new()
        .nest("/auth", me_routes)
        .nest("/users", user_routes)
        .nest("/products", product_routes)
        .route("/stock-movements", get(handlers::products::list_movements))
        .nest("/clients", client_routes)
        .nest("/suppliers", supplier_routes)
        .nest("/sales", sale_routes)
        .nest("/returns", return_routes)
        .nest("/inventory-counts", count_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api", protected)
        .merge(SwaggerUi::new("/swagger-ui").url("/api/docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state)
}
