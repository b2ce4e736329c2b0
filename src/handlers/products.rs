// src/handlers/products.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{RequireRole, StockWrite},
    },
    models::{
        catalog::{CreateProduct, ImportPayload, ImportSummary, Product, ProductFilter, ProductSize, UpdatePricePayload},
        ledger::{AdjustQuantityPayload, LedgerAudit, MovementEntry, MovementFilter, MovementKind, StockMovement},
        pagination::{Page, PageParams},
    },
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ProductQuery {
    /// Busca parcial pelo nome (sem diferenciar maiúsculas)
    pub name: Option<String>,
    pub size: Option<ProductSize>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MovementQuery {
    pub product_id: Option<i64>,
    pub product_name: Option<String>,
    pub kind: Option<MovementKind>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

pub(crate) fn page_params(offset: Option<i64>, limit: Option<i64>) -> PageParams {
    let defaults = PageParams::default();
    PageParams::new(offset.unwrap_or(defaults.offset), limit.unwrap_or(defaults.limit))
}

// =============================================================================
//  CATÁLOGO
// =============================================================================

// POST /api/products
#[utoipa::path(
    post,
    path = "/api/products",
    tag = "Products",
    request_body = CreateProduct,
    responses(
        (status = 201, description = "Produto cadastrado", body = Product),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Nome e tamanho já cadastrados")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _guard: RequireRole<StockWrite>,
    Json(payload): Json<CreateProduct>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.config))?;

    let product = app_state
        .catalog_service
        .create_product(payload, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok((StatusCode::CREATED, Json(product)))
}

// GET /api/products
#[utoipa::path(
    get,
    path = "/api/products",
    tag = "Products",
    params(ProductQuery),
    responses((status = 200, description = "Produtos paginados", body = Page<Product>)),
    security(("api_jwt" = []))
)]
pub async fn list_products(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Page<Product>>, ApiError> {
    let filter = ProductFilter { name: query.name, size: query.size };

    let page = app_state
        .catalog_service
        .list_products(filter, page_params(query.offset, query.limit))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok(Json(page))
}

// POST /api/products/import
#[utoipa::path(
    post,
    path = "/api/products/import",
    tag = "Products",
    request_body = ImportPayload,
    responses(
        (status = 200, description = "Resumo da importação", body = ImportSummary),
        (status = 400, description = "Linha inválida; nada foi importado")
    ),
    security(("api_jwt" = []))
)]
pub async fn import_products(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _guard: RequireRole<StockWrite>,
    Json(payload): Json<ImportPayload>,
) -> Result<Json<ImportSummary>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.config))?;

    let summary = app_state
        .catalog_service
        .import_products(payload.rows, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok(Json(summary))
}

// GET /api/products/{id}
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    tag = "Products",
    params(("id" = i64, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Produto", body = Product),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_product(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
) -> Result<Json<Product>, ApiError> {
    let product = app_state
        .catalog_service
        .get_product(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok(Json(product))
}

// PUT /api/products/{id}/price
#[utoipa::path(
    put,
    path = "/api/products/{id}/price",
    tag = "Products",
    params(("id" = i64, Path, description = "ID do produto")),
    request_body = UpdatePricePayload,
    responses(
        (status = 200, description = "Preço atualizado", body = Product),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_price(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<StockWrite>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePricePayload>,
) -> Result<Json<Product>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.config))?;

    let product = app_state
        .catalog_service
        .update_price(id, payload.price)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok(Json(product))
}

// =============================================================================
//  LIVRO-RAZÃO
// =============================================================================

// POST /api/products/{id}/adjust
#[utoipa::path(
    post,
    path = "/api/products/{id}/adjust",
    tag = "Stock Ledger",
    params(("id" = i64, Path, description = "ID do produto")),
    request_body = AdjustQuantityPayload,
    responses(
        (status = 201, description = "Movimentação registrada", body = StockMovement),
        (status = 409, description = "Estoque insuficiente")
    ),
    security(("api_jwt" = []))
)]
pub async fn adjust_quantity(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _guard: RequireRole<StockWrite>,
    Path(id): Path<i64>,
    Json(payload): Json<AdjustQuantityPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.config))?;

    let movement = app_state
        .ledger_service
        .adjust_quantity(id, payload.delta, payload.kind, &payload.reason, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok((StatusCode::CREATED, Json(movement)))
}

// GET /api/products/{id}/audit
#[utoipa::path(
    get,
    path = "/api/products/{id}/audit",
    tag = "Stock Ledger",
    params(("id" = i64, Path, description = "ID do produto")),
    responses((status = 200, description = "Quantidade x soma das movimentações", body = LedgerAudit)),
    security(("api_jwt" = []))
)]
pub async fn audit_product(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
) -> Result<Json<LedgerAudit>, ApiError> {
    let audit = app_state
        .ledger_service
        .audit(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok(Json(audit))
}

// GET /api/stock-movements
#[utoipa::path(
    get,
    path = "/api/stock-movements",
    tag = "Stock Ledger",
    params(MovementQuery),
    responses((status = 200, description = "Histórico de movimentações", body = Page<MovementEntry>)),
    security(("api_jwt" = []))
)]
pub async fn list_movements(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<MovementQuery>,
) -> Result<Json<Page<MovementEntry>>, ApiError> {
    let filter = MovementFilter {
        product_id: query.product_id,
        kind: query.kind,
        from: query.from,
        to: query.to,
        product_name: query.product_name,
        page: page_params(query.offset, query.limit),
    };

    let page = app_state
        .ledger_service
        .history(filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok(Json(page))
}
