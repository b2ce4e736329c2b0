// src/handlers/sales.rs

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
    handlers::products::page_params,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{RequireRole, SalesWrite},
    },
    models::{
        credits::{ApplyCredit, CreditApplication},
        pagination::Page,
        sales::{
            Balance, CancelSalePayload, CreateSale, Payment, PaymentReceipt, RecordPayment, Sale,
            SaleDetail, SaleFilter, SaleStatus, SaleSummary,
        },
    },
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SaleQuery {
    pub client_name: Option<String>,
    pub status: Option<SaleStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

// =============================================================================
//  VENDAS
// =============================================================================

// POST /api/sales
#[utoipa::path(
    post,
    path = "/api/sales",
    tag = "Sales",
    request_body = CreateSale,
    responses(
        (status = 201, description = "Venda registrada e estoque baixado", body = SaleDetail),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Estoque insuficiente")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_sale(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _guard: RequireRole<SalesWrite>,
    Json(payload): Json<CreateSale>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.config))?;

    let detail = app_state
        .sale_service
        .create_sale(payload, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok((StatusCode::CREATED, Json(detail)))
}

// GET /api/sales
#[utoipa::path(
    get,
    path = "/api/sales",
    tag = "Sales",
    params(SaleQuery),
    responses((status = 200, description = "Vendas paginadas", body = Page<SaleSummary>)),
    security(("api_jwt" = []))
)]
pub async fn list_sales(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<SaleQuery>,
) -> Result<Json<Page<SaleSummary>>, ApiError> {
    let filter = SaleFilter {
        client_name: query.client_name,
        from: query.from,
        to: query.to,
        status: query.status,
        page: page_params(query.offset, query.limit),
    };

    let page = app_state
        .sale_service
        .list_sales(filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok(Json(page))
}

// GET /api/sales/{id}
#[utoipa::path(
    get,
    path = "/api/sales/{id}",
    tag = "Sales",
    params(("id" = i64, Path, description = "ID da venda")),
    responses(
        (status = 200, description = "Venda com itens", body = SaleDetail),
        (status = 404, description = "Venda não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_sale(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
) -> Result<Json<SaleDetail>, ApiError> {
    let detail = app_state
        .sale_service
        .get_sale(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok(Json(detail))
}

// POST /api/sales/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/sales/{id}/cancel",
    tag = "Sales",
    params(("id" = i64, Path, description = "ID da venda")),
    request_body = CancelSalePayload,
    responses(
        (status = 200, description = "Venda cancelada e estoque devolvido", body = Sale),
        (status = 409, description = "Venda já cancelada")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_sale(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _guard: RequireRole<SalesWrite>,
    Path(id): Path<i64>,
    Json(payload): Json<CancelSalePayload>,
) -> Result<Json<Sale>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.config))?;

    let sale = app_state
        .sale_service
        .cancel_sale(id, &payload.reason, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok(Json(sale))
}

// =============================================================================
//  PAGAMENTOS
// =============================================================================

// POST /api/sales/{id}/payments
#[utoipa::path(
    post,
    path = "/api/sales/{id}/payments",
    tag = "Payments",
    params(("id" = i64, Path, description = "ID da venda")),
    request_body = RecordPayment,
    responses(
        (status = 201, description = "Pagamento registrado", body = PaymentReceipt),
        (status = 409, description = "Pagamento excede o total ou venda cancelada")
    ),
    security(("api_jwt" = []))
)]
pub async fn record_payment(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _guard: RequireRole<SalesWrite>,
    Path(id): Path<i64>,
    Json(payload): Json<RecordPayment>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.config))?;

    let receipt = app_state
        .payment_service
        .record_payment(id, payload, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

// GET /api/sales/{id}/payments
#[utoipa::path(
    get,
    path = "/api/sales/{id}/payments",
    tag = "Payments",
    params(("id" = i64, Path, description = "ID da venda")),
    responses((status = 200, description = "Pagamentos da venda", body = Vec<Payment>)),
    security(("api_jwt" = []))
)]
pub async fn list_payments(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Payment>>, ApiError> {
    let payments = app_state
        .payment_service
        .list_payments(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok(Json(payments))
}

// GET /api/sales/{id}/balance
#[utoipa::path(
    get,
    path = "/api/sales/{id}/balance",
    tag = "Payments",
    params(("id" = i64, Path, description = "ID da venda")),
    responses(
        (status = 200, description = "Total, pago e saldo", body = Balance),
        (status = 404, description = "Venda não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_balance(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
) -> Result<Json<Balance>, ApiError> {
    let balance = app_state
        .payment_service
        .summary(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok(Json(balance))
}

// POST /api/sales/{id}/credits
#[utoipa::path(
    post,
    path = "/api/sales/{id}/credits",
    tag = "Credits",
    params(("id" = i64, Path, description = "ID da venda")),
    request_body = ApplyCredit,
    responses(
        (status = 200, description = "Crédito aplicado", body = CreditApplication),
        (status = 404, description = "Crédito indisponível"),
        (status = 409, description = "Valor excede o crédito")
    ),
    security(("api_jwt" = []))
)]
pub async fn apply_credit(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _guard: RequireRole<SalesWrite>,
    Path(id): Path<i64>,
    Json(payload): Json<ApplyCredit>,
) -> Result<Json<CreditApplication>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.config))?;

    let application = app_state
        .credit_service
        .apply_credit(id, payload, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok(Json(application))
}
