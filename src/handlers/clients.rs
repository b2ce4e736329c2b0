// src/handlers/clients.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
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
        rbac::{RequireRole, SalesWrite, StockWrite},
    },
    models::{
        catalog::{Client, NewClient, NewSupplier, Supplier},
        credits::{ClientCredits, Credit, GrantCredit},
        pagination::Page,
    },
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClientQuery {
    pub name: Option<String>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

// =============================================================================
//  CLIENTES
// =============================================================================

// POST /api/clients
#[utoipa::path(
    post,
    path = "/api/clients",
    tag = "Clients",
    request_body = NewClient,
    responses(
        (status = 201, description = "Cliente cadastrado", body = Client),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_client(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<SalesWrite>,
    Json(payload): Json<NewClient>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.config))?;

    let client = app_state
        .catalog_service
        .create_client(payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok((StatusCode::CREATED, Json(client)))
}

// GET /api/clients
#[utoipa::path(
    get,
    path = "/api/clients",
    tag = "Clients",
    params(ClientQuery),
    responses((status = 200, description = "Clientes paginados", body = Page<Client>)),
    security(("api_jwt" = []))
)]
pub async fn list_clients(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<ClientQuery>,
) -> Result<Json<Page<Client>>, ApiError> {
    let page = app_state
        .catalog_service
        .list_clients(query.name, page_params(query.offset, query.limit))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok(Json(page))
}

// GET /api/clients/{id}/credits
#[utoipa::path(
    get,
    path = "/api/clients/{id}/credits",
    tag = "Credits",
    params(("id" = i64, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Créditos disponíveis e saldo", body = ClientCredits),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_client_credits(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
) -> Result<Json<ClientCredits>, ApiError> {
    let credits = app_state
        .credit_service
        .list_client_credits(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok(Json(credits))
}

// POST /api/clients/{id}/credits
#[utoipa::path(
    post,
    path = "/api/clients/{id}/credits",
    tag = "Credits",
    params(("id" = i64, Path, description = "ID do cliente")),
    request_body = GrantCredit,
    responses(
        (status = 201, description = "Crédito concedido", body = Credit),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn grant_credit(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _guard: RequireRole<SalesWrite>,
    Path(id): Path<i64>,
    Json(payload): Json<GrantCredit>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.config))?;

    let credit = app_state
        .credit_service
        .grant_credit(id, payload, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok((StatusCode::CREATED, Json(credit)))
}

// =============================================================================
//  FORNECEDORES
// =============================================================================

// POST /api/suppliers
#[utoipa::path(
    post,
    path = "/api/suppliers",
    tag = "Suppliers",
    request_body = NewSupplier,
    responses((status = 201, description = "Fornecedor cadastrado", body = Supplier)),
    security(("api_jwt" = []))
)]
pub async fn create_supplier(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<StockWrite>,
    Json(payload): Json<NewSupplier>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.config))?;

    let supplier = app_state
        .catalog_service
        .create_supplier(payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok((StatusCode::CREATED, Json(supplier)))
}

// GET /api/suppliers
#[utoipa::path(
    get,
    path = "/api/suppliers",
    tag = "Suppliers",
    responses((status = 200, description = "Fornecedores", body = Vec<Supplier>)),
    security(("api_jwt" = []))
)]
pub async fn list_suppliers(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<Json<Vec<Supplier>>, ApiError> {
    let suppliers = app_state
        .catalog_service
        .list_suppliers()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok(Json(suppliers))
}
