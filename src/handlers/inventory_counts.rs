// src/handlers/inventory_counts.rs

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
        rbac::{RequireRole, StockWrite},
    },
    models::{
        inventory_count::{AdjustmentsPayload, CountDetail, FinalizedCount, InventoryCount, RecordCountsPayload},
        pagination::Page,
    },
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CountQuery {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

// POST /api/inventory-counts
#[utoipa::path(
    post,
    path = "/api/inventory-counts",
    tag = "Inventory Counts",
    responses(
        (status = 201, description = "Inventário iniciado com a foto do estoque", body = CountDetail),
        (status = 409, description = "Já existe um inventário em andamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn start_count(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _guard: RequireRole<StockWrite>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .count_service
        .start_count(&actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok((StatusCode::CREATED, Json(detail)))
}

// GET /api/inventory-counts
#[utoipa::path(
    get,
    path = "/api/inventory-counts",
    tag = "Inventory Counts",
    params(CountQuery),
    responses((status = 200, description = "Histórico de inventários", body = Page<InventoryCount>)),
    security(("api_jwt" = []))
)]
pub async fn list_counts(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<CountQuery>,
) -> Result<Json<Page<InventoryCount>>, ApiError> {
    let page = app_state
        .count_service
        .history(page_params(query.offset, query.limit))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok(Json(page))
}

// GET /api/inventory-counts/{id}
#[utoipa::path(
    get,
    path = "/api/inventory-counts/{id}",
    tag = "Inventory Counts",
    params(("id" = i64, Path, description = "ID do inventário")),
    responses(
        (status = 200, description = "Inventário com itens", body = CountDetail),
        (status = 404, description = "Inventário não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_count(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
) -> Result<Json<CountDetail>, ApiError> {
    let detail = app_state
        .count_service
        .detail(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok(Json(detail))
}

// PUT /api/inventory-counts/current/items
#[utoipa::path(
    put,
    path = "/api/inventory-counts/current/items",
    tag = "Inventory Counts",
    request_body = RecordCountsPayload,
    responses(
        (status = 200, description = "Contagens registradas", body = CountDetail),
        (status = 404, description = "Nenhum inventário em andamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn record_counts(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<StockWrite>,
    Json(payload): Json<RecordCountsPayload>,
) -> Result<Json<CountDetail>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.config))?;

    let detail = app_state
        .count_service
        .record_counts(payload.entries)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok(Json(detail))
}

// POST /api/inventory-counts/current/adjustments
#[utoipa::path(
    post,
    path = "/api/inventory-counts/current/adjustments",
    tag = "Inventory Counts",
    request_body = AdjustmentsPayload,
    responses(
        (status = 200, description = "Ajustes aplicados e inventário finalizado", body = FinalizedCount),
        (status = 404, description = "Nenhum inventário em andamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn apply_adjustments(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _guard: RequireRole<StockWrite>,
    Json(payload): Json<AdjustmentsPayload>,
) -> Result<Json<FinalizedCount>, ApiError> {
    let finalized = app_state
        .count_service
        .apply_adjustments(payload.adjustments, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok(Json(finalized))
}

// POST /api/inventory-counts/current/finalize
#[utoipa::path(
    post,
    path = "/api/inventory-counts/current/finalize",
    tag = "Inventory Counts",
    responses(
        (status = 200, description = "Finalizado com as contagens registradas", body = FinalizedCount),
        (status = 404, description = "Nenhum inventário em andamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn finalize_count(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _guard: RequireRole<StockWrite>,
) -> Result<Json<FinalizedCount>, ApiError> {
    let finalized = app_state
        .count_service
        .finalize(&actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok(Json(finalized))
}
