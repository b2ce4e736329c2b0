// src/handlers/returns.rs

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
        rbac::{RequireRole, SalesWrite},
    },
    models::{
        pagination::Page,
        returns::{
            CreateReturn, RejectReturnPayload, ReturnApproval, ReturnDetail, ReturnFilter,
            ReturnStatus, SaleReturn,
        },
    },
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ReturnQuery {
    pub status: Option<ReturnStatus>,
    pub client_id: Option<i64>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

// POST /api/returns
#[utoipa::path(
    post,
    path = "/api/returns",
    tag = "Returns",
    request_body = CreateReturn,
    responses(
        (status = 201, description = "Devolução aberta (pendente)", body = ReturnDetail),
        (status = 400, description = "Quantidade inválida"),
        (status = 409, description = "Venda não concluída")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_return(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _guard: RequireRole<SalesWrite>,
    Json(payload): Json<CreateReturn>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.config))?;

    let detail = app_state
        .return_service
        .create_return(payload, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok((StatusCode::CREATED, Json(detail)))
}

// GET /api/returns
#[utoipa::path(
    get,
    path = "/api/returns",
    tag = "Returns",
    params(ReturnQuery),
    responses((status = 200, description = "Devoluções paginadas", body = Page<SaleReturn>)),
    security(("api_jwt" = []))
)]
pub async fn list_returns(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<ReturnQuery>,
) -> Result<Json<Page<SaleReturn>>, ApiError> {
    let filter = ReturnFilter {
        status: query.status,
        client_id: query.client_id,
        page: page_params(query.offset, query.limit),
    };

    let page = app_state
        .return_service
        .list_returns(filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok(Json(page))
}

// GET /api/returns/{id}
#[utoipa::path(
    get,
    path = "/api/returns/{id}",
    tag = "Returns",
    params(("id" = i64, Path, description = "ID da devolução")),
    responses(
        (status = 200, description = "Devolução com itens", body = ReturnDetail),
        (status = 404, description = "Devolução não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_return(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
) -> Result<Json<ReturnDetail>, ApiError> {
    let detail = app_state
        .return_service
        .get_return(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok(Json(detail))
}

// POST /api/returns/{id}/approve
#[utoipa::path(
    post,
    path = "/api/returns/{id}/approve",
    tag = "Returns",
    params(("id" = i64, Path, description = "ID da devolução")),
    responses(
        (status = 200, description = "Estoque devolvido e crédito emitido", body = ReturnApproval),
        (status = 409, description = "Devolução já decidida")
    ),
    security(("api_jwt" = []))
)]
pub async fn approve_return(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _guard: RequireRole<SalesWrite>,
    Path(id): Path<i64>,
) -> Result<Json<ReturnApproval>, ApiError> {
    let approval = app_state
        .return_service
        .approve_return(id, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok(Json(approval))
}

// POST /api/returns/{id}/reject
#[utoipa::path(
    post,
    path = "/api/returns/{id}/reject",
    tag = "Returns",
    params(("id" = i64, Path, description = "ID da devolução")),
    request_body = RejectReturnPayload,
    responses(
        (status = 200, description = "Devolução recusada", body = SaleReturn),
        (status = 409, description = "Devolução já decidida")
    ),
    security(("api_jwt" = []))
)]
pub async fn reject_return(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _guard: RequireRole<SalesWrite>,
    Path(id): Path<i64>,
    Json(payload): Json<RejectReturnPayload>,
) -> Result<Json<SaleReturn>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.config))?;

    let ret = app_state
        .return_service
        .reject_return(id, &payload.reason, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.config))?;

    Ok(Json(ret))
}
