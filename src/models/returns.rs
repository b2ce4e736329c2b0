// src/models/returns.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::credits::Credit;

use super::pagination::PageParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "return_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReturnStatus {
    Pending,
    Approved,
    Rejected,
}

// --- Devolução ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleReturn {
    pub id: i64,
    pub sale_id: i64,
    pub client_id: i64,
    pub reason: String,
    pub total: Decimal,
    pub status: ReturnStatus,
    pub actor_id: i64,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnItem {
    pub id: i64,
    pub return_id: i64,
    pub sale_item_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewReturn {
    pub sale_id: i64,
    pub client_id: i64,
    pub reason: String,
    pub total: Decimal,
    pub actor_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewReturnItem {
    pub sale_item_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnLine {
    pub sale_item_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReturn {
    pub sale_id: i64,
    pub client_id: i64,
    #[validate(length(min = 1, message = "O motivo da devolução é obrigatório."))]
    pub reason: String,
    #[validate(length(min = 1, message = "Informe pelo menos um item."))]
    pub lines: Vec<ReturnLine>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RejectReturnPayload {
    #[validate(length(min = 1, message = "O motivo da recusa é obrigatório."))]
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ReturnFilter {
    pub status: Option<ReturnStatus>,
    pub client_id: Option<i64>,
    pub page: PageParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnDetail {
    #[serde(flatten)]
    pub header: SaleReturn,
    pub items: Vec<ReturnItem>,
}

// Devolução aprovada junto com o crédito emitido para o cliente
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnApproval {
    #[serde(flatten)]
    pub header: SaleReturn,
    pub items: Vec<ReturnItem>,
    pub credit: Option<Credit>,
}
