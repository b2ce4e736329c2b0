// src/models/credits.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::common::validation::positive_amount;

use super::sales::SaleStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "credit_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CreditStatus {
    Available,
    Used,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "credit_origin", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CreditOrigin {
    Return,    // Gerado por devolução aprovada
    Manual,    // Concedido pela loja
    Remainder, // Saldo restante de um crédito usado parcialmente
}

// --- Crédito do cliente (vale-troca) ---
// Nunca tem o valor alterado: uso parcial gera um novo crédito com o saldo.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Credit {
    pub id: i64,
    pub client_id: i64,
    pub amount: Decimal,
    pub origin: CreditOrigin,
    pub status: CreditStatus,
    pub return_id: Option<i64>,
    pub parent_credit_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credit {
    /// Disponível e não vencido em `now` (validade nula = não vence).
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.status == CreditStatus::Available && self.expires_at.is_none_or(|exp| exp > now)
    }
}

#[derive(Debug, Clone)]
pub struct NewCredit {
    pub client_id: i64,
    pub amount: Decimal,
    pub origin: CreditOrigin,
    pub return_id: Option<i64>,
    pub parent_credit_id: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreditUsage {
    pub id: i64,
    pub credit_id: i64,
    pub sale_id: i64,
    pub amount: Decimal,
    pub actor_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCreditUsage {
    pub credit_id: i64,
    pub sale_id: i64,
    pub amount: Decimal,
    pub actor_id: i64,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrantCredit {
    #[schema(example = 50.0)]
    #[validate(custom(function = "positive_amount"))]
    pub amount: Decimal,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplyCredit {
    pub client_id: i64,
    pub credit_id: i64,
    #[schema(example = 30.0)]
    #[validate(custom(function = "positive_amount"))]
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientCredits {
    pub credits: Vec<Credit>,
    pub total: Decimal,
}

// Resultado de uma aplicação de crédito em uma venda
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreditApplication {
    pub usage: CreditUsage,
    pub remainder: Option<Credit>,
    pub sale_total: Decimal,
    pub sale_status: SaleStatus,
}
