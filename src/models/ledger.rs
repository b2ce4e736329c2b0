// src/models/ledger.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::catalog::ProductSize;
use super::pagination::PageParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "movement_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Inbound,  // Entrada
    Outbound, // Saída
}

impl MovementKind {
    /// Sinal aplicado à magnitude gravada no histórico.
    pub fn sign(self) -> i32 {
        match self {
            MovementKind::Inbound => 1,
            MovementKind::Outbound => -1,
        }
    }

    pub fn for_delta(delta: i32) -> Self {
        if delta < 0 { MovementKind::Outbound } else { MovementKind::Inbound }
    }
}

// --- Movimentação (livro-razão, somente inserção) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: i64,
    pub product_id: i64,
    // Magnitude (sempre > 0); o sentido vem de `kind`
    pub quantity: i32,
    pub kind: MovementKind,
    pub reason: String,
    pub actor_id: i64,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    pub fn signed_quantity(&self) -> i32 {
        self.quantity * self.kind.sign()
    }
}

#[derive(Debug, Clone)]
pub struct NewMovement {
    pub product_id: i64,
    pub quantity: i32,
    pub kind: MovementKind,
    pub reason: String,
    pub actor_id: i64,
}

// Linha do histórico com os dados do produto (para a tela de movimentações)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MovementEntry {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub product_size: ProductSize,
    pub quantity: i32,
    pub kind: MovementKind,
    pub reason: String,
    pub actor_id: i64,
    pub created_at: DateTime<Utc>,
}

// Ajuste manual (entrada de mercadoria, perda, avaria...)
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdjustQuantityPayload {
    #[schema(example = -2)]
    pub delta: i32,
    pub kind: MovementKind,
    #[validate(length(min = 1, message = "O motivo é obrigatório."))]
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    pub product_id: Option<i64>,
    pub kind: Option<MovementKind>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub product_name: Option<String>,
    pub page: PageParams,
}

// Conferência do invariante: quantidade == soma das movimentações
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerAudit {
    pub product_id: i64,
    pub quantity: i32,
    pub movement_balance: i64,
    pub consistent: bool,
}
