// src/models/inventory_count.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::catalog::ProductSize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "count_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CountStatus {
    InProgress,
    Finished,
}

// --- Cabeçalho do inventário físico ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryCount {
    pub id: i64,
    pub status: CountStatus,
    pub actor_id: i64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

// Uma linha por produto: quantidade do sistema congelada no início da contagem
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryCountItem {
    pub count_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub product_size: ProductSize,
    pub system_quantity: i32,
    pub physical_quantity: Option<i32>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CountItemState {
    Uncounted,
    Mismatch,
    Match,
}

impl InventoryCountItem {
    pub fn state(&self) -> CountItemState {
        match self.physical_quantity {
            None => CountItemState::Uncounted,
            Some(q) if q != self.system_quantity => CountItemState::Mismatch,
            Some(_) => CountItemState::Match,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountEntry {
    pub product_id: i64,
    pub physical_quantity: i32,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Adjustment {
    pub product_id: i64,
    pub new_quantity: i32,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RecordCountsPayload {
    #[validate(length(min = 1, message = "Nenhuma contagem informada."))]
    pub entries: Vec<CountEntry>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AdjustmentsPayload {
    pub adjustments: Vec<Adjustment>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppliedAdjustment {
    pub product_id: i64,
    pub previous_quantity: i32,
    pub new_quantity: i32,
    pub movement_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountDetail {
    #[serde(flatten)]
    pub count: InventoryCount,
    pub items: Vec<InventoryCountItem>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedCount {
    #[serde(flatten)]
    pub count: InventoryCount,
    pub adjustments: Vec<AppliedAdjustment>,
}
