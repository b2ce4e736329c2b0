// src/models/sales.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::common::validation::{money, positive_amount};

use super::pagination::PageParams;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_method", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    CreditCard, // "credit-card"
    DebitCard,  // "debit-card"
    Pix,
    Crediario,  // Crediário da loja (encomenda paga em parcelas)
    Check,
    Cash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "sale_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Pending,
    Completed,
    Cancelled,
}

// --- Venda ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: i64,
    pub client_id: Option<i64>,
    #[schema(example = 150.0)]
    pub subtotal: Decimal,
    // Percentual e valor descrevem o mesmo desconto
    pub discount_percent: Option<Decimal>,
    pub discount_amount: Decimal,
    #[schema(example = 135.0)]
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub actor_id: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub id: i64,
    pub sale_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewSale {
    pub client_id: Option<i64>,
    pub subtotal: Decimal,
    pub discount_percent: Option<Decimal>,
    pub discount_amount: Decimal,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub actor_id: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewSaleItem {
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

// Linha pedida pelo vendedor; `unit_price` sobrescreve o preço do produto
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleLine {
    pub product_id: i64,
    #[validate(range(min = 1, message = "A quantidade deve ser maior que zero."))]
    pub quantity: i32,
    #[validate(custom(function = "money"))]
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiscountInput {
    pub percent: Option<Decimal>,
    pub amount: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSale {
    pub client_id: Option<i64>,
    #[validate(length(min = 1, message = "A venda precisa de pelo menos um item."), nested)]
    pub lines: Vec<SaleLine>,
    #[serde(default)]
    pub discount: DiscountInput,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    pub client_name: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub status: Option<SaleStatus>,
    pub page: PageParams,
}

// Linha da listagem de vendas
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleSummary {
    pub id: i64,
    pub client_id: Option<i64>,
    pub client_name: Option<String>,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub actor_id: i64,
    pub created_at: DateTime<Utc>,
}

// --- Pagamentos ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: i64,
    pub sale_id: i64,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub actor_id: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub sale_id: i64,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub actor_id: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CancelSalePayload {
    #[validate(length(min = 1, message = "O motivo do cancelamento é obrigatório."))]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RecordPayment {
    #[schema(example = 40.0)]
    #[validate(custom(function = "positive_amount"))]
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub total: Decimal,
    pub paid: Decimal,
    pub remaining: Decimal,
}

impl Balance {
    pub fn new(total: Decimal, paid: Decimal) -> Self {
        Self { total, paid, remaining: total - paid }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    pub balance: Balance,
}

// Resposta do registro de pagamento: o saldo e o status já atualizados
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub balance: Balance,
    pub sale_status: SaleStatus,
}
