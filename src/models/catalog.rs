// src/models/catalog.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::common::validation::{not_negative, positive_amount};

// --- 1. Grade de tamanhos ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "product_size", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ProductSize {
    Pp,  // Vira "PP"
    P,
    M,
    G,
    Gg,  // Vira "GG"
    Xg,  // Vira "XG"
    Xxg, // Vira "XXG"
}

// --- 2. Produtos ---
// A quantidade só muda pelo livro-razão (services::ledger_service).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[schema(example = 42)]
    pub id: i64,
    #[schema(example = "Camiseta Básica")]
    pub name: String,
    pub size: ProductSize,
    #[schema(example = 12)]
    pub quantity: i32,
    #[schema(example = 59.9)]
    pub price: Decimal,
    pub supplier_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub size: ProductSize,
    pub price: Decimal,
    pub supplier_id: Option<i64>,
}

// Cadastro de produto; a quantidade inicial entra como movimentação
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProduct {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    pub size: ProductSize,
    #[schema(example = 59.9)]
    #[validate(custom(function = "positive_amount"))]
    pub price: Decimal,
    #[serde(default)]
    #[validate(custom(function = "not_negative"))]
    pub initial_quantity: i32,
    pub supplier_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdatePricePayload {
    #[schema(example = 64.9)]
    #[validate(custom(function = "positive_amount"))]
    pub price: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub name: Option<String>,
    pub size: Option<ProductSize>,
}

// Linha de importação em lote (o parsing de CSV/XLSX fica fora deste serviço)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportRow {
    pub name: String,
    pub size: ProductSize,
    pub quantity: i32,
    pub price: Decimal,
    pub supplier_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ImportPayload {
    #[validate(length(min = 1, message = "Nenhuma linha para importar."))]
    pub rows: Vec<ImportRow>,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
}

// --- 3. Clientes ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: i64,
    #[schema(example = "Maria Souza")]
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewClient {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    pub phone: Option<String>,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,
}

// --- 4. Fornecedores ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: i64,
    #[schema(example = "Malharia Sul")]
    pub name: String,
    pub contact: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewSupplier {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    pub contact: Option<String>,
}
