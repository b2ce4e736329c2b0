// src/db/store.rs
//
// Porta de persistência. Os services nunca falam SQL direto: abrem uma
// transação com `Store::begin`, passam `&mut dyn StoreTx` para todas as
// chamadas de repositório e encerram com `finish` (commit ou rollback).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{
    common::error::AppError,
    models::{
        auth::{NewUser, User},
        catalog::{Client, NewClient, NewProduct, Product, ProductFilter, ProductSize, Supplier},
        credits::{Credit, CreditUsage, NewCredit, NewCreditUsage},
        inventory_count::{InventoryCount, InventoryCountItem},
        ledger::{MovementEntry, MovementFilter, NewMovement, StockMovement},
        pagination::PageParams,
        returns::{NewReturn, NewReturnItem, ReturnFilter, ReturnItem, ReturnStatus, SaleReturn},
        sales::{
            NewPayment, NewSale, NewSaleItem, Payment, Sale, SaleFilter, SaleItem, SaleStatus,
            SaleSummary,
        },
    },
};

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, AppError>;
}

/// Escopo de transação. Sem `commit`, nada do que foi escrito fica visível.
#[async_trait]
pub trait StoreTx:
    UserRepository
    + CatalogRepository
    + LedgerRepository
    + SaleRepository
    + ReturnRepository
    + CreditRepository
    + CountRepository
    + Send
{
    async fn commit(self: Box<Self>) -> Result<(), AppError>;
    async fn rollback(self: Box<Self>) -> Result<(), AppError>;
}

/// Único ponto de saída de uma transação: commit no Ok, rollback no Err.
pub async fn finish<T>(tx: Box<dyn StoreTx>, result: Result<T, AppError>) -> Result<T, AppError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!("🔥 Falha no rollback: {}", rollback_err);
            }
            Err(err)
        }
    }
}

#[async_trait]
pub trait UserRepository {
    async fn find_user(&mut self, id: i64) -> Result<Option<User>, AppError>;
    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, AppError>;
    async fn insert_user(&mut self, user: NewUser) -> Result<User, AppError>;
    async fn count_users(&mut self) -> Result<i64, AppError>;
}

#[async_trait]
pub trait CatalogRepository {
    async fn insert_product(&mut self, product: NewProduct) -> Result<Product, AppError>;
    async fn find_product(&mut self, id: i64) -> Result<Option<Product>, AppError>;
    /// Lê o produto travando a linha até o fim da transação.
    async fn lock_product(&mut self, id: i64) -> Result<Option<Product>, AppError>;
    async fn find_product_by_name_size(
        &mut self,
        name: &str,
        size: ProductSize,
    ) -> Result<Option<Product>, AppError>;
    async fn update_product_price(&mut self, id: i64, price: Decimal) -> Result<Option<Product>, AppError>;
    async fn list_products(
        &mut self,
        filter: &ProductFilter,
        page: PageParams,
    ) -> Result<(Vec<Product>, i64), AppError>;

    async fn insert_client(&mut self, client: NewClient) -> Result<Client, AppError>;
    async fn find_client(&mut self, id: i64) -> Result<Option<Client>, AppError>;
    async fn list_clients(
        &mut self,
        name: Option<&str>,
        page: PageParams,
    ) -> Result<(Vec<Client>, i64), AppError>;

    async fn insert_supplier(&mut self, name: &str, contact: Option<&str>) -> Result<Supplier, AppError>;
    async fn find_supplier(&mut self, id: i64) -> Result<Option<Supplier>, AppError>;
    async fn list_suppliers(&mut self) -> Result<Vec<Supplier>, AppError>;
}

#[async_trait]
pub trait LedgerRepository {
    /// Soma `delta` à quantidade somente se o resultado não ficar negativo.
    /// `None` quando a condição falha (ou o produto não existe).
    async fn apply_quantity_delta(&mut self, product_id: i64, delta: i32) -> Result<Option<Product>, AppError>;
    async fn set_product_quantity(&mut self, product_id: i64, quantity: i32) -> Result<Product, AppError>;
    async fn insert_movement(&mut self, movement: NewMovement) -> Result<StockMovement, AppError>;
    /// Soma com sinal de todas as movimentações do produto.
    async fn movement_balance(&mut self, product_id: i64) -> Result<i64, AppError>;
    async fn list_movements(&mut self, filter: &MovementFilter) -> Result<(Vec<MovementEntry>, i64), AppError>;
}

#[async_trait]
pub trait SaleRepository {
    async fn insert_sale(&mut self, sale: NewSale) -> Result<Sale, AppError>;
    async fn insert_sale_item(&mut self, sale_id: i64, item: NewSaleItem) -> Result<SaleItem, AppError>;
    async fn find_sale(&mut self, id: i64) -> Result<Option<Sale>, AppError>;
    async fn lock_sale(&mut self, id: i64) -> Result<Option<Sale>, AppError>;
    async fn list_sale_items(&mut self, sale_id: i64) -> Result<Vec<SaleItem>, AppError>;
    async fn find_sale_item(&mut self, sale_id: i64, item_id: i64) -> Result<Option<SaleItem>, AppError>;
    async fn update_sale_status(
        &mut self,
        id: i64,
        status: SaleStatus,
        notes: Option<String>,
    ) -> Result<Sale, AppError>;
    async fn update_sale_total(&mut self, id: i64, total: Decimal) -> Result<Sale, AppError>;
    async fn list_sales(&mut self, filter: &SaleFilter) -> Result<(Vec<SaleSummary>, i64), AppError>;

    async fn insert_payment(&mut self, payment: NewPayment) -> Result<Payment, AppError>;
    async fn sum_payments(&mut self, sale_id: i64) -> Result<Decimal, AppError>;
    async fn list_payments(&mut self, sale_id: i64) -> Result<Vec<Payment>, AppError>;
}

#[async_trait]
pub trait ReturnRepository {
    async fn insert_return(&mut self, ret: NewReturn) -> Result<SaleReturn, AppError>;
    async fn insert_return_item(&mut self, return_id: i64, item: NewReturnItem) -> Result<ReturnItem, AppError>;
    async fn find_return(&mut self, id: i64) -> Result<Option<SaleReturn>, AppError>;
    async fn lock_return(&mut self, id: i64) -> Result<Option<SaleReturn>, AppError>;
    async fn list_return_items(&mut self, return_id: i64) -> Result<Vec<ReturnItem>, AppError>;
    /// Quantidade já devolvida de um item de venda em devoluções com os status dados.
    async fn returned_quantity(
        &mut self,
        sale_item_id: i64,
        statuses: &[ReturnStatus],
    ) -> Result<i64, AppError>;
    async fn update_return_status(
        &mut self,
        id: i64,
        status: ReturnStatus,
        rejection_reason: Option<String>,
    ) -> Result<SaleReturn, AppError>;
    async fn list_returns(&mut self, filter: &ReturnFilter) -> Result<(Vec<SaleReturn>, i64), AppError>;
}

#[async_trait]
pub trait CreditRepository {
    async fn insert_credit(&mut self, credit: NewCredit) -> Result<Credit, AppError>;
    async fn lock_credit(&mut self, id: i64) -> Result<Option<Credit>, AppError>;
    async fn mark_credit_used(&mut self, id: i64) -> Result<Credit, AppError>;
    /// Créditos disponíveis e não vencidos em `now`, mais novos primeiro.
    async fn list_available_credits(
        &mut self,
        client_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Credit>, AppError>;
    async fn insert_credit_usage(&mut self, usage: NewCreditUsage) -> Result<CreditUsage, AppError>;
}

#[async_trait]
pub trait CountRepository {
    /// Falha com `Conflict` se já existir contagem em andamento.
    async fn insert_count(&mut self, actor_id: i64) -> Result<InventoryCount, AppError>;
    async fn lock_open_count(&mut self) -> Result<Option<InventoryCount>, AppError>;
    /// Congela a quantidade atual de todos os produtos na contagem.
    async fn snapshot_count_items(&mut self, count_id: i64) -> Result<u64, AppError>;
    /// `false` quando o produto não pertence à contagem.
    async fn update_count_item(
        &mut self,
        count_id: i64,
        product_id: i64,
        physical_quantity: i32,
        note: Option<String>,
    ) -> Result<bool, AppError>;
    async fn list_count_items(&mut self, count_id: i64) -> Result<Vec<InventoryCountItem>, AppError>;
    async fn finish_count(&mut self, count_id: i64) -> Result<InventoryCount, AppError>;
    async fn find_count(&mut self, id: i64) -> Result<Option<InventoryCount>, AppError>;
    async fn list_counts(&mut self, page: PageParams) -> Result<(Vec<InventoryCount>, i64), AppError>;
}
