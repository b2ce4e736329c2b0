// src/services/catalog_service.rs

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::{
    common::{error::AppError, validation::fits_money},
    db::{finish, Store, StoreTx},
    models::{
        auth::Actor,
        catalog::{
            Client, CreateProduct, ImportRow, ImportSummary, NewClient, NewProduct, NewSupplier,
            Product, ProductFilter, Supplier,
        },
        pagination::{Page, PageParams},
    },
    services::ledger_service::LedgerService,
};

const INITIAL_STOCK_REASON: &str = "estoque inicial";
const IMPORT_REASON: &str = "importação de produtos";

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
    ledger: LedgerService,
}

fn ensure_positive_price(price: Decimal) -> Result<(), AppError> {
    if price <= Decimal::ZERO {
        return Err(AppError::InvalidInput("O preço deve ser maior que zero.".into()));
    }
    if !fits_money(price) {
        return Err(AppError::InvalidInput(
            "O preço aceita no máximo duas casas decimais e 9.999.999.999,99.".into(),
        ));
    }
    Ok(())
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>, ledger: LedgerService) -> Self {
        Self { store, ledger }
    }

    // =========================================================================
    //  PRODUTOS
    // =========================================================================

    pub async fn create_product(&self, payload: CreateProduct, actor: &Actor) -> Result<Product, AppError> {
        ensure_positive_price(payload.price)?;
        if payload.initial_quantity < 0 {
            return Err(AppError::InvalidInput("A quantidade inicial não pode ser negativa.".into()));
        }

        let mut tx = self.store.begin().await?;
        let result = self.create_product_tx(&mut *tx, payload, actor.user_id).await;
        let product = finish(tx, result).await?;

        tracing::info!(product_id = product.id, quantity = product.quantity, "🏷️ Produto cadastrado");
        Ok(product)
    }

    async fn create_product_tx(
        &self,
        tx: &mut dyn StoreTx,
        payload: CreateProduct,
        actor_id: i64,
    ) -> Result<Product, AppError> {
        if let Some(supplier_id) = payload.supplier_id {
            tx.find_supplier(supplier_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Fornecedor {}", supplier_id)))?;
        }

        // Nasce com 0; o saldo inicial entra pelo livro-razão
        let product = tx
            .insert_product(NewProduct {
                name: payload.name.trim().to_string(),
                size: payload.size,
                price: payload.price,
                supplier_id: payload.supplier_id,
            })
            .await?;

        if payload.initial_quantity > 0 {
            self.ledger
                .apply_movement(&mut *tx, product.id, payload.initial_quantity, INITIAL_STOCK_REASON, actor_id)
                .await?;
        }

        tx.find_product(product.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Produto {}", product.id)))
    }

    /// Importação em lote: (nome, tamanho) existente soma quantidade e atualiza preço.
    /// O lote inteiro é uma transação só.
    pub async fn import_products(&self, rows: Vec<ImportRow>, actor: &Actor) -> Result<ImportSummary, AppError> {
        if rows.is_empty() {
            return Err(AppError::InvalidInput("Nenhuma linha para importar.".into()));
        }
        for (line, row) in rows.iter().enumerate() {
            if row.name.trim().is_empty() {
                return Err(AppError::InvalidInput(format!("Linha {}: nome obrigatório.", line + 1)));
            }
            if row.quantity < 0 {
                return Err(AppError::InvalidInput(format!("Linha {}: quantidade negativa.", line + 1)));
            }
            if row.price <= Decimal::ZERO || !fits_money(row.price) {
                return Err(AppError::InvalidInput(format!("Linha {}: preço inválido.", line + 1)));
            }
        }

        let mut tx = self.store.begin().await?;
        let result = self.import_tx(&mut *tx, rows, actor.user_id).await;
        let summary = finish(tx, result).await?;

        tracing::info!(created = summary.created, updated = summary.updated, "📥 Importação concluída");
        Ok(summary)
    }

    async fn import_tx(
        &self,
        tx: &mut dyn StoreTx,
        rows: Vec<ImportRow>,
        actor_id: i64,
    ) -> Result<ImportSummary, AppError> {
        let mut summary = ImportSummary::default();

        for row in rows {
            let name = row.name.trim();
            match tx.find_product_by_name_size(name, row.size).await? {
                Some(existing) => {
                    if row.quantity > 0 {
                        self.ledger
                            .apply_movement(&mut *tx, existing.id, row.quantity, IMPORT_REASON, actor_id)
                            .await?;
                    }
                    tx.update_product_price(existing.id, row.price).await?;
                    summary.updated += 1;
                }
                None => {
                    if let Some(supplier_id) = row.supplier_id {
                        tx.find_supplier(supplier_id)
                            .await?
                            .ok_or_else(|| AppError::NotFound(format!("Fornecedor {}", supplier_id)))?;
                    }
                    let product = tx
                        .insert_product(NewProduct {
                            name: name.to_string(),
                            size: row.size,
                            price: row.price,
                            supplier_id: row.supplier_id,
                        })
                        .await?;
                    if row.quantity > 0 {
                        self.ledger
                            .apply_movement(&mut *tx, product.id, row.quantity, IMPORT_REASON, actor_id)
                            .await?;
                    }
                    summary.created += 1;
                }
            }
        }

        Ok(summary)
    }

    pub async fn update_price(&self, product_id: i64, price: Decimal) -> Result<Product, AppError> {
        ensure_positive_price(price)?;

        let mut tx = self.store.begin().await?;
        let result = tx
            .update_product_price(product_id, price)
            .await
            .and_then(|p| p.ok_or_else(|| AppError::NotFound(format!("Produto {}", product_id))));
        let product = finish(tx, result).await?;

        tracing::info!(product_id, %price, "💲 Preço atualizado");
        Ok(product)
    }

    pub async fn get_product(&self, product_id: i64) -> Result<Product, AppError> {
        let mut tx = self.store.begin().await?;
        let result = tx
            .find_product(product_id)
            .await
            .and_then(|p| p.ok_or_else(|| AppError::NotFound(format!("Produto {}", product_id))));
        finish(tx, result).await
    }

    pub async fn list_products(&self, filter: ProductFilter, page: PageParams) -> Result<Page<Product>, AppError> {
        let mut tx = self.store.begin().await?;
        let result = tx.list_products(&filter, page).await;
        let (items, total) = finish(tx, result).await?;
        Ok(Page::new(items, total, page))
    }

    // =========================================================================
    //  CLIENTES
    // =========================================================================

    pub async fn create_client(&self, client: NewClient) -> Result<Client, AppError> {
        if client.name.trim().is_empty() {
            return Err(AppError::InvalidInput("O nome é obrigatório.".into()));
        }

        let mut tx = self.store.begin().await?;
        let result = tx.insert_client(client).await;
        let client = finish(tx, result).await?;

        tracing::info!(client_id = client.id, "👤 Cliente cadastrado");
        Ok(client)
    }

    pub async fn get_client(&self, client_id: i64) -> Result<Client, AppError> {
        let mut tx = self.store.begin().await?;
        let result = tx
            .find_client(client_id)
            .await
            .and_then(|c| c.ok_or_else(|| AppError::NotFound(format!("Cliente {}", client_id))));
        finish(tx, result).await
    }

    pub async fn list_clients(&self, name: Option<String>, page: PageParams) -> Result<Page<Client>, AppError> {
        let mut tx = self.store.begin().await?;
        let result = tx.list_clients(name.as_deref(), page).await;
        let (items, total) = finish(tx, result).await?;
        Ok(Page::new(items, total, page))
    }

    // =========================================================================
    //  FORNECEDORES
    // =========================================================================

    pub async fn create_supplier(&self, supplier: NewSupplier) -> Result<Supplier, AppError> {
        if supplier.name.trim().is_empty() {
            return Err(AppError::InvalidInput("O nome é obrigatório.".into()));
        }

        let mut tx = self.store.begin().await?;
        let result = tx
            .insert_supplier(supplier.name.trim(), supplier.contact.as_deref())
            .await;
        let supplier = finish(tx, result).await?;

        tracing::info!(supplier_id = supplier.id, "🚚 Fornecedor cadastrado");
        Ok(supplier)
    }

    pub async fn list_suppliers(&self) -> Result<Vec<Supplier>, AppError> {
        let mut tx = self.store.begin().await?;
        let result = tx.list_suppliers().await;
        finish(tx, result).await
    }
}
