// src/db/postgres.rs
//
// Adaptador Postgres da porta de persistência. Toda operação roda dentro de
// uma `sqlx::Transaction`; leituras que antecedem escrita usam FOR UPDATE.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use super::store::{
    CatalogRepository, CountRepository, CreditRepository, LedgerRepository, ReturnRepository,
    SaleRepository, Store, StoreTx, UserRepository,
};
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

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

// Traduz violações de unicidade para Conflict, pelo nome da constraint
fn map_unique(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some("users_email_key") => AppError::Conflict("Este e-mail já está em uso.".into()),
                Some("products_name_size_key") => {
                    AppError::Conflict("Já existe um produto com este nome e tamanho.".into())
                }
                Some("idx_inventory_counts_open") => {
                    AppError::Conflict("Já existe um inventário em andamento.".into())
                }
                other => AppError::Conflict(format!(
                    "Registro duplicado ({}).",
                    other.unwrap_or("desconhecido")
                )),
            };
        }
    }
    e.into()
}

fn return_status_label(status: ReturnStatus) -> &'static str {
    match status {
        ReturnStatus::Pending => "pending",
        ReturnStatus::Approved => "approved",
        ReturnStatus::Rejected => "rejected",
    }
}

// =========================================================================
//  USUÁRIOS
// =========================================================================

#[async_trait]
impl UserRepository for PgTx {
    async fn find_user(&mut self, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(user)
    }

    async fn insert_user(&mut self, user: NewUser) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user.name)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.role)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_unique)
    }

    async fn count_users(&mut self) -> Result<i64, AppError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(total)
    }
}

// =========================================================================
//  CATÁLOGO
// =========================================================================

const PRODUCT_FILTER: &str = r#"
    WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%')
      AND ($2::product_size IS NULL OR size = $2)
"#;

const CLIENT_FILTER: &str = "WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%')";

#[async_trait]
impl CatalogRepository for PgTx {
    async fn insert_product(&mut self, product: NewProduct) -> Result<Product, AppError> {
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (name, size, quantity, price, supplier_id)
            VALUES ($1, $2, 0, $3, $4)
            RETURNING *
            "#,
        )
        .bind(product.name)
        .bind(product.size)
        .bind(product.price)
        .bind(product.supplier_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_unique)
    }

    async fn find_product(&mut self, id: i64) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(product)
    }

    async fn lock_product(&mut self, id: i64) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(product)
    }

    async fn find_product_by_name_size(
        &mut self,
        name: &str,
        size: ProductSize,
    ) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE LOWER(name) = LOWER($1) AND size = $2 FOR UPDATE",
        )
        .bind(name)
        .bind(size)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(product)
    }

    async fn update_product_price(&mut self, id: i64, price: Decimal) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(
            "UPDATE products SET price = $1 WHERE id = $2 RETURNING *",
        )
        .bind(price)
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(product)
    }

    async fn list_products(
        &mut self,
        filter: &ProductFilter,
        page: PageParams,
    ) -> Result<(Vec<Product>, i64), AppError> {
        let page = page.normalized();
        let rows = sqlx::query_as::<_, Product>(&format!(
            "SELECT * FROM products {} ORDER BY name ASC, id ASC OFFSET $3 LIMIT $4",
            PRODUCT_FILTER
        ))
        .bind(filter.name.as_deref())
        .bind(filter.size)
        .bind(page.offset)
        .bind(page.limit)
        .fetch_all(&mut *self.tx)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM products {}", PRODUCT_FILTER))
            .bind(filter.name.as_deref())
            .bind(filter.size)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok((rows, total))
    }

    async fn insert_client(&mut self, client: NewClient) -> Result<Client, AppError> {
        let client = sqlx::query_as::<_, Client>(
            "INSERT INTO clients (name, phone, email) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(client.name)
        .bind(client.phone)
        .bind(client.email)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(client)
    }

    async fn find_client(&mut self, id: i64) -> Result<Option<Client>, AppError> {
        let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(client)
    }

    async fn list_clients(
        &mut self,
        name: Option<&str>,
        page: PageParams,
    ) -> Result<(Vec<Client>, i64), AppError> {
        let page = page.normalized();
        let rows = sqlx::query_as::<_, Client>(&format!(
            "SELECT * FROM clients {} ORDER BY name ASC, id ASC OFFSET $2 LIMIT $3",
            CLIENT_FILTER
        ))
        .bind(name)
        .bind(page.offset)
        .bind(page.limit)
        .fetch_all(&mut *self.tx)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM clients {}", CLIENT_FILTER))
            .bind(name)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok((rows, total))
    }

    async fn insert_supplier(&mut self, name: &str, contact: Option<&str>) -> Result<Supplier, AppError> {
        let supplier = sqlx::query_as::<_, Supplier>(
            "INSERT INTO suppliers (name, contact) VALUES ($1, $2) RETURNING *",
        )
        .bind(name)
        .bind(contact)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(supplier)
    }

    async fn find_supplier(&mut self, id: i64) -> Result<Option<Supplier>, AppError> {
        let supplier = sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(supplier)
    }

    async fn list_suppliers(&mut self) -> Result<Vec<Supplier>, AppError> {
        let suppliers = sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers ORDER BY name ASC")
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(suppliers)
    }
}

// =========================================================================
//  LIVRO-RAZÃO
// =========================================================================

const MOVEMENT_FILTER: &str = r#"
    FROM stock_movements m
    JOIN products p ON p.id = m.product_id
    WHERE ($1::bigint IS NULL OR m.product_id = $1)
      AND ($2::movement_kind IS NULL OR m.kind = $2)
      AND ($3::timestamptz IS NULL OR m.created_at >= $3)
      AND ($4::timestamptz IS NULL OR m.created_at <= $4)
      AND ($5::text IS NULL OR p.name ILIKE '%' || $5 || '%')
"#;

#[async_trait]
impl LedgerRepository for PgTx {
    async fn apply_quantity_delta(&mut self, product_id: i64, delta: i32) -> Result<Option<Product>, AppError> {
        // UPDATE condicional: nunca deixa o saldo negativo, mesmo sob concorrência
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET quantity = quantity + $1
            WHERE id = $2 AND quantity + $1 >= 0
            RETURNING *
            "#,
        )
        .bind(delta)
        .bind(product_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(product)
    }

    async fn set_product_quantity(&mut self, product_id: i64, quantity: i32) -> Result<Product, AppError> {
        sqlx::query_as::<_, Product>("UPDATE products SET quantity = $1 WHERE id = $2 RETURNING *")
            .bind(quantity)
            .bind(product_id)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Produto {}", product_id)))
    }

    async fn insert_movement(&mut self, movement: NewMovement) -> Result<StockMovement, AppError> {
        let movement = sqlx::query_as::<_, StockMovement>(
            r#"
            INSERT INTO stock_movements (product_id, quantity, kind, reason, actor_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(movement.product_id)
        .bind(movement.quantity)
        .bind(movement.kind)
        .bind(movement.reason)
        .bind(movement.actor_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(movement)
    }

    async fn movement_balance(&mut self, product_id: i64) -> Result<i64, AppError> {
        let balance = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(CASE WHEN kind = 'inbound' THEN quantity ELSE -quantity END), 0)::BIGINT
            FROM stock_movements
            WHERE product_id = $1
            "#,
        )
        .bind(product_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(balance)
    }

    async fn list_movements(&mut self, filter: &MovementFilter) -> Result<(Vec<MovementEntry>, i64), AppError> {
        let page = filter.page.normalized();
        let rows = sqlx::query_as::<_, MovementEntry>(&format!(
            r#"
            SELECT m.id, m.product_id, p.name AS product_name, p.size AS product_size,
                   m.quantity, m.kind, m.reason, m.actor_id, m.created_at
            {}
            ORDER BY m.created_at DESC, m.id DESC
            OFFSET $6 LIMIT $7
            "#,
            MOVEMENT_FILTER
        ))
        .bind(filter.product_id)
        .bind(filter.kind)
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.product_name.as_deref())
        .bind(page.offset)
        .bind(page.limit)
        .fetch_all(&mut *self.tx)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) {}", MOVEMENT_FILTER))
            .bind(filter.product_id)
            .bind(filter.kind)
            .bind(filter.from)
            .bind(filter.to)
            .bind(filter.product_name.as_deref())
            .fetch_one(&mut *self.tx)
            .await?;

        Ok((rows, total))
    }
}

// =========================================================================
//  VENDAS E PAGAMENTOS
// =========================================================================

const SALE_FILTER: &str = r#"
    FROM sales s
    LEFT JOIN clients c ON c.id = s.client_id
    WHERE ($1::text IS NULL OR c.name ILIKE '%' || $1 || '%')
      AND ($2::timestamptz IS NULL OR s.created_at >= $2)
      AND ($3::timestamptz IS NULL OR s.created_at <= $3)
      AND ($4::sale_status IS NULL OR s.status = $4)
"#;

#[async_trait]
impl SaleRepository for PgTx {
    async fn insert_sale(&mut self, sale: NewSale) -> Result<Sale, AppError> {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            INSERT INTO sales (
                client_id, subtotal, discount_percent, discount_amount, total,
                payment_method, status, actor_id, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(sale.client_id)
        .bind(sale.subtotal)
        .bind(sale.discount_percent)
        .bind(sale.discount_amount)
        .bind(sale.total)
        .bind(sale.payment_method)
        .bind(sale.status)
        .bind(sale.actor_id)
        .bind(sale.notes)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(sale)
    }

    async fn insert_sale_item(&mut self, sale_id: i64, item: NewSaleItem) -> Result<SaleItem, AppError> {
        let item = sqlx::query_as::<_, SaleItem>(
            r#"
            INSERT INTO sale_items (sale_id, product_id, quantity, unit_price, subtotal)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(sale_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.subtotal)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(item)
    }

    async fn find_sale(&mut self, id: i64) -> Result<Option<Sale>, AppError> {
        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(sale)
    }

    async fn lock_sale(&mut self, id: i64) -> Result<Option<Sale>, AppError> {
        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(sale)
    }

    async fn list_sale_items(&mut self, sale_id: i64) -> Result<Vec<SaleItem>, AppError> {
        let items = sqlx::query_as::<_, SaleItem>("SELECT * FROM sale_items WHERE sale_id = $1 ORDER BY id")
            .bind(sale_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(items)
    }

    async fn find_sale_item(&mut self, sale_id: i64, item_id: i64) -> Result<Option<SaleItem>, AppError> {
        let item = sqlx::query_as::<_, SaleItem>("SELECT * FROM sale_items WHERE sale_id = $1 AND id = $2")
            .bind(sale_id)
            .bind(item_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(item)
    }

    async fn update_sale_status(
        &mut self,
        id: i64,
        status: SaleStatus,
        notes: Option<String>,
    ) -> Result<Sale, AppError> {
        sqlx::query_as::<_, Sale>(
            "UPDATE sales SET status = $1, notes = COALESCE($2, notes) WHERE id = $3 RETURNING *",
        )
        .bind(status)
        .bind(notes)
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Venda {}", id)))
    }

    async fn update_sale_total(&mut self, id: i64, total: Decimal) -> Result<Sale, AppError> {
        sqlx::query_as::<_, Sale>("UPDATE sales SET total = $1 WHERE id = $2 RETURNING *")
            .bind(total)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Venda {}", id)))
    }

    async fn list_sales(&mut self, filter: &SaleFilter) -> Result<(Vec<SaleSummary>, i64), AppError> {
        let page = filter.page.normalized();
        let rows = sqlx::query_as::<_, SaleSummary>(&format!(
            r#"
            SELECT s.id, s.client_id, c.name AS client_name, s.total, s.payment_method,
                   s.status, s.actor_id, s.created_at
            {}
            ORDER BY s.created_at DESC, s.id DESC
            OFFSET $5 LIMIT $6
            "#,
            SALE_FILTER
        ))
        .bind(filter.client_name.as_deref())
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.status)
        .bind(page.offset)
        .bind(page.limit)
        .fetch_all(&mut *self.tx)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) {}", SALE_FILTER))
            .bind(filter.client_name.as_deref())
            .bind(filter.from)
            .bind(filter.to)
            .bind(filter.status)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok((rows, total))
    }

    async fn insert_payment(&mut self, payment: NewPayment) -> Result<Payment, AppError> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (sale_id, amount, method, actor_id, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(payment.sale_id)
        .bind(payment.amount)
        .bind(payment.method)
        .bind(payment.actor_id)
        .bind(payment.notes)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(payment)
    }

    async fn sum_payments(&mut self, sale_id: i64) -> Result<Decimal, AppError> {
        let paid = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE sale_id = $1",
        )
        .bind(sale_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(paid)
    }

    async fn list_payments(&mut self, sale_id: i64) -> Result<Vec<Payment>, AppError> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE sale_id = $1 ORDER BY created_at, id",
        )
        .bind(sale_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(payments)
    }
}

// =========================================================================
//  DEVOLUÇÕES
// =========================================================================

const RETURN_FILTER: &str = r#"
    WHERE ($1::return_status IS NULL OR status = $1)
      AND ($2::bigint IS NULL OR client_id = $2)
"#;

#[async_trait]
impl ReturnRepository for PgTx {
    async fn insert_return(&mut self, ret: NewReturn) -> Result<SaleReturn, AppError> {
        let ret = sqlx::query_as::<_, SaleReturn>(
            r#"
            INSERT INTO returns (sale_id, client_id, reason, total, status, actor_id)
            VALUES ($1, $2, $3, $4, 'pending', $5)
            RETURNING *
            "#,
        )
        .bind(ret.sale_id)
        .bind(ret.client_id)
        .bind(ret.reason)
        .bind(ret.total)
        .bind(ret.actor_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(ret)
    }

    async fn insert_return_item(&mut self, return_id: i64, item: NewReturnItem) -> Result<ReturnItem, AppError> {
        let item = sqlx::query_as::<_, ReturnItem>(
            r#"
            INSERT INTO return_items (return_id, sale_item_id, product_id, quantity, unit_price, subtotal)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(return_id)
        .bind(item.sale_item_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.subtotal)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(item)
    }

    async fn find_return(&mut self, id: i64) -> Result<Option<SaleReturn>, AppError> {
        let ret = sqlx::query_as::<_, SaleReturn>("SELECT * FROM returns WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(ret)
    }

    async fn lock_return(&mut self, id: i64) -> Result<Option<SaleReturn>, AppError> {
        let ret = sqlx::query_as::<_, SaleReturn>("SELECT * FROM returns WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(ret)
    }

    async fn list_return_items(&mut self, return_id: i64) -> Result<Vec<ReturnItem>, AppError> {
        let items = sqlx::query_as::<_, ReturnItem>(
            "SELECT * FROM return_items WHERE return_id = $1 ORDER BY id",
        )
        .bind(return_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(items)
    }

    async fn returned_quantity(
        &mut self,
        sale_item_id: i64,
        statuses: &[ReturnStatus],
    ) -> Result<i64, AppError> {
        let labels: Vec<&str> = statuses.iter().copied().map(return_status_label).collect();
        let quantity = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(ri.quantity), 0)::BIGINT
            FROM return_items ri
            JOIN returns r ON r.id = ri.return_id
            WHERE ri.sale_item_id = $1 AND r.status::text = ANY($2)
            "#,
        )
        .bind(sale_item_id)
        .bind(labels)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(quantity)
    }

    async fn update_return_status(
        &mut self,
        id: i64,
        status: ReturnStatus,
        rejection_reason: Option<String>,
    ) -> Result<SaleReturn, AppError> {
        sqlx::query_as::<_, SaleReturn>(
            r#"
            UPDATE returns
            SET status = $1, rejection_reason = $2, decided_at = NOW()
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(rejection_reason)
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Devolução {}", id)))
    }

    async fn list_returns(&mut self, filter: &ReturnFilter) -> Result<(Vec<SaleReturn>, i64), AppError> {
        let page = filter.page.normalized();
        let rows = sqlx::query_as::<_, SaleReturn>(&format!(
            "SELECT * FROM returns {} ORDER BY created_at DESC, id DESC OFFSET $3 LIMIT $4",
            RETURN_FILTER
        ))
        .bind(filter.status)
        .bind(filter.client_id)
        .bind(page.offset)
        .bind(page.limit)
        .fetch_all(&mut *self.tx)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM returns {}", RETURN_FILTER))
            .bind(filter.status)
            .bind(filter.client_id)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok((rows, total))
    }
}

// =========================================================================
//  CRÉDITOS
// =========================================================================

#[async_trait]
impl CreditRepository for PgTx {
    async fn insert_credit(&mut self, credit: NewCredit) -> Result<Credit, AppError> {
        let credit = sqlx::query_as::<_, Credit>(
            r#"
            INSERT INTO credits (client_id, amount, origin, status, return_id, parent_credit_id, expires_at)
            VALUES ($1, $2, $3, 'available', $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(credit.client_id)
        .bind(credit.amount)
        .bind(credit.origin)
        .bind(credit.return_id)
        .bind(credit.parent_credit_id)
        .bind(credit.expires_at)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(credit)
    }

    async fn lock_credit(&mut self, id: i64) -> Result<Option<Credit>, AppError> {
        let credit = sqlx::query_as::<_, Credit>("SELECT * FROM credits WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(credit)
    }

    async fn mark_credit_used(&mut self, id: i64) -> Result<Credit, AppError> {
        sqlx::query_as::<_, Credit>("UPDATE credits SET status = 'used' WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Crédito {}", id)))
    }

    async fn list_available_credits(
        &mut self,
        client_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Credit>, AppError> {
        let credits = sqlx::query_as::<_, Credit>(
            r#"
            SELECT * FROM credits
            WHERE client_id = $1
              AND status = 'available'
              AND (expires_at IS NULL OR expires_at > $2)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(client_id)
        .bind(now)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(credits)
    }

    async fn insert_credit_usage(&mut self, usage: NewCreditUsage) -> Result<CreditUsage, AppError> {
        let usage = sqlx::query_as::<_, CreditUsage>(
            r#"
            INSERT INTO credit_usages (credit_id, sale_id, amount, actor_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(usage.credit_id)
        .bind(usage.sale_id)
        .bind(usage.amount)
        .bind(usage.actor_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(usage)
    }
}

// =========================================================================
//  INVENTÁRIO FÍSICO
// =========================================================================

#[async_trait]
impl CountRepository for PgTx {
    async fn insert_count(&mut self, actor_id: i64) -> Result<InventoryCount, AppError> {
        // O índice único parcial garante uma só contagem em andamento
        sqlx::query_as::<_, InventoryCount>(
            "INSERT INTO inventory_counts (status, actor_id) VALUES ('in_progress', $1) RETURNING *",
        )
        .bind(actor_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_unique)
    }

    async fn lock_open_count(&mut self) -> Result<Option<InventoryCount>, AppError> {
        let count = sqlx::query_as::<_, InventoryCount>(
            "SELECT * FROM inventory_counts WHERE status = 'in_progress' FOR UPDATE",
        )
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(count)
    }

    async fn snapshot_count_items(&mut self, count_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO inventory_count_items (count_id, product_id, system_quantity)
            SELECT $1, id, quantity FROM products
            "#,
        )
        .bind(count_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn update_count_item(
        &mut self,
        count_id: i64,
        product_id: i64,
        physical_quantity: i32,
        note: Option<String>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE inventory_count_items
            SET physical_quantity = $1, note = $2
            WHERE count_id = $3 AND product_id = $4
            "#,
        )
        .bind(physical_quantity)
        .bind(note)
        .bind(count_id)
        .bind(product_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_count_items(&mut self, count_id: i64) -> Result<Vec<InventoryCountItem>, AppError> {
        let items = sqlx::query_as::<_, InventoryCountItem>(
            r#"
            SELECT i.count_id, i.product_id, p.name AS product_name, p.size AS product_size,
                   i.system_quantity, i.physical_quantity, i.note
            FROM inventory_count_items i
            JOIN products p ON p.id = i.product_id
            WHERE i.count_id = $1
            "#,
        )
        .bind(count_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(items)
    }

    async fn finish_count(&mut self, count_id: i64) -> Result<InventoryCount, AppError> {
        sqlx::query_as::<_, InventoryCount>(
            r#"
            UPDATE inventory_counts
            SET status = 'finished', finished_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(count_id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Inventário {}", count_id)))
    }

    async fn find_count(&mut self, id: i64) -> Result<Option<InventoryCount>, AppError> {
        let count = sqlx::query_as::<_, InventoryCount>("SELECT * FROM inventory_counts WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(count)
    }

    async fn list_counts(&mut self, page: PageParams) -> Result<(Vec<InventoryCount>, i64), AppError> {
        let page = page.normalized();
        let rows = sqlx::query_as::<_, InventoryCount>(
            "SELECT * FROM inventory_counts ORDER BY started_at DESC, id DESC OFFSET $1 LIMIT $2",
        )
        .bind(page.offset)
        .bind(page.limit)
        .fetch_all(&mut *self.tx)
        .await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM inventory_counts")
            .fetch_one(&mut *self.tx)
            .await?;

        Ok((rows, total))
    }
}
