// src/db/memory.rs
//
// Store em memória. Cada transação trabalha numa cópia do estado e segura o
// mutex até o commit/rollback, então as transações rodam uma de cada vez
// (equivalente a SERIALIZABLE). Usado nos testes e com DATABASE_URL=memory://.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::store::{
    CatalogRepository, CountRepository, CreditRepository, LedgerRepository, ReturnRepository,
    SaleRepository, Store, StoreTx, UserRepository,
};
use crate::{
    common::error::AppError,
    models::{
        auth::{NewUser, User},
        catalog::{Client, NewClient, NewProduct, Product, ProductFilter, ProductSize, Supplier},
        credits::{Credit, CreditStatus, CreditUsage, NewCredit, NewCreditUsage},
        inventory_count::{CountStatus, InventoryCount, InventoryCountItem},
        ledger::{MovementEntry, MovementFilter, NewMovement, StockMovement},
        pagination::PageParams,
        returns::{NewReturn, NewReturnItem, ReturnFilter, ReturnItem, ReturnStatus, SaleReturn},
        sales::{
            NewPayment, NewSale, NewSaleItem, Payment, Sale, SaleFilter, SaleItem, SaleStatus,
            SaleSummary,
        },
    },
};

#[derive(Debug, Clone)]
struct CountItemRow {
    count_id: i64,
    product_id: i64,
    system_quantity: i32,
    physical_quantity: Option<i32>,
    note: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    sequences: HashMap<&'static str, i64>,
    users: BTreeMap<i64, User>,
    products: BTreeMap<i64, Product>,
    clients: BTreeMap<i64, Client>,
    suppliers: BTreeMap<i64, Supplier>,
    movements: Vec<StockMovement>,
    sales: BTreeMap<i64, Sale>,
    sale_items: Vec<SaleItem>,
    payments: Vec<Payment>,
    returns: BTreeMap<i64, SaleReturn>,
    return_items: Vec<ReturnItem>,
    credits: BTreeMap<i64, Credit>,
    credit_usages: Vec<CreditUsage>,
    counts: BTreeMap<i64, InventoryCount>,
    count_items: Vec<CountItemRow>,
}

impl MemoryState {
    // Equivalente ao BIGSERIAL: um contador por tabela
    fn next_id(&mut self, table: &'static str) -> i64 {
        let seq = self.sequences.entry(table).or_insert(0);
        *seq += 1;
        *seq
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, AppError> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx { guard, work }))
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let MemoryTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        // Descarta a cópia de trabalho; o guard é liberado no drop
        Ok(())
    }
}

// Mesma regra dos índices LOWER(..) do Postgres, inclusive fora do ASCII
fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn in_range(at: DateTime<Utc>, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> bool {
    from.is_none_or(|f| at >= f) && to.is_none_or(|t| at <= t)
}

fn paged<T: Clone>(rows: Vec<T>, page: PageParams) -> (Vec<T>, i64) {
    let total = rows.len() as i64;
    (page.slice(&rows), total)
}

fn missing(what: &str, id: i64) -> AppError {
    AppError::NotFound(format!("{} {}", what, id))
}

// =========================================================================
//  USUÁRIOS
// =========================================================================

#[async_trait]
impl UserRepository for MemoryTx {
    async fn find_user(&mut self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.work.users.get(&id).cloned())
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .work
            .users
            .values()
            .find(|u| same_name(&u.email, email))
            .cloned())
    }

    async fn insert_user(&mut self, user: NewUser) -> Result<User, AppError> {
        if self.work.users.values().any(|u| same_name(&u.email, &user.email)) {
            return Err(AppError::Conflict("Este e-mail já está em uso.".into()));
        }
        let id = self.work.next_id("users");
        let row = User {
            id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
        };
        self.work.users.insert(id, row.clone());
        Ok(row)
    }

    async fn count_users(&mut self) -> Result<i64, AppError> {
        Ok(self.work.users.len() as i64)
    }
}

// =========================================================================
//  CATÁLOGO
// =========================================================================

#[async_trait]
impl CatalogRepository for MemoryTx {
    async fn insert_product(&mut self, product: NewProduct) -> Result<Product, AppError> {
        let duplicated = self
            .work
            .products
            .values()
            .any(|p| same_name(&p.name, &product.name) && p.size == product.size);
        if duplicated {
            return Err(AppError::Conflict(format!(
                "Já existe o produto '{}' no tamanho {:?}.",
                product.name, product.size
            )));
        }
        let id = self.work.next_id("products");
        let row = Product {
            id,
            name: product.name,
            size: product.size,
            quantity: 0,
            price: product.price,
            supplier_id: product.supplier_id,
            created_at: Utc::now(),
        };
        self.work.products.insert(id, row.clone());
        Ok(row)
    }

    async fn find_product(&mut self, id: i64) -> Result<Option<Product>, AppError> {
        Ok(self.work.products.get(&id).cloned())
    }

    async fn lock_product(&mut self, id: i64) -> Result<Option<Product>, AppError> {
        self.find_product(id).await
    }

    async fn find_product_by_name_size(
        &mut self,
        name: &str,
        size: ProductSize,
    ) -> Result<Option<Product>, AppError> {
        Ok(self
            .work
            .products
            .values()
            .find(|p| same_name(&p.name, name) && p.size == size)
            .cloned())
    }

    async fn update_product_price(&mut self, id: i64, price: Decimal) -> Result<Option<Product>, AppError> {
        Ok(self.work.products.get_mut(&id).map(|p| {
            p.price = price;
            p.clone()
        }))
    }

    async fn list_products(
        &mut self,
        filter: &ProductFilter,
        page: PageParams,
    ) -> Result<(Vec<Product>, i64), AppError> {
        let mut rows: Vec<Product> = self
            .work
            .products
            .values()
            .filter(|p| filter.name.as_deref().is_none_or(|n| contains_ci(&p.name, n)))
            .filter(|p| filter.size.is_none_or(|s| p.size == s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(paged(rows, page))
    }

    async fn insert_client(&mut self, client: NewClient) -> Result<Client, AppError> {
        let id = self.work.next_id("clients");
        let row = Client {
            id,
            name: client.name,
            phone: client.phone,
            email: client.email,
            created_at: Utc::now(),
        };
        self.work.clients.insert(id, row.clone());
        Ok(row)
    }

    async fn find_client(&mut self, id: i64) -> Result<Option<Client>, AppError> {
        Ok(self.work.clients.get(&id).cloned())
    }

    async fn list_clients(
        &mut self,
        name: Option<&str>,
        page: PageParams,
    ) -> Result<(Vec<Client>, i64), AppError> {
        let mut rows: Vec<Client> = self
            .work
            .clients
            .values()
            .filter(|c| name.is_none_or(|n| contains_ci(&c.name, n)))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(paged(rows, page))
    }

    async fn insert_supplier(&mut self, name: &str, contact: Option<&str>) -> Result<Supplier, AppError> {
        let id = self.work.next_id("suppliers");
        let row = Supplier {
            id,
            name: name.to_string(),
            contact: contact.map(str::to_string),
            created_at: Utc::now(),
        };
        self.work.suppliers.insert(id, row.clone());
        Ok(row)
    }

    async fn find_supplier(&mut self, id: i64) -> Result<Option<Supplier>, AppError> {
        Ok(self.work.suppliers.get(&id).cloned())
    }

    async fn list_suppliers(&mut self) -> Result<Vec<Supplier>, AppError> {
        let mut rows: Vec<Supplier> = self.work.suppliers.values().cloned().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }
}

// =========================================================================
//  LIVRO-RAZÃO
// =========================================================================

#[async_trait]
impl LedgerRepository for MemoryTx {
    async fn apply_quantity_delta(&mut self, product_id: i64, delta: i32) -> Result<Option<Product>, AppError> {
        match self.work.products.get_mut(&product_id) {
            Some(p) => match p.quantity.checked_add(delta) {
                Some(quantity) if quantity >= 0 => {
                    p.quantity = quantity;
                    Ok(Some(p.clone()))
                }
                _ => Ok(None),
            },
            None => Ok(None),
        }
    }

    async fn set_product_quantity(&mut self, product_id: i64, quantity: i32) -> Result<Product, AppError> {
        let p = self
            .work
            .products
            .get_mut(&product_id)
            .ok_or_else(|| missing("Produto", product_id))?;
        p.quantity = quantity;
        Ok(p.clone())
    }

    async fn insert_movement(&mut self, movement: NewMovement) -> Result<StockMovement, AppError> {
        let id = self.work.next_id("stock_movements");
        let row = StockMovement {
            id,
            product_id: movement.product_id,
            quantity: movement.quantity,
            kind: movement.kind,
            reason: movement.reason,
            actor_id: movement.actor_id,
            created_at: Utc::now(),
        };
        self.work.movements.push(row.clone());
        Ok(row)
    }

    async fn movement_balance(&mut self, product_id: i64) -> Result<i64, AppError> {
        Ok(self
            .work
            .movements
            .iter()
            .filter(|m| m.product_id == product_id)
            .map(|m| m.signed_quantity() as i64)
            .sum())
    }

    async fn list_movements(&mut self, filter: &MovementFilter) -> Result<(Vec<MovementEntry>, i64), AppError> {
        let products = &self.work.products;
        let mut rows: Vec<MovementEntry> = self
            .work
            .movements
            .iter()
            .filter(|m| filter.product_id.is_none_or(|id| m.product_id == id))
            .filter(|m| filter.kind.is_none_or(|k| m.kind == k))
            .filter(|m| in_range(m.created_at, filter.from, filter.to))
            .filter_map(|m| {
                let product = products.get(&m.product_id)?;
                if let Some(name) = filter.product_name.as_deref() {
                    if !contains_ci(&product.name, name) {
                        return None;
                    }
                }
                Some(MovementEntry {
                    id: m.id,
                    product_id: m.product_id,
                    product_name: product.name.clone(),
                    product_size: product.size,
                    quantity: m.quantity,
                    kind: m.kind,
                    reason: m.reason.clone(),
                    actor_id: m.actor_id,
                    created_at: m.created_at,
                })
            })
            .collect();
        // Mais recentes primeiro
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(paged(rows, filter.page))
    }
}

// =========================================================================
//  VENDAS E PAGAMENTOS
// =========================================================================

#[async_trait]
impl SaleRepository for MemoryTx {
    async fn insert_sale(&mut self, sale: NewSale) -> Result<Sale, AppError> {
        let id = self.work.next_id("sales");
        let row = Sale {
            id,
            client_id: sale.client_id,
            subtotal: sale.subtotal,
            discount_percent: sale.discount_percent,
            discount_amount: sale.discount_amount,
            total: sale.total,
            payment_method: sale.payment_method,
            status: sale.status,
            actor_id: sale.actor_id,
            notes: sale.notes,
            created_at: Utc::now(),
        };
        self.work.sales.insert(id, row.clone());
        Ok(row)
    }

    async fn insert_sale_item(&mut self, sale_id: i64, item: NewSaleItem) -> Result<SaleItem, AppError> {
        let id = self.work.next_id("sale_items");
        let row = SaleItem {
            id,
            sale_id,
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            subtotal: item.subtotal,
        };
        self.work.sale_items.push(row.clone());
        Ok(row)
    }

    async fn find_sale(&mut self, id: i64) -> Result<Option<Sale>, AppError> {
        Ok(self.work.sales.get(&id).cloned())
    }

    async fn lock_sale(&mut self, id: i64) -> Result<Option<Sale>, AppError> {
        self.find_sale(id).await
    }

    async fn list_sale_items(&mut self, sale_id: i64) -> Result<Vec<SaleItem>, AppError> {
        Ok(self
            .work
            .sale_items
            .iter()
            .filter(|i| i.sale_id == sale_id)
            .cloned()
            .collect())
    }

    async fn find_sale_item(&mut self, sale_id: i64, item_id: i64) -> Result<Option<SaleItem>, AppError> {
        Ok(self
            .work
            .sale_items
            .iter()
            .find(|i| i.sale_id == sale_id && i.id == item_id)
            .cloned())
    }

    async fn update_sale_status(
        &mut self,
        id: i64,
        status: SaleStatus,
        notes: Option<String>,
    ) -> Result<Sale, AppError> {
        let sale = self.work.sales.get_mut(&id).ok_or_else(|| missing("Venda", id))?;
        sale.status = status;
        if notes.is_some() {
            sale.notes = notes;
        }
        Ok(sale.clone())
    }

    async fn update_sale_total(&mut self, id: i64, total: Decimal) -> Result<Sale, AppError> {
        let sale = self.work.sales.get_mut(&id).ok_or_else(|| missing("Venda", id))?;
        sale.total = total;
        Ok(sale.clone())
    }

    async fn list_sales(&mut self, filter: &SaleFilter) -> Result<(Vec<SaleSummary>, i64), AppError> {
        let clients = &self.work.clients;
        let mut rows: Vec<SaleSummary> = self
            .work
            .sales
            .values()
            .filter(|s| filter.status.is_none_or(|st| s.status == st))
            .filter(|s| in_range(s.created_at, filter.from, filter.to))
            .filter_map(|s| {
                let client_name = s.client_id.and_then(|id| clients.get(&id)).map(|c| c.name.clone());
                if let Some(needle) = filter.client_name.as_deref() {
                    if !client_name.as_deref().is_some_and(|n| contains_ci(n, needle)) {
                        return None;
                    }
                }
                Some(SaleSummary {
                    id: s.id,
                    client_id: s.client_id,
                    client_name,
                    total: s.total,
                    payment_method: s.payment_method,
                    status: s.status,
                    actor_id: s.actor_id,
                    created_at: s.created_at,
                })
            })
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(paged(rows, filter.page))
    }

    async fn insert_payment(&mut self, payment: NewPayment) -> Result<Payment, AppError> {
        let id = self.work.next_id("payments");
        let row = Payment {
            id,
            sale_id: payment.sale_id,
            amount: payment.amount,
            method: payment.method,
            actor_id: payment.actor_id,
            notes: payment.notes,
            created_at: Utc::now(),
        };
        self.work.payments.push(row.clone());
        Ok(row)
    }

    async fn sum_payments(&mut self, sale_id: i64) -> Result<Decimal, AppError> {
        Ok(self
            .work
            .payments
            .iter()
            .filter(|p| p.sale_id == sale_id)
            .map(|p| p.amount)
            .sum())
    }

    async fn list_payments(&mut self, sale_id: i64) -> Result<Vec<Payment>, AppError> {
        Ok(self
            .work
            .payments
            .iter()
            .filter(|p| p.sale_id == sale_id)
            .cloned()
            .collect())
    }
}

// =========================================================================
//  DEVOLUÇÕES
// =========================================================================

#[async_trait]
impl ReturnRepository for MemoryTx {
    async fn insert_return(&mut self, ret: NewReturn) -> Result<SaleReturn, AppError> {
        let id = self.work.next_id("returns");
        let row = SaleReturn {
            id,
            sale_id: ret.sale_id,
            client_id: ret.client_id,
            reason: ret.reason,
            total: ret.total,
            status: ReturnStatus::Pending,
            actor_id: ret.actor_id,
            rejection_reason: None,
            created_at: Utc::now(),
            decided_at: None,
        };
        self.work.returns.insert(id, row.clone());
        Ok(row)
    }

    async fn insert_return_item(&mut self, return_id: i64, item: NewReturnItem) -> Result<ReturnItem, AppError> {
        let id = self.work.next_id("return_items");
        let row = ReturnItem {
            id,
            return_id,
            sale_item_id: item.sale_item_id,
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            subtotal: item.subtotal,
        };
        self.work.return_items.push(row.clone());
        Ok(row)
    }

    async fn find_return(&mut self, id: i64) -> Result<Option<SaleReturn>, AppError> {
        Ok(self.work.returns.get(&id).cloned())
    }

    async fn lock_return(&mut self, id: i64) -> Result<Option<SaleReturn>, AppError> {
        self.find_return(id).await
    }

    async fn list_return_items(&mut self, return_id: i64) -> Result<Vec<ReturnItem>, AppError> {
        Ok(self
            .work
            .return_items
            .iter()
            .filter(|i| i.return_id == return_id)
            .cloned()
            .collect())
    }

    async fn returned_quantity(
        &mut self,
        sale_item_id: i64,
        statuses: &[ReturnStatus],
    ) -> Result<i64, AppError> {
        let returns = &self.work.returns;
        Ok(self
            .work
            .return_items
            .iter()
            .filter(|i| i.sale_item_id == sale_item_id)
            .filter(|i| returns.get(&i.return_id).is_some_and(|r| statuses.contains(&r.status)))
            .map(|i| i.quantity as i64)
            .sum())
    }

    async fn update_return_status(
        &mut self,
        id: i64,
        status: ReturnStatus,
        rejection_reason: Option<String>,
    ) -> Result<SaleReturn, AppError> {
        let ret = self.work.returns.get_mut(&id).ok_or_else(|| missing("Devolução", id))?;
        ret.status = status;
        ret.rejection_reason = rejection_reason;
        ret.decided_at = Some(Utc::now());
        Ok(ret.clone())
    }

    async fn list_returns(&mut self, filter: &ReturnFilter) -> Result<(Vec<SaleReturn>, i64), AppError> {
        let mut rows: Vec<SaleReturn> = self
            .work
            .returns
            .values()
            .filter(|r| filter.status.is_none_or(|s| r.status == s))
            .filter(|r| filter.client_id.is_none_or(|c| r.client_id == c))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(paged(rows, filter.page))
    }
}

// =========================================================================
//  CRÉDITOS
// =========================================================================

#[async_trait]
impl CreditRepository for MemoryTx {
    async fn insert_credit(&mut self, credit: NewCredit) -> Result<Credit, AppError> {
        let id = self.work.next_id("credits");
        let row = Credit {
            id,
            client_id: credit.client_id,
            amount: credit.amount,
            origin: credit.origin,
            status: CreditStatus::Available,
            return_id: credit.return_id,
            parent_credit_id: credit.parent_credit_id,
            created_at: Utc::now(),
            expires_at: credit.expires_at,
        };
        self.work.credits.insert(id, row.clone());
        Ok(row)
    }

    async fn lock_credit(&mut self, id: i64) -> Result<Option<Credit>, AppError> {
        Ok(self.work.credits.get(&id).cloned())
    }

    async fn mark_credit_used(&mut self, id: i64) -> Result<Credit, AppError> {
        let credit = self.work.credits.get_mut(&id).ok_or_else(|| missing("Crédito", id))?;
        credit.status = CreditStatus::Used;
        Ok(credit.clone())
    }

    async fn list_available_credits(
        &mut self,
        client_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Credit>, AppError> {
        let mut rows: Vec<Credit> = self
            .work
            .credits
            .values()
            .filter(|c| c.client_id == client_id && c.is_usable_at(now))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn insert_credit_usage(&mut self, usage: NewCreditUsage) -> Result<CreditUsage, AppError> {
        let id = self.work.next_id("credit_usages");
        let row = CreditUsage {
            id,
            credit_id: usage.credit_id,
            sale_id: usage.sale_id,
            amount: usage.amount,
            actor_id: usage.actor_id,
            created_at: Utc::now(),
        };
        self.work.credit_usages.push(row.clone());
        Ok(row)
    }
}

// =========================================================================
//  INVENTÁRIO FÍSICO
// =========================================================================

#[async_trait]
impl CountRepository for MemoryTx {
    async fn insert_count(&mut self, actor_id: i64) -> Result<InventoryCount, AppError> {
        if self.work.counts.values().any(|c| c.status == CountStatus::InProgress) {
            return Err(AppError::Conflict("Já existe um inventário em andamento.".into()));
        }
        let id = self.work.next_id("inventory_counts");
        let row = InventoryCount {
            id,
            status: CountStatus::InProgress,
            actor_id,
            started_at: Utc::now(),
            finished_at: None,
        };
        self.work.counts.insert(id, row.clone());
        Ok(row)
    }

    async fn lock_open_count(&mut self) -> Result<Option<InventoryCount>, AppError> {
        Ok(self
            .work
            .counts
            .values()
            .find(|c| c.status == CountStatus::InProgress)
            .cloned())
    }

    async fn snapshot_count_items(&mut self, count_id: i64) -> Result<u64, AppError> {
        let rows: Vec<CountItemRow> = self
            .work
            .products
            .values()
            .map(|p| CountItemRow {
                count_id,
                product_id: p.id,
                system_quantity: p.quantity,
                physical_quantity: None,
                note: None,
            })
            .collect();
        let inserted = rows.len() as u64;
        self.work.count_items.extend(rows);
        Ok(inserted)
    }

    async fn update_count_item(
        &mut self,
        count_id: i64,
        product_id: i64,
        physical_quantity: i32,
        note: Option<String>,
    ) -> Result<bool, AppError> {
        match self
            .work
            .count_items
            .iter_mut()
            .find(|i| i.count_id == count_id && i.product_id == product_id)
        {
            Some(item) => {
                item.physical_quantity = Some(physical_quantity);
                item.note = note;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_count_items(&mut self, count_id: i64) -> Result<Vec<InventoryCountItem>, AppError> {
        let products = &self.work.products;
        Ok(self
            .work
            .count_items
            .iter()
            .filter(|i| i.count_id == count_id)
            .filter_map(|i| {
                let product = products.get(&i.product_id)?;
                Some(InventoryCountItem {
                    count_id: i.count_id,
                    product_id: i.product_id,
                    product_name: product.name.clone(),
                    product_size: product.size,
                    system_quantity: i.system_quantity,
                    physical_quantity: i.physical_quantity,
                    note: i.note.clone(),
                })
            })
            .collect())
    }

    async fn finish_count(&mut self, count_id: i64) -> Result<InventoryCount, AppError> {
        let count = self
            .work
            .counts
            .get_mut(&count_id)
            .ok_or_else(|| missing("Inventário", count_id))?;
        count.status = CountStatus::Finished;
        count.finished_at = Some(Utc::now());
        Ok(count.clone())
    }

    async fn find_count(&mut self, id: i64) -> Result<Option<InventoryCount>, AppError> {
        Ok(self.work.counts.get(&id).cloned())
    }

    async fn list_counts(&mut self, page: PageParams) -> Result<(Vec<InventoryCount>, i64), AppError> {
        let mut rows: Vec<InventoryCount> = self.work.counts.values().cloned().collect();
        rows.sort_by(|a, b| b.started_at.cmp(&a.started_at).then(b.id.cmp(&a.id)));
        Ok(paged(rows, page))
    }
}
