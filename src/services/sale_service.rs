// src/services/sale_service.rs

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::{
    common::{error::AppError, validation::fits_money},
    db::{finish, Store, StoreTx},
    models::{
        auth::Actor,
        pagination::Page,
        returns::ReturnStatus,
        sales::{
            Balance, CreateSale, DiscountInput, NewSale, NewSaleItem, Sale, SaleDetail, SaleFilter,
            SaleStatus, SaleSummary,
        },
    },
    services::ledger_service::LedgerService,
};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Desconto resolvido: percentual (se informado) e o valor abatido.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDiscount {
    pub percent: Option<Decimal>,
    pub amount: Decimal,
}

/// Percentual tem precedência sobre valor quando os dois vêm preenchidos.
pub fn resolve_discount(subtotal: Decimal, discount: DiscountInput) -> Result<ResolvedDiscount, AppError> {
    if let Some(percent) = discount.percent {
        if percent < Decimal::ZERO || percent > HUNDRED {
            return Err(AppError::InvalidInput("O desconto percentual deve estar entre 0 e 100.".into()));
        }
        let amount = (subtotal * percent / HUNDRED).round_dp(2);
        return Ok(ResolvedDiscount { percent: Some(percent), amount });
    }

    match discount.amount {
        Some(amount) if amount < Decimal::ZERO => {
            Err(AppError::InvalidInput("O desconto não pode ser negativo.".into()))
        }
        Some(amount) if !fits_money(amount) => {
            Err(AppError::InvalidInput("O desconto aceita no máximo duas casas decimais.".into()))
        }
        Some(amount) if amount > subtotal => {
            Err(AppError::InvalidInput("O desconto não pode ser maior que o subtotal.".into()))
        }
        Some(amount) => Ok(ResolvedDiscount { percent: None, amount }),
        None => Ok(ResolvedDiscount { percent: None, amount: Decimal::ZERO }),
    }
}

#[derive(Clone)]
pub struct SaleService {
    store: Arc<dyn Store>,
    ledger: LedgerService,
}

impl SaleService {
    pub fn new(store: Arc<dyn Store>, ledger: LedgerService) -> Self {
        Self { store, ledger }
    }

    // --- CRIAR VENDA ---
    // Venda + itens + uma saída por item, tudo ou nada.
    pub async fn create_sale(&self, input: CreateSale, actor: &Actor) -> Result<SaleDetail, AppError> {
        if input.lines.is_empty() {
            return Err(AppError::InvalidInput("A venda precisa de pelo menos um item.".into()));
        }
        for line in &input.lines {
            if line.quantity <= 0 {
                return Err(AppError::InvalidInput(format!(
                    "Quantidade inválida para o produto {}.",
                    line.product_id
                )));
            }
            if line.unit_price.is_some_and(|p| p < Decimal::ZERO || !fits_money(p)) {
                return Err(AppError::InvalidInput(format!(
                    "Preço inválido para o produto {}.",
                    line.product_id
                )));
            }
        }

        let mut tx = self.store.begin().await?;
        let result = self.create_sale_tx(&mut *tx, input, actor.user_id).await;
        let detail = finish(tx, result).await?;

        tracing::info!(
            sale_id = detail.sale.id,
            total = %detail.sale.total,
            items = detail.items.len(),
            actor_id = actor.user_id,
            "🛒 Venda registrada"
        );
        Ok(detail)
    }

    async fn create_sale_tx(
        &self,
        tx: &mut dyn StoreTx,
        input: CreateSale,
        actor_id: i64,
    ) -> Result<SaleDetail, AppError> {
        if let Some(client_id) = input.client_id {
            tx.find_client(client_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Cliente {}", client_id)))?;
        }

        // 1. Valida estoque e precifica antes de qualquer escrita
        let mut requested: HashMap<i64, i32> = HashMap::new();
        let mut priced = Vec::with_capacity(input.lines.len());
        let mut subtotal = Decimal::ZERO;

        for line in &input.lines {
            let product = tx
                .lock_product(line.product_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Produto {}", line.product_id)))?;

            // Linhas repetidas do mesmo produto somam contra o mesmo saldo
            let required = requested.entry(product.id).or_insert(0);
            let summed = required.checked_add(line.quantity);
            *required = summed.unwrap_or(i32::MAX);
            if summed.is_none() || product.quantity < *required {
                tracing::warn!(product_id = product.id, available = product.quantity, required = *required, "Venda recusada por falta de estoque");
                return Err(AppError::InsufficientStock {
                    product_id: product.id,
                    available: product.quantity,
                    required: *required,
                });
            }

            let unit_price = line.unit_price.unwrap_or(product.price);
            let line_total = unit_price
                .checked_mul(Decimal::from(line.quantity))
                .filter(|total| fits_money(*total))
                .ok_or_else(|| {
                    AppError::InvalidInput(format!("Valor da linha do produto {} excede o limite.", product.id))
                })?;
            subtotal = subtotal
                .checked_add(line_total)
                .filter(|total| fits_money(*total))
                .ok_or_else(|| AppError::InvalidInput("O subtotal da venda excede o limite.".into()))?;
            priced.push(NewSaleItem {
                product_id: product.id,
                quantity: line.quantity,
                unit_price,
                subtotal: line_total,
            });
        }

        let discount = resolve_discount(subtotal, input.discount)?;
        let total = (subtotal - discount.amount).max(Decimal::ZERO);
        let status = if total.is_zero() { SaleStatus::Completed } else { SaleStatus::Pending };

        // 2. Persiste cabeçalho e itens
        let sale = tx
            .insert_sale(NewSale {
                client_id: input.client_id,
                subtotal,
                discount_percent: discount.percent,
                discount_amount: discount.amount,
                total,
                payment_method: input.payment_method,
                status,
                actor_id,
                notes: input.notes,
            })
            .await?;

        let mut items = Vec::with_capacity(priced.len());
        for item in priced {
            items.push(tx.insert_sale_item(sale.id, item).await?);
        }

        // 3. Baixa no estoque pelo livro-razão
        let reason = format!("venda #{}", sale.id);
        for item in &items {
            self.ledger
                .apply_movement(&mut *tx, item.product_id, -item.quantity, &reason, actor_id)
                .await?;
        }

        let balance = Balance::new(sale.total, Decimal::ZERO);
        Ok(SaleDetail { sale, items, balance })
    }

    // --- CANCELAR VENDA ---
    // Compensação: os itens voltam ao estoque como novas entradas.
    pub async fn cancel_sale(&self, sale_id: i64, reason: &str, actor: &Actor) -> Result<Sale, AppError> {
        if reason.trim().is_empty() {
            return Err(AppError::InvalidInput("O motivo do cancelamento é obrigatório.".into()));
        }

        let mut tx = self.store.begin().await?;
        let result = self.cancel_sale_tx(&mut *tx, sale_id, reason.trim(), actor.user_id).await;
        let sale = finish(tx, result).await?;

        tracing::info!(sale_id, actor_id = actor.user_id, "❌ Venda cancelada");
        Ok(sale)
    }

    async fn cancel_sale_tx(
        &self,
        tx: &mut dyn StoreTx,
        sale_id: i64,
        reason: &str,
        actor_id: i64,
    ) -> Result<Sale, AppError> {
        let sale = tx
            .lock_sale(sale_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Venda {}", sale_id)))?;

        if sale.status == SaleStatus::Cancelled {
            return Err(AppError::AlreadyCancelled(sale_id));
        }

        let movement_reason = format!("cancelamento da venda #{}", sale_id);
        for item in tx.list_sale_items(sale_id).await? {
            // Devoluções aprovadas já devolveram parte ao estoque
            let returned = tx.returned_quantity(item.id, &[ReturnStatus::Approved]).await?;
            let restore = item.quantity - returned as i32;
            if restore > 0 {
                self.ledger
                    .apply_movement(&mut *tx, item.product_id, restore, &movement_reason, actor_id)
                    .await?;
            }
        }

        let notes = match sale.notes.as_deref() {
            Some(existing) if !existing.trim().is_empty() => format!("{}\nCancelada: {}", existing, reason),
            _ => format!("Cancelada: {}", reason),
        };

        tx.update_sale_status(sale_id, SaleStatus::Cancelled, Some(notes)).await
    }

    // --- LEITURAS ---
    pub async fn get_sale(&self, sale_id: i64) -> Result<SaleDetail, AppError> {
        let mut tx = self.store.begin().await?;
        let result = Self::load_detail(&mut *tx, sale_id).await;
        finish(tx, result).await
    }

    async fn load_detail(tx: &mut dyn StoreTx, sale_id: i64) -> Result<SaleDetail, AppError> {
        let sale = tx
            .find_sale(sale_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Venda {}", sale_id)))?;
        let items = tx.list_sale_items(sale_id).await?;
        let paid = tx.sum_payments(sale_id).await?;
        let balance = Balance::new(sale.total, paid);
        Ok(SaleDetail { sale, items, balance })
    }

    pub async fn list_sales(&self, filter: SaleFilter) -> Result<Page<SaleSummary>, AppError> {
        let mut tx = self.store.begin().await?;
        let result = tx.list_sales(&filter).await;
        let (items, total) = finish(tx, result).await?;
        Ok(Page::new(items, total, filter.page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn percent_discount_is_derived_from_subtotal() {
        let d = resolve_discount(dec!(150.00), DiscountInput { percent: Some(dec!(10)), amount: None }).unwrap();
        assert_eq!(d.amount, dec!(15.00));
        assert_eq!(d.percent, Some(dec!(10)));
    }

    #[test]
    fn percent_wins_when_both_are_given() {
        let d = resolve_discount(
            dec!(200.00),
            DiscountInput { percent: Some(dec!(5)), amount: Some(dec!(50.00)) },
        )
        .unwrap();
        assert_eq!(d.amount, dec!(10.00));
    }

    #[test]
    fn absolute_discount_cannot_exceed_subtotal() {
        let err = resolve_discount(dec!(20.00), DiscountInput { percent: None, amount: Some(dec!(20.01)) });
        assert!(matches!(err, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn absolute_discount_keeps_cents() {
        let err = resolve_discount(dec!(20.00), DiscountInput { percent: None, amount: Some(dec!(0.005)) });
        assert!(matches!(err, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn percent_out_of_range_is_rejected() {
        let err = resolve_discount(dec!(20.00), DiscountInput { percent: Some(dec!(101)), amount: None });
        assert!(matches!(err, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn no_discount_means_zero() {
        let d = resolve_discount(dec!(99.90), DiscountInput::default()).unwrap();
        assert_eq!(d, ResolvedDiscount { percent: None, amount: Decimal::ZERO });
    }
}
