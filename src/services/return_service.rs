// src/services/return_service.rs
//
// Devoluções sobre vendas concluídas. A aprovação devolve o estoque e emite
// o crédito na mesma transação da troca de status.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use crate::{
    common::error::AppError,
    db::{finish, Store, StoreTx},
    models::{
        auth::Actor,
        pagination::Page,
        returns::{
            CreateReturn, NewReturn, NewReturnItem, ReturnApproval, ReturnDetail, ReturnFilter,
            ReturnStatus, SaleReturn,
        },
        sales::SaleStatus,
    },
    services::{credit_service::CreditService, ledger_service::LedgerService},
};

// Quantidades dessas devoluções já estão comprometidas com o item da venda
const CLAIMING_STATUSES: [ReturnStatus; 2] = [ReturnStatus::Pending, ReturnStatus::Approved];

#[derive(Clone)]
pub struct ReturnService {
    store: Arc<dyn Store>,
    ledger: LedgerService,
    credits: CreditService,
    credit_validity_days: Option<i64>,
}

impl ReturnService {
    pub fn new(
        store: Arc<dyn Store>,
        ledger: LedgerService,
        credits: CreditService,
        credit_validity_days: Option<i64>,
    ) -> Self {
        Self { store, ledger, credits, credit_validity_days }
    }

    // --- ABRIR DEVOLUÇÃO ---
    pub async fn create_return(&self, input: CreateReturn, actor: &Actor) -> Result<ReturnDetail, AppError> {
        if input.reason.trim().is_empty() {
            return Err(AppError::InvalidInput("O motivo da devolução é obrigatório.".into()));
        }
        if input.lines.is_empty() {
            return Err(AppError::InvalidInput("Informe pelo menos um item.".into()));
        }

        let mut tx = self.store.begin().await?;
        let result = Self::create_return_tx(&mut *tx, input, actor.user_id).await;
        let detail = finish(tx, result).await?;

        tracing::info!(
            return_id = detail.header.id,
            sale_id = detail.header.sale_id,
            total = %detail.header.total,
            "↩️ Devolução aberta"
        );
        Ok(detail)
    }

    async fn create_return_tx(
        tx: &mut dyn StoreTx,
        input: CreateReturn,
        actor_id: i64,
    ) -> Result<ReturnDetail, AppError> {
        // Trava a venda para serializar devoluções concorrentes do mesmo item
        let sale = tx
            .lock_sale(input.sale_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Venda {}", input.sale_id)))?;

        if sale.status != SaleStatus::Completed {
            return Err(AppError::InvalidState(format!(
                "Só vendas concluídas podem ser devolvidas (venda {}).",
                sale.id
            )));
        }

        tx.find_client(input.client_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Cliente {}", input.client_id)))?;
        if sale.client_id.is_some_and(|c| c != input.client_id) {
            return Err(AppError::InvalidInput("O cliente não corresponde ao cliente da venda.".into()));
        }

        let mut claimed_here: HashMap<i64, i32> = HashMap::new();
        let mut items = Vec::with_capacity(input.lines.len());
        let mut total = Decimal::ZERO;

        for line in &input.lines {
            let sale_item = tx
                .find_sale_item(sale.id, line.sale_item_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Item {} da venda {}", line.sale_item_id, sale.id)))?;

            let already = tx.returned_quantity(sale_item.id, &CLAIMING_STATUSES).await? as i32;
            let claimed = claimed_here.entry(sale_item.id).or_insert(0);
            let max = (sale_item.quantity - already - *claimed).max(0);

            if line.quantity <= 0 || line.quantity > max {
                tracing::warn!(sale_item_id = sale_item.id, requested = line.quantity, max, "Quantidade de devolução inválida");
                return Err(AppError::InvalidQuantity {
                    sale_item_id: sale_item.id,
                    requested: line.quantity,
                    max,
                });
            }
            *claimed += line.quantity;

            let subtotal = sale_item.unit_price * Decimal::from(line.quantity);
            total += subtotal;
            items.push(NewReturnItem {
                sale_item_id: sale_item.id,
                product_id: sale_item.product_id,
                quantity: line.quantity,
                unit_price: sale_item.unit_price,
                subtotal,
            });
        }

        let header = tx
            .insert_return(NewReturn {
                sale_id: sale.id,
                client_id: input.client_id,
                reason: input.reason.trim().to_string(),
                total,
                actor_id,
            })
            .await?;

        let mut saved = Vec::with_capacity(items.len());
        for item in items {
            saved.push(tx.insert_return_item(header.id, item).await?);
        }

        Ok(ReturnDetail { header, items: saved })
    }

    // --- APROVAR ---
    pub async fn approve_return(&self, return_id: i64, actor: &Actor) -> Result<ReturnApproval, AppError> {
        let mut tx = self.store.begin().await?;
        let result = self.approve_return_tx(&mut *tx, return_id, actor.user_id).await;
        let approval = finish(tx, result).await?;

        tracing::info!(
            return_id,
            credit_id = ?approval.credit.as_ref().map(|c| c.id),
            total = %approval.header.total,
            actor_id = actor.user_id,
            "✅ Devolução aprovada"
        );
        Ok(approval)
    }

    async fn approve_return_tx(
        &self,
        tx: &mut dyn StoreTx,
        return_id: i64,
        actor_id: i64,
    ) -> Result<ReturnApproval, AppError> {
        let ret = Self::lock_pending(&mut *tx, return_id).await?;

        let sale = tx
            .lock_sale(ret.sale_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Venda {}", ret.sale_id)))?;
        if sale.status == SaleStatus::Cancelled {
            return Err(AppError::InvalidState(format!(
                "A venda {} foi cancelada; a devolução não pode ser aprovada.",
                sale.id
            )));
        }

        let header = tx.update_return_status(return_id, ReturnStatus::Approved, None).await?;
        let items = tx.list_return_items(return_id).await?;

        let reason = format!("devolução #{}", return_id);
        for item in &items {
            self.ledger
                .apply_movement(&mut *tx, item.product_id, item.quantity, &reason, actor_id)
                .await?;
        }

        let credit = if header.total > Decimal::ZERO {
            let expires_at = self.credit_validity_days.map(|days| Utc::now() + Duration::days(days));
            Some(
                self.credits
                    .issue_return_credit(&mut *tx, header.client_id, return_id, header.total, expires_at)
                    .await?,
            )
        } else {
            None
        };

        Ok(ReturnApproval { header, items, credit })
    }

    // --- RECUSAR ---
    pub async fn reject_return(&self, return_id: i64, reason: &str, actor: &Actor) -> Result<SaleReturn, AppError> {
        if reason.trim().is_empty() {
            return Err(AppError::InvalidInput("O motivo da recusa é obrigatório.".into()));
        }

        let mut tx = self.store.begin().await?;
        let result = async {
            Self::lock_pending(&mut *tx, return_id).await?;
            tx.update_return_status(return_id, ReturnStatus::Rejected, Some(reason.trim().to_string()))
                .await
        }
        .await;
        let ret = finish(tx, result).await?;

        tracing::info!(return_id, actor_id = actor.user_id, "🚫 Devolução recusada");
        Ok(ret)
    }

    async fn lock_pending(tx: &mut dyn StoreTx, return_id: i64) -> Result<SaleReturn, AppError> {
        let ret = tx
            .lock_return(return_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Devolução {}", return_id)))?;
        if ret.status != ReturnStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "A devolução {} já foi decidida.",
                return_id
            )));
        }
        Ok(ret)
    }

    // --- LEITURAS ---
    pub async fn get_return(&self, return_id: i64) -> Result<ReturnDetail, AppError> {
        let mut tx = self.store.begin().await?;
        let result = async {
            let header = tx
                .find_return(return_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Devolução {}", return_id)))?;
            let items = tx.list_return_items(return_id).await?;
            Ok::<_, AppError>(ReturnDetail { header, items })
        }
        .await;
        finish(tx, result).await
    }

    pub async fn list_returns(&self, filter: ReturnFilter) -> Result<Page<SaleReturn>, AppError> {
        let mut tx = self.store.begin().await?;
        let result = tx.list_returns(&filter).await;
        let (items, total) = finish(tx, result).await?;
        Ok(Page::new(items, total, filter.page))
    }
}
