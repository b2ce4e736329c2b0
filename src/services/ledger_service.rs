// src/services/ledger_service.rs
//
// Livro-razão de estoque. Único lugar que altera Product.quantity: toda
// alteração grava exatamente uma movimentação na mesma transação.

use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::{finish, Store, StoreTx},
    models::{
        auth::Actor,
        inventory_count::AppliedAdjustment,
        ledger::{LedgerAudit, MovementEntry, MovementFilter, MovementKind, NewMovement, StockMovement},
        pagination::Page,
    },
};

#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn Store>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    // --- AJUSTE MANUAL ---
    pub async fn adjust_quantity(
        &self,
        product_id: i64,
        delta: i32,
        kind: MovementKind,
        reason: &str,
        actor: &Actor,
    ) -> Result<StockMovement, AppError> {
        if delta == 0 {
            return Err(AppError::InvalidInput("A variação de quantidade não pode ser zero.".into()));
        }
        if MovementKind::for_delta(delta) != kind {
            return Err(AppError::InvalidInput(
                "O sinal da quantidade não corresponde ao tipo de movimentação.".into(),
            ));
        }
        if reason.trim().is_empty() {
            return Err(AppError::InvalidInput("O motivo é obrigatório.".into()));
        }

        let mut tx = self.store.begin().await?;
        let result = self.apply_movement(&mut *tx, product_id, delta, reason, actor.user_id).await;
        let movement = finish(tx, result).await?;

        tracing::info!(
            product_id,
            delta,
            movement_id = movement.id,
            actor_id = actor.user_id,
            "📦 Ajuste de estoque registrado"
        );
        Ok(movement)
    }

    /// Aplica `delta` dentro de uma transação já aberta.
    /// Trava a linha do produto e debita/credita com UPDATE condicional.
    pub async fn apply_movement(
        &self,
        tx: &mut dyn StoreTx,
        product_id: i64,
        delta: i32,
        reason: &str,
        actor_id: i64,
    ) -> Result<StockMovement, AppError> {
        let product = tx
            .lock_product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Produto {}", product_id)))?;

        if product.quantity.checked_add(delta).is_none() {
            return Err(AppError::InvalidInput(format!(
                "A quantidade do produto {} excederia o limite.",
                product_id
            )));
        }
        if tx.apply_quantity_delta(product_id, delta).await?.is_none() {
            tracing::warn!(product_id, available = product.quantity, delta, "Estoque insuficiente");
            return Err(AppError::InsufficientStock {
                product_id,
                available: product.quantity,
                required: delta.saturating_neg(),
            });
        }

        tx.insert_movement(NewMovement {
            product_id,
            quantity: delta.abs(),
            kind: MovementKind::for_delta(delta),
            reason: reason.to_string(),
            actor_id,
        })
        .await
    }

    /// Define a quantidade absoluta (inventário) gravando a diferença como movimentação.
    /// Sem diferença, nada é gravado.
    pub async fn set_quantity(
        &self,
        tx: &mut dyn StoreTx,
        product_id: i64,
        new_quantity: i32,
        reason: &str,
        actor_id: i64,
    ) -> Result<AppliedAdjustment, AppError> {
        if new_quantity < 0 {
            return Err(AppError::InvalidInput(format!(
                "Quantidade negativa para o produto {}.",
                product_id
            )));
        }

        let product = tx
            .lock_product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Produto {}", product_id)))?;

        let delta = new_quantity - product.quantity;
        let mut movement_id = None;
        if delta != 0 {
            tx.set_product_quantity(product_id, new_quantity).await?;
            let movement = tx
                .insert_movement(NewMovement {
                    product_id,
                    quantity: delta.abs(),
                    kind: MovementKind::for_delta(delta),
                    reason: reason.to_string(),
                    actor_id,
                })
                .await?;
            movement_id = Some(movement.id);
        }

        Ok(AppliedAdjustment {
            product_id,
            previous_quantity: product.quantity,
            new_quantity,
            movement_id,
        })
    }

    // --- LEITURAS ---
    pub async fn history(&self, filter: MovementFilter) -> Result<Page<MovementEntry>, AppError> {
        let mut tx = self.store.begin().await?;
        let result = tx.list_movements(&filter).await;
        let (items, total) = finish(tx, result).await?;
        Ok(Page::new(items, total, filter.page))
    }

    pub async fn audit(&self, product_id: i64) -> Result<LedgerAudit, AppError> {
        let mut tx = self.store.begin().await?;
        let result = async {
            let product = tx
                .find_product(product_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Produto {}", product_id)))?;
            let balance = tx.movement_balance(product_id).await?;
            Ok::<_, AppError>(LedgerAudit {
                product_id,
                quantity: product.quantity,
                movement_balance: balance,
                consistent: balance == product.quantity as i64,
            })
        }
        .await;
        let audit = finish(tx, result).await?;

        if !audit.consistent {
            tracing::error!(
                product_id,
                quantity = audit.quantity,
                movement_balance = audit.movement_balance,
                "🔥 Quantidade divergente do livro-razão"
            );
        }
        Ok(audit)
    }
}
