// src/services/count_service.rs
//
// Inventário físico: nenhum -> em andamento -> finalizado.
// Só uma contagem em andamento por vez.

use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::{finish, Store, StoreTx},
    models::{
        auth::Actor,
        inventory_count::{
            Adjustment, AppliedAdjustment, CountDetail, CountEntry, FinalizedCount, InventoryCount,
            InventoryCountItem,
        },
        pagination::{Page, PageParams},
    },
    services::ledger_service::LedgerService,
};

const ADJUSTMENT_REASON: &str = "ajuste de inventário";

/// Não contados primeiro, depois divergências, depois os que batem; empate pelo nome.
pub fn sort_items(items: &mut [InventoryCountItem]) {
    items.sort_by(|a, b| {
        a.state()
            .cmp(&b.state())
            .then_with(|| a.product_name.cmp(&b.product_name))
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
}

fn no_open_count() -> AppError {
    AppError::NotFound("Inventário em andamento".into())
}

#[derive(Clone)]
pub struct CountService {
    store: Arc<dyn Store>,
    ledger: LedgerService,
}

impl CountService {
    pub fn new(store: Arc<dyn Store>, ledger: LedgerService) -> Self {
        Self { store, ledger }
    }

    // --- INICIAR ---
    pub async fn start_count(&self, actor: &Actor) -> Result<CountDetail, AppError> {
        let mut tx = self.store.begin().await?;
        let result = Self::start_count_tx(&mut *tx, actor.user_id).await;
        let detail = finish(tx, result).await?;

        tracing::info!(count_id = detail.count.id, items = detail.items.len(), "📋 Inventário iniciado");
        Ok(detail)
    }

    async fn start_count_tx(tx: &mut dyn StoreTx, actor_id: i64) -> Result<CountDetail, AppError> {
        if tx.lock_open_count().await?.is_some() {
            return Err(AppError::Conflict("Já existe um inventário em andamento.".into()));
        }

        let count = tx.insert_count(actor_id).await?;
        tx.snapshot_count_items(count.id).await?;
        let mut items = tx.list_count_items(count.id).await?;
        sort_items(&mut items);

        Ok(CountDetail { count, items })
    }

    // --- REGISTRAR CONTAGENS ---
    // Pode ser chamado várias vezes; a última contagem de cada produto vale.
    pub async fn record_counts(&self, entries: Vec<CountEntry>) -> Result<CountDetail, AppError> {
        if entries.is_empty() {
            return Err(AppError::InvalidInput("Nenhuma contagem informada.".into()));
        }
        if let Some(bad) = entries.iter().find(|e| e.physical_quantity < 0) {
            return Err(AppError::InvalidInput(format!(
                "Quantidade física negativa para o produto {}.",
                bad.product_id
            )));
        }

        let mut tx = self.store.begin().await?;
        let result = Self::record_counts_tx(&mut *tx, entries).await;
        let detail = finish(tx, result).await?;

        tracing::info!(count_id = detail.count.id, "📝 Contagens registradas");
        Ok(detail)
    }

    async fn record_counts_tx(tx: &mut dyn StoreTx, entries: Vec<CountEntry>) -> Result<CountDetail, AppError> {
        let count = tx.lock_open_count().await?.ok_or_else(no_open_count)?;

        for entry in entries {
            let updated = tx
                .update_count_item(count.id, entry.product_id, entry.physical_quantity, entry.note)
                .await?;
            if !updated {
                return Err(AppError::NotFound(format!(
                    "Produto {} no inventário {}",
                    entry.product_id, count.id
                )));
            }
        }

        let mut items = tx.list_count_items(count.id).await?;
        sort_items(&mut items);
        Ok(CountDetail { count, items })
    }

    // --- APLICAR AJUSTES E FINALIZAR ---
    pub async fn apply_adjustments(
        &self,
        adjustments: Vec<Adjustment>,
        actor: &Actor,
    ) -> Result<FinalizedCount, AppError> {
        if let Some(bad) = adjustments.iter().find(|a| a.new_quantity < 0) {
            return Err(AppError::InvalidInput(format!(
                "Quantidade negativa para o produto {}.",
                bad.product_id
            )));
        }

        let mut tx = self.store.begin().await?;
        let result = async {
            let count = tx.lock_open_count().await?.ok_or_else(no_open_count)?;
            self.apply_and_finish(&mut *tx, count, &adjustments, actor.user_id).await
        }
        .await;
        let finalized = finish(tx, result).await?;

        tracing::info!(
            count_id = finalized.count.id,
            adjustments = finalized.adjustments.len(),
            "🏁 Inventário finalizado"
        );
        Ok(finalized)
    }

    /// Finaliza usando as próprias contagens físicas registradas como ajustes.
    pub async fn finalize(&self, actor: &Actor) -> Result<FinalizedCount, AppError> {
        let mut tx = self.store.begin().await?;
        let result = async {
            let count = tx.lock_open_count().await?.ok_or_else(no_open_count)?;
            let adjustments: Vec<Adjustment> = tx
                .list_count_items(count.id)
                .await?
                .into_iter()
                .filter_map(|item| {
                    item.physical_quantity.map(|q| Adjustment {
                        product_id: item.product_id,
                        new_quantity: q,
                    })
                })
                .collect();
            self.apply_and_finish(&mut *tx, count, &adjustments, actor.user_id).await
        }
        .await;
        let finalized = finish(tx, result).await?;

        tracing::info!(
            count_id = finalized.count.id,
            adjustments = finalized.adjustments.len(),
            "🏁 Inventário finalizado pelas contagens"
        );
        Ok(finalized)
    }

    async fn apply_and_finish(
        &self,
        tx: &mut dyn StoreTx,
        count: InventoryCount,
        adjustments: &[Adjustment],
        actor_id: i64,
    ) -> Result<FinalizedCount, AppError> {
        let mut applied: Vec<AppliedAdjustment> = Vec::with_capacity(adjustments.len());
        for adj in adjustments {
            let result = self
                .ledger
                .set_quantity(&mut *tx, adj.product_id, adj.new_quantity, ADJUSTMENT_REASON, actor_id)
                .await?;
            applied.push(result);
        }

        let count = tx.finish_count(count.id).await?;
        Ok(FinalizedCount { count, adjustments: applied })
    }

    // --- LEITURAS ---
    pub async fn history(&self, page: PageParams) -> Result<Page<InventoryCount>, AppError> {
        let mut tx = self.store.begin().await?;
        let result = tx.list_counts(page).await;
        let (items, total) = finish(tx, result).await?;
        Ok(Page::new(items, total, page))
    }

    pub async fn detail(&self, count_id: i64) -> Result<CountDetail, AppError> {
        let mut tx = self.store.begin().await?;
        let result = async {
            let count = tx
                .find_count(count_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Inventário {}", count_id)))?;
            let mut items = tx.list_count_items(count.id).await?;
            sort_items(&mut items);
            Ok::<_, AppError>(CountDetail { count, items })
        }
        .await;
        finish(tx, result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::ProductSize;

    fn item(product_id: i64, name: &str, system: i32, physical: Option<i32>) -> InventoryCountItem {
        InventoryCountItem {
            count_id: 1,
            product_id,
            product_name: name.to_string(),
            product_size: ProductSize::M,
            system_quantity: system,
            physical_quantity: physical,
            note: None,
        }
    }

    #[test]
    fn uncounted_then_mismatch_then_match() {
        let mut items = vec![
            item(1, "Bermuda", 5, Some(5)),
            item(2, "Camisa", 3, Some(1)),
            item(3, "Vestido", 2, None),
            item(4, "Blusa", 4, None),
        ];
        sort_items(&mut items);
        let order: Vec<i64> = items.iter().map(|i| i.product_id).collect();
        assert_eq!(order, vec![4, 3, 2, 1]);
    }
}
