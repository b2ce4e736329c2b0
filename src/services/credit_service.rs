// src/services/credit_service.rs
//
// Créditos de cliente (vale-troca). Um crédito nunca tem o valor alterado:
// uso parcial encerra o original e emite um novo com o saldo.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{
    common::{error::AppError, validation::fits_money},
    db::{finish, Store, StoreTx},
    models::{
        auth::Actor,
        credits::{
            ApplyCredit, ClientCredits, Credit, CreditApplication, CreditOrigin, GrantCredit,
            NewCredit, NewCreditUsage,
        },
        sales::SaleStatus,
    },
};

#[derive(Clone)]
pub struct CreditService {
    store: Arc<dyn Store>,
}

impl CreditService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list_client_credits(&self, client_id: i64) -> Result<ClientCredits, AppError> {
        let mut tx = self.store.begin().await?;
        let result = async {
            tx.find_client(client_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Cliente {}", client_id)))?;
            tx.list_available_credits(client_id, Utc::now()).await
        }
        .await;
        let credits = finish(tx, result).await?;

        let total = credits.iter().map(|c| c.amount).sum::<Decimal>();
        Ok(ClientCredits { credits, total })
    }

    // --- CRÉDITO MANUAL ---
    pub async fn grant_credit(
        &self,
        client_id: i64,
        payload: GrantCredit,
        actor: &Actor,
    ) -> Result<Credit, AppError> {
        if payload.amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput("O valor do crédito deve ser maior que zero.".into()));
        }
        if !fits_money(payload.amount) {
            return Err(AppError::InvalidInput(
                "O valor do crédito aceita no máximo duas casas decimais e 9.999.999.999,99.".into(),
            ));
        }
        if payload.expires_at.is_some_and(|exp| exp <= Utc::now()) {
            return Err(AppError::InvalidInput("A validade precisa estar no futuro.".into()));
        }

        let mut tx = self.store.begin().await?;
        let result = async {
            tx.find_client(client_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Cliente {}", client_id)))?;
            tx.insert_credit(NewCredit {
                client_id,
                amount: payload.amount,
                origin: CreditOrigin::Manual,
                return_id: None,
                parent_credit_id: None,
                expires_at: payload.expires_at,
            })
            .await
        }
        .await;
        let credit = finish(tx, result).await?;

        tracing::info!(client_id, credit_id = credit.id, amount = %credit.amount, actor_id = actor.user_id, "🎁 Crédito manual concedido");
        Ok(credit)
    }

    /// Emite o crédito de uma devolução aprovada, dentro da transação da aprovação.
    pub async fn issue_return_credit(
        &self,
        tx: &mut dyn StoreTx,
        client_id: i64,
        return_id: i64,
        amount: Decimal,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Credit, AppError> {
        tx.insert_credit(NewCredit {
            client_id,
            amount,
            origin: CreditOrigin::Return,
            return_id: Some(return_id),
            parent_credit_id: None,
            expires_at,
        })
        .await
    }

    // --- USO DE CRÉDITO EM VENDA ---
    pub async fn apply_credit(
        &self,
        sale_id: i64,
        payload: ApplyCredit,
        actor: &Actor,
    ) -> Result<CreditApplication, AppError> {
        if payload.amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput("O valor a usar deve ser maior que zero.".into()));
        }
        if !fits_money(payload.amount) {
            return Err(AppError::InvalidInput(
                "O valor a usar aceita no máximo duas casas decimais.".into(),
            ));
        }

        let mut tx = self.store.begin().await?;
        let result = Self::apply_credit_tx(&mut *tx, sale_id, &payload, actor.user_id).await;
        let application = finish(tx, result).await?;

        tracing::info!(
            sale_id,
            credit_id = payload.credit_id,
            amount = %payload.amount,
            remainder = ?application.remainder.as_ref().map(|c| c.amount),
            "🎟️ Crédito aplicado na venda"
        );
        Ok(application)
    }

    async fn apply_credit_tx(
        tx: &mut dyn StoreTx,
        sale_id: i64,
        payload: &ApplyCredit,
        actor_id: i64,
    ) -> Result<CreditApplication, AppError> {
        let not_found = || AppError::NotFound(format!("Crédito {}", payload.credit_id));

        // Crédito de outro cliente, já usado ou vencido: para o chamador, não existe
        let credit = tx
            .lock_credit(payload.credit_id)
            .await?
            .filter(|c| c.client_id == payload.client_id && c.is_usable_at(Utc::now()))
            .ok_or_else(not_found)?;

        if payload.amount > credit.amount {
            return Err(AppError::ExceedsCredit {
                available: credit.amount,
                requested: payload.amount,
            });
        }

        let sale = tx
            .lock_sale(sale_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Venda {}", sale_id)))?;
        if sale.status != SaleStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "Crédito só pode ser usado em venda pendente (venda {}).",
                sale_id
            )));
        }
        if sale.client_id.is_some_and(|c| c != payload.client_id) {
            return Err(AppError::InvalidInput("O crédito pertence a outro cliente da venda.".into()));
        }

        let usage = tx
            .insert_credit_usage(NewCreditUsage {
                credit_id: credit.id,
                sale_id,
                amount: payload.amount,
                actor_id,
            })
            .await?;

        tx.mark_credit_used(credit.id).await?;

        let remainder = if payload.amount < credit.amount {
            Some(
                tx.insert_credit(NewCredit {
                    client_id: credit.client_id,
                    amount: credit.amount - payload.amount,
                    origin: CreditOrigin::Remainder,
                    return_id: None,
                    parent_credit_id: Some(credit.id),
                    expires_at: credit.expires_at,
                })
                .await?,
            )
        } else {
            None
        };

        let new_total = (sale.total - payload.amount).max(Decimal::ZERO);
        let mut sale = tx.update_sale_total(sale_id, new_total).await?;

        let paid = tx.sum_payments(sale_id).await?;
        if paid >= new_total {
            sale = tx.update_sale_status(sale_id, SaleStatus::Completed, None).await?;
        }

        Ok(CreditApplication {
            usage,
            remainder,
            sale_total: sale.total,
            sale_status: sale.status,
        })
    }
}
