// src/services/payment_service.rs
//
// Pagamentos parciais (crediário/encomendas). A venda fecha quando o total
// pago alcança o total, na mesma transação do pagamento.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::{
    common::{error::AppError, validation::fits_money},
    db::{finish, Store, StoreTx},
    models::{
        auth::Actor,
        sales::{Balance, NewPayment, Payment, PaymentReceipt, RecordPayment, SaleStatus},
    },
};

#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn Store>,
}

impl PaymentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn record_payment(
        &self,
        sale_id: i64,
        payload: RecordPayment,
        actor: &Actor,
    ) -> Result<PaymentReceipt, AppError> {
        if payload.amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput("O valor do pagamento deve ser maior que zero.".into()));
        }
        // NUMERIC(12,2) arredondaria o valor e a venda nunca fecharia
        if !fits_money(payload.amount) {
            return Err(AppError::InvalidInput(
                "O valor do pagamento aceita no máximo duas casas decimais e 9.999.999.999,99.".into(),
            ));
        }

        let mut tx = self.store.begin().await?;
        let result = Self::record_payment_tx(&mut *tx, sale_id, payload, actor.user_id).await;
        let receipt = finish(tx, result).await?;

        tracing::info!(
            sale_id,
            amount = %receipt.payment.amount,
            remaining = %receipt.balance.remaining,
            status = ?receipt.sale_status,
            "💰 Pagamento registrado"
        );
        Ok(receipt)
    }

    async fn record_payment_tx(
        tx: &mut dyn StoreTx,
        sale_id: i64,
        payload: RecordPayment,
        actor_id: i64,
    ) -> Result<PaymentReceipt, AppError> {
        // Trava a venda: pagamentos concorrentes somam em série
        let sale = tx
            .lock_sale(sale_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Venda {}", sale_id)))?;

        if sale.status == SaleStatus::Cancelled {
            return Err(AppError::InvalidState(format!(
                "A venda {} está cancelada e não aceita pagamentos.",
                sale_id
            )));
        }

        let paid = tx.sum_payments(sale_id).await?;
        let after = paid.checked_add(payload.amount);
        if after.is_none_or(|after| after > sale.total) {
            tracing::warn!(sale_id, total = %sale.total, paid = %paid, attempted = %payload.amount, "Pagamento acima do total");
            return Err(AppError::OverPayment {
                total: sale.total,
                paid,
                attempted: payload.amount,
            });
        }

        let payment = tx
            .insert_payment(NewPayment {
                sale_id,
                amount: payload.amount,
                method: payload.method,
                actor_id,
                notes: payload.notes,
            })
            .await?;

        let paid = paid + payment.amount;
        let mut status = sale.status;
        if paid >= sale.total && sale.status == SaleStatus::Pending {
            status = tx.update_sale_status(sale_id, SaleStatus::Completed, None).await?.status;
        }

        Ok(PaymentReceipt {
            payment,
            balance: Balance::new(sale.total, paid),
            sale_status: status,
        })
    }

    pub async fn summary(&self, sale_id: i64) -> Result<Balance, AppError> {
        let mut tx = self.store.begin().await?;
        let result = async {
            let sale = tx
                .find_sale(sale_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Venda {}", sale_id)))?;
            let paid = tx.sum_payments(sale_id).await?;
            Ok::<_, AppError>(Balance::new(sale.total, paid))
        }
        .await;
        finish(tx, result).await
    }

    pub async fn list_payments(&self, sale_id: i64) -> Result<Vec<Payment>, AppError> {
        let mut tx = self.store.begin().await?;
        let result = async {
            tx.find_sale(sale_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Venda {}", sale_id)))?;
            tx.list_payments(sale_id).await
        }
        .await;
        finish(tx, result).await
    }
}
