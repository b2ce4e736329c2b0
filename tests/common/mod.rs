// Montagem compartilhada: AppState completo sobre o store em memória.
#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal::Decimal;

use loja_backend::{
    config::{AppState, Config},
    db::MemoryStore,
    models::{
        auth::{Actor, CreateUserPayload, Role},
        catalog::{Client, CreateProduct, NewClient, Product, ProductSize},
        sales::{CreateSale, DiscountInput, PaymentMethod, RecordPayment, SaleDetail, SaleLine},
    },
};

pub struct Harness {
    pub state: AppState,
    pub admin: Actor,
    pub seller: Actor,
    pub clerk: Actor,
}

pub async fn harness() -> Harness {
    let state = AppState::with_store(Config::in_memory("segredo-de-teste"), Arc::new(MemoryStore::new()));

    let admin = user(&state, "admin@loja.com", Role::Admin).await;
    let seller = user(&state, "vendas@loja.com", Role::Salesperson).await;
    let clerk = user(&state, "estoque@loja.com", Role::StockClerk).await;

    Harness { state, admin, seller, clerk }
}

async fn user(state: &AppState, email: &str, role: Role) -> Actor {
    let user = state
        .auth_service
        .create_user(CreateUserPayload {
            name: email.split('@').next().unwrap_or("usuario").to_string(),
            email: email.to_string(),
            password: "senha123".to_string(),
            role,
        })
        .await
        .unwrap();
    Actor::from(&user)
}

impl Harness {
    pub async fn product(&self, name: &str, quantity: i32, price: Decimal) -> Product {
        self.state
            .catalog_service
            .create_product(
                CreateProduct {
                    name: name.to_string(),
                    size: ProductSize::M,
                    price,
                    initial_quantity: quantity,
                    supplier_id: None,
                },
                &self.clerk,
            )
            .await
            .unwrap()
    }

    pub async fn client(&self, name: &str) -> Client {
        self.state
            .catalog_service
            .create_client(NewClient { name: name.to_string(), phone: None, email: None })
            .await
            .unwrap()
    }

    pub async fn quantity(&self, product_id: i64) -> i32 {
        self.state.catalog_service.get_product(product_id).await.unwrap().quantity
    }

    pub fn sale_input(&self, client_id: Option<i64>, lines: &[(i64, i32)]) -> CreateSale {
        CreateSale {
            client_id,
            lines: lines
                .iter()
                .map(|&(product_id, quantity)| SaleLine { product_id, quantity, unit_price: None })
                .collect(),
            discount: DiscountInput::default(),
            payment_method: PaymentMethod::Pix,
            notes: None,
        }
    }

    pub async fn sell(&self, client_id: Option<i64>, lines: &[(i64, i32)]) -> SaleDetail {
        self.state
            .sale_service
            .create_sale(self.sale_input(client_id, lines), &self.seller)
            .await
            .unwrap()
    }

    pub fn payment(amount: Decimal) -> RecordPayment {
        RecordPayment { amount, method: PaymentMethod::Cash, notes: None }
    }

    /// Paga o total e deixa a venda concluída.
    pub async fn pay_in_full(&self, sale: &SaleDetail) {
        self.state
            .payment_service
            .record_payment(sale.sale.id, Self::payment(sale.sale.total), &self.seller)
            .await
            .unwrap();
    }
}
