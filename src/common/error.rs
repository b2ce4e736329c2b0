use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::Config;
use crate::middleware::i18n::Locale;

// Taxonomia de erros do motor de estoque/vendas.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Validação de regra de negócio feita no service (sem campo específico)
    #[error("Dados inválidos: {0}")]
    InvalidInput(String),

    #[error("{0} não encontrado(a)")]
    NotFound(String),

    #[error("Estoque insuficiente para o produto {product_id}: disponível {available}, solicitado {required}")]
    InsufficientStock {
        product_id: i64,
        available: i32,
        required: i32,
    },

    #[error("Estado inválido: {0}")]
    InvalidState(String),

    #[error("Venda {0} já está cancelada")]
    AlreadyCancelled(i64),

    #[error("Quantidade inválida para o item {sale_item_id}: {requested} (máximo {max})")]
    InvalidQuantity {
        sale_item_id: i64,
        requested: i32,
        max: i32,
    },

    #[error("Conflito: {0}")]
    Conflict(String),

    #[error("Pagamento excede o total da venda: total {total}, pago {paid}, tentativa {attempted}")]
    OverPayment {
        total: Decimal,
        paid: Decimal,
        attempted: Decimal,
    },

    #[error("Valor excede o crédito: disponível {available}, solicitado {requested}")]
    ExceedsCredit {
        available: Decimal,
        requested: Decimal,
    },

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Acesso negado: {0}")]
    Forbidden(String),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

// O erro que vai para o cliente HTTP (já traduzido)
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InsufficientStock { .. }
            | AppError::InvalidState(_)
            | AppError::AlreadyCancelled(_)
            | AppError::Conflict(_)
            | AppError::OverPayment { .. }
            | AppError::ExceedsCredit { .. } => StatusCode::CONFLICT,
            AppError::InvalidQuantity { .. } => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn is_internal(&self) -> bool {
        self.status() == StatusCode::INTERNAL_SERVER_ERROR
    }

    /// Contexto estruturado útil para o frontend (ex: disponível x solicitado).
    fn details(&self) -> Option<Value> {
        match self {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), json!(messages));
                }
                Some(Value::Object(details))
            }
            AppError::InsufficientStock { product_id, available, required } => Some(json!({
                "productId": product_id,
                "available": available,
                "required": required,
            })),
            AppError::InvalidQuantity { sale_item_id, requested, max } => Some(json!({
                "saleItemId": sale_item_id,
                "requested": requested,
                "max": max,
            })),
            AppError::OverPayment { total, paid, attempted } => Some(json!({
                "total": total,
                "paid": paid,
                "attempted": attempted,
            })),
            AppError::ExceedsCredit { available, requested } => Some(json!({
                "available": available,
                "requested": requested,
            })),
            _ => None,
        }
    }

    fn message(&self, lang: &str) -> String {
        let english = lang == "en";
        match self {
            AppError::ValidationError(_) => {
                if english { "One or more fields are invalid.".into() } else { "Um ou mais campos são inválidos.".into() }
            }
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::NotFound(what) => {
                if english { format!("{} not found.", what) } else { format!("{} não encontrado(a).", what) }
            }
            AppError::InsufficientStock { .. } => {
                if english { "Insufficient stock.".into() } else { "Estoque insuficiente.".into() }
            }
            AppError::InvalidState(msg) => msg.clone(),
            AppError::AlreadyCancelled(id) => {
                if english { format!("Sale {} is already cancelled.", id) } else { format!("A venda {} já está cancelada.", id) }
            }
            AppError::InvalidQuantity { .. } => {
                if english { "Invalid return quantity.".into() } else { "Quantidade de devolução inválida.".into() }
            }
            AppError::Conflict(msg) => msg.clone(),
            AppError::OverPayment { .. } => {
                if english { "Payment exceeds the sale total.".into() } else { "O pagamento excede o total da venda.".into() }
            }
            AppError::ExceedsCredit { .. } => {
                if english { "Amount exceeds the available credit.".into() } else { "O valor excede o crédito disponível.".into() }
            }
            AppError::InvalidCredentials => {
                if english { "Invalid e-mail or password.".into() } else { "E-mail ou senha inválidos.".into() }
            }
            AppError::InvalidToken => {
                if english { "Invalid or missing authentication token.".into() } else { "Token de autenticação inválido ou ausente.".into() }
            }
            AppError::Forbidden(msg) => msg.clone(),
            _ => {
                if english { "An unexpected error occurred.".into() } else { "Ocorreu um erro inesperado.".into() }
            }
        }
    }

    /// Converte para a resposta HTTP no idioma do cliente.
    /// Erros internos são logados; em produção o detalhe não vaza.
    pub fn to_api_error(&self, locale: &Locale, config: &Config) -> ApiError {
        let status = self.status();

        if self.is_internal() {
            tracing::error!("Erro Interno do Servidor: {}", self);
            let error = if config.is_production() {
                self.message(&locale.0)
            } else {
                self.to_string()
            };
            return ApiError { status, error, details: None };
        }

        ApiError {
            status,
            error: self.message(&locale.0),
            details: self.details(),
        }
    }
}

// Usado fora dos handlers (middleware), sem idioma negociado
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.is_internal() {
            tracing::error!("Erro Interno do Servidor: {}", self);
        }
        let body = Json(json!({ "error": self.message("pt") }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_http_status() {
        assert_eq!(AppError::NotFound("Venda".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::InvalidInput("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::InsufficientStock { product_id: 1, available: 0, required: 2 }.status(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::InternalServerError(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn insufficient_stock_reports_available_and_required() {
        let err = AppError::InsufficientStock { product_id: 7, available: 1, required: 3 };
        let api = err.to_api_error(&Locale("en".into()), &Config::in_memory("segredo"));
        let details = api.details.expect("details");
        assert_eq!(details["available"], 1);
        assert_eq!(details["required"], 3);
        assert_eq!(api.error, "Insufficient stock.");
    }

    #[test]
    fn production_hides_internal_details() {
        let mut config = Config::in_memory("segredo");
        config.app_env = "production".into();
        let err = AppError::InternalServerError(anyhow::anyhow!("senha do banco vazou"));
        let api = err.to_api_error(&Locale("pt".into()), &config);
        assert_eq!(api.error, "Ocorreu um erro inesperado.");
    }
}
