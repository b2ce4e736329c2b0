// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{common::error::AppError, middleware::auth::AuthenticatedUser, models::auth::Role};

/// 1. O Trait que define quais papéis passam pelo portão
pub trait RoleGate: Send + Sync + 'static {
    fn name() -> &'static str;
    fn allows(role: Role) -> bool;
}

/// 2. O Extractor (Guardião)
pub struct RequireRole<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleGate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or(AppError::InvalidToken)?;

        if !T::allows(user.0.role) {
            tracing::warn!(user_id = user.0.user_id, role = ?user.0.role, gate = T::name(), "Acesso negado");
            return Err(AppError::Forbidden(format!(
                "Seu perfil não permite esta ação ({}).",
                T::name()
            )));
        }

        Ok(RequireRole(PhantomData))
    }
}

// ---
// DEFINIÇÃO DOS PORTÕES (TIPOS)
// ---

/// Livro-razão, inventário e catálogo
pub struct StockWrite;
impl RoleGate for StockWrite {
    fn name() -> &'static str { "estoque" }
    fn allows(role: Role) -> bool {
        matches!(role, Role::Admin | Role::StockClerk)
    }
}

/// Vendas, pagamentos, devoluções e créditos
pub struct SalesWrite;
impl RoleGate for SalesWrite {
    fn name() -> &'static str { "vendas" }
    fn allows(role: Role) -> bool {
        matches!(role, Role::Admin | Role::Salesperson)
    }
}

pub struct AdminOnly;
impl RoleGate for AdminOnly {
    fn name() -> &'static str { "administração" }
    fn allows(role: Role) -> bool {
        role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gates_follow_the_role_table() {
        assert!(StockWrite::allows(Role::StockClerk));
        assert!(!StockWrite::allows(Role::Salesperson));
        assert!(SalesWrite::allows(Role::Salesperson));
        assert!(!SalesWrite::allows(Role::StockClerk));
        assert!(AdminOnly::allows(Role::Admin));
        assert!(!AdminOnly::allows(Role::Salesperson));
        assert!(StockWrite::allows(Role::Admin) && SalesWrite::allows(Role::Admin));
    }
}
