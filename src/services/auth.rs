// src/services/auth.rs

use std::sync::Arc;

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    common::error::AppError,
    db::{finish, Store},
    models::auth::{Actor, Claims, CreateUserPayload, NewUser, Role, User},
};

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    jwt_secret: String,
    token_ttl_hours: i64,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, jwt_secret: String, token_ttl_hours: i64) -> Self {
        Self { store, jwt_secret, token_ttl_hours }
    }

    async fn hash_password(password: &str) -> Result<String, AppError> {
        let password_clone = password.to_owned();
        let hashed = tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
        Ok(hashed)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<String, AppError> {
        let mut tx = self.store.begin().await?;
        let result = tx.find_user_by_email(email).await;
        let user = finish(tx, result).await?.ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            tracing::warn!(email, "Tentativa de login com senha inválida");
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!(user_id = user.id, "🔑 Login realizado");
        self.create_token(&user)
    }

    /// Token -> ator. Usuários removidos depois da emissão são recusados.
    pub async fn validate_token(&self, token: &str) -> Result<Actor, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        let mut tx = self.store.begin().await?;
        let result = tx.find_user(token_data.claims.sub).await;
        let user = finish(tx, result).await?.ok_or(AppError::InvalidToken)?;

        Ok(Actor::from(&user))
    }

    pub async fn create_user(&self, payload: CreateUserPayload) -> Result<User, AppError> {
        let password_hash = Self::hash_password(&payload.password).await?;

        let mut tx = self.store.begin().await?;
        let result = tx
            .insert_user(NewUser {
                name: payload.name.trim().to_string(),
                email: payload.email.trim().to_lowercase(),
                password_hash,
                role: payload.role,
            })
            .await;
        let user = finish(tx, result).await?;

        tracing::info!(user_id = user.id, role = ?user.role, "👤 Usuário criado");
        Ok(user)
    }

    /// Cria o primeiro admin quando a base ainda não tem usuários.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<Option<User>, AppError> {
        let password_hash = Self::hash_password(password).await?;

        let mut tx = self.store.begin().await?;
        let result = async {
            if tx.count_users().await? > 0 {
                return Ok(None);
            }
            let user = tx
                .insert_user(NewUser {
                    name: "Administrador".to_string(),
                    email: email.trim().to_lowercase(),
                    password_hash,
                    role: Role::Admin,
                })
                .await?;
            Ok::<_, AppError>(Some(user))
        }
        .await;
        let created = finish(tx, result).await?;

        if let Some(user) = &created {
            tracing::info!(user_id = user.id, "🛡️ Administrador inicial criado");
        }
        Ok(created)
    }

    fn create_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::hours(self.token_ttl_hours);

        let claims = Claims {
            sub: user.id,
            role: user.role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn service() -> AuthService {
        AuthService::new(Arc::new(MemoryStore::new()), "segredo-de-teste".into(), 1)
    }

    fn payload(role: Role) -> CreateUserPayload {
        CreateUserPayload {
            name: "Ana".into(),
            email: "Ana@Loja.com".into(),
            password: "senha123".into(),
            role,
        }
    }

    #[tokio::test]
    async fn login_issues_a_token_that_validates_back_to_the_actor() {
        let auth = service();
        let user = auth.create_user(payload(Role::Salesperson)).await.unwrap();

        let token = auth.login("ana@loja.com", "senha123").await.unwrap();
        let actor = auth.validate_token(&token).await.unwrap();

        assert_eq!(actor.user_id, user.id);
        assert_eq!(actor.role, Role::Salesperson);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let auth = service();
        auth.create_user(payload(Role::Admin)).await.unwrap();

        let err = auth.login("ana@loja.com", "outra-senha").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn token_signed_with_another_secret_is_rejected() {
        let auth = service();
        auth.create_user(payload(Role::Admin)).await.unwrap();
        let token = auth.login("ana@loja.com", "senha123").await.unwrap();

        let other = AuthService::new(Arc::new(MemoryStore::new()), "outro-segredo".into(), 1);
        assert!(matches!(other.validate_token(&token).await, Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn bootstrap_admin_only_when_empty() {
        let auth = service();
        assert!(auth.ensure_admin("admin@loja.com", "admin123").await.unwrap().is_some());
        assert!(auth.ensure_admin("outro@loja.com", "admin123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let auth = service();
        auth.create_user(payload(Role::Admin)).await.unwrap();
        let err = auth.create_user(payload(Role::StockClerk)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
