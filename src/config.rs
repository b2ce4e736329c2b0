// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::{
    db::{MemoryStore, PgStore, Store},
    services::{
        auth::AuthService, catalog_service::CatalogService, count_service::CountService,
        credit_service::CreditService, ledger_service::LedgerService,
        payment_service::PaymentService, return_service::ReturnService,
        sale_service::SaleService,
    },
};

const MEMORY_URL_PREFIX: &str = "memory://";

// Configuração lida do ambiente (.env em desenvolvimento)
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub app_env: String,
    pub token_ttl_hours: i64,
    // Validade dos créditos gerados por devolução; None = não vencem
    pub credit_validity_days: Option<i64>,
    pub bootstrap_admin: Option<(String, String)>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;
        if jwt_secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET não pode ser vazio");
        }

        let bootstrap_admin = match (
            env::var("BOOTSTRAP_ADMIN_EMAIL").ok(),
            env::var("BOOTSTRAP_ADMIN_PASSWORD").ok(),
        ) {
            (Some(email), Some(password)) => Some((email, password)),
            _ => None,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS")?.unwrap_or(5),
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            token_ttl_hours: parse_var("TOKEN_TTL_HOURS")?.unwrap_or(24 * 7),
            credit_validity_days: parse_var("CREDIT_VALIDITY_DAYS")?,
            bootstrap_admin,
        })
    }

    /// Configuração para rodar tudo em memória (testes e demonstração local).
    pub fn in_memory(jwt_secret: &str) -> Self {
        Self {
            database_url: MEMORY_URL_PREFIX.to_string(),
            jwt_secret: jwt_secret.to_string(),
            bind_addr: "127.0.0.1:3000".to_string(),
            db_max_connections: 1,
            app_env: "test".to_string(),
            token_ttl_hours: 1,
            credit_validity_days: None,
            bootstrap_admin: None,
        }
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url.starts_with(MEMORY_URL_PREFIX)
    }
}

fn parse_var<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("{} inválida: {}", name, raw)),
        _ => Ok(None),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub auth_service: AuthService,
    pub catalog_service: CatalogService,
    pub ledger_service: LedgerService,
    pub sale_service: SaleService,
    pub payment_service: PaymentService,
    pub return_service: ReturnService,
    pub credit_service: CreditService,
    pub count_service: CountService,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store: Arc<dyn Store> = if config.uses_memory_store() {
            tracing::warn!("⚠️ Usando store em memória: os dados somem ao reiniciar.");
            Arc::new(MemoryStore::new())
        } else {
            // Conecta ao banco de dados, usando '?' para propagar erros
            let pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .acquire_timeout(Duration::from_secs(3))
                .connect(&config.database_url)
                .await?;

            tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

            let pg = PgStore::new(pool);
            pg.migrate().await?;
            tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");
            Arc::new(pg)
        };

        Ok(Self::with_store(config, store))
    }

    // --- Monta o gráfico de dependências ---
    pub fn with_store(config: Config, store: Arc<dyn Store>) -> Self {
        let ledger_service = LedgerService::new(store.clone());
        let credit_service = CreditService::new(store.clone());

        Self {
            auth_service: AuthService::new(store.clone(), config.jwt_secret.clone(), config.token_ttl_hours),
            catalog_service: CatalogService::new(store.clone(), ledger_service.clone()),
            sale_service: SaleService::new(store.clone(), ledger_service.clone()),
            payment_service: PaymentService::new(store.clone()),
            return_service: ReturnService::new(
                store.clone(),
                ledger_service.clone(),
                credit_service.clone(),
                config.credit_validity_days,
            ),
            count_service: CountService::new(store.clone(), ledger_service.clone()),
            credit_service,
            ledger_service,
            store,
            config: Arc::new(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_url_selects_memory_store() {
        let config = Config::in_memory("segredo");
        assert!(config.uses_memory_store());
        assert!(!config.is_production());
    }
}
