// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth / Users ---
        handlers::auth::login,
        handlers::auth::get_me,
        handlers::auth::create_user,

        // --- Products / Ledger ---
        handlers::products::create_product,
        handlers::products::list_products,
        handlers::products::import_products,
        handlers::products::get_product,
        handlers::products::update_price,
        handlers::products::adjust_quantity,
        handlers::products::audit_product,
        handlers::products::list_movements,

        // --- Clients / Suppliers / Credits ---
        handlers::clients::create_client,
        handlers::clients::list_clients,
        handlers::clients::list_client_credits,
        handlers::clients::grant_credit,
        handlers::clients::create_supplier,
        handlers::clients::list_suppliers,

        // --- Sales / Payments ---
        handlers::sales::create_sale,
        handlers::sales::list_sales,
        handlers::sales::get_sale,
        handlers::sales::cancel_sale,
        handlers::sales::record_payment,
        handlers::sales::list_payments,
        handlers::sales::get_balance,
        handlers::sales::apply_credit,

        // --- Returns ---
        handlers::returns::create_return,
        handlers::returns::list_returns,
        handlers::returns::get_return,
        handlers::returns::approve_return,
        handlers::returns::reject_return,

        // --- Inventory Counts ---
        handlers::inventory_counts::start_count,
        handlers::inventory_counts::list_counts,
        handlers::inventory_counts::get_count,
        handlers::inventory_counts::record_counts,
        handlers::inventory_counts::apply_adjustments,
        handlers::inventory_counts::finalize_count,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::Role,
            models::auth::User,
            models::auth::Actor,
            models::auth::LoginUserPayload,
            models::auth::CreateUserPayload,
            models::auth::AuthResponse,

            // --- Catalog ---
            models::catalog::ProductSize,
            models::catalog::Product,
            models::catalog::CreateProduct,
            models::catalog::UpdatePricePayload,
            models::catalog::ImportRow,
            models::catalog::ImportPayload,
            models::catalog::ImportSummary,
            models::catalog::Client,
            models::catalog::NewClient,
            models::catalog::Supplier,
            models::catalog::NewSupplier,

            // --- Ledger ---
            models::ledger::MovementKind,
            models::ledger::StockMovement,
            models::ledger::MovementEntry,
            models::ledger::AdjustQuantityPayload,
            models::ledger::LedgerAudit,

            // --- Sales ---
            models::sales::PaymentMethod,
            models::sales::SaleStatus,
            models::sales::Sale,
            models::sales::SaleItem,
            models::sales::SaleLine,
            models::sales::DiscountInput,
            models::sales::CreateSale,
            models::sales::SaleSummary,
            models::sales::SaleDetail,
            models::sales::CancelSalePayload,
            models::sales::Payment,
            models::sales::RecordPayment,
            models::sales::PaymentReceipt,
            models::sales::Balance,

            // --- Returns ---
            models::returns::ReturnStatus,
            models::returns::SaleReturn,
            models::returns::ReturnItem,
            models::returns::ReturnLine,
            models::returns::CreateReturn,
            models::returns::RejectReturnPayload,
            models::returns::ReturnDetail,
            models::returns::ReturnApproval,

            // --- Credits ---
            models::credits::CreditStatus,
            models::credits::CreditOrigin,
            models::credits::Credit,
            models::credits::CreditUsage,
            models::credits::GrantCredit,
            models::credits::ApplyCredit,
            models::credits::ClientCredits,
            models::credits::CreditApplication,

            // --- Inventory Counts ---
            models::inventory_count::CountStatus,
            models::inventory_count::InventoryCount,
            models::inventory_count::InventoryCountItem,
            models::inventory_count::CountItemState,
            models::inventory_count::CountEntry,
            models::inventory_count::RecordCountsPayload,
            models::inventory_count::Adjustment,
            models::inventory_count::AdjustmentsPayload,
            models::inventory_count::AppliedAdjustment,
            models::inventory_count::CountDetail,
            models::inventory_count::FinalizedCount,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação"),
        (name = "Users", description = "Cadastro de usuários (admin)"),
        (name = "Products", description = "Catálogo de produtos"),
        (name = "Stock Ledger", description = "Livro-razão de estoque"),
        (name = "Clients", description = "Clientes"),
        (name = "Suppliers", description = "Fornecedores"),
        (name = "Sales", description = "Vendas e cancelamentos"),
        (name = "Payments", description = "Pagamentos e saldo da venda"),
        (name = "Returns", description = "Devoluções"),
        (name = "Credits", description = "Créditos de cliente (vale-troca)"),
        (name = "Inventory Counts", description = "Inventário físico e conciliação")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route_group() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        for path in [
            "/api/auth/login",
            "/api/products/{id}/adjust",
            "/api/sales/{id}/payments",
            "/api/returns/{id}/approve",
            "/api/inventory-counts/current/finalize",
        ] {
            assert!(paths.contains_key(path), "rota ausente: {}", path);
        }
        let schemes = doc.components.expect("components").security_schemes;
        assert!(schemes.contains_key("api_jwt"));
    }
}
