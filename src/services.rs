pub mod auth;
pub mod ledger_service;
pub mod catalog_service;
pub mod sale_service;
pub mod payment_service;
pub mod credit_service;
pub mod return_service;
pub mod count_service;
