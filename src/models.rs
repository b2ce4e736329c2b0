pub mod pagination;
pub mod auth;
pub mod catalog;
pub mod ledger;
pub mod sales;
pub mod returns;
pub mod credits;
pub mod inventory_count;
