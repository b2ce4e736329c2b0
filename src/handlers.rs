pub mod auth;
pub mod clients;
pub mod inventory_counts;
pub mod products;
pub mod returns;
pub mod sales;
