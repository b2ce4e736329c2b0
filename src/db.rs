pub mod store;
pub use store::{
    finish, CatalogRepository, CountRepository, CreditRepository, LedgerRepository,
    ReturnRepository, SaleRepository, Store, StoreTx, UserRepository,
};
pub mod postgres;
pub use postgres::PgStore;
pub mod memory;
pub use memory::MemoryStore;
