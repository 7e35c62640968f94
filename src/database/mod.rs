pub mod adapter;
pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;

pub use adapter::AuthAdapter;
pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryAdapter;
pub use postgres::PgAdapter;
