//! Persistence layer — SQLite-backed storage for customers, catalog, cakes,
//! and orders.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::Database;
