//! Persistence layer: libSQL-backed storage for threads, voice calls, and classifications.

pub mod classifications;
pub mod handle;
pub mod libsql_backend;
pub mod migrations;
pub mod threads;

pub use handle::DbHandle;
pub use libsql_backend::LibSqlBackend;
