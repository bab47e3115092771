//! `DbHandle`: run statements on a bare connection or inside an open transaction.
//!
//! Repository functions take `&dyn DbHandle` and never begin transactions of
//! their own. The caller decides whether a write joins an ambient transaction
//! (pass the `Transaction`) or commits on its own (pass the `Connection`).

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Rows, Transaction, Value};

/// Something that can execute and query SQL.
#[async_trait]
pub trait DbHandle: Send + Sync {
    /// Execute a statement, returning the number of affected rows.
    async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<u64, libsql::Error>;

    /// Run a query and return its rows.
    async fn query(&self, sql: &str, params: Vec<Value>) -> Result<Rows, libsql::Error>;
}

#[async_trait]
impl DbHandle for Connection {
    async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<u64, libsql::Error> {
        Connection::execute(self, sql, params).await
    }

    async fn query(&self, sql: &str, params: Vec<Value>) -> Result<Rows, libsql::Error> {
        Connection::query(self, sql, params).await
    }
}

#[async_trait]
impl DbHandle for Transaction {
    async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<u64, libsql::Error> {
        // `Transaction` derefs to the connection it was opened on.
        Connection::execute(self, sql, params).await
    }

    async fn query(&self, sql: &str, params: Vec<Value>) -> Result<Rows, libsql::Error> {
        Connection::query(self, sql, params).await
    }
}

/// `Some` → text, `None` → NULL.
pub(crate) fn opt_text(s: Option<String>) -> Value {
    match s {
        Some(s) => Value::Text(s),
        None => Value::Null,
    }
}

pub(crate) fn text(s: impl Into<String>) -> Value {
    Value::Text(s.into())
}

/// Fixed-width UTC timestamp, so text ordering matches time ordering.
pub(crate) fn timestamp(dt: DateTime<Utc>) -> Value {
    Value::Text(dt.to_rfc3339_opts(SecondsFormat::Micros, true))
}
