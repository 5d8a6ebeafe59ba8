//! One connection plus at most one active transaction.
//!
//! ```ignore
//! let mut session = Session::new(client);
//! session.begin().await?;
//! session.exec("UPDATE accounts SET balance = balance - $1 WHERE id = $2", &[&100_i64, &1_i64]).await?;
//! let n = QueryBuilder::<Account>::new().count(&session).await?;
//! session.commit().await?;
//! session.close().await?;
//! ```
//!
//! Transactions are driven with `BEGIN` / `COMMIT` / `ROLLBACK` on the wrapped
//! connection, so every call is dispatched the same way whether or not a
//! transaction is active. `Session` implements [`GenericClient`] and can be
//! passed to builder execution methods.

use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::row::{FromRow, RowExt};
use std::fmt;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, ToSql};

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionIsolation {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl TransactionIsolation {
    pub fn as_sql(self) -> &'static str {
        match self {
            TransactionIsolation::ReadUncommitted => "READ UNCOMMITTED",
            TransactionIsolation::ReadCommitted => "READ COMMITTED",
            TransactionIsolation::RepeatableRead => "REPEATABLE READ",
            TransactionIsolation::Serializable => "SERIALIZABLE",
        }
    }
}

/// Options applied by [`Session::begin_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionOptions {
    pub isolation: Option<TransactionIsolation>,
    pub read_only: bool,
    pub deferrable: bool,
}

impl TransactionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn isolation_level(mut self, isolation: TransactionIsolation) -> Self {
        self.isolation = Some(isolation);
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn deferrable(mut self, deferrable: bool) -> Self {
        self.deferrable = deferrable;
        self
    }

    /// The `BEGIN` statement for these options.
    pub fn begin_sql(&self) -> String {
        let mut sql = String::from("BEGIN");
        if let Some(isolation) = self.isolation {
            sql.push_str(" ISOLATION LEVEL ");
            sql.push_str(isolation.as_sql());
        }
        if self.read_only {
            sql.push_str(" READ ONLY");
        }
        if self.deferrable {
            sql.push_str(" DEFERRABLE");
        }
        sql
    }
}

/// A connection with explicit transaction state.
pub struct Session<C> {
    conn: Option<C>,
    in_transaction: bool,
}

impl<C> fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("closed", &self.conn.is_none())
            .field("in_transaction", &self.in_transaction)
            .finish()
    }
}

impl<C> Drop for Session<C> {
    fn drop(&mut self) {
        if self.conn.is_some() && self.in_transaction {
            tracing::warn!(
                "session dropped with an active transaction; the connection is released without COMMIT"
            );
        }
    }
}

impl<C: GenericClient> Session<C> {
    pub fn new(conn: C) -> Self {
        Self {
            conn: Some(conn),
            in_transaction: false,
        }
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    pub fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    fn conn(&self) -> OrmResult<&C> {
        self.conn
            .as_ref()
            .ok_or_else(|| OrmError::Connection("session is closed".to_string()))
    }

    fn log_dispatch(&self, sql: &str, params: usize) {
        tracing::debug!(
            target: "dbx.sql",
            in_transaction = self.in_transaction,
            params,
            sql,
            "dispatch"
        );
    }

    // ==================== Transaction state ====================

    /// Start a transaction with default options.
    pub async fn begin(&mut self) -> OrmResult<()> {
        self.begin_with(TransactionOptions::default()).await
    }

    /// Start a transaction; fails if one is already active.
    pub async fn begin_with(&mut self, options: TransactionOptions) -> OrmResult<()> {
        let conn = self.conn()?;
        if self.in_transaction {
            return Err(OrmError::transaction("transaction already active"));
        }
        conn.execute(&options.begin_sql(), &[]).await?;
        self.in_transaction = true;
        tracing::debug!(?options, "transaction started");
        Ok(())
    }

    /// Commit the active transaction.
    ///
    /// If `COMMIT` itself fails the transaction stays active, so the caller
    /// can still roll back.
    pub async fn commit(&mut self) -> OrmResult<()> {
        let conn = self.conn()?;
        if !self.in_transaction {
            return Err(OrmError::transaction("no active transaction"));
        }
        conn.execute("COMMIT", &[]).await?;
        self.in_transaction = false;
        tracing::debug!("transaction committed");
        Ok(())
    }

    /// Roll back the active transaction.
    pub async fn rollback(&mut self) -> OrmResult<()> {
        let conn = self.conn()?;
        if !self.in_transaction {
            return Err(OrmError::transaction("no active transaction"));
        }
        conn.execute("ROLLBACK", &[]).await?;
        self.in_transaction = false;
        tracing::debug!("transaction rolled back");
        Ok(())
    }

    /// Roll back any active transaction and release the connection.
    ///
    /// Closing an already closed session does nothing.
    pub async fn close(&mut self) -> OrmResult<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        if self.in_transaction {
            self.in_transaction = false;
            if let Err(err) = conn.execute("ROLLBACK", &[]).await {
                tracing::warn!(error = %err, "rollback on close failed");
            }
        }
        tracing::debug!("session closed");
        Ok(())
    }

    // ==================== Primitives ====================

    /// Run a query and map its first row.
    pub async fn fetch_one<T: FromRow>(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> OrmResult<T> {
        let row = GenericClient::query_one(self, sql, params).await?;
        T::from_row(&row)
    }

    /// Run a query and map every row.
    pub async fn fetch_all<T: FromRow>(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> OrmResult<Vec<T>> {
        let rows = GenericClient::query(self, sql, params).await?;
        rows.iter().map(T::from_row).collect()
    }

    /// Run a query and return its rows unmapped.
    pub async fn query_raw(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> OrmResult<Vec<Row>> {
        GenericClient::query(self, sql, params).await
    }

    /// Run a query expected to return one row; errors surface when the row is read.
    pub async fn query_row(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DeferredRow {
        DeferredRow {
            result: GenericClient::query_opt(self, sql, params).await,
        }
    }

    /// Execute a statement and return the number of affected rows.
    pub async fn exec(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<u64> {
        GenericClient::execute(self, sql, params).await
    }
}

impl<C: GenericClient> GenericClient for Session<C> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<Vec<Row>> {
        let conn = self.conn()?;
        self.log_dispatch(sql, params.len());
        conn.query(sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<u64> {
        let conn = self.conn()?;
        self.log_dispatch(sql, params.len());
        conn.execute(sql, params).await
    }
}

/// Result of [`Session::query_row`].
#[derive(Debug)]
#[must_use]
pub struct DeferredRow {
    result: OrmResult<Option<Row>>,
}

impl DeferredRow {
    /// The row, or the error the query produced (`NotFound` for no rows).
    pub fn into_result(self) -> OrmResult<Row> {
        self.result?
            .ok_or_else(|| OrmError::not_found("Expected one row, got none"))
    }

    /// Map the row.
    pub fn scan<T: FromRow>(self) -> OrmResult<T> {
        T::from_row(&self.into_result()?)
    }

    /// Read one column of the row.
    pub fn get<T>(self, column: &str) -> OrmResult<T>
    where
        T: for<'a> FromSql<'a>,
    {
        self.into_result()?.try_get_column(column)
    }
}
