//! The driver boundary.
//!
//! Drivers implement [`Driver`], [`Connection`], [`Statement`] and
//! [`RowCursor`]. Everything async takes a [`Cx`] and returns an
//! [`Outcome`], so cancellation and budgets are handled by the runtime.

use std::future::Future;

use asupersync::{Cx, Outcome};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::row::Row;
use crate::value::Value;

/// Connection pool limits handed through to the driver on open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolLimits {
    /// Maximum idle connections kept open.
    pub max_idle: usize,
    /// Maximum open connections; 0 means unlimited.
    pub max_open: usize,
}

impl Default for PoolLimits {
    fn default() -> Self {
        Self {
            max_idle: 2,
            max_open: 0,
        }
    }
}

/// What a driver reports after executing a write statement.
///
/// Each field is `None` when the driver (or the statement kind) cannot
/// report it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    rows_affected: Option<u64>,
    last_insert_id: Option<i64>,
}

impl ExecResult {
    /// Create a result from what the driver knows.
    pub const fn new(rows_affected: Option<u64>, last_insert_id: Option<i64>) -> Self {
        Self {
            rows_affected,
            last_insert_id,
        }
    }

    /// Number of rows changed by the statement.
    pub fn rows_affected(&self) -> Result<u64> {
        self.rows_affected.ok_or_else(|| {
            Error::Unsupported("driver does not report affected rows for this statement".into())
        })
    }

    /// Id generated by the statement.
    pub fn last_insert_id(&self) -> Result<i64> {
        self.last_insert_id.ok_or_else(|| {
            Error::Unsupported("driver does not report a last insert id for this statement".into())
        })
    }
}

/// Opens connections.
pub trait Driver: Send + Sync {
    /// Connection type produced.
    type Connection: Connection;

    /// Connect to `dsn` with the given pool limits.
    fn open(
        &self,
        cx: &Cx,
        dsn: &str,
        limits: PoolLimits,
    ) -> impl Future<Output = Outcome<Self::Connection, Error>> + Send;
}

/// A database connection (or pool) statements are prepared against.
pub trait Connection: Send + Sync + 'static {
    /// Prepared statement handle.
    type Statement: Statement;

    /// Prepare `sql` for repeated execution.
    fn prepare(
        &self,
        cx: &Cx,
        sql: &str,
    ) -> impl Future<Output = Outcome<Self::Statement, Error>> + Send;

    /// Execute `sql` once without preparing it for reuse.
    fn execute(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<ExecResult, Error>> + Send;
}

/// A prepared statement. Published statements may be used concurrently.
pub trait Statement: Send + Sync + 'static {
    /// Cursor returned by [`Statement::query`].
    type Rows: RowCursor;

    /// SQL text this statement was prepared from.
    fn sql(&self) -> &str;

    /// Execute with positional `params`.
    fn execute(
        &self,
        cx: &Cx,
        params: &[Value],
    ) -> impl Future<Output = Outcome<ExecResult, Error>> + Send;

    /// Run a query with positional `params`, returning a live cursor.
    fn query(
        &self,
        cx: &Cx,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Self::Rows, Error>> + Send;

    /// Release driver-side resources. Further use is an error.
    fn close(&self) -> Result<()>;
}

/// A live result cursor.
pub trait RowCursor: Send {
    /// Advance to the next row; `None` when exhausted.
    fn next(&mut self, cx: &Cx) -> impl Future<Output = Outcome<Option<Row>, Error>> + Send;

    /// Release the cursor.
    fn close(&mut self) -> Result<()>;
}
