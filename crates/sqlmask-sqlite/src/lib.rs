//! SQLite driver for sqlmask, backed by rusqlite.
//!
//! A [`SqliteConnection`] wraps one `rusqlite::Connection` behind a mutex.
//! Preparing a statement validates its SQL and seeds rusqlite's statement
//! cache; every execution re-resolves the handle through that cache, so a
//! [`SqliteStatement`] is cheap, `Send` and `Sync`. Query results are
//! materialized into a [`SqliteRows`] cursor before the lock is released.
//!
//! Pool limits are accepted on open and logged; a single SQLite connection
//! has no pool to size.
#![allow(clippy::manual_async_fn)]

use std::collections::VecDeque;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::ErrorCode;
use rusqlite::types::Value as SqlValue;
use sqlmask_core::{
    Connection, ConnectionError, ConnectionErrorKind, Cx, Driver, Error, ExecResult, Outcome,
    PoolLimits, QueryError, QueryErrorKind, Result, Row, RowCursor, Statement, Value, outcome,
};

/// DSN that opens a private in-memory database.
pub const MEMORY_DSN: &str = ":memory:";

/// Opens [`SqliteConnection`]s. The DSN is a file path or [`MEMORY_DSN`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDriver;

impl Driver for SqliteDriver {
    type Connection = SqliteConnection;

    fn open(
        &self,
        _cx: &Cx,
        dsn: &str,
        limits: PoolLimits,
    ) -> impl Future<Output = Outcome<SqliteConnection, Error>> + Send {
        let conn = if dsn == MEMORY_DSN {
            SqliteConnection::open_memory()
        } else {
            SqliteConnection::open(dsn)
        };
        if conn.is_ok() {
            tracing::debug!(
                dsn,
                max_idle = limits.max_idle,
                max_open = limits.max_open,
                "opened sqlite database"
            );
        }
        async move { outcome(conn) }
    }
}

/// A SQLite database connection.
#[derive(Debug, Clone)]
pub struct SqliteConnection {
    inner: Arc<Mutex<rusqlite::Connection>>,
}

impl SqliteConnection {
    /// Open a private in-memory database.
    pub fn open_memory() -> Result<Self> {
        rusqlite::Connection::open_in_memory()
            .map(Self::from_rusqlite)
            .map_err(|e| connect_error(MEMORY_DSN, e))
    }

    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        rusqlite::Connection::open(path)
            .map(Self::from_rusqlite)
            .map_err(|e| connect_error(&path.display().to_string(), e))
    }

    /// Wrap an existing rusqlite connection.
    pub fn from_rusqlite(conn: rusqlite::Connection) -> Self {
        Self {
            inner: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run one or more `;`-separated statements without parameters.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let conn = lock(&self.inner)?;
        conn.execute_batch(sql)
            .map_err(|e| query_error(QueryErrorKind::Database, sql, e))
    }
}

impl Connection for SqliteConnection {
    type Statement = SqliteStatement;

    fn prepare(
        &self,
        _cx: &Cx,
        sql: &str,
    ) -> impl Future<Output = Outcome<SqliteStatement, Error>> + Send {
        let res = lock(&self.inner).and_then(|conn| {
            conn.prepare_cached(sql)
                .map(|_| ())
                .map_err(|e| query_error(QueryErrorKind::Prepare, sql, e))
        });
        let res = res.map(|()| {
            tracing::trace!(sql, "prepared sqlite statement");
            SqliteStatement {
                sql: sql.to_string(),
                conn: Arc::clone(&self.inner),
                returns_id: is_insert(sql),
                closed: AtomicBool::new(false),
            }
        });
        async move { outcome(res) }
    }

    fn execute(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<ExecResult, Error>> + Send {
        let res = lock(&self.inner).and_then(|conn| run_execute(&conn, sql, params, is_insert(sql)));
        async move { outcome(res) }
    }
}

/// A prepared SQLite statement.
#[derive(Debug)]
pub struct SqliteStatement {
    sql: String,
    conn: Arc<Mutex<rusqlite::Connection>>,
    returns_id: bool,
    closed: AtomicBool,
}

impl SqliteStatement {
    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Query(QueryError {
                kind: QueryErrorKind::Closed,
                message: "statement is closed".to_string(),
                sql: Some(self.sql.clone()),
                source: None,
            }));
        }
        Ok(())
    }

    fn run_query(&self, params: &[Value]) -> Result<SqliteRows> {
        self.check_open()?;
        let conn = lock(&self.conn)?;
        let mut stmt = conn
            .prepare_cached(&self.sql)
            .map_err(|e| query_error(QueryErrorKind::Prepare, &self.sql, e))?;
        let columns: Arc<[String]> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        let width = columns.len();

        let mut rows = stmt
            .query(rusqlite::params_from_iter(params.iter().map(to_sql)))
            .map_err(|e| query_error(QueryErrorKind::Database, &self.sql, e))?;
        let mut out = VecDeque::new();
        while let Some(row) = rows
            .next()
            .map_err(|e| query_error(QueryErrorKind::Database, &self.sql, e))?
        {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                let v: SqlValue = row
                    .get(i)
                    .map_err(|e| query_error(QueryErrorKind::Database, &self.sql, e))?;
                values.push(from_sql(v));
            }
            out.push_back(Row::new(Arc::clone(&columns), values));
        }
        Ok(SqliteRows {
            rows: out,
            closed: false,
        })
    }
}

impl Statement for SqliteStatement {
    type Rows = SqliteRows;

    fn sql(&self) -> &str {
        &self.sql
    }

    fn execute(
        &self,
        _cx: &Cx,
        params: &[Value],
    ) -> impl Future<Output = Outcome<ExecResult, Error>> + Send {
        let res = self
            .check_open()
            .and_then(|()| lock(&self.conn))
            .and_then(|conn| run_execute(&conn, &self.sql, params, self.returns_id));
        async move { outcome(res) }
    }

    fn query(
        &self,
        _cx: &Cx,
        params: &[Value],
    ) -> impl Future<Output = Outcome<SqliteRows, Error>> + Send {
        let res = self.run_query(params);
        async move { outcome(res) }
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

/// Materialized query results.
#[derive(Debug)]
pub struct SqliteRows {
    rows: VecDeque<Row>,
    closed: bool,
}

impl RowCursor for SqliteRows {
    fn next(&mut self, _cx: &Cx) -> impl Future<Output = Outcome<Option<Row>, Error>> + Send {
        let res = if self.closed {
            Err(Error::query(QueryErrorKind::Closed, "cursor is closed"))
        } else {
            Ok(self.rows.pop_front())
        };
        async move { outcome(res) }
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.rows.clear();
        Ok(())
    }
}

fn lock(conn: &Mutex<rusqlite::Connection>) -> Result<MutexGuard<'_, rusqlite::Connection>> {
    conn.lock().map_err(|_| {
        Error::connection(
            ConnectionErrorKind::Disconnected,
            "sqlite connection lock poisoned",
        )
    })
}

fn run_execute(
    conn: &rusqlite::Connection,
    sql: &str,
    params: &[Value],
    returns_id: bool,
) -> Result<ExecResult> {
    let mut stmt = conn
        .prepare_cached(sql)
        .map_err(|e| query_error(QueryErrorKind::Prepare, sql, e))?;
    let changed = stmt
        .execute(rusqlite::params_from_iter(params.iter().map(to_sql)))
        .map_err(|e| query_error(QueryErrorKind::Database, sql, e))?;
    let last_id = returns_id.then(|| conn.last_insert_rowid());
    Ok(ExecResult::new(Some(changed as u64), last_id))
}

fn is_insert(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("INSERT"))
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Int(v) => SqlValue::Integer(i64::from(*v)),
        Value::BigInt(v) => SqlValue::Integer(*v),
        Value::Double(v) => SqlValue::Real(*v),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Bytes(b) => SqlValue::Blob(b.clone()),
        Value::Json(j) => SqlValue::Text(j.to_string()),
    }
}

fn from_sql(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(v) => Value::BigInt(v),
        SqlValue::Real(v) => Value::Double(v),
        SqlValue::Text(s) => Value::Text(s),
        SqlValue::Blob(b) => Value::Bytes(b),
    }
}

fn connect_error(dsn: &str, e: rusqlite::Error) -> Error {
    Error::Connection(ConnectionError {
        kind: ConnectionErrorKind::Connect,
        message: format!("failed to open sqlite database {dsn}: {e}"),
        source: Some(Box::new(e)),
    })
}

fn query_error(kind: QueryErrorKind, sql: &str, e: rusqlite::Error) -> Error {
    let kind = match e.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => QueryErrorKind::Constraint,
        _ => kind,
    };
    Error::Query(QueryError {
        kind,
        message: e.to_string(),
        sql: Some(sql.to_string()),
        source: Some(Box::new(e)),
    })
}
