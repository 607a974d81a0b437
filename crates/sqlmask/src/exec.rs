//! Executing statements and resolving their results.
//!
//! The helpers take the statement as an `Outcome`, so a failure from the step
//! that produced it (preparation, a contract violation) flows through the
//! same return shape as an execution failure. The `close_*` variants own a
//! one-off statement and close it after use.

use std::sync::Arc;

use sqlmask_core::{Cx, Error, ExecResult, Outcome, Statement, Value};

use crate::scanner::Scanner;

/// Which value a write operation returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultKind {
    /// Nothing; resolves to 0.
    Nothing,
    /// Id generated by the statement.
    LastInsertId,
    /// Number of rows changed.
    RowsAffected,
}

/// Resolve an execution outcome into the value `kind` asks for.
///
/// A value the driver did not report is an [`Error::Unsupported`], never 0.
pub fn resolve_result(res: Outcome<ExecResult, Error>, kind: ResultKind) -> Outcome<i64, Error> {
    let res = match res {
        Outcome::Ok(r) => r,
        Outcome::Err(e) => return Outcome::Err(e),
        Outcome::Cancelled(r) => return Outcome::Cancelled(r),
        Outcome::Panicked(p) => return Outcome::Panicked(p),
    };
    let value = match kind {
        ResultKind::Nothing => Ok(0),
        ResultKind::LastInsertId => res.last_insert_id(),
        ResultKind::RowsAffected => res.rows_affected().and_then(|n| {
            i64::try_from(n).map_err(|_| Error::Custom(format!("rows affected overflows i64: {n}")))
        }),
    };
    sqlmask_core::outcome(value)
}

/// Execute `stmt` with `args` and resolve the result.
pub async fn exec<S: Statement>(
    cx: &Cx,
    stmt: Outcome<Arc<S>, Error>,
    kind: ResultKind,
    args: &[Value],
) -> Outcome<i64, Error> {
    let stmt = match stmt {
        Outcome::Ok(s) => s,
        Outcome::Err(e) => return Outcome::Err(e),
        Outcome::Cancelled(r) => return Outcome::Cancelled(r),
        Outcome::Panicked(p) => return Outcome::Panicked(p),
    };
    let res = stmt.execute(cx, args).await;
    resolve_result(with_sql(res, stmt.sql()), kind)
}

/// Execute `stmt` and return the number of rows affected.
pub async fn update<S: Statement>(
    cx: &Cx,
    stmt: Outcome<Arc<S>, Error>,
    args: &[Value],
) -> Outcome<i64, Error> {
    exec(cx, stmt, ResultKind::RowsAffected, args).await
}

/// Run `stmt` as a query. Failures are carried by the returned scanner.
///
/// `table` labels the scanner's not-found error.
pub async fn query<S: Statement>(
    cx: &Cx,
    stmt: Outcome<Arc<S>, Error>,
    table: &str,
    args: &[Value],
) -> Scanner<S::Rows> {
    let stmt = match stmt {
        Outcome::Ok(s) => s,
        Outcome::Err(e) => return Scanner::failed(table, e),
        Outcome::Cancelled(r) => return Scanner::new(table, Outcome::Cancelled(r)),
        Outcome::Panicked(p) => return Scanner::new(table, Outcome::Panicked(p)),
    };
    let rows = stmt.query(cx, args).await;
    Scanner::new(table, with_sql(rows, stmt.sql()))
}

/// [`exec`] against a one-off statement, closed afterwards.
pub async fn close_exec<S: Statement>(
    cx: &Cx,
    stmt: Outcome<S, Error>,
    kind: ResultKind,
    args: &[Value],
) -> Outcome<i64, Error> {
    let stmt = match stmt {
        Outcome::Ok(s) => s,
        Outcome::Err(e) => return Outcome::Err(e),
        Outcome::Cancelled(r) => return Outcome::Cancelled(r),
        Outcome::Panicked(p) => return Outcome::Panicked(p),
    };
    let res = stmt.execute(cx, args).await;
    let res = resolve_result(with_sql(res, stmt.sql()), kind);
    close_after(&stmt, res)
}

/// [`update`] against a one-off statement, closed afterwards.
pub async fn close_update<S: Statement>(
    cx: &Cx,
    stmt: Outcome<S, Error>,
    args: &[Value],
) -> Outcome<i64, Error> {
    close_exec(cx, stmt, ResultKind::RowsAffected, args).await
}

/// [`query`] against a one-off statement, closed once the cursor is open.
///
/// Drivers must keep an open cursor usable after its statement is closed.
pub async fn close_query<S: Statement>(
    cx: &Cx,
    stmt: Outcome<S, Error>,
    table: &str,
    args: &[Value],
) -> Scanner<S::Rows> {
    let stmt = match stmt {
        Outcome::Ok(s) => s,
        Outcome::Err(e) => return Scanner::failed(table, e),
        Outcome::Cancelled(r) => return Scanner::new(table, Outcome::Cancelled(r)),
        Outcome::Panicked(p) => return Scanner::new(table, Outcome::Panicked(p)),
    };
    let rows = stmt.query(cx, args).await;
    let rows = with_sql(rows, stmt.sql());
    if let Err(e) = stmt.close() {
        tracing::warn!(sql = stmt.sql(), error = %e, "failed to close one-off statement");
    }
    Scanner::new(table, rows)
}

fn with_sql<T>(res: Outcome<T, Error>, sql: &str) -> Outcome<T, Error> {
    match res {
        Outcome::Err(e) => Outcome::Err(e.with_sql(sql)),
        other => other,
    }
}

fn close_after<S: Statement>(stmt: &S, res: Outcome<i64, Error>) -> Outcome<i64, Error> {
    match (res, stmt.close()) {
        (Outcome::Ok(v), Ok(())) => Outcome::Ok(v),
        (Outcome::Ok(_), Err(e)) => Outcome::Err(e),
        (other, Err(e)) => {
            tracing::warn!(sql = stmt.sql(), error = %e, "failed to close one-off statement");
            other
        }
        (other, Ok(())) => other,
    }
}
