//! In-memory fake driver that records everything it is asked to do.
#![allow(dead_code, clippy::manual_async_fn)]

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};

use asupersync::{Cx, Outcome};
use sqlmask::{
    Connection, Driver, Error, ExecResult, FieldInfo, FieldMask, Model, PoolLimits, QueryErrorKind,
    Result, Row, RowCursor, Statement, Value,
};

pub fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> std::result::Result<T, String> {
    match outcome {
        Outcome::Ok(v) => Ok(v),
        Outcome::Err(e) => Err(format!("unexpected error: {e}")),
        Outcome::Cancelled(r) => Err(format!("cancelled: {r:?}")),
        Outcome::Panicked(p) => Err(format!("panicked: {p:?}")),
    }
}

pub fn expect_err<T: std::fmt::Debug>(outcome: Outcome<T, Error>) -> Error {
    match outcome {
        Outcome::Err(e) => e,
        Outcome::Ok(v) => panic!("expected an error, got {v:?}"),
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub age: i32,
}

impl User {
    pub const ID: FieldMask = FieldMask::bit(0);
    pub const NAME: FieldMask = FieldMask::bit(1);
    pub const AGE: FieldMask = FieldMask::bit(2);
}

impl Model for User {
    const TABLE_NAME: &'static str = "users";
    const FIELDS: &'static [FieldInfo] = &[
        FieldInfo::new("ID").primary_key(),
        FieldInfo::new("Name"),
        FieldInfo::new("Age"),
    ];

    fn field_value(&self, index: usize) -> Option<Value> {
        match index {
            0 => Some(self.id.into()),
            1 => Some(self.name.clone().into()),
            2 => Some(self.age.into()),
            _ => None,
        }
    }

    fn set_field(&mut self, index: usize, value: Value) -> Result<()> {
        match index {
            0 => self.id = value.decode(Some("id"))?,
            1 => self.name = value.decode(Some("name"))?,
            2 => self.age = value.decode(Some("age"))?,
            _ => return Err(Self::unknown_field(index)),
        }
        Ok(())
    }
}

/// Shared state between a fake connection, its statements and cursors.
#[derive(Default)]
pub struct Shared {
    pub prepared: Mutex<Vec<String>>,
    pub executed: Mutex<Vec<(String, Vec<Value>)>>,
    pub queried: Mutex<Vec<(String, Vec<Value>)>>,
    pub statement_closes: AtomicUsize,
    pub cursors_opened: AtomicUsize,
    pub cursor_closes: AtomicUsize,
    pub fail_prepares: AtomicUsize,
    pub rows: Mutex<Vec<Vec<Value>>>,
    pub exec_result: Mutex<ExecResult>,
    pub fail_cursor_at: Mutex<Option<usize>>,
    pub fail_cursor_close: Mutex<bool>,
    pub prepare_barrier: Mutex<Option<Arc<Barrier>>>,
    pub opened_with: Mutex<Option<(String, PoolLimits)>>,
}

impl Shared {
    pub fn prepared(&self) -> Vec<String> {
        self.prepared.lock().unwrap().clone()
    }

    pub fn executed(&self) -> Vec<(String, Vec<Value>)> {
        self.executed.lock().unwrap().clone()
    }

    pub fn queried(&self) -> Vec<(String, Vec<Value>)> {
        self.queried.lock().unwrap().clone()
    }

    pub fn statement_closes(&self) -> usize {
        self.statement_closes.load(Ordering::SeqCst)
    }

    pub fn cursors_opened(&self) -> usize {
        self.cursors_opened.load(Ordering::SeqCst)
    }

    pub fn cursor_closes(&self) -> usize {
        self.cursor_closes.load(Ordering::SeqCst)
    }
}

pub struct FakeConnection {
    pub shared: Arc<Shared>,
}

impl FakeConnection {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
        }
    }

    pub fn with_rows(self, rows: Vec<Vec<Value>>) -> Self {
        *self.shared.rows.lock().unwrap() = rows;
        self
    }

    pub fn with_exec_result(self, res: ExecResult) -> Self {
        *self.shared.exec_result.lock().unwrap() = res;
        self
    }

    pub fn failing_prepares(self, n: usize) -> Self {
        self.shared.fail_prepares.store(n, Ordering::SeqCst);
        self
    }

    pub fn failing_cursor_at(self, row: usize) -> Self {
        *self.shared.fail_cursor_at.lock().unwrap() = Some(row);
        self
    }

    pub fn failing_cursor_close(self) -> Self {
        *self.shared.fail_cursor_close.lock().unwrap() = true;
        self
    }

    pub fn with_prepare_barrier(self, barrier: Arc<Barrier>) -> Self {
        *self.shared.prepare_barrier.lock().unwrap() = Some(barrier);
        self
    }
}

pub struct FakeStatement {
    sql: String,
    shared: Arc<Shared>,
}

pub struct FakeRows {
    rows: VecDeque<Vec<Value>>,
    yielded: usize,
    fail_at: Option<usize>,
    shared: Arc<Shared>,
}

impl RowCursor for FakeRows {
    fn next(&mut self, _cx: &Cx) -> impl Future<Output = Outcome<Option<Row>, Error>> + Send {
        let out = if self.fail_at == Some(self.yielded) {
            Outcome::Err(Error::query(QueryErrorKind::Database, "cursor failed"))
        } else {
            self.yielded += 1;
            Outcome::Ok(self.rows.pop_front().map(Row::from_values))
        };
        async move { out }
    }

    fn close(&mut self) -> Result<()> {
        self.shared.cursor_closes.fetch_add(1, Ordering::SeqCst);
        if *self.shared.fail_cursor_close.lock().unwrap() {
            return Err(Error::query(QueryErrorKind::Database, "close failed"));
        }
        Ok(())
    }
}

impl Statement for FakeStatement {
    type Rows = FakeRows;

    fn sql(&self) -> &str {
        &self.sql
    }

    fn execute(
        &self,
        _cx: &Cx,
        params: &[Value],
    ) -> impl Future<Output = Outcome<ExecResult, Error>> + Send {
        self.shared
            .executed
            .lock()
            .unwrap()
            .push((self.sql.clone(), params.to_vec()));
        let res = *self.shared.exec_result.lock().unwrap();
        async move { Outcome::Ok(res) }
    }

    fn query(
        &self,
        _cx: &Cx,
        params: &[Value],
    ) -> impl Future<Output = Outcome<FakeRows, Error>> + Send {
        self.shared
            .queried
            .lock()
            .unwrap()
            .push((self.sql.clone(), params.to_vec()));
        self.shared.cursors_opened.fetch_add(1, Ordering::SeqCst);
        let rows = FakeRows {
            rows: self.shared.rows.lock().unwrap().clone().into(),
            yielded: 0,
            fail_at: *self.shared.fail_cursor_at.lock().unwrap(),
            shared: Arc::clone(&self.shared),
        };
        async move { Outcome::Ok(rows) }
    }

    fn close(&self) -> Result<()> {
        self.shared.statement_closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Connection for FakeConnection {
    type Statement = FakeStatement;

    fn prepare(
        &self,
        _cx: &Cx,
        sql: &str,
    ) -> impl Future<Output = Outcome<FakeStatement, Error>> + Send {
        let shared = Arc::clone(&self.shared);
        let sql = sql.to_string();
        async move {
            let barrier = shared.prepare_barrier.lock().unwrap().clone();
            if let Some(barrier) = barrier {
                barrier.wait();
            }
            shared.prepared.lock().unwrap().push(sql.clone());
            let failing = shared
                .fail_prepares
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Outcome::Err(Error::query(QueryErrorKind::Prepare, "server gone away"));
            }
            Outcome::Ok(FakeStatement { sql, shared })
        }
    }

    fn execute(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<ExecResult, Error>> + Send {
        self.shared
            .executed
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
        let res = *self.shared.exec_result.lock().unwrap();
        async move { Outcome::Ok(res) }
    }
}

pub struct FakeDriver;

impl Driver for FakeDriver {
    type Connection = FakeConnection;

    fn open(
        &self,
        _cx: &Cx,
        dsn: &str,
        limits: PoolLimits,
    ) -> impl Future<Output = Outcome<FakeConnection, Error>> + Send {
        let conn = FakeConnection::new();
        *conn.shared.opened_with.lock().unwrap() = Some((dsn.to_string(), limits));
        async move { Outcome::Ok(conn) }
    }
}
