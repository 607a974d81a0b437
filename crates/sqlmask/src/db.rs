//! The database handle.
//!
//! [`Db`] owns a connection, the table registry and the configuration. Every
//! model operation resolves the model's [`TypeInfo`], takes the cached
//! statement for its masks and runs it:
//!
//! - `insert`, `update`, `delete`, `one`, `limit`, `all` and `count` read
//!   their arguments from a model value;
//! - the `args_*` variants take caller-supplied arguments, checked against
//!   the statement's placeholder count before the driver is touched.

use std::sync::Arc;

use sqlmask_core::{
    Connection, Cx, Driver, Error, FieldMask, Model, Outcome, Result, Row, Store, TypeError, Value,
    field_dest, field_values,
};
use sqlmask_query::{StatementKey, TypeInfo};

use crate::cacher::Cacher;
use crate::config::DbConfig;
use crate::exec::{self, ResultKind};

/// Arguments for an UPDATE: `fields` values then `where_fields` values.
pub fn update_args<M: Model>(
    model: &M,
    fields: FieldMask,
    where_fields: FieldMask,
) -> Result<Vec<Value>> {
    let split = fields.count();
    let mut args = vec![Value::Null; split + where_fields.count()];
    let (set, filter) = args.split_at_mut(split);
    model.read_values(fields, set)?;
    model.read_values(where_fields, filter)?;
    Ok(args)
}

/// Arguments for a ranged SELECT: `where_fields` values, then offset and count.
pub fn limit_args<M: Model>(
    model: &M,
    where_fields: FieldMask,
    start: usize,
    count: usize,
) -> Result<Vec<Value>> {
    let mut args = field_values(where_fields, model)?;
    args.push(Value::from(start));
    args.push(Value::from(count));
    Ok(args)
}

/// Row count requested by the trailing argument of a ranged SELECT.
fn trailing_count(args: &[Value]) -> Result<usize> {
    let last = args.last().cloned().unwrap_or_default();
    last.as_i64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| {
            TypeError {
                expected: "usize",
                actual: last.type_name().to_string(),
                column: Some("count".to_string()),
            }
            .into()
        })
}

/// A database handle.
#[derive(Debug)]
pub struct Db<C: Connection> {
    conn: C,
    cacher: Cacher<C::Statement>,
    config: DbConfig,
}

impl<C: Connection> Db<C> {
    /// Wrap an open connection.
    pub fn new(conn: C, config: DbConfig) -> Self {
        Self {
            conn,
            cacher: Cacher::new(),
            config,
        }
    }

    /// Connect through `driver` with the configured pool limits.
    pub async fn open<D>(cx: &Cx, driver: &D, dsn: &str, config: DbConfig) -> Outcome<Self, Error>
    where
        D: Driver<Connection = C>,
    {
        match driver.open(cx, dsn, config.pool).await {
            Outcome::Ok(conn) => {
                tracing::info!(dialect = ?config.dialect, "database opened");
                Outcome::Ok(Self::new(conn, config))
            }
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Underlying connection.
    pub fn connection(&self) -> &C {
        &self.conn
    }

    /// Configuration in use.
    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Table registry.
    pub fn cacher(&self) -> &Cacher<C::Statement> {
        &self.cacher
    }

    /// Metadata and statement cache for `M`.
    pub fn type_info<M: Model>(&self) -> Result<Arc<TypeInfo<C::Statement>>> {
        self.cacher.resolve::<M>(&self.config)
    }

    /// Close every cached statement and hand back the connection.
    pub fn close(self) -> Result<C> {
        self.cacher.close_all()?;
        tracing::debug!(tables = self.cacher.len(), "database closed");
        Ok(self.conn)
    }

    async fn statement<M: Model>(
        &self,
        cx: &Cx,
        key: StatementKey,
        args: &[Value],
    ) -> Outcome<Arc<C::Statement>, Error> {
        let ti = match self.type_info::<M>() {
            Ok(ti) => ti,
            Err(e) => return Outcome::Err(e),
        };
        if let Err(e) = key.check_args(args.len()) {
            return Outcome::Err(e);
        }
        ti.statement(cx, &self.conn, key).await
    }

    /// Insert the `fields` of `model`; `kind` picks the returned value.
    #[tracing::instrument(level = "debug", skip(self, cx, model), fields(table = M::TABLE_NAME))]
    pub async fn insert<M: Model>(
        &self,
        cx: &Cx,
        model: &M,
        fields: FieldMask,
        kind: ResultKind,
    ) -> Outcome<i64, Error> {
        let args = match field_values(fields, model) {
            Ok(args) => args,
            Err(e) => return Outcome::Err(e),
        };
        self.args_insert::<M>(cx, fields, kind, &args).await
    }

    /// Insert `args` into the `fields` columns of `M`'s table.
    #[tracing::instrument(level = "debug", skip(self, cx, args), fields(table = M::TABLE_NAME))]
    pub async fn args_insert<M: Model>(
        &self,
        cx: &Cx,
        fields: FieldMask,
        kind: ResultKind,
        args: &[Value],
    ) -> Outcome<i64, Error> {
        let stmt = self
            .statement::<M>(cx, StatementKey::insert(fields), args)
            .await;
        exec::exec(cx, stmt, kind, args).await
    }

    /// Update the `fields` of rows matching `model` on `where_fields`.
    ///
    /// Returns the number of rows affected.
    #[tracing::instrument(level = "debug", skip(self, cx, model), fields(table = M::TABLE_NAME))]
    pub async fn update<M: Model>(
        &self,
        cx: &Cx,
        model: &M,
        fields: FieldMask,
        where_fields: FieldMask,
    ) -> Outcome<i64, Error> {
        let args = match update_args(model, fields, where_fields) {
            Ok(args) => args,
            Err(e) => return Outcome::Err(e),
        };
        self.args_update::<M>(cx, fields, where_fields, &args).await
    }

    /// UPDATE with caller-supplied arguments, `fields` values first.
    #[tracing::instrument(level = "debug", skip(self, cx, args), fields(table = M::TABLE_NAME))]
    pub async fn args_update<M: Model>(
        &self,
        cx: &Cx,
        fields: FieldMask,
        where_fields: FieldMask,
        args: &[Value],
    ) -> Outcome<i64, Error> {
        let stmt = self
            .statement::<M>(cx, StatementKey::update(fields, where_fields), args)
            .await;
        exec::update(cx, stmt, args).await
    }

    /// Delete rows matching `model` on `where_fields`.
    #[tracing::instrument(level = "debug", skip(self, cx, model), fields(table = M::TABLE_NAME))]
    pub async fn delete<M: Model>(
        &self,
        cx: &Cx,
        model: &M,
        where_fields: FieldMask,
    ) -> Outcome<i64, Error> {
        let args = match field_values(where_fields, model) {
            Ok(args) => args,
            Err(e) => return Outcome::Err(e),
        };
        self.args_delete::<M>(cx, where_fields, &args).await
    }

    /// DELETE with caller-supplied arguments.
    #[tracing::instrument(level = "debug", skip(self, cx, args), fields(table = M::TABLE_NAME))]
    pub async fn args_delete<M: Model>(
        &self,
        cx: &Cx,
        where_fields: FieldMask,
        args: &[Value],
    ) -> Outcome<i64, Error> {
        let stmt = self
            .statement::<M>(cx, StatementKey::delete(where_fields), args)
            .await;
        exec::update(cx, stmt, args).await
    }

    /// Load the `fields` of `model` from the first row matching it on
    /// `where_fields`.
    ///
    /// No matching row is [`Error::NotFound`].
    #[tracing::instrument(level = "debug", skip(self, cx, model), fields(table = M::TABLE_NAME))]
    pub async fn one<M: Model>(
        &self,
        cx: &Cx,
        model: &mut M,
        fields: FieldMask,
        where_fields: FieldMask,
    ) -> Outcome<(), Error> {
        let args = match field_values(where_fields, &*model) {
            Ok(args) => args,
            Err(e) => return Outcome::Err(e),
        };
        let stmt = self
            .statement::<M>(cx, StatementKey::select_one(fields, where_fields), &args)
            .await;
        let scanner = exec::query(cx, stmt, M::TABLE_NAME, &args).await;
        scanner.one(cx, &mut field_dest(fields, model)).await
    }

    /// Append up to `count` rows starting at offset `start` to `store`.
    ///
    /// Rows match `model` on `where_fields`. Returns the rows appended.
    #[tracing::instrument(level = "debug", skip(self, cx, store, model), fields(table = <St::Item as Model>::TABLE_NAME))]
    #[allow(clippy::too_many_arguments)]
    pub async fn limit<St: Store>(
        &self,
        cx: &Cx,
        store: &mut St,
        model: &St::Item,
        fields: FieldMask,
        where_fields: FieldMask,
        start: usize,
        count: usize,
    ) -> Outcome<usize, Error> {
        let args = match limit_args(model, where_fields, start, count) {
            Ok(args) => args,
            Err(e) => return Outcome::Err(e),
        };
        self.args_limit(cx, store, fields, where_fields, &args).await
    }

    /// Ranged SELECT with caller-supplied arguments.
    ///
    /// The last two arguments are the offset and the count; the count also
    /// caps how many rows are bound.
    #[tracing::instrument(level = "debug", skip(self, cx, store, args), fields(table = <St::Item as Model>::TABLE_NAME))]
    pub async fn args_limit<St: Store>(
        &self,
        cx: &Cx,
        store: &mut St,
        fields: FieldMask,
        where_fields: FieldMask,
        args: &[Value],
    ) -> Outcome<usize, Error> {
        let stmt = self
            .statement::<St::Item>(cx, StatementKey::select_limit(fields, where_fields), args)
            .await;
        let count = match stmt {
            Outcome::Ok(_) => match trailing_count(args) {
                Ok(count) => count,
                Err(e) => return Outcome::Err(e),
            },
            _ => 0,
        };
        let scanner = exec::query(cx, stmt, <St::Item as Model>::TABLE_NAME, args).await;
        scanner.limit(cx, store, fields, count).await
    }

    /// Append every row matching `model` on `where_fields` to `store`.
    #[tracing::instrument(level = "debug", skip(self, cx, store, model), fields(table = <St::Item as Model>::TABLE_NAME))]
    pub async fn all<St: Store>(
        &self,
        cx: &Cx,
        store: &mut St,
        model: &St::Item,
        fields: FieldMask,
        where_fields: FieldMask,
    ) -> Outcome<usize, Error> {
        let args = match field_values(where_fields, model) {
            Ok(args) => args,
            Err(e) => return Outcome::Err(e),
        };
        self.args_all(cx, store, fields, where_fields, &args).await
    }

    /// Unbounded SELECT with caller-supplied arguments.
    #[tracing::instrument(level = "debug", skip(self, cx, store, args), fields(table = <St::Item as Model>::TABLE_NAME))]
    pub async fn args_all<St: Store>(
        &self,
        cx: &Cx,
        store: &mut St,
        fields: FieldMask,
        where_fields: FieldMask,
        args: &[Value],
    ) -> Outcome<usize, Error> {
        let stmt = self
            .statement::<St::Item>(cx, StatementKey::select_all(fields, where_fields), args)
            .await;
        let scanner = exec::query(cx, stmt, <St::Item as Model>::TABLE_NAME, args).await;
        scanner.all(cx, store, fields, self.config.size_hint).await
    }

    /// Count rows matching `model` on `where_fields`.
    #[tracing::instrument(level = "debug", skip(self, cx, model), fields(table = M::TABLE_NAME))]
    pub async fn count<M: Model>(
        &self,
        cx: &Cx,
        model: &M,
        where_fields: FieldMask,
    ) -> Outcome<i64, Error> {
        let args = match field_values(where_fields, model) {
            Ok(args) => args,
            Err(e) => return Outcome::Err(e),
        };
        self.args_count::<M>(cx, where_fields, &args).await
    }

    /// COUNT with caller-supplied arguments.
    #[tracing::instrument(level = "debug", skip(self, cx, args), fields(table = M::TABLE_NAME))]
    pub async fn args_count<M: Model>(
        &self,
        cx: &Cx,
        where_fields: FieldMask,
        args: &[Value],
    ) -> Outcome<i64, Error> {
        let stmt = self
            .statement::<M>(cx, StatementKey::count(where_fields), args)
            .await;
        let scanner = exec::query(cx, stmt, M::TABLE_NAME, args).await;
        let mut count = 0_i64;
        let mut dest = |row: Row| -> Result<()> {
            count = row.get_as(0)?;
            Ok(())
        };
        match scanner.one(cx, &mut dest).await {
            Outcome::Ok(()) => Outcome::Ok(count),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Run ad-hoc `sql` once, unprepared, and resolve its result.
    #[tracing::instrument(level = "debug", skip(self, cx, args))]
    pub async fn exec_update(
        &self,
        cx: &Cx,
        sql: &str,
        kind: ResultKind,
        args: &[Value],
    ) -> Outcome<i64, Error> {
        let res = match self.conn.execute(cx, sql, args).await {
            Outcome::Err(e) => Outcome::Err(e.with_sql(sql)),
            other => other,
        };
        exec::resolve_result(res, kind)
    }

    /// Prepare ad-hoc `sql` as a one-off statement for the `close_*` helpers.
    pub async fn prepare(&self, cx: &Cx, sql: &str) -> Outcome<C::Statement, Error> {
        match self.conn.prepare(cx, sql).await {
            Outcome::Err(e) => Outcome::Err(e.with_sql(sql)),
            other => other,
        }
    }
}
