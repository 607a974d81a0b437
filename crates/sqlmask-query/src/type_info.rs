//! Per-table column metadata and prepared statement cache.
//!
//! A [`TypeInfo`] exists once per table. It owns the canonical column names,
//! fixed at construction, and a cache holding one prepared statement per
//! [`StatementKey`] ever requested. The cache is add-only: hits take a read
//! lock, and the write lock is taken only to publish a freshly prepared
//! statement. Preparation runs without any lock held, so two callers missing
//! on the same key may both prepare; the first to publish wins and the other
//! statement is closed.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use asupersync::{Cx, Outcome};
use sqlmask_core::{
    Connection, Error, FieldMask, MaskError, Model, Result, Statement, validate_identifier,
};

use crate::builder::{SqlBuilder, StatementKey};
use crate::dialect::Dialect;

/// Column metadata and statement cache for one table.
pub struct TypeInfo<S: Statement> {
    table: String,
    columns: Vec<String>,
    dialect: Dialect,
    statements: RwLock<HashMap<StatementKey, Arc<S>>>,
}

impl<S: Statement> fmt::Debug for TypeInfo<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("table", &self.table)
            .field("columns", &self.columns)
            .field("dialect", &self.dialect)
            .field("cached", &self.cached_len())
            .finish_non_exhaustive()
    }
}

impl<S: Statement> TypeInfo<S> {
    /// Create the metadata for `table` with columns in canonical order.
    ///
    /// Every name must be a plain SQL identifier and at most
    /// [`FieldMask::CAPACITY`] columns are addressable.
    pub fn new(table: impl Into<String>, columns: Vec<String>, dialect: Dialect) -> Result<Self> {
        let table = table.into();
        validate_identifier(&table)?;
        for col in &columns {
            validate_identifier(col)?;
        }
        if columns.len() > FieldMask::CAPACITY {
            return Err(MaskError::OutOfRange {
                table,
                bit: FieldMask::CAPACITY as u32,
                field_count: columns.len(),
            }
            .into());
        }
        Ok(Self {
            table,
            columns,
            dialect,
            statements: RwLock::new(HashMap::new()),
        })
    }

    /// Metadata for `M` using its own table and column names.
    pub fn for_model<M: Model>(dialect: Dialect) -> Result<Self> {
        let columns = M::FIELDS
            .iter()
            .map(|f| f.column_name().into_owned())
            .collect();
        Self::new(M::TABLE_NAME, columns, dialect)
    }

    /// Table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Column names in canonical order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Column selected by bit `index`.
    pub fn column(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(String::as_str)
    }

    /// Dialect statements are built for.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Build the SQL text for `key` without touching the cache.
    pub fn sql(&self, key: &StatementKey) -> Result<String> {
        SqlBuilder::new(&self.table, &self.columns, self.dialect).build(key)
    }

    /// The cached statement for `key`, if one was published.
    pub fn cached(&self, key: &StatementKey) -> Option<Arc<S>> {
        self.statements
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Number of cached statements.
    pub fn cached_len(&self) -> usize {
        self.statements
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Resolve the prepared statement for `key`, preparing it on first use.
    ///
    /// Contract violations and preparation failures are returned and leave
    /// the cache untouched, so a later call retries.
    #[tracing::instrument(level = "debug", skip(self, cx, conn), fields(table = %self.table))]
    pub async fn statement<C>(&self, cx: &Cx, conn: &C, key: StatementKey) -> Outcome<Arc<S>, Error>
    where
        C: Connection<Statement = S>,
    {
        if let Some(stmt) = self.cached(&key) {
            tracing::trace!("statement cache hit");
            return Outcome::Ok(stmt);
        }

        let sql = match self.sql(&key) {
            Ok(sql) => sql,
            Err(e) => return Outcome::Err(e),
        };

        tracing::debug!(sql = %sql, "statement cache miss, preparing");

        match conn.prepare(cx, &sql).await {
            Outcome::Ok(stmt) => Outcome::Ok(self.publish(key, stmt)),
            Outcome::Err(e) => Outcome::Err(e.with_sql(&sql)),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    fn publish(&self, key: StatementKey, stmt: S) -> Arc<S> {
        let mut statements = self
            .statements
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let (winner, loser) = match statements.entry(key) {
            Entry::Occupied(existing) => (Arc::clone(existing.get()), Some(stmt)),
            Entry::Vacant(slot) => (Arc::clone(slot.insert(Arc::new(stmt))), None),
        };
        drop(statements);

        if let Some(stmt) = loser {
            tracing::debug!(
                table = %self.table,
                sql = stmt.sql(),
                "discarding statement prepared concurrently"
            );
            if let Err(e) = stmt.close() {
                tracing::warn!(table = %self.table, error = %e, "failed to close discarded statement");
            }
        }
        winner
    }

    /// INSERT of `fields`.
    pub async fn insert_stmt<C>(&self, cx: &Cx, conn: &C, fields: FieldMask) -> Outcome<Arc<S>, Error>
    where
        C: Connection<Statement = S>,
    {
        self.statement(cx, conn, StatementKey::insert(fields)).await
    }

    /// UPDATE of `fields` filtered by `where_fields`.
    pub async fn update_stmt<C>(
        &self,
        cx: &Cx,
        conn: &C,
        fields: FieldMask,
        where_fields: FieldMask,
    ) -> Outcome<Arc<S>, Error>
    where
        C: Connection<Statement = S>,
    {
        self.statement(cx, conn, StatementKey::update(fields, where_fields))
            .await
    }

    /// DELETE filtered by `where_fields`.
    pub async fn delete_stmt<C>(
        &self,
        cx: &Cx,
        conn: &C,
        where_fields: FieldMask,
    ) -> Outcome<Arc<S>, Error>
    where
        C: Connection<Statement = S>,
    {
        self.statement(cx, conn, StatementKey::delete(where_fields))
            .await
    }

    /// Single-row SELECT of `fields` filtered by `where_fields`.
    pub async fn select_one_stmt<C>(
        &self,
        cx: &Cx,
        conn: &C,
        fields: FieldMask,
        where_fields: FieldMask,
    ) -> Outcome<Arc<S>, Error>
    where
        C: Connection<Statement = S>,
    {
        self.statement(cx, conn, StatementKey::select_one(fields, where_fields))
            .await
    }

    /// Ranged SELECT; the last two arguments are offset and count.
    pub async fn select_limit_stmt<C>(
        &self,
        cx: &Cx,
        conn: &C,
        fields: FieldMask,
        where_fields: FieldMask,
    ) -> Outcome<Arc<S>, Error>
    where
        C: Connection<Statement = S>,
    {
        self.statement(cx, conn, StatementKey::select_limit(fields, where_fields))
            .await
    }

    /// Unbounded SELECT of `fields` filtered by `where_fields`.
    pub async fn select_all_stmt<C>(
        &self,
        cx: &Cx,
        conn: &C,
        fields: FieldMask,
        where_fields: FieldMask,
    ) -> Outcome<Arc<S>, Error>
    where
        C: Connection<Statement = S>,
    {
        self.statement(cx, conn, StatementKey::select_all(fields, where_fields))
            .await
    }

    /// COUNT filtered by `where_fields`.
    pub async fn count_stmt<C>(
        &self,
        cx: &Cx,
        conn: &C,
        where_fields: FieldMask,
    ) -> Outcome<Arc<S>, Error>
    where
        C: Connection<Statement = S>,
    {
        self.statement(cx, conn, StatementKey::count(where_fields))
            .await
    }

    /// Close every cached statement. Entries stay in place; the driver
    /// rejects any later use of them.
    pub fn close_all(&self) -> Result<()> {
        let statements = self
            .statements
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut first_err = None;
        for stmt in statements.values() {
            if let Err(e) = stmt.close() {
                tracing::warn!(table = %self.table, sql = stmt.sql(), error = %e, "failed to close statement");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
