//! SQL text for the fixed statement shapes.
//!
//! Every statement is determined by a [`StatementKey`]: the operation kind, the
//! mask of fields it writes or selects, and the mask of fields its WHERE clause
//! compares for equality. Placeholders are emitted in argument order: `fields`
//! ascending, then `where_fields` ascending, then offset and count for
//! [`StatementKind::SelectLimit`].

use sqlmask_core::{FieldMask, MaskError, Result};

use crate::dialect::Dialect;

/// The operation a cached statement performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// `INSERT INTO t (fields) VALUES (...)`
    Insert,
    /// `UPDATE t SET fields WHERE where_fields`
    Update,
    /// `DELETE FROM t WHERE where_fields`
    Delete,
    /// `SELECT fields FROM t WHERE where_fields LIMIT 1`
    SelectOne,
    /// `SELECT fields FROM t WHERE where_fields` plus offset/count
    SelectLimit,
    /// `SELECT fields FROM t WHERE where_fields`
    SelectAll,
    /// `SELECT COUNT(*) FROM t WHERE where_fields`
    Count,
}

impl StatementKind {
    /// Operation name used in errors and logs.
    pub const fn name(self) -> &'static str {
        match self {
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
            StatementKind::SelectOne => "SELECT ONE",
            StatementKind::SelectLimit => "SELECT LIMIT",
            StatementKind::SelectAll => "SELECT ALL",
            StatementKind::Count => "COUNT",
        }
    }

    /// Whether the statement needs at least one field in `fields`.
    pub const fn requires_fields(self) -> bool {
        !matches!(self, StatementKind::Delete | StatementKind::Count)
    }
}

/// Cache key of a statement: operation plus field and where masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatementKey {
    /// Operation.
    pub kind: StatementKind,
    /// Fields written or selected.
    pub fields: FieldMask,
    /// Fields compared in the WHERE clause.
    pub where_fields: FieldMask,
}

impl StatementKey {
    /// Key for an INSERT of `fields`.
    pub const fn insert(fields: FieldMask) -> Self {
        Self {
            kind: StatementKind::Insert,
            fields,
            where_fields: FieldMask::EMPTY,
        }
    }

    /// Key for an UPDATE of `fields` filtered by `where_fields`.
    pub const fn update(fields: FieldMask, where_fields: FieldMask) -> Self {
        Self {
            kind: StatementKind::Update,
            fields,
            where_fields,
        }
    }

    /// Key for a DELETE filtered by `where_fields`.
    pub const fn delete(where_fields: FieldMask) -> Self {
        Self {
            kind: StatementKind::Delete,
            fields: FieldMask::EMPTY,
            where_fields,
        }
    }

    /// Key for a single-row SELECT.
    pub const fn select_one(fields: FieldMask, where_fields: FieldMask) -> Self {
        Self {
            kind: StatementKind::SelectOne,
            fields,
            where_fields,
        }
    }

    /// Key for a ranged SELECT.
    pub const fn select_limit(fields: FieldMask, where_fields: FieldMask) -> Self {
        Self {
            kind: StatementKind::SelectLimit,
            fields,
            where_fields,
        }
    }

    /// Key for an unbounded SELECT.
    pub const fn select_all(fields: FieldMask, where_fields: FieldMask) -> Self {
        Self {
            kind: StatementKind::SelectAll,
            fields,
            where_fields,
        }
    }

    /// Key for a COUNT filtered by `where_fields`.
    pub const fn count(where_fields: FieldMask) -> Self {
        Self {
            kind: StatementKind::Count,
            fields: FieldMask::EMPTY,
            where_fields,
        }
    }

    /// Number of positional arguments the statement takes.
    pub const fn arg_count(&self) -> usize {
        match self.kind {
            StatementKind::Insert => self.fields.count(),
            StatementKind::Update => self.fields.count() + self.where_fields.count(),
            StatementKind::Delete
            | StatementKind::SelectOne
            | StatementKind::SelectAll
            | StatementKind::Count => self.where_fields.count(),
            StatementKind::SelectLimit => self.where_fields.count() + 2,
        }
    }

    /// Check that the argument slice matches [`StatementKey::arg_count`].
    pub fn check_args(&self, actual: usize) -> Result<()> {
        let expected = self.arg_count();
        if expected == actual {
            Ok(())
        } else {
            Err(MaskError::ArgumentCount {
                operation: self.kind.name(),
                expected,
                actual,
            }
            .into())
        }
    }
}

/// Builds statement text for one table.
#[derive(Debug, Clone, Copy)]
pub struct SqlBuilder<'a> {
    table: &'a str,
    columns: &'a [String],
    dialect: Dialect,
}

impl<'a> SqlBuilder<'a> {
    /// Builder over `table` whose canonical columns are `columns`.
    pub fn new(table: &'a str, columns: &'a [String], dialect: Dialect) -> Self {
        Self {
            table,
            columns,
            dialect,
        }
    }

    /// Build the SQL text for `key`.
    ///
    /// Fails only on contract violations: a bit beyond the column list, or an
    /// empty field mask for an operation that selects or writes fields.
    pub fn build(&self, key: &StatementKey) -> Result<String> {
        self.check_mask(key.fields)?;
        self.check_mask(key.where_fields)?;
        if key.kind.requires_fields() && key.fields.is_empty() {
            return Err(MaskError::EmptyFields {
                table: self.table.to_string(),
                operation: key.kind.name(),
            }
            .into());
        }

        let mut next = 1;
        let sql = match key.kind {
            StatementKind::Insert => {
                let placeholders: Vec<_> = (next..next + key.fields.count())
                    .map(|i| self.dialect.placeholder(i))
                    .collect();
                format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    self.table,
                    self.column_list(key.fields),
                    placeholders.join(", ")
                )
            }
            StatementKind::Update => {
                let sets = self.assignments(key.fields, &mut next, ", ");
                let mut sql = format!("UPDATE {} SET {}", self.table, sets);
                self.push_where(&mut sql, key.where_fields, &mut next);
                sql
            }
            StatementKind::Delete => {
                let mut sql = format!("DELETE FROM {}", self.table);
                self.push_where(&mut sql, key.where_fields, &mut next);
                sql
            }
            StatementKind::SelectOne => {
                let mut sql = self.select(key.fields);
                self.push_where(&mut sql, key.where_fields, &mut next);
                sql.push_str(" LIMIT 1");
                sql
            }
            StatementKind::SelectLimit => {
                let mut sql = self.select(key.fields);
                self.push_where(&mut sql, key.where_fields, &mut next);
                sql.push_str(&self.dialect.range_clause(next));
                sql
            }
            StatementKind::SelectAll => {
                let mut sql = self.select(key.fields);
                self.push_where(&mut sql, key.where_fields, &mut next);
                sql
            }
            StatementKind::Count => {
                let mut sql = format!("SELECT COUNT(*) FROM {}", self.table);
                self.push_where(&mut sql, key.where_fields, &mut next);
                sql
            }
        };
        Ok(sql)
    }

    fn check_mask(&self, mask: FieldMask) -> Result<()> {
        match mask.first_beyond(self.columns.len()) {
            None => Ok(()),
            Some(bit) => Err(MaskError::OutOfRange {
                table: self.table.to_string(),
                bit,
                field_count: self.columns.len(),
            }
            .into()),
        }
    }

    fn column_list(&self, mask: FieldMask) -> String {
        mask.iter()
            .map(|i| self.columns[i].as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn select(&self, fields: FieldMask) -> String {
        format!("SELECT {} FROM {}", self.column_list(fields), self.table)
    }

    fn assignments(&self, mask: FieldMask, next: &mut usize, sep: &str) -> String {
        mask.iter()
            .map(|i| {
                let part = format!("{} = {}", self.columns[i], self.dialect.placeholder(*next));
                *next += 1;
                part
            })
            .collect::<Vec<_>>()
            .join(sep)
    }

    fn push_where(&self, sql: &mut String, where_fields: FieldMask, next: &mut usize) {
        if where_fields.is_empty() {
            return;
        }
        sql.push_str(" WHERE ");
        sql.push_str(&self.assignments(where_fields, next, " AND "));
    }
}
