//! sqlmask: field-mask driven SQL statements with a per-table statement cache.
//!
//! A model lists its fields in a fixed canonical order; a [`FieldMask`]
//! selects a subset of them by position. Every operation on [`Db`] is
//! parameterized by a mask of fields to write or read and a mask of fields to
//! filter on, and the statement for each distinct combination is built and
//! prepared once, then reused for the lifetime of the handle.
//!
//! # Example
//!
//! Drivers live in their own crates; this one uses `sqlmask-sqlite`. Every
//! operation returns an asupersync [`Outcome`].
//!
//! ```ignore
//! use sqlmask::prelude::*;
//! use sqlmask_sqlite::{MEMORY_DSN, SqliteDriver};
//!
//! let config = DbConfig::new().dialect(Dialect::Sqlite);
//! let Outcome::Ok(db) = Db::open(&cx, &SqliteDriver, MEMORY_DSN, config).await else {
//!     panic!("open failed");
//! };
//!
//! // INSERT INTO users (name, age) VALUES (?, ?)
//! let id = db.insert(&cx, &user, User::NAME | User::AGE, ResultKind::LastInsertId).await;
//!
//! // UPDATE users SET name = ? WHERE id = ?
//! let changed = db.update(&cx, &user, User::NAME, User::ID).await;
//!
//! // SELECT name, age FROM users LIMIT ?, ?
//! let mut page: Vec<User> = Vec::new();
//! let bound = db
//!     .limit(&cx, &mut page, &User::default(), User::NAME | User::AGE, FieldMask::EMPTY, 10, 5)
//!     .await;
//! ```
//!
//! # Crates
//!
//! - `sqlmask-core`: masks, values, the model contract and the driver traits
//! - `sqlmask-query`: SQL text and the per-table statement cache
//! - `sqlmask` (this crate): the [`Db`] handle, [`Cacher`], [`Scanner`] and
//!   result resolution
//! - `sqlmask-sqlite`: a [`Driver`] backed by rusqlite

pub mod cacher;
pub mod config;
pub mod db;
pub mod exec;
pub mod scanner;

pub use sqlmask_core::{
    Bind, Connection, ConnectionError, ConnectionErrorKind, Cx, Driver, Error, ExecResult,
    FieldInfo, FieldMask, Fields, FromValue, MaskError, Model, Outcome, PoolLimits, QueryError,
    QueryErrorKind, Result, Row, RowCursor, Statement, Store, TypeError, Value, field_count,
    field_dest, field_values, to_snake,
};
pub use sqlmask_query::{Dialect, SqlBuilder, StatementKey, StatementKind, TypeInfo};

pub use cacher::Cacher;
pub use config::{DEFAULT_SIZE_HINT, DbConfig, TableOverride};
pub use db::{Db, limit_args, update_args};
pub use exec::{
    ResultKind, close_exec, close_query, close_update, exec, query, resolve_result, update,
};
pub use scanner::Scanner;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        Bind, Connection, Cx, Db, DbConfig, Dialect, Driver, Error, FieldInfo, FieldMask, Model,
        Outcome, ResultKind, Result, Row, Scanner, Store, Value, field_count, field_dest,
        field_values,
    };
}
