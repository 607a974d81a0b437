//! Core types and traits for sqlmask.
//!
//! `sqlmask-core` is the contract layer shared by the statement builder, the
//! `sqlmask` facade and the drivers.
//!
//! - **Field masks**: [`FieldMask`] selects model fields by canonical
//!   position; [`field_count`] sizes argument and destination slices.
//! - **Model contract**: [`Model`] exposes a table name, canonical field
//!   metadata ([`FieldInfo`]) and mask-driven value accessors. [`Store`] and
//!   [`Bind`] are the destinations rows are bound into.
//! - **Data**: [`Value`] and [`Row`] carry statement arguments and results.
//! - **Driver boundary**: [`Driver`], [`Connection`], [`Statement`] and
//!   [`RowCursor`], async over asupersync's [`Cx`] and [`Outcome`].

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Cx, Outcome};

pub mod connection;
pub mod error;
pub mod field;
pub mod identifiers;
pub mod mask;
pub mod model;
pub mod row;
pub mod value;

pub use connection::{Connection, Driver, ExecResult, PoolLimits, RowCursor, Statement};
pub use error::{
    ConnectionError, ConnectionErrorKind, Error, MaskError, QueryError, QueryErrorKind, Result,
    TypeError, outcome,
};
pub use field::{FieldInfo, to_snake};
pub use identifiers::validate_identifier;
pub use mask::{FieldMask, field_count};
pub use model::{Bind, Fields, Model, Store, field_dest, field_values};
pub use row::Row;
pub use value::{FromValue, Value};
