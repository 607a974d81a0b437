//! Statement building and caching for sqlmask.
//!
//! - [`SqlBuilder`] renders the fixed statement shapes (INSERT, UPDATE,
//!   DELETE, single-row, ranged and unbounded SELECT, COUNT) from a
//!   [`StatementKey`] and a table's canonical column list.
//! - [`TypeInfo`] holds one table's column metadata and caches one prepared
//!   statement per key for the lifetime of the registry.
//! - [`Dialect`] picks placeholder and range syntax.

pub mod builder;
pub mod dialect;
pub mod type_info;

pub use builder::{SqlBuilder, StatementKey, StatementKind};
pub use dialect::Dialect;
pub use type_info::TypeInfo;
