//! Database configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlmask_core::{Error, FieldInfo, Model, PoolLimits, Result};
use sqlmask_query::Dialect;

/// Default number of rows `all` pre-sizes a store for.
pub const DEFAULT_SIZE_HINT: usize = 10;

/// Name overrides for one model's table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableOverride {
    /// Table name to use instead of `Model::TABLE_NAME`.
    pub table: Option<String>,
    /// Column names keyed by field name.
    pub columns: HashMap<String, String>,
}

impl TableOverride {
    /// Column for `field`, falling back to the field's own column name.
    pub fn column(&self, field: &FieldInfo) -> String {
        self.columns
            .get(field.name)
            .cloned()
            .unwrap_or_else(|| field.column_name().into_owned())
    }
}

/// Configuration for a [`Db`](crate::Db).
///
/// # Example
///
/// ```
/// use sqlmask::{DbConfig, Dialect};
///
/// let config = DbConfig::new()
///     .dialect(Dialect::Sqlite)
///     .max_idle(4)
///     .rename_table("users", "app_users")
///     .rename_column("users", "Name", "full_name");
/// assert_eq!(config.size_hint, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Placeholder and range syntax.
    pub dialect: Dialect,
    /// Pool limits handed to the driver on open.
    pub pool: PoolLimits,
    /// Rows `all` pre-sizes a store for.
    pub size_hint: usize,
    /// Overrides keyed by `Model::TABLE_NAME`.
    pub tables: HashMap<String, TableOverride>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            pool: PoolLimits::default(),
            size_hint: DEFAULT_SIZE_HINT,
            tables: HashMap::new(),
        }
    }
}

impl DbConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON; absent keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Custom(format!("invalid configuration: {e}")))
    }

    /// Set the SQL dialect.
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Set the maximum idle connections.
    pub fn max_idle(mut self, n: usize) -> Self {
        self.pool.max_idle = n;
        self
    }

    /// Set the maximum open connections (0 = unlimited).
    pub fn max_open(mut self, n: usize) -> Self {
        self.pool.max_open = n;
        self
    }

    /// Set the store pre-size hint for `all`.
    pub fn size_hint(mut self, n: usize) -> Self {
        self.size_hint = n;
        self
    }

    /// Store the model whose table name is `model_table` in `table` instead.
    pub fn rename_table(mut self, model_table: &str, table: impl Into<String>) -> Self {
        self.tables.entry(model_table.to_string()).or_default().table = Some(table.into());
        self
    }

    /// Map `field` of the model whose table name is `model_table` to `column`.
    pub fn rename_column(
        mut self,
        model_table: &str,
        field: &str,
        column: impl Into<String>,
    ) -> Self {
        self.tables
            .entry(model_table.to_string())
            .or_default()
            .columns
            .insert(field.to_string(), column.into());
        self
    }

    /// Resolved table name and canonical columns for `M`.
    pub fn table_layout<M: Model>(&self) -> (String, Vec<String>) {
        match self.tables.get(M::TABLE_NAME) {
            Some(ov) => (
                ov.table.clone().unwrap_or_else(|| M::TABLE_NAME.to_string()),
                M::FIELDS.iter().map(|f| ov.column(f)).collect(),
            ),
            None => (
                M::TABLE_NAME.to_string(),
                M::FIELDS
                    .iter()
                    .map(|f| f.column_name().into_owned())
                    .collect(),
            ),
        }
    }
}
