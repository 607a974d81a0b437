//! Table registry.
//!
//! The [`Cacher`] maps a model's table name to its [`TypeInfo`]. Entries are
//! built lazily on first use and never removed. Two callers racing on a new
//! table may both build metadata; only the first published entry survives.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use sqlmask_core::{Model, Result, Statement};
use sqlmask_query::TypeInfo;

use crate::config::DbConfig;

/// Registry of per-table metadata and statement caches.
pub struct Cacher<S: Statement> {
    tables: RwLock<HashMap<&'static str, Arc<TypeInfo<S>>>>,
}

impl<S: Statement> Default for Cacher<S> {
    fn default() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }
}

impl<S: Statement> fmt::Debug for Cacher<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cacher")
            .field("tables", &self.len())
            .finish()
    }
}

impl<S: Statement> Cacher<S> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The metadata for `M`, building it from `config` on first use.
    pub fn resolve<M: Model>(&self, config: &DbConfig) -> Result<Arc<TypeInfo<S>>> {
        if let Some(ti) = self.get(M::TABLE_NAME) {
            return Ok(ti);
        }

        let (table, columns) = config.table_layout::<M>();
        let built = Arc::new(TypeInfo::new(table, columns, config.dialect)?);

        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let ti = tables.entry(M::TABLE_NAME).or_insert_with(|| {
            tracing::info!(
                model = M::TABLE_NAME,
                table = built.table(),
                columns = built.columns().len(),
                "registered table"
            );
            Arc::clone(&built)
        });
        Ok(Arc::clone(ti))
    }

    /// Registered metadata for the model table `name`.
    pub fn get(&self, name: &str) -> Option<Arc<TypeInfo<S>>> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Number of registered tables.
    pub fn len(&self) -> usize {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no table is registered yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close every cached statement of every table.
    ///
    /// All tables are visited; the first failure is returned.
    pub fn close_all(&self) -> Result<()> {
        let tables: Vec<_> = self
            .tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        let mut first_err = None;
        for ti in tables {
            if let Err(e) = ti.close_all() {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
