//! SQL dialects.

use serde::{Deserialize, Serialize};

/// SQL dialect for placeholder and range syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// PostgreSQL: `$1, $2, ...` placeholders, `OFFSET $n LIMIT $m`
    #[default]
    Postgres,
    /// SQLite: `?` placeholders, `LIMIT ?, ?`
    Sqlite,
    /// MySQL: `?` placeholders, `LIMIT ?, ?`
    Mysql,
}

impl Dialect {
    /// Placeholder for the 1-based parameter `index`.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", index),
            Dialect::Sqlite | Dialect::Mysql => "?".to_string(),
        }
    }

    /// Range clause whose two parameters are offset then count.
    ///
    /// `next` is the 1-based index of the offset parameter.
    pub fn range_clause(self, next: usize) -> String {
        match self {
            Dialect::Postgres => format!(" OFFSET ${} LIMIT ${}", next, next + 1),
            Dialect::Sqlite | Dialect::Mysql => " LIMIT ?, ?".to_string(),
        }
    }
}
