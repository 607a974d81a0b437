//! Result rows.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::value::{FromValue, Value};

/// A single row produced by a query cursor.
///
/// Values are positional, in the order the statement selected them. Column
/// names are shared between all rows of one result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row from shared column names and its values.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Create a row with no column names.
    pub fn from_values(values: Vec<Value>) -> Self {
        Self {
            columns: Arc::from(Vec::new()),
            values,
        }
    }

    /// Number of values in the row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the row has no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Column names, possibly empty when the driver does not report them.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Value at `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// All values in positional order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consume the row, returning its values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Decode the value at `index`.
    pub fn get_as<T: FromValue>(&self, index: usize) -> Result<T> {
        let value = self.values.get(index).cloned().ok_or_else(|| {
            Error::Custom(format!(
                "column index {} out of range ({} columns)",
                index,
                self.values.len()
            ))
        })?;
        value.decode(self.columns.get(index).map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_as_decodes_by_position() {
        let cols: Arc<[String]> = Arc::from(vec!["id".to_string(), "name".to_string()]);
        let row = Row::new(cols, vec![Value::BigInt(3), Value::from("ann")]);
        assert_eq!(row.get_as::<i64>(0).unwrap(), 3);
        assert_eq!(row.get_as::<String>(1).unwrap(), "ann");
        assert!(row.get_as::<i64>(2).is_err());
        assert_eq!(row.columns()[1], "name");
    }

    #[test]
    fn type_error_names_column() {
        let cols: Arc<[String]> = Arc::from(vec!["age".to_string()]);
        let row = Row::new(cols, vec![Value::from("old")]);
        match row.get_as::<i64>(0) {
            Err(Error::Type(t)) => assert_eq!(t.column.as_deref(), Some("age")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
