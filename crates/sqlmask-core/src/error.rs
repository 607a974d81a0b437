//! Error types for sqlmask.
//!
//! Errors fall into four groups:
//!
//! - **Contract violations** ([`Error::Mask`]): masks that name fields a model
//!   does not have, empty projections, argument slices of the wrong arity,
//!   invalid identifiers. These are programming defects and are never retried.
//! - **Driver failures** ([`Error::Connection`], [`Error::Query`]): connect,
//!   prepare and execute errors, returned verbatim with the SQL for context.
//! - **Decoding failures** ([`Error::Type`]): a row value could not be
//!   converted into the destination field type.
//! - **Not found** ([`Error::NotFound`]): a single-row query yielded no row.

use std::fmt;

use asupersync::Outcome;

/// The primary error type for all sqlmask operations.
#[derive(Debug)]
pub enum Error {
    /// Field-mask or argument contract violation.
    Mask(MaskError),
    /// Connection-level failure.
    Connection(ConnectionError),
    /// Statement preparation or execution failure.
    Query(QueryError),
    /// Value conversion failure while binding a row.
    Type(TypeError),
    /// The driver does not report the requested result for this statement.
    Unsupported(String),
    /// A query expected to return one row returned none.
    NotFound {
        /// Table that was queried.
        table: String,
    },
    /// Free-form error.
    Custom(String),
}

/// A violated field-mask contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaskError {
    /// The mask names a bit beyond the model's canonical field list.
    OutOfRange {
        /// Table the mask was applied to.
        table: String,
        /// Lowest offending bit.
        bit: u32,
        /// Number of canonical fields.
        field_count: usize,
    },
    /// The operation needs at least one selected field.
    EmptyFields {
        /// Table the mask was applied to.
        table: String,
        /// Operation that was being built.
        operation: &'static str,
    },
    /// Argument slice does not match the statement's placeholder count.
    ArgumentCount {
        /// Operation that was being executed.
        operation: &'static str,
        /// Placeholders in the statement.
        expected: usize,
        /// Arguments supplied.
        actual: usize,
    },
    /// A destination or source slice does not match the mask's field count.
    Destination {
        /// Slots the mask requires.
        expected: usize,
        /// Slots supplied.
        actual: usize,
    },
    /// Table or column name is not a plain SQL identifier.
    InvalidIdentifier(String),
}

/// Connection error details.
#[derive(Debug)]
pub struct ConnectionError {
    /// What went wrong.
    pub kind: ConnectionErrorKind,
    /// Human readable message.
    pub message: String,
    /// Underlying cause.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// Classification of connection errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Opening the connection failed.
    Connect,
    /// The connection is closed or its lock is poisoned.
    Disconnected,
}

/// Query error details.
#[derive(Debug)]
pub struct QueryError {
    /// What went wrong.
    pub kind: QueryErrorKind,
    /// Human readable message.
    pub message: String,
    /// SQL text of the failing statement, when known.
    pub sql: Option<String>,
    /// Underlying cause.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// Classification of query errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// The driver rejected the statement text.
    Prepare,
    /// Constraint violation while executing.
    Constraint,
    /// The statement handle was already closed.
    Closed,
    /// Any other database-side failure.
    Database,
}

/// Value conversion error details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeError {
    /// Rust type that was expected.
    pub expected: &'static str,
    /// Value variant that was found.
    pub actual: String,
    /// Column or field name, when known.
    pub column: Option<String>,
}

impl Error {
    /// Build a query error with the given kind and message.
    pub fn query(kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Error::Query(QueryError {
            kind,
            message: message.into(),
            sql: None,
            source: None,
        })
    }

    /// Build a connection error with the given kind and message.
    pub fn connection(kind: ConnectionErrorKind, message: impl Into<String>) -> Self {
        Error::Connection(ConnectionError {
            kind,
            message: message.into(),
            source: None,
        })
    }

    /// Attach SQL text to a query error that has none.
    #[must_use]
    pub fn with_sql(mut self, sql: &str) -> Self {
        if let Error::Query(q) = &mut self {
            if q.sql.is_none() {
                q.sql = Some(sql.to_string());
            }
        }
        self
    }

    /// True for [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// True for contract violations, which are defects rather than runtime conditions.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Error::Mask(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Mask(e) => write!(f, "Mask contract violation: {}", e),
            Error::Connection(e) => write!(f, "Connection error: {}", e.message),
            Error::Query(e) => match &e.sql {
                Some(sql) => write!(f, "Query error: {} (sql: {})", e.message, sql),
                None => write!(f, "Query error: {}", e.message),
            },
            Error::Type(e) => write!(f, "{}", e),
            Error::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            Error::NotFound { table } => write!(f, "No row found in {}", table),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for MaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskError::OutOfRange {
                table,
                bit,
                field_count,
            } => write!(
                f,
                "bit {} is out of range for {} ({} fields)",
                bit, table, field_count
            ),
            MaskError::EmptyFields { table, operation } => {
                write!(f, "{} on {} selects no fields", operation, table)
            }
            MaskError::ArgumentCount {
                operation,
                expected,
                actual,
            } => write!(
                f,
                "{} expects {} arguments, got {}",
                operation, expected, actual
            ),
            MaskError::Destination { expected, actual } => {
                write!(f, "mask needs {} slots, got {}", expected, actual)
            }
            MaskError::InvalidIdentifier(name) => write!(f, "invalid identifier {:?}", name),
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(col) => write!(
                f,
                "Type error in column {}: expected {}, found {}",
                col, self.expected, self.actual
            ),
            None => write!(
                f,
                "Type error: expected {}, found {}",
                self.expected, self.actual
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(e) => e
                .source
                .as_ref()
                .map(|s| s.as_ref() as &(dyn std::error::Error + 'static)),
            Error::Query(e) => e
                .source
                .as_ref()
                .map(|s| s.as_ref() as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl From<MaskError> for Error {
    fn from(e: MaskError) -> Self {
        Error::Mask(e)
    }
}

impl From<TypeError> for Error {
    fn from(e: TypeError) -> Self {
        Error::Type(e)
    }
}

/// Result type alias for sqlmask operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Lift a plain `Result` into an `Outcome`.
pub fn outcome<T>(result: Result<T>) -> Outcome<T, Error> {
    match result {
        Ok(v) => Outcome::Ok(v),
        Err(e) => Outcome::Err(e),
    }
}
