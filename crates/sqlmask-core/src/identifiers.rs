//! SQL identifier validation.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{MaskError, Result};

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
            .unwrap_or_else(|e| unreachable!("identifier pattern is valid: {e}"))
    })
}

/// Check that `name` is a plain (optionally schema-qualified) SQL identifier.
///
/// Table and column names are spliced into statement text unquoted, so
/// anything else is rejected as a contract violation.
pub fn validate_identifier(name: &str) -> Result<()> {
    if identifier_re().is_match(name) {
        Ok(())
    } else {
        Err(MaskError::InvalidIdentifier(name.to_string()).into())
    }
}
