//! Canonical field metadata.

use std::borrow::Cow;

/// Metadata for one model field at a fixed canonical position.
///
/// The position of a `FieldInfo` inside `Model::FIELDS` is the bit that
/// selects it in a [`FieldMask`](crate::FieldMask).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    /// Rust field name
    pub name: &'static str,
    /// Explicit database column name; defaults to the snake_case field name
    pub column: Option<&'static str>,
    /// Whether this field is (part of) the primary key
    pub primary_key: bool,
}

impl FieldInfo {
    /// Field whose column is derived from its name.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            column: None,
            primary_key: false,
        }
    }

    /// Set an explicit column name.
    pub const fn column(mut self, column: &'static str) -> Self {
        self.column = Some(column);
        self
    }

    /// Mark as primary key.
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Resolved column name: the explicit column, else `to_snake(name)`.
    pub fn column_name(&self) -> Cow<'static, str> {
        match self.column {
            Some(col) => Cow::Borrowed(col),
            None => to_snake(self.name),
        }
    }
}

/// Convert a field or type name to snake_case.
///
/// `UserName` becomes `user_name`; runs of capitals are kept together, so
/// `HTTPCode` becomes `http_code` and `ID` becomes `id`.
pub fn to_snake(name: &'static str) -> Cow<'static, str> {
    if !name.chars().any(|c| c.is_ascii_uppercase()) {
        return Cow::Borrowed(name);
    }
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                None | Some('_') => false,
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                Some(p) => p.is_ascii_uppercase() && next.is_some_and(|n| n.is_ascii_lowercase()),
            };
            if boundary {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}
