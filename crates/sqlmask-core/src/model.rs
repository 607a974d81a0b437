//! The model contract and row destinations.
//!
//! A [`Model`] exposes its table name, its canonical field list, and two
//! per-field accessors. The bulk accessors [`Model::read_values`] and
//! [`Model::write_values`] are provided on top of them and always touch
//! exactly `mask.count()` slots, in ascending bit order.

use crate::error::{Error, MaskError, Result};
use crate::field::FieldInfo;
use crate::mask::FieldMask;
use crate::row::Row;
use crate::value::Value;

/// A persisted type.
///
/// # Example
///
/// ```
/// use sqlmask_core::{FieldInfo, FieldMask, Model, Result, Value};
///
/// #[derive(Default)]
/// struct User {
///     id: i64,
///     name: String,
/// }
///
/// impl User {
///     const ID: FieldMask = FieldMask::bit(0);
///     const NAME: FieldMask = FieldMask::bit(1);
/// }
///
/// impl Model for User {
///     const TABLE_NAME: &'static str = "users";
///     const FIELDS: &'static [FieldInfo] =
///         &[FieldInfo::new("id").primary_key(), FieldInfo::new("name")];
///
///     fn field_value(&self, index: usize) -> Option<Value> {
///         match index {
///             0 => Some(self.id.into()),
///             1 => Some(self.name.clone().into()),
///             _ => None,
///         }
///     }
///
///     fn set_field(&mut self, index: usize, value: Value) -> Result<()> {
///         match index {
///             0 => self.id = value.decode(Some("id"))?,
///             1 => self.name = value.decode(Some("name"))?,
///             _ => return Err(Self::unknown_field(index)),
///         }
///         Ok(())
///     }
/// }
///
/// let user = User { id: 1, name: "ann".into() };
/// let mut vals = vec![Value::Null; 2];
/// user.read_values(User::ID | User::NAME, &mut vals).unwrap();
/// assert_eq!(vals, vec![Value::BigInt(1), Value::Text("ann".into())]);
/// ```
pub trait Model: Send + Sync + 'static {
    /// Table name.
    const TABLE_NAME: &'static str;

    /// Fields in canonical order; position *i* is selected by bit *i*.
    const FIELDS: &'static [FieldInfo];

    /// Current value of the field at canonical position `index`.
    ///
    /// Returns `None` for an index the model does not have.
    fn field_value(&self, index: usize) -> Option<Value>;

    /// Assign the field at canonical position `index`.
    fn set_field(&mut self, index: usize, value: Value) -> Result<()>;

    /// Mask selecting every field.
    fn all_fields() -> FieldMask {
        FieldMask::first(Self::FIELDS.len())
    }

    /// Mask selecting the primary key fields.
    fn primary_key() -> FieldMask {
        Self::FIELDS
            .iter()
            .enumerate()
            .filter(|(_, f)| f.primary_key)
            .fold(FieldMask::EMPTY, |m, (i, _)| m | FieldMask::bit(i))
    }

    /// Error for an index outside `FIELDS`.
    fn unknown_field(index: usize) -> Error {
        MaskError::OutOfRange {
            table: Self::TABLE_NAME.to_string(),
            bit: index as u32,
            field_count: Self::FIELDS.len(),
        }
        .into()
    }

    /// Write the values selected by `mask` into `dest`, ascending bit order.
    ///
    /// `dest` must hold exactly `mask.count()` slots.
    fn read_values(&self, mask: FieldMask, dest: &mut [Value]) -> Result<()> {
        if dest.len() != mask.count() {
            return Err(MaskError::Destination {
                expected: mask.count(),
                actual: dest.len(),
            }
            .into());
        }
        for (slot, index) in dest.iter_mut().zip(mask) {
            *slot = self
                .field_value(index)
                .ok_or_else(|| Self::unknown_field(index))?;
        }
        Ok(())
    }

    /// Assign `src` to the fields selected by `mask`, ascending bit order.
    ///
    /// `src` must hold exactly `mask.count()` values.
    fn write_values(&mut self, mask: FieldMask, src: Vec<Value>) -> Result<()> {
        if src.len() != mask.count() {
            return Err(MaskError::Destination {
                expected: mask.count(),
                actual: src.len(),
            }
            .into());
        }
        for (value, index) in src.into_iter().zip(mask) {
            self.set_field(index, value)?;
        }
        Ok(())
    }
}

/// Values of the fields selected by `mask`, sized by `mask.count()`.
pub fn field_values<M: Model>(mask: FieldMask, model: &M) -> Result<Vec<Value>> {
    let mut vals = vec![Value::Null; mask.count()];
    model.read_values(mask, &mut vals)?;
    Ok(vals)
}

/// Something a single result row can be bound into.
pub trait Bind {
    /// Consume `row` into the destination.
    fn bind(&mut self, row: Row) -> Result<()>;
}

impl<F> Bind for F
where
    F: FnMut(Row) -> Result<()>,
{
    fn bind(&mut self, row: Row) -> Result<()> {
        self(row)
    }
}

/// Destination binding a row into the fields of a model selected by a mask.
#[derive(Debug)]
pub struct Fields<'a, M: Model> {
    model: &'a mut M,
    mask: FieldMask,
}

impl<'a, M: Model> Fields<'a, M> {
    /// Bind rows into the `mask` fields of `model`.
    pub fn new(mask: FieldMask, model: &'a mut M) -> Self {
        Self { model, mask }
    }
}

impl<M: Model> Bind for Fields<'_, M> {
    fn bind(&mut self, row: Row) -> Result<()> {
        self.model.write_values(self.mask, row.into_values())
    }
}

/// Row destination for the fields selected by `mask`.
pub fn field_dest<M: Model>(mask: FieldMask, model: &mut M) -> Fields<'_, M> {
    Fields::new(mask, model)
}

/// An append-only destination for multi-row results.
pub trait Store {
    /// Model type stored.
    type Item: Model;

    /// Prepare for about `size_hint` rows. Never caps how many are pushed.
    fn init(&mut self, size_hint: usize) {
        let _ = size_hint;
    }

    /// A fresh model value to bind the next row into.
    fn fresh(&mut self) -> Self::Item;

    /// Append a bound model, in row-arrival order.
    fn push(&mut self, item: Self::Item);
}

impl<M: Model + Default> Store for Vec<M> {
    type Item = M;

    fn init(&mut self, size_hint: usize) {
        self.reserve(size_hint);
    }

    fn fresh(&mut self) -> M {
        M::default()
    }

    fn push(&mut self, item: M) {
        Vec::push(self, item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, Default, PartialEq)]
    struct User {
        id: i64,
        name: String,
        age: i32,
    }

    thread_local! {
        static TOUCHED: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
    }

    impl Model for User {
        const TABLE_NAME: &'static str = "users";
        const FIELDS: &'static [FieldInfo] = &[
            FieldInfo::new("ID").primary_key(),
            FieldInfo::new("Name"),
            FieldInfo::new("Age"),
        ];

        fn field_value(&self, index: usize) -> Option<Value> {
            TOUCHED.with(|t| t.borrow_mut().push(index));
            match index {
                0 => Some(self.id.into()),
                1 => Some(self.name.clone().into()),
                2 => Some(self.age.into()),
                _ => None,
            }
        }

        fn set_field(&mut self, index: usize, value: Value) -> Result<()> {
            TOUCHED.with(|t| t.borrow_mut().push(index));
            match index {
                0 => self.id = value.decode(Some("id"))?,
                1 => self.name = value.decode(Some("name"))?,
                2 => self.age = value.decode(Some("age"))?,
                _ => return Err(Self::unknown_field(index)),
            }
            Ok(())
        }
    }

    fn take_touched() -> Vec<usize> {
        TOUCHED.with(|t| std::mem::take(&mut *t.borrow_mut()))
    }

    fn ann() -> User {
        User {
            id: 7,
            name: "ann".to_string(),
            age: 31,
        }
    }

    #[test]
    fn read_values_touches_exactly_count_in_order() {
        take_touched();
        let vals = field_values(FieldMask::new(0b101), &ann()).unwrap();
        assert_eq!(vals, vec![Value::BigInt(7), Value::Int(31)]);
        assert_eq!(take_touched(), vec![0, 2]);

        assert!(field_values(FieldMask::EMPTY, &ann()).unwrap().is_empty());
        assert!(take_touched().is_empty());
    }

    #[test]
    fn write_values_touches_exactly_count_in_order() {
        take_touched();
        let mut u = User::default();
        u.write_values(
            FieldMask::new(0b110),
            vec![Value::from("bob"), Value::Int(40)],
        )
        .unwrap();
        assert_eq!(take_touched(), vec![1, 2]);
        assert_eq!(u.name, "bob");
        assert_eq!(u.age, 40);
        assert_eq!(u.id, 0);
    }

    #[test]
    fn slot_count_mismatch_is_rejected() {
        let mut dest = vec![Value::Null; 1];
        let err = ann().read_values(FieldMask::new(0b11), &mut dest).unwrap_err();
        assert!(matches!(
            err,
            Error::Mask(MaskError::Destination {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn unknown_bit_is_out_of_range() {
        let mut dest = vec![Value::Null; 1];
        let err = ann().read_values(FieldMask::bit(5), &mut dest).unwrap_err();
        assert!(matches!(
            err,
            Error::Mask(MaskError::OutOfRange { bit: 5, .. })
        ));
    }

    #[test]
    fn masks_from_metadata() {
        assert_eq!(User::all_fields(), FieldMask::new(0b111));
        assert_eq!(User::primary_key(), FieldMask::new(0b001));
    }

    #[test]
    fn fields_destination_binds_row() {
        let mut u = User::default();
        let mut dest = field_dest(FieldMask::new(0b011), &mut u);
        dest.bind(Row::from_values(vec![Value::BigInt(9), Value::from("zed")]))
            .unwrap();
        assert_eq!(u.id, 9);
        assert_eq!(u.name, "zed");
    }

    #[test]
    fn vec_store_appends_in_order() {
        let mut store: Vec<User> = Vec::new();
        store.init(4);
        assert!(store.capacity() >= 4);
        let mut a = store.fresh();
        a.id = 1;
        Store::push(&mut store, a);
        let mut b = store.fresh();
        b.id = 2;
        Store::push(&mut store, b);
        assert_eq!(store.iter().map(|u| u.id).collect::<Vec<_>>(), vec![1, 2]);
    }
}
