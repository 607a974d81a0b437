//! Binding result rows into caller storage.
//!
//! A [`Scanner`] is returned by every query. It either carries the terminal
//! outcome of an earlier step (preparation, argument assembly, the query
//! itself) or a live cursor. Its binding methods consume it and release the
//! cursor exactly once, whichever way they return. A scanner dropped without
//! being consumed releases its cursor too.

use std::fmt;

use sqlmask_core::{Bind, Cx, Error, FieldMask, Model, Outcome, RowCursor, Store, outcome};

use crate::config::DEFAULT_SIZE_HINT;

/// Row binder for one query.
pub struct Scanner<R: RowCursor> {
    table: String,
    rows: Outcome<CursorGuard<R>, Error>,
}

impl<R: RowCursor> fmt::Debug for Scanner<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scanner")
            .field("table", &self.table)
            .field("bound", &self.is_bound())
            .finish_non_exhaustive()
    }
}

impl<R: RowCursor> Scanner<R> {
    /// Scanner over the result of a query against `table`.
    ///
    /// `table` is reported by [`Error::NotFound`]; ad-hoc queries pass their
    /// SQL text instead.
    pub fn new(table: impl Into<String>, rows: Outcome<R, Error>) -> Self {
        let rows = match rows {
            Outcome::Ok(cursor) => Outcome::Ok(CursorGuard::new(cursor)),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        };
        Self {
            table: table.into(),
            rows,
        }
    }

    /// Scanner carrying an error from an earlier step.
    pub fn failed(table: impl Into<String>, err: Error) -> Self {
        Self::new(table, Outcome::Err(err))
    }

    /// Whether a live cursor is held.
    pub fn is_bound(&self) -> bool {
        matches!(self.rows, Outcome::Ok(_))
    }

    /// Bind the first row into `dest`.
    ///
    /// No row yields [`Error::NotFound`].
    pub async fn one<B>(self, cx: &Cx, dest: &mut B) -> Outcome<(), Error>
    where
        B: Bind + ?Sized,
    {
        let Scanner { table, rows } = self;
        let mut guard = match rows {
            Outcome::Ok(guard) => guard,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        let result = match guard.cursor.next(cx).await {
            Outcome::Ok(Some(row)) => outcome(dest.bind(row)),
            Outcome::Ok(None) => {
                tracing::debug!(table = %table, "no row found");
                Outcome::Err(Error::NotFound { table })
            }
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        };
        guard.finish(result)
    }

    /// Bind up to `count` rows, each into a fresh item pushed onto `store`.
    ///
    /// Running out of rows early is not an error. Returns the rows bound.
    /// `count` only caps the scan; the store is pre-sized for at most
    /// [`DEFAULT_SIZE_HINT`] rows.
    pub async fn limit<St>(
        self,
        cx: &Cx,
        store: &mut St,
        fields: FieldMask,
        count: usize,
    ) -> Outcome<usize, Error>
    where
        St: Store + ?Sized,
    {
        store.init(count.min(DEFAULT_SIZE_HINT));
        self.collect(cx, store, fields, Some(count)).await
    }

    /// Bind every row into `store`. `size_hint` only pre-sizes it.
    pub async fn all<St>(
        self,
        cx: &Cx,
        store: &mut St,
        fields: FieldMask,
        size_hint: usize,
    ) -> Outcome<usize, Error>
    where
        St: Store + ?Sized,
    {
        store.init(size_hint);
        self.collect(cx, store, fields, None).await
    }

    async fn collect<St>(
        self,
        cx: &Cx,
        store: &mut St,
        fields: FieldMask,
        max: Option<usize>,
    ) -> Outcome<usize, Error>
    where
        St: Store + ?Sized,
    {
        let Scanner { table, rows } = self;
        let mut guard = match rows {
            Outcome::Ok(guard) => guard,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        let mut bound = 0;
        let result = loop {
            if max.is_some_and(|m| bound >= m) {
                break Outcome::Ok(bound);
            }
            match guard.cursor.next(cx).await {
                Outcome::Ok(Some(row)) => {
                    let mut item = store.fresh();
                    if let Err(e) = item.write_values(fields, row.into_values()) {
                        break Outcome::Err(e);
                    }
                    store.push(item);
                    bound += 1;
                }
                Outcome::Ok(None) => break Outcome::Ok(bound),
                Outcome::Err(e) => break Outcome::Err(e),
                Outcome::Cancelled(r) => break Outcome::Cancelled(r),
                Outcome::Panicked(p) => break Outcome::Panicked(p),
            }
        };

        tracing::trace!(table = %table, rows = bound, "scan finished");
        guard.finish(result)
    }
}

/// Closes the cursor exactly once: explicitly through [`CursorGuard::finish`],
/// or on drop when the scanner or its scan future is abandoned.
struct CursorGuard<R: RowCursor> {
    cursor: R,
    closed: bool,
}

impl<R: RowCursor> CursorGuard<R> {
    fn new(cursor: R) -> Self {
        Self {
            cursor,
            closed: false,
        }
    }

    /// Close the cursor and merge the close result into `result`.
    ///
    /// An earlier failure wins over a close failure.
    fn finish<T>(mut self, result: Outcome<T, Error>) -> Outcome<T, Error> {
        self.closed = true;
        let closed = self.cursor.close();
        match (result, closed) {
            (Outcome::Ok(v), Ok(())) => Outcome::Ok(v),
            (Outcome::Ok(_), Err(e)) => Outcome::Err(e),
            (other, Err(e)) => {
                tracing::warn!(error = %e, "failed to close cursor after an earlier failure");
                other
            }
            (other, Ok(())) => other,
        }
    }
}

impl<R: RowCursor> Drop for CursorGuard<R> {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Err(e) = self.cursor.close() {
                tracing::warn!(error = %e, "failed to close abandoned cursor");
            }
        }
    }
}
