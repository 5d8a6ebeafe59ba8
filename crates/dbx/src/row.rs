//! Row mapping traits and utilities

use crate::error::{OrmError, OrmResult};
use tokio_postgres::Row;
use tokio_postgres::types::FromSql;

/// Trait for converting a database row into a Rust type.
///
/// Usually derived; virtual fields (`#[orm(virtual)]`) have no column and are
/// filled with `Default::default()`.
///
/// ```ignore
/// use dbx::FromRow;
///
/// #[derive(FromRow)]
/// struct User {
///     id: i64,
///     username: String,
///     email: Option<String>,
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> OrmResult<Self>;
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning OrmError::Decode on failure
    fn try_get_column<T>(&self, column: &str) -> OrmResult<T>
    where
        T: for<'a> FromSql<'a>;

    /// Like [`try_get_column`](RowExt::try_get_column), by position.
    fn try_get_index<T>(&self, index: usize) -> OrmResult<T>
    where
        T: for<'a> FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> OrmResult<T>
    where
        T: for<'a> FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| OrmError::decode(column, e.to_string()))
    }

    fn try_get_index<T>(&self, index: usize) -> OrmResult<T>
    where
        T: for<'a> FromSql<'a>,
    {
        self.try_get(index)
            .map_err(|e| OrmError::decode(format!("#{index}"), e.to_string()))
    }
}
