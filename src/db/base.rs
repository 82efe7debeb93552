//! Common marker for database records managed by [`crate::crud::CrudBase`].

use sqlx::sqlite::SqliteRow;
use sqlx::{Encode, FromRow, Sqlite, Type};

/// Column definition for a creation timestamp filled in by the database.
pub const CREATED_AT_COLUMN: &str = "created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP";
/// Column definition for a modification timestamp. Pair it with
/// [`Entity::MODIFIED_AT`] so updates refresh it.
pub const MODIFIED_AT_COLUMN: &str = "modified_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP";

/// A row type stored in a single table with a unique identifier column.
///
/// ```ignore
/// #[derive(sqlx::FromRow)]
/// struct Project { id: i64, name: String }
///
/// impl Entity for Project {
///     type Id = i64;
///     const TABLE: &'static str = "projects";
///     fn id(&self) -> i64 { self.id }
/// }
/// ```
pub trait Entity: for<'r> FromRow<'r, SqliteRow> + Send + Sync + Unpin + 'static {
    type Id: for<'q> Encode<'q, Sqlite> + Type<Sqlite> + Clone + Send + Sync + 'static;

    const TABLE: &'static str;
    const PRIMARY_KEY: &'static str = "id";
    /// Column set to `CURRENT_TIMESTAMP` on every update, if any.
    const MODIFIED_AT: Option<&'static str> = None;

    fn id(&self) -> Self::Id;
}
