//! Generic create/read/update/delete operations over any [`Entity`].
//!
//! Inputs are plain `serde::Serialize` values that serialize to a JSON object;
//! its keys are the columns written. For partial updates, leave unset fields
//! out of the object (`#[serde(skip_serializing_if = "Option::is_none")]`).
//!
//! Every operation runs one statement on the caller's connection. On a
//! [`crate::db::DbSession`] that statement autocommits; inside a caller-owned
//! transaction the caller decides when to commit.

use std::fmt;
use std::marker::PhantomData;

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::db::base::Entity;
use crate::error::AppResult;

/// Page size used by [`CrudBase::list_default`].
pub const DEFAULT_LIMIT: u32 = 100;

/// Data access for entity `E`, created from `C` and updated from `U`.
///
/// Holds no data, so repositories are usually declared as constants:
///
/// ```ignore
/// const USERS: CrudBase<User, NewUser, UserPatch> = CrudBase::new();
/// ```
pub struct CrudBase<E, C, U> {
    _marker: PhantomData<fn() -> (E, C, U)>,
}

impl<E, C, U> CrudBase<E, C, U> {
    pub const fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<E, C, U> Default for CrudBase<E, C, U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, C, U> Clone for CrudBase<E, C, U> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, C, U> Copy for CrudBase<E, C, U> {}

impl<E: Entity, C, U> fmt::Debug for CrudBase<E, C, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrudBase").field("table", &E::TABLE).finish()
    }
}

impl<E, C, U> CrudBase<E, C, U>
where
    E: Entity,
    C: Serialize + Sync,
    U: Serialize + Sync,
{
    /// Fetches one row by primary key; `None` if there is no such row.
    pub async fn get(&self, conn: &mut SqliteConnection, id: E::Id) -> AppResult<Option<E>> {
        let mut query = select_by_id::<E>(id);
        let row = query.build_query_as::<E>().fetch_optional(&mut *conn).await?;
        Ok(row)
    }

    /// Fetches at most `limit` rows after skipping `skip`, in the store's
    /// default order.
    pub async fn list(&self, conn: &mut SqliteConnection, skip: u32, limit: u32) -> AppResult<Vec<E>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT * FROM {} LIMIT ", quote_ident(E::TABLE)));
        query.push_bind(i64::from(limit)).push(" OFFSET ").push_bind(i64::from(skip));
        let rows = query.build_query_as::<E>().fetch_all(&mut *conn).await?;
        Ok(rows)
    }

    /// The first [`DEFAULT_LIMIT`] rows.
    pub async fn list_default(&self, conn: &mut SqliteConnection) -> AppResult<Vec<E>> {
        self.list(conn, 0, DEFAULT_LIMIT).await
    }

    /// Inserts every field of `input` and returns the stored row, including
    /// generated ids and database defaults. Constraint violations surface as
    /// [`crate::error::AppError::Database`].
    pub async fn create(&self, conn: &mut SqliteConnection, input: &C) -> AppResult<E> {
        let fields = changeset(input)?;
        let mut query = QueryBuilder::<Sqlite>::new(format!("INSERT INTO {}", quote_ident(E::TABLE)));
        if fields.is_empty() {
            query.push(" DEFAULT VALUES");
        } else {
            let columns: Vec<String> = fields.iter().map(|(name, _)| quote_ident(name)).collect();
            query.push(" (").push(columns.join(", ")).push(") VALUES (");
            for (i, (_, value)) in fields.into_iter().enumerate() {
                if i > 0 {
                    query.push(", ");
                }
                bind_value(&mut query, value)?;
            }
            query.push(")");
        }
        query.push(" RETURNING *");
        let row = query.build_query_as::<E>().fetch_one(&mut *conn).await?;
        Ok(row)
    }

    /// Writes the fields present in `input` onto `existing` and returns the
    /// refreshed row. Fields missing from `input` keep their stored values.
    pub async fn update(&self, conn: &mut SqliteConnection, existing: &E, input: &U) -> AppResult<E> {
        let fields = changeset(input)?;
        let touch = E::MODIFIED_AT.filter(|column| !fields.iter().any(|(name, _)| name.as_str() == *column));

        if fields.is_empty() && touch.is_none() {
            let mut query = select_by_id::<E>(existing.id());
            let row = query.build_query_as::<E>().fetch_one(&mut *conn).await?;
            return Ok(row);
        }

        let mut query = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET ", quote_ident(E::TABLE)));
        let mut first = true;
        for (name, value) in fields {
            if !first {
                query.push(", ");
            }
            first = false;
            query.push(quote_ident(&name)).push(" = ");
            bind_value(&mut query, value)?;
        }
        if let Some(column) = touch {
            if !first {
                query.push(", ");
            }
            query.push(quote_ident(column)).push(" = CURRENT_TIMESTAMP");
        }
        query
            .push(" WHERE ")
            .push(quote_ident(E::PRIMARY_KEY))
            .push(" = ")
            .push_bind(existing.id())
            .push(" RETURNING *");
        let row = query.build_query_as::<E>().fetch_one(&mut *conn).await?;
        Ok(row)
    }

    /// Deletes the row with `id` and returns what it held, or `None` if there
    /// was no such row.
    pub async fn remove(&self, conn: &mut SqliteConnection, id: E::Id) -> AppResult<Option<E>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "DELETE FROM {} WHERE {} = ",
            quote_ident(E::TABLE),
            quote_ident(E::PRIMARY_KEY)
        ));
        query.push_bind(id).push(" RETURNING *");
        let row = query.build_query_as::<E>().fetch_optional(&mut *conn).await?;
        Ok(row)
    }
}

fn select_by_id<E: Entity>(id: E::Id) -> QueryBuilder<'static, Sqlite> {
    let mut query = QueryBuilder::new(format!(
        "SELECT * FROM {} WHERE {} = ",
        quote_ident(E::TABLE),
        quote_ident(E::PRIMARY_KEY)
    ));
    query.push_bind(id);
    query
}

/// Column/value pairs of a serializable input.
fn changeset<T: Serialize>(input: &T) -> AppResult<Vec<(String, Value)>> {
    match serde_json::to_value(input).context("failed to serialize input")? {
        Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(anyhow::anyhow!("expected an object of column values, got {}", other).into()),
    }
}

/// JSON scalars bind as their SQLite counterparts; arrays and objects are
/// stored as JSON text. Integers outside the `i64` range are rejected
/// instead of being stored as a lossy REAL.
fn bind_value(query: &mut QueryBuilder<'_, Sqlite>, value: Value) -> AppResult<()> {
    match value {
        Value::Null => query.push_bind(Option::<String>::None),
        Value::Bool(flag) => query.push_bind(flag),
        Value::Number(number) => match number.as_i64() {
            Some(int) => query.push_bind(int),
            None if number.is_f64() => query.push_bind(number.as_f64()),
            None => return Err(anyhow::anyhow!("integer {} does not fit in a 64-bit column", number).into()),
        },
        Value::String(text) => query.push_bind(text),
        other => query.push_bind(other.to_string()),
    };
    Ok(())
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
