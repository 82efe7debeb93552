use std::ops::{Deref, DerefMut};

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection};

use crate::error::AppError;
use crate::state::AppState;

/// One pooled database connection, owned by a single request.
///
/// Taking `DbSession` as a handler argument checks a connection out of
/// [`AppState::db`]. It goes back to the pool when the value is dropped, which
/// happens however the handler ends: normal return, error, panic, or the
/// client going away mid-request. A transaction begun on the session and not
/// committed is rolled back on drop.
///
/// ```ignore
/// async fn show(mut db: DbSession, Path(id): Path<i64>) -> AppResult<Json<User>> {
///     let user = USERS.get(&mut db, id).await?.ok_or_api(ApiError::user_not_found())?;
///     Ok(Json(user))
/// }
/// ```
#[derive(Debug)]
pub struct DbSession(PoolConnection<Sqlite>);

impl DbSession {
    pub fn into_inner(self) -> PoolConnection<Sqlite> {
        self.0
    }
}

impl Deref for DbSession {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DbSession {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<S> FromRequestParts<S> for DbSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let conn = state.db.acquire().await?;
        Ok(DbSession(conn))
    }
}
