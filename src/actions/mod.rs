//! Mutation layer: one function per (entity, operation). Every action that
//! touches more than one row runs inside a single transaction, and every
//! action returns `Result<_, ActionError>` so the HTTP layer has one
//! uniform success/failure contract to normalize.

use sqlx::{Postgres, Transaction};
use thiserror::Error;

pub mod cascade;
pub mod catalog;
pub mod community;
pub mod lessons;
pub mod payments;
pub mod people;
pub mod records;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("{0}")]
    Validation(String),

    /// Business precondition failed (class at capacity, duplicate
    /// username, payment not in a transitionable state, ...).
    #[error("{0}")]
    Precondition(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

impl From<crate::auth::AuthError> for ActionError {
    fn from(err: crate::auth::AuthError) -> Self {
        ActionError::Internal(err.to_string())
    }
}

pub type ActionResult<T> = Result<T, ActionError>;

/// Username uniqueness pre-check, run inside the caller's transaction so
/// the check and the insert see the same state.
pub(crate) async fn ensure_username_free(
    tx: &mut Transaction<'_, Postgres>,
    username: &str,
) -> ActionResult<()> {
    let taken: Option<(uuid::Uuid,)> =
        sqlx::query_as("SELECT id FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&mut **tx)
            .await?;
    if taken.is_some() {
        return Err(ActionError::Precondition(format!(
            "username '{}' is already taken",
            username
        )));
    }
    Ok(())
}
