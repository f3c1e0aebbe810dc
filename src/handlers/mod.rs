//! HTTP handlers, one module per entity family.
//!
//! Every list read follows the same shape: the caller's role scope is
//! AND-ed with URL column filters and free-text search, sort keys resolve
//! against a per-entity allow-list, and the page size is fixed by config.

use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::{DatabaseManager, Repository};
use crate::error::ApiError;
use crate::filter::{ListQuery, ListSelect, OrderBy, Predicate};
use crate::middleware::Viewer;
use crate::models::Role;

pub mod assessments;
pub mod auth;
pub mod catalog;
pub mod community;
pub mod lessons;
pub mod parents;
pub mod payments;
pub mod records;
pub mod students;
pub mod teachers;

/// Page of rows plus pagination metadata.
#[derive(Debug, Serialize)]
pub struct ListPayload<T: Serialize> {
    pub items: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
}

/// Run a scoped, filtered, paged list read against one table or view.
pub(crate) async fn list_scoped<T>(
    table: &'static str,
    scope: Predicate,
    filters: Vec<Predicate>,
    search_columns: &'static [&'static str],
    sort_allowed: &'static [&'static str],
    query: &ListQuery,
) -> Result<ListPayload<T>, ApiError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin + Serialize,
{
    let mut parts = vec![scope];
    parts.extend(filters);
    if let Some(term) = query.search_term() {
        parts.push(Predicate::Search(search_columns.to_vec(), term));
    }
    let predicate = Predicate::and(parts);

    let page_size = crate::config::config().api.page_size;
    let page = query.page(page_size);
    let order = OrderBy::resolve(sort_allowed, query.sort.as_deref(), query.order.as_deref());

    let select = ListSelect::new(table)?
        .predicate(predicate)
        .order(order)
        .page(page);

    let pool = DatabaseManager::pool().await?;
    let (items, total) = Repository::<T>::new(pool).list_page(&select).await?;

    Ok(ListPayload {
        items,
        page: page.number,
        page_size,
        total,
    })
}

/// Fetch one row through the caller's scope; a row outside the scope is
/// indistinguishable from a missing one.
pub(crate) async fn find_scoped<T>(
    table: &'static str,
    scope: Predicate,
    id: impl Into<crate::filter::Param>,
) -> Result<T, ApiError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin + Serialize,
{
    let pool = DatabaseManager::pool().await?;
    let predicate = Predicate::and(vec![scope, Predicate::Eq("id", id.into())]);
    Ok(Repository::<T>::new(pool)
        .find_scoped_404(table, predicate)
        .await?)
}

/// Teachers mutate only their own lessons' assessments; admins are
/// unrestricted.
pub(crate) fn teacher_restriction(viewer: &Viewer) -> Option<Uuid> {
    match viewer.role {
        Role::Teacher => Some(viewer.id),
        _ => None,
    }
}
