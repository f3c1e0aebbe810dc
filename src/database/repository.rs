use serde::Serialize;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{FromRow, PgPool};

use crate::database::manager::DatabaseError;
use crate::filter::{ListSelect, Param, Predicate};

/// Read-side access for one table or view. List reads run the row fetch
/// and the count in a single transaction so the page and the reported
/// total come from the same snapshot.
pub struct Repository<T> {
    pool: PgPool,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Repository<T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin + Serialize,
{
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _phantom: std::marker::PhantomData,
        }
    }

    pub async fn list_page(&self, select: &ListSelect) -> Result<(Vec<T>, i64), DatabaseError> {
        let rows_sql = select.to_sql();
        let count_sql = select.to_count_sql();

        let mut tx = self.pool.begin().await?;

        let mut query = sqlx::query_as::<_, T>(&rows_sql.query);
        for param in &rows_sql.params {
            query = bind_query_as(query, param);
        }
        let rows = query.fetch_all(&mut *tx).await?;

        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql.query);
        for param in &count_sql.params {
            count_query = bind_scalar(count_query, param);
        }
        let total = count_query.fetch_one(&mut *tx).await?;

        tx.commit().await?;
        Ok((rows, total))
    }

    /// Fetch a single row through the same predicate machinery the list
    /// path uses, so detail pages stay role-scoped.
    pub async fn find_scoped(
        &self,
        table: &'static str,
        predicate: Predicate,
    ) -> Result<Option<T>, DatabaseError> {
        let select = ListSelect::new(table)
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?
            .predicate(predicate);
        let sql = select.to_sql();
        let mut query = sqlx::query_as::<_, T>(&sql.query);
        for param in &sql.params {
            query = bind_query_as(query, param);
        }
        Ok(query.fetch_optional(&self.pool).await?)
    }

    pub async fn find_scoped_404(
        &self,
        table: &'static str,
        predicate: Predicate,
    ) -> Result<T, DatabaseError> {
        self.find_scoped(table, predicate)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Record not found".to_string()))
    }
}

fn bind_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    param: &'q Param,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    match param {
        Param::Text(s) => q.bind(s),
        Param::Int(i) => q.bind(*i),
        Param::Bool(b) => q.bind(*b),
        Param::Uuid(u) => q.bind(*u),
        Param::Date(d) => q.bind(*d),
        Param::Decimal(d) => q.bind(*d),
    }
}

fn bind_scalar<'q>(
    q: sqlx::query::QueryScalar<'q, sqlx::Postgres, i64, PgArguments>,
    param: &'q Param,
) -> sqlx::query::QueryScalar<'q, sqlx::Postgres, i64, PgArguments> {
    match param {
        Param::Text(s) => q.bind(s),
        Param::Int(i) => q.bind(*i),
        Param::Bool(b) => q.bind(*b),
        Param::Uuid(u) => q.bind(*u),
        Param::Date(d) => q.bind(*d),
        Param::Decimal(d) => q.bind(*d),
    }
}
