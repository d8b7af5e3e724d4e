use sqlx::{self, postgres::PgRow, FromRow, PgPool};

use crate::database::query_builder::QueryBuilder;
use crate::database::queries::CollectionQuery;
use crate::database::store::StoreError;
use crate::types::Page;

/// Read side of one collection: runs typed queries and converts raw rows
/// into domain records
pub struct Repository<R> {
    pool: PgPool,
    _phantom: std::marker::PhantomData<R>,
}

impl<R> Repository<R>
where
    R: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _phantom: std::marker::PhantomData,
        }
    }

    pub async fn select_one<Q, T>(&self, query: &Q) -> Result<Option<T>, StoreError>
    where
        Q: CollectionQuery<Record = T>,
        T: TryFrom<R, Error = StoreError>,
    {
        let filter = query.to_filter()?.limit(1, None)?;
        QueryBuilder::<R>::new(filter)
            .select_optional(&self.pool)
            .await?
            .map(T::try_from)
            .transpose()
    }

    pub async fn select_any<Q, T>(&self, query: &Q, page: Page) -> Result<Vec<T>, StoreError>
    where
        Q: CollectionQuery<Record = T>,
        T: TryFrom<R, Error = StoreError>,
    {
        QueryBuilder::<R>::new(query.to_listing(Some(page))?)
            .select_all(&self.pool)
            .await?
            .into_iter()
            .map(T::try_from)
            .collect()
    }
}
