use crate::error::CatalogError;
use crate::models::Record;
use crate::pagination::PageRequest;
use async_trait::async_trait;

#[async_trait]
pub trait Repository<R: Record>: Send + Sync {
    /// One page of records in id order, optionally restricted to those whose
    /// `scope_id` equals `scope`.
    async fn find_all_with_pagination(
        &self,
        page: PageRequest,
        scope: Option<u64>,
    ) -> Result<Vec<R>, CatalogError>;

    /// All records in id order
    async fn find_all(&self) -> Result<Vec<R>, CatalogError>;

    async fn find_one_by_id(&self, id: u64) -> Result<Option<R>, CatalogError>;

    /// Persists the record, assigning an id when it has none. Records that
    /// already carry an id are overwritten.
    async fn add(&self, record: R) -> Result<R, CatalogError>;

    /// Deletes the record. Returns whether it existed.
    async fn remove(&self, record: &R) -> Result<bool, CatalogError>;
}
