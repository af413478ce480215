use crate::error::CatalogError;
use crate::models::{Client, Product, Record, User};
use crate::pagination::PageRequest;
use crate::repository::Repository;
use async_trait::async_trait;
use sled::Db;
use std::marker::PhantomData;
use std::path::Path;

/// Sled database holding the products, clients and users trees.
#[derive(Clone)]
pub struct SledCatalog {
    db: Db,
}

impl SledCatalog {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// In-memory database removed on drop
    pub fn temporary() -> Result<Self, CatalogError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    pub fn products(&self) -> SledRepository<Product> {
        SledRepository::new(self.db.clone())
    }

    pub fn clients(&self) -> SledRepository<Client> {
        SledRepository::new(self.db.clone())
    }

    pub fn users(&self) -> SledRepository<User> {
        SledRepository::new(self.db.clone())
    }

    pub async fn flush(&self) -> Result<(), CatalogError> {
        self.db.flush_async().await?;
        Ok(())
    }
}

/// Records are stored as JSON under their big-endian id, so tree order is id order.
pub struct SledRepository<R> {
    db: Db,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for SledRepository<R> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: Record> SledRepository<R> {
    fn new(db: Db) -> Self {
        Self {
            db,
            _record: PhantomData,
        }
    }

    fn tree(&self) -> Result<sled::Tree, CatalogError> {
        Ok(self.db.open_tree(R::TREE)?)
    }

    fn next_id(&self) -> Result<u64, CatalogError> {
        // generate_id starts at zero; ids start at one
        Ok(self.db.generate_id()? + 1)
    }

    fn scan(&self) -> Result<impl Iterator<Item = Result<R, CatalogError>>, CatalogError> {
        Ok(self.tree()?.iter().values().map(|value| -> Result<R, CatalogError> {
            let bytes = value?;
            Ok(serde_json::from_slice::<R>(&bytes)?)
        }))
    }
}

#[async_trait]
impl<R: Record> Repository<R> for SledRepository<R> {
    async fn find_all_with_pagination(
        &self,
        page: PageRequest,
        scope: Option<u64>,
    ) -> Result<Vec<R>, CatalogError> {
        let mut records = Vec::with_capacity(page.limit as usize);
        let mut skipped = 0;

        for record in self.scan()? {
            let record = record?;
            if scope.is_some() && record.scope_id() != scope {
                continue;
            }
            if skipped < page.offset() {
                skipped += 1;
                continue;
            }
            records.push(record);
            if records.len() == page.limit as usize {
                break;
            }
        }

        tracing::debug!(
            "{} page {} (limit {}, scope {:?}): {} record(s)",
            R::KIND,
            page.page,
            page.limit,
            scope,
            records.len()
        );
        Ok(records)
    }

    async fn find_all(&self) -> Result<Vec<R>, CatalogError> {
        self.scan()?.collect()
    }

    async fn find_one_by_id(&self, id: u64) -> Result<Option<R>, CatalogError> {
        match self.tree()?.get(id.to_be_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn add(&self, mut record: R) -> Result<R, CatalogError> {
        let id = match record.id() {
            Some(id) => id,
            None => {
                let id = self.next_id()?;
                record.assign_id(id);
                id
            }
        };

        let json = serde_json::to_vec(&record)?;
        self.tree()?.insert(id.to_be_bytes(), json)?;
        Ok(record)
    }

    async fn remove(&self, record: &R) -> Result<bool, CatalogError> {
        let id = record.id().ok_or(CatalogError::MissingId)?;
        Ok(self.tree()?.remove(id.to_be_bytes())?.is_some())
    }
}
