use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },

    #[error("Invalid pagination: {0}")]
    InvalidPage(String),

    #[error("Record has no id")]
    MissingId,

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<sled::Error> for CatalogError {
    fn from(err: sled::Error) -> Self {
        CatalogError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::SerializationError(err.to_string())
    }
}

impl From<CatalogError> for shared::Error {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound { .. } => shared::Error::NotFound,
            CatalogError::InvalidPage(_) | CatalogError::MissingId => {
                shared::Error::InvalidArgument(err.to_string())
            }
            CatalogError::StorageError(msg) => shared::Error::Storage(msg),
            CatalogError::SerializationError(msg) => shared::Error::Serialization(msg),
        }
    }
}
