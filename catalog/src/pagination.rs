use crate::error::CatalogError;

/// One-based page number and page size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub const MAX_LIMIT: u32 = shared::config::MAX_PAGE_LIMIT;

    pub fn new(page: u32, limit: u32) -> Result<Self, CatalogError> {
        if page == 0 {
            return Err(CatalogError::InvalidPage("page starts at 1".into()));
        }
        if limit == 0 || limit > Self::MAX_LIMIT {
            return Err(CatalogError::InvalidPage(format!(
                "limit must be between 1 and {}",
                Self::MAX_LIMIT
            )));
        }
        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.limit as usize
    }
}
