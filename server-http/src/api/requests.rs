use catalog::{CatalogError, PageRequest};
use serde::Deserialize;

/// `?page=&limit=` on listing routes
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl PageQuery {
    pub fn resolve(&self, default_limit: u32) -> Result<PageRequest, CatalogError> {
        PageRequest::new(self.page.unwrap_or(1), self.limit.unwrap_or(default_limit))
    }
}

#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
}

#[derive(Debug, Deserialize)]
pub struct UserRequest {
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub client_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ClientRequest {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_defaults() {
        let page = PageQuery::default().resolve(3).unwrap();
        assert_eq!((page.page, page.limit), (1, 3));

        let page = PageQuery {
            page: Some(2),
            limit: None,
        }
        .resolve(5)
        .unwrap();
        assert_eq!((page.page, page.limit), (2, 5));
    }

    #[test]
    fn test_configured_default_limit_always_resolves() {
        let config = shared::config::Config::from_lookup(|name| {
            (name == "BILEMO_PAGE_LIMIT").then(|| "500".to_string())
        });
        let page = PageQuery::default()
            .resolve(config.default_page_limit)
            .unwrap();
        assert_eq!(page.limit, 3);
    }

    #[test]
    fn test_page_query_rejects_zero() {
        let query = PageQuery {
            page: Some(0),
            limit: Some(3),
        };
        assert!(query.resolve(3).is_err());
    }
}
