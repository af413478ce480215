use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A row in one of the catalog's trees.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Sled tree holding this record type.
    const TREE: &'static str;
    /// Human-readable kind used in errors.
    const KIND: &'static str;

    fn id(&self) -> Option<u64>;

    fn assign_id(&mut self, id: u64);

    /// Id of the record owning this one, used to scope paginated listings.
    fn scope_id(&self) -> Option<u64> {
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    #[serde(default)]
    pub id: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
}

impl Product {
    pub fn new(name: impl Into<String>, brand: impl Into<String>, price: f64) -> Self {
        Self {
            id: None,
            name: name.into(),
            brand: brand.into(),
            description: String::new(),
            price,
        }
    }
}

impl Record for Product {
    const TREE: &'static str = "products";
    const KIND: &'static str = "Product";

    fn id(&self) -> Option<u64> {
        self.id
    }

    fn assign_id(&mut self, id: u64) {
        self.id = Some(id);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Client {
    #[serde(default)]
    pub id: Option<u64>,
    pub name: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Client {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

impl Record for Client {
    const TREE: &'static str = "clients";
    const KIND: &'static str = "Client";

    fn id(&self) -> Option<u64> {
        self.id
    }

    fn assign_id(&mut self, id: u64) {
        self.id = Some(id);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    #[serde(default)]
    pub id: Option<u64>,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub client_id: Option<u64>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: impl Into<String>, client_id: Option<u64>) -> Self {
        Self {
            id: None,
            email: email.into(),
            first_name: String::new(),
            last_name: String::new(),
            client_id,
            created_at: Utc::now(),
        }
    }
}

impl Record for User {
    const TREE: &'static str = "users";
    const KIND: &'static str = "User";

    fn id(&self) -> Option<u64> {
        self.id
    }

    fn assign_id(&mut self, id: u64) {
        self.id = Some(id);
    }

    fn scope_id(&self) -> Option<u64> {
        self.client_id
    }
}
