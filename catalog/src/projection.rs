use crate::error::CatalogError;
use crate::models::{Client, User};
use crate::repository::Repository;
use bytes::Bytes;
use serde::Serialize;
use std::collections::HashMap;

/// Output shape applied before a response is cached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Projection {
    /// The stored record as is
    Record,
    /// Users with their client embedded as `{id, name}`
    GetUsers,
}

impl Projection {
    pub fn name(&self) -> &'static str {
        match self {
            Projection::Record => "record",
            Projection::GetUsers => "getUsers",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClientSummary {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserView {
    pub id: Option<u64>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub client: Option<ClientSummary>,
}

impl UserView {
    pub fn project(user: User, client: Option<&Client>) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            client: client.and_then(|c| {
                c.id.map(|id| ClientSummary {
                    id,
                    name: c.name.clone(),
                })
            }),
        }
    }
}

/// Projects users through [`Projection::GetUsers`], loading each distinct
/// client once.
pub async fn user_views<C>(users: Vec<User>, clients: &C) -> Result<Vec<UserView>, CatalogError>
where
    C: Repository<Client> + ?Sized,
{
    let mut loaded: HashMap<u64, Option<Client>> = HashMap::new();
    for client_id in users.iter().filter_map(|u| u.client_id) {
        if !loaded.contains_key(&client_id) {
            let client = clients.find_one_by_id(client_id).await?;
            loaded.insert(client_id, client);
        }
    }

    Ok(users
        .into_iter()
        .map(|user| {
            let client = user
                .client_id
                .and_then(|id| loaded.get(&id))
                .and_then(Option::as_ref);
            UserView::project(user, client)
        })
        .collect())
}

/// Serializes a response body to JSON bytes.
pub fn encode_payload<T: Serialize + ?Sized>(value: &T) -> Result<Bytes, CatalogError> {
    Ok(Bytes::from(serde_json::to_vec(value)?))
}
