use crate::api::{ClientRequest, JsonBytes, PageQuery};
use crate::cache_keys;
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use catalog::{encode_payload, user_views, Client, Projection, Record};

/// POST /api/clients
pub async fn create_client(
    State(state): State<AppState>,
    Json(request): Json<ClientRequest>,
) -> Result<JsonBytes, ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".into()));
    }

    let client = state.clients.add(Client::new(request.name)).await?;
    state.cache.invalidate(&cache_keys::users_tag()).await?;

    let id = client.id().ok_or(catalog::CatalogError::MissingId)?;
    tracing::info!("Created client {}", id);
    Ok(JsonBytes::created(
        encode_payload(&client)?,
        format!("/api/clients/{}", id),
    ))
}

/// GET /api/clients/{id}
pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Client>, ApiError> {
    state
        .clients
        .find_one_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(Client::KIND, id))
}

/// GET /api/clients/{id}/users?page=&limit=
///
/// Cached per client and page under the users tag, so any user write drops
/// every client's pages.
pub async fn list_client_users(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Query(query): Query<PageQuery>,
) -> Result<JsonBytes, ApiError> {
    let page = query.resolve(state.default_page_limit)?;
    let key = cache_keys::client_users_page(id, page, Projection::GetUsers);
    let users = state.users.clone();
    let clients = state.clients.clone();

    let body = state
        .cache
        .get_or_compute(&key, &[cache_keys::users_tag()], move || async move {
            let page_users = users.find_all_with_pagination(page, Some(id)).await?;
            let views = user_views(page_users, clients.as_ref()).await?;
            Ok::<_, ApiError>(encode_payload(&views)?)
        })
        .await?;

    Ok(JsonBytes::ok(body))
}
