use crate::api::{JsonBytes, UserRequest};
use crate::cache_keys;
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use catalog::{encode_payload, user_views, Record, User, UserView};

/// GET /api/users
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserView>>, ApiError> {
    let users = state.users.find_all().await?;
    Ok(Json(user_views(users, state.clients.as_ref()).await?))
}

/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<UserView>, ApiError> {
    let user = find_user(&state, id).await?;
    Ok(Json(project(&state, user).await?))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<UserRequest>,
) -> Result<JsonBytes, ApiError> {
    validate(&request)?;

    let mut user = User::new(request.email, known_client(&state, request.client_id).await?);
    user.first_name = request.first_name;
    user.last_name = request.last_name;

    let user = state.users.add(user).await?;
    state.cache.invalidate(&cache_keys::users_tag()).await?;

    let id = user.id().ok_or(catalog::CatalogError::MissingId)?;
    tracing::info!("Created user {} (client {:?})", id, user.client_id);
    let view = project(&state, user).await?;
    Ok(JsonBytes::created(
        encode_payload(&view)?,
        format!("/api/users/{}", id),
    ))
}

/// PUT /api/users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<UserRequest>,
) -> Result<StatusCode, ApiError> {
    validate(&request)?;

    let mut user = find_user(&state, id).await?;
    user.email = request.email;
    user.first_name = request.first_name;
    user.last_name = request.last_name;
    user.client_id = known_client(&state, request.client_id).await?;

    state.users.add(user).await?;
    state.cache.invalidate(&cache_keys::users_tag()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let user = find_user(&state, id).await?;
    state.users.remove(&user).await?;
    state.cache.invalidate(&cache_keys::users_tag()).await?;

    tracing::info!("Deleted user {}", id);
    Ok(StatusCode::NO_CONTENT)
}

async fn find_user(state: &AppState, id: u64) -> Result<User, ApiError> {
    state
        .users
        .find_one_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(User::KIND, id))
}

async fn project(state: &AppState, user: User) -> Result<UserView, ApiError> {
    let client = match user.client_id {
        Some(client_id) => state.clients.find_one_by_id(client_id).await?,
        None => None,
    };
    Ok(UserView::project(user, client.as_ref()))
}

/// Unknown clients leave the user unscoped.
async fn known_client(state: &AppState, client_id: Option<u64>) -> Result<Option<u64>, ApiError> {
    let Some(client_id) = client_id else {
        return Ok(None);
    };
    match state.clients.find_one_by_id(client_id).await? {
        Some(_) => Ok(Some(client_id)),
        None => {
            tracing::warn!("Client {} does not exist, user left without client", client_id);
            Ok(None)
        }
    }
}

fn validate(request: &UserRequest) -> Result<(), ApiError> {
    if !request.email.contains('@') {
        return Err(ApiError::BadRequest("email is invalid".into()));
    }
    Ok(())
}
