use crate::api::{JsonBytes, PageQuery, ProductDetailResponse, ProductRequest};
use crate::cache_keys;
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use catalog::{encode_payload, Product, Record};

/// GET /api/products?page=&limit=
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<JsonBytes, ApiError> {
    let page = query.resolve(state.default_page_limit)?;
    let key = cache_keys::products_page(page);
    let products = state.products.clone();

    let body = state
        .cache
        .get_or_compute(&key, &[cache_keys::products_tag()], move || async move {
            let items = products.find_all_with_pagination(page, None).await?;
            Ok::<_, ApiError>(encode_payload(&items)?)
        })
        .await?;

    Ok(JsonBytes::ok(body))
}

/// GET /api/products/{id}
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ProductDetailResponse>, ApiError> {
    let product = find_product(&state, id).await?;
    Ok(Json(ProductDetailResponse { product }))
}

/// POST /api/products
pub async fn create_product(
    State(state): State<AppState>,
    Json(request): Json<ProductRequest>,
) -> Result<JsonBytes, ApiError> {
    validate(&request)?;

    let mut product = Product::new(request.name, request.brand, request.price);
    product.description = request.description;
    let product = state.products.add(product).await?;
    state.cache.invalidate(&cache_keys::products_tag()).await?;

    let id = product.id().ok_or(catalog::CatalogError::MissingId)?;
    tracing::info!("Created product {}", id);
    Ok(JsonBytes::created(
        encode_payload(&product)?,
        format!("/api/products/{}", id),
    ))
}

/// PUT /api/products/{id}
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<ProductRequest>,
) -> Result<StatusCode, ApiError> {
    validate(&request)?;

    let mut product = find_product(&state, id).await?;
    product.name = request.name;
    product.brand = request.brand;
    product.description = request.description;
    product.price = request.price;

    state.products.add(product).await?;
    state.cache.invalidate(&cache_keys::products_tag()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/products/{id}
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let product = find_product(&state, id).await?;
    state.products.remove(&product).await?;
    state.cache.invalidate(&cache_keys::products_tag()).await?;

    tracing::info!("Deleted product {}", id);
    Ok(StatusCode::NO_CONTENT)
}

async fn find_product(state: &AppState, id: u64) -> Result<Product, ApiError> {
    state
        .products
        .find_one_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(Product::KIND, id))
}

fn validate(request: &ProductRequest) -> Result<(), ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".into()));
    }
    if !request.price.is_finite() || request.price < 0.0 {
        return Err(ApiError::BadRequest("price must be a positive number".into()));
    }
    Ok(())
}
