use catalog::{PageRequest, Projection};
use tagcache::{CacheKey, Tag};

pub const PRODUCTS_CACHE: &str = "productsCache";
pub const USERS_CACHE: &str = "usersCache";

pub fn products_tag() -> Tag {
    Tag::from(PRODUCTS_CACHE)
}

pub fn users_tag() -> Tag {
    Tag::from(USERS_CACHE)
}

pub fn products_page(page: PageRequest) -> CacheKey {
    CacheKey::for_page("products", page.page, page.limit, None, None)
}

pub fn client_users_page(client_id: u64, page: PageRequest, projection: Projection) -> CacheKey {
    CacheKey::for_page(
        "users",
        page.page,
        page.limit,
        Some(client_id),
        Some(projection.name()),
    )
}
