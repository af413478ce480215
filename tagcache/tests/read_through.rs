use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tagcache::{CacheKey, CacheManager, EntryStore, MemoryStore, Tag};

fn cache() -> CacheManager {
    CacheManager::new("products", Arc::new(MemoryStore::new()))
}

fn tags(names: &[&str]) -> Vec<Tag> {
    names.iter().map(|n| Tag::from(*n)).collect()
}

async fn compute_counted(
    cache: &CacheManager,
    key: &str,
    tag_names: &[&str],
    payload: &'static [u8],
    calls: &AtomicUsize,
) -> Bytes {
    cache
        .get_or_compute(&CacheKey::from(key), &tags(tag_names), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, shared::Error>(Bytes::from_static(payload))
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn hit_returns_stored_value_verbatim() {
    let cache = cache();
    let first_calls = AtomicUsize::new(0);
    let second_calls = AtomicUsize::new(0);

    let p = compute_counted(&cache, "k", &["A"], b"[1,2,3]", &first_calls).await;
    let again = compute_counted(&cache, "k", &["B"], b"different", &second_calls).await;

    assert_eq!(p, Bytes::from_static(b"[1,2,3]"));
    assert_eq!(again, p);
    assert_eq!(first_calls.load(Ordering::SeqCst), 1);
    assert_eq!(second_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn invalidation_is_scoped_to_its_tag() {
    let cache = cache();
    let calls = AtomicUsize::new(0);
    compute_counted(&cache, "k1", &["A"], b"one", &calls).await;
    compute_counted(&cache, "k2", &["B"], b"two", &calls).await;

    cache.invalidate(&Tag::from("A")).await.unwrap();

    let recompute = AtomicUsize::new(0);
    let k2 = compute_counted(&cache, "k2", &["B"], b"fresh", &recompute).await;
    assert_eq!(k2, Bytes::from_static(b"two"));
    assert_eq!(recompute.load(Ordering::SeqCst), 0);

    let k1 = compute_counted(&cache, "k1", &["A"], b"fresh", &recompute).await;
    assert_eq!(k1, Bytes::from_static(b"fresh"));
    assert_eq!(recompute.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn invalidation_removes_the_whole_entry() {
    let cache = cache();
    let calls = AtomicUsize::new(0);
    compute_counted(&cache, "k", &["A", "B"], b"both", &calls).await;

    cache.invalidate(&Tag::from("A")).await.unwrap();

    let index = cache.store().tag_index();
    assert!(index.keys_for(&Tag::from("B")).is_empty());
    assert_eq!(cache.store().get(&CacheKey::from("k")).await.unwrap(), None);

    compute_counted(&cache, "k", &["A", "B"], b"again", &calls).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn invalidation_is_idempotent() {
    let cache = cache();
    let calls = AtomicUsize::new(0);
    compute_counted(&cache, "k1", &["A"], b"one", &calls).await;
    compute_counted(&cache, "k2", &["B"], b"two", &calls).await;

    assert_eq!(cache.invalidate(&Tag::from("A")).await.unwrap(), 1);
    assert_eq!(cache.invalidate(&Tag::from("A")).await.unwrap(), 0);
    assert_eq!(cache.invalidate(&Tag::from("never-used")).await.unwrap(), 0);

    let untouched = cache.store().get(&CacheKey::from("k2")).await.unwrap();
    assert_eq!(untouched, Some(Bytes::from_static(b"two")));
}

#[derive(Debug, PartialEq)]
enum QueryError {
    Unavailable,
    Cache(String),
}

impl From<shared::Error> for QueryError {
    fn from(err: shared::Error) -> Self {
        QueryError::Cache(err.to_string())
    }
}

#[tokio::test]
async fn compute_failure_leaves_cache_unchanged() {
    let cache = cache();
    let key = CacheKey::from("k");

    let failed = cache
        .get_or_compute(&key, &tags(&["A"]), || async {
            Err::<Bytes, _>(QueryError::Unavailable)
        })
        .await;
    assert_eq!(failed, Err(QueryError::Unavailable));
    assert_eq!(cache.store().entry_count(), 0);
    assert!(cache.store().tag_index().keys_for(&Tag::from("A")).is_empty());

    let retry_calls = AtomicUsize::new(0);
    let payload = compute_counted(&cache, "k", &["A"], b"recovered", &retry_calls).await;
    assert_eq!(payload, Bytes::from_static(b"recovered"));
    assert_eq!(retry_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn compute_failure_keeps_prior_value() {
    let cache = cache();
    let calls = AtomicUsize::new(0);
    compute_counted(&cache, "k", &["A"], b"old", &calls).await;

    // A hit never reaches the failing compute.
    let result = cache
        .get_or_compute(&CacheKey::from("k"), &tags(&["A"]), || async {
            Err::<Bytes, _>(QueryError::Unavailable)
        })
        .await;
    assert_eq!(result, Ok(Bytes::from_static(b"old")));
}

#[derive(Clone, serde::Serialize)]
struct Product {
    id: u64,
    name: String,
}

fn query_page(products: &Mutex<Vec<Product>>, page: usize, limit: usize) -> shared::Result<Bytes> {
    let products = products.lock().unwrap();
    let slice: Vec<Product> = products
        .iter()
        .skip((page - 1) * limit)
        .take(limit)
        .cloned()
        .collect();
    serde_json::to_vec(&slice)
        .map(Bytes::from)
        .map_err(|e| shared::Error::Serialization(e.to_string()))
}

#[tokio::test]
async fn product_listing_recomputes_after_create() {
    let cache = cache();
    let products_tag = [Tag::from("productsCache")];
    let key = CacheKey::for_page("products", 1, 3, None, None);
    assert_eq!(key.as_str(), "products-p1-l3");

    let products = Arc::new(Mutex::new(vec![
        Product { id: 1, name: "Phone A".into() },
        Product { id: 2, name: "Phone B".into() },
    ]));

    let first = cache
        .get_or_compute(&key, &products_tag, || {
            let products = products.clone();
            async move { query_page(&products, 1, 3) }
        })
        .await
        .unwrap();
    let listed: Vec<serde_json::Value> = serde_json::from_slice(&first).unwrap();
    assert_eq!(listed.len(), 2);

    // Create a product, then invalidate as the write path does.
    products.lock().unwrap().push(Product { id: 3, name: "Phone C".into() });

    let stale = cache
        .get_or_compute(&key, &products_tag, || {
            let products = products.clone();
            async move { query_page(&products, 1, 3) }
        })
        .await
        .unwrap();
    assert_eq!(stale, first);

    cache.invalidate(&products_tag[0]).await.unwrap();

    let fresh = cache
        .get_or_compute(&key, &products_tag, || {
            let products = products.clone();
            async move { query_page(&products, 1, 3) }
        })
        .await
        .unwrap();
    let listed: Vec<serde_json::Value> = serde_json::from_slice(&fresh).unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[2]["name"], "Phone C");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_fill_and_invalidate_leave_index_consistent() {
    let cache = cache();
    let tag = Tag::from("usersCache");

    let fillers: Vec<_> = (0..4)
        .map(|worker| {
            let cache = cache.clone();
            let tag = tag.clone();
            tokio::spawn(async move {
                for i in 0..100 {
                    let key = CacheKey::new(format!("users-p{}-l3", (worker + i) % 5));
                    cache
                        .get_or_compute(&key, &[tag.clone()], || async {
                            Ok::<_, shared::Error>(Bytes::from_static(b"[]"))
                        })
                        .await
                        .unwrap();
                }
            })
        })
        .collect();
    let invalidators: Vec<_> = (0..2)
        .map(|_| {
            let cache = cache.clone();
            let tag = tag.clone();
            tokio::spawn(async move {
                for _ in 0..100 {
                    cache.invalidate(&tag).await.unwrap();
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    futures::future::join_all(fillers.into_iter().chain(invalidators)).await;

    let store = cache.store();
    let indexed = store.tag_index().keys_for(&tag);
    for page in 0..5 {
        let key = CacheKey::new(format!("users-p{}-l3", page));
        let stored = store.get(&key).await.unwrap().is_some();
        assert_eq!(indexed.contains(&key), stored, "key {} out of sync", key);
    }
    assert_eq!(indexed.len() as u64, store.entry_count());
}
