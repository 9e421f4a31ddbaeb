use std::sync::Arc;

use treecache::backend::MemoryBackend;
use treecache::cache::{CacheConfig, CachedTree};
use treecache::overlay::InMemoryOverrideTree;
use treecache::prefetch::PrefetchConfig;
use treecache::{NodeName, NodeNamesPath, TreeCache, TreeData};

fn path(text: &str) -> NodeNamesPath {
    NodeNamesPath::parse(text)
}

fn tree_cache(backend: Arc<MemoryBackend>) -> TreeCache<MemoryBackend, InMemoryOverrideTree> {
    TreeCache::new(
        backend,
        Arc::new(CachedTree::new(CacheConfig::default())),
        Arc::new(InMemoryOverrideTree::new()),
        PrefetchConfig::default(),
    )
}

#[tokio::test]
async fn removed_child_is_absent_while_sibling_is_served_from_base() {
    let backend = Arc::new(MemoryBackend::new());
    backend.add_file("/a/x", 10);
    backend.add_file("/a/y", 20);
    let cache = tree_cache(Arc::clone(&backend));
    cache.prefetch(&path("/a")).await;

    let a = cache.union().get(&path("/a")).unwrap().unwrap();
    let names: Vec<&str> = a.child_names.iter().map(NodeName::as_str).collect();
    assert_eq!(names, vec!["x", "y"]);

    cache.remove(&path("/a/x")).unwrap();

    assert!(cache.union().get(&path("/a/x")).unwrap().is_none());
    let y = cache.union().get(&path("/a/y")).unwrap().unwrap();
    assert_eq!(y.external_length, 20);
    // The base still holds the backend truth
    assert!(cache.base().get(&path("/a/x")).unwrap().is_some());
}

#[tokio::test]
async fn refresh_after_backend_delete_evicts_subtree() {
    let backend = Arc::new(MemoryBackend::new());
    backend.add_file("/d/gone/deep", 1);
    backend.add_file("/d/kept", 1);
    let cache = tree_cache(Arc::clone(&backend));
    cache.prefetch(&path("/d")).await;
    assert!(cache.base().get(&path("/d/gone/deep")).unwrap().is_some());

    backend.delete("/d/gone");
    cache.prefetch(&path("/d")).await;

    assert!(cache.base().get(&path("/d/gone")).unwrap().is_none());
    assert!(cache.base().get(&path("/d/gone/deep")).unwrap().is_none());
    assert!(cache.base().get(&path("/d/kept")).unwrap().is_some());
}

#[tokio::test]
async fn paged_listing_resolves_to_complete_dir() {
    let backend = Arc::new(MemoryBackend::new().with_page_size(2));
    for name in ["a", "b", "c"] {
        backend.add_file(&format!("/p/{}", name), 1);
    }
    let cache = tree_cache(Arc::clone(&backend));
    let report = cache.prefetch(&path("/p")).await;
    assert_eq!(report.pages, 2);

    let partial = cache.get_partial(&path("/p"));
    assert!(partial.is_complete_child_names);
    assert_eq!(partial.child_names_present.len(), 3);
    assert!(partial.data_if_present.is_some());

    let calls = backend.list_calls();
    let p = cache.get(&path("/p")).await.unwrap().unwrap();
    assert_eq!(p.child_names.len(), 3);
    assert!(cache.get(&path("/p")).await.unwrap().is_some());
    assert_eq!(backend.list_calls(), calls);
}

#[tokio::test]
async fn lazy_get_pages_through_directory() {
    let backend = Arc::new(MemoryBackend::new().with_page_size(2));
    for name in ["a", "b", "c", "d", "e"] {
        backend.add_file(&format!("/p/{}", name), 1);
    }
    let cache = tree_cache(Arc::clone(&backend));

    let p = cache.get(&path("/p")).await.unwrap().unwrap();
    assert_eq!(p.child_names.len(), 5);
    assert_eq!(backend.list_calls(), 3);
    cache.get(&path("/p")).await.unwrap();
    assert_eq!(backend.list_calls(), 3);
}

#[tokio::test]
async fn stale_records_are_refreshed() {
    let backend = Arc::new(MemoryBackend::new());
    backend.add_file("/s/f", 1);
    let cache = TreeCache::new(
        Arc::clone(&backend),
        Arc::new(CachedTree::new(CacheConfig { max_age_millis: 0 })),
        Arc::new(InMemoryOverrideTree::new()),
        PrefetchConfig::default(),
    );
    cache.prefetch(&path("/s")).await;
    let calls = backend.list_calls();

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let refreshed = cache.refresh_stale().await;
    assert_eq!(refreshed, 2);
    assert!(backend.list_calls() > calls);
}
