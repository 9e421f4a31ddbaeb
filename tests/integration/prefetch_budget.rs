use std::sync::Arc;

use treecache::backend::{BackendRecord, MemoryBackend};
use treecache::cache::CachedTree;
use treecache::prefetch::{
    BackendRecordConverter, CacheStoringPrefetchContext, ConverterPrefetchContext, LimitingPrefetchContext,
    PrefetchCrawler, PrefetchLimits, PrefetchNodeDataContext, ProposalPolicy,
};
use treecache::{NodeData, NodeNamesPath, TreeData};

fn path(text: &str) -> NodeNamesPath {
    NodeNamesPath::parse(text)
}

fn sink(cache: &Arc<CachedTree>) -> Arc<dyn PrefetchNodeDataContext<NodeData>> {
    Arc::new(CacheStoringPrefetchContext::new(
        Arc::clone(cache),
        ProposalPolicy::Complete,
    ))
}

fn record_context(
    cache: &Arc<CachedTree>,
    limits: PrefetchLimits,
    outer_ceiling_millis: i64,
) -> Arc<dyn PrefetchNodeDataContext<BackendRecord>> {
    let limiting: Arc<dyn PrefetchNodeDataContext<NodeData>> =
        Arc::new(LimitingPrefetchContext::root(sink(cache), limits, outer_ceiling_millis));
    Arc::new(ConverterPrefetchContext::new(Arc::new(BackendRecordConverter), limiting))
}

#[test]
fn count_and_depth_predicates() {
    let cache = Arc::new(CachedTree::default());
    let limits = PrefetchLimits {
        max_count: 3,
        max_recurse_level: 2,
        max_duration_millis: -1,
    };
    let root = LimitingPrefetchContext::root(sink(&cache), limits, 0);

    root.incr_prefetch_count(1);
    root.incr_prefetch_count(1);
    assert!(root.accept_prefetch_node_datas());
    root.incr_prefetch_count(1);
    assert!(!root.accept_prefetch_node_datas());

    let fresh = LimitingPrefetchContext::root(sink(&cache), limits, 0);
    let child = fresh.create_child_prefetch_context();
    let grandchild = child.create_child_prefetch_context();
    assert!(child.accept_recurse_propose_prefetch_path_items());
    assert!(!grandchild.accept_recurse_propose_prefetch_path_items());
}

#[tokio::test]
async fn count_budget_bounds_stored_records() {
    let backend = Arc::new(MemoryBackend::new().with_inline_child_records(true));
    for i in 0..10 {
        backend.add_file(&format!("/r/f{}", i), i);
    }
    let cache = Arc::new(CachedTree::default());
    let crawler = PrefetchCrawler::new(Arc::clone(&backend), 4);
    let limits = PrefetchLimits {
        max_count: 3,
        max_recurse_level: -1,
        max_duration_millis: -1,
    };

    let report = crawler.prefetch(&path("/r"), record_context(&cache, limits, 0)).await;

    assert_eq!(report.listed, 1);
    assert_eq!(report.proposals_completed, 2);
    assert_eq!(report.proposals_ignored, 8);
    assert_eq!(cache.len(), 3);
    // Inline records need no extra backend calls
    assert_eq!(backend.stat_calls(), 0);
}

#[tokio::test]
async fn depth_budget_stops_below_limit() {
    let backend = Arc::new(MemoryBackend::new());
    backend.add_file("/r/d1/d2/f", 1);
    let cache = Arc::new(CachedTree::default());
    let crawler = PrefetchCrawler::new(Arc::clone(&backend), 4);

    let limits = PrefetchLimits {
        max_count: -1,
        max_recurse_level: 1,
        max_duration_millis: -1,
    };
    crawler.prefetch(&path("/r"), record_context(&cache, limits, 0)).await;
    assert!(cache.get(&path("/r/d1")).unwrap().is_some());
    assert!(cache.get(&path("/r/d1/d2")).unwrap().is_none());

    let limits = PrefetchLimits {
        max_recurse_level: 2,
        ..limits
    };
    crawler.prefetch(&path("/r"), record_context(&cache, limits, 0)).await;
    assert!(cache.get(&path("/r/d1/d2")).unwrap().is_some());
    assert!(cache.get(&path("/r/d1/d2/f")).unwrap().is_none());
}

#[tokio::test]
async fn expired_outer_ceiling_stops_everything() {
    let backend = Arc::new(MemoryBackend::new());
    backend.add_file("/r/f", 1);
    let cache = Arc::new(CachedTree::default());
    let crawler = PrefetchCrawler::new(Arc::clone(&backend), 4);

    let report = crawler
        .prefetch(&path("/r"), record_context(&cache, PrefetchLimits::UNLIMITED, 1))
        .await;

    assert_eq!(report.listed, 0);
    assert_eq!(report.budget_stops, 1);
    assert_eq!(backend.list_calls(), 0);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn failing_branch_does_not_abort_siblings() {
    let backend = Arc::new(MemoryBackend::new());
    backend.add_file("/r/bad/f", 1);
    backend.add_file("/r/good/f", 1);
    backend.fail_on("/r/bad");
    let cache = Arc::new(CachedTree::default());
    let crawler = PrefetchCrawler::new(Arc::clone(&backend), 2);

    let report = crawler
        .prefetch(&path("/r"), record_context(&cache, PrefetchLimits::UNLIMITED, 0))
        .await;

    assert_eq!(report.errors, 1);
    assert!(cache.get(&path("/r/good/f")).unwrap().is_some());
    assert!(cache.get(&path("/r/bad")).unwrap().is_none());
}
