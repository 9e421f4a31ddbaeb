use std::collections::BTreeSet;

use tempfile::TempDir;
use treecache::overlay::{OverrideNodeData, SledOverrideTree};
use treecache::{NodeData, NodeName, NodeNamesPath, OverrideTree};

#[test]
fn overrides_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let store_path = temp_dir.path().join("overrides");
    {
        let store = SledOverrideTree::open(&store_path).unwrap();
        store.remove(&NodeNamesPath::parse("/a/x")).unwrap();
        store
            .put(
                &NodeNamesPath::parse("/a/new"),
                NodeData::file(NodeName::new("new"), 7, 0),
            )
            .unwrap();
        store.flush().unwrap();
    }

    let store = SledOverrideTree::open(&store_path).unwrap();
    assert_eq!(store.len(), 2);
    assert_eq!(
        store.get_override(&NodeNamesPath::parse("/a/x")).unwrap(),
        OverrideNodeData::Deleted
    );
    let updated = store.get_override(&NodeNamesPath::parse("/a/new")).unwrap();
    assert_eq!(updated.data().map(|d| d.external_length), Some(7));
}

#[test]
fn child_partition_matches_memory_store_semantics() {
    let store = SledOverrideTree::temporary().unwrap();
    let dir = NodeNamesPath::parse("/d");
    store.remove(&dir.child(NodeName::new("b"))).unwrap();

    let base: BTreeSet<NodeName> = ["a", "b", "c"].iter().map(|n| NodeName::new(n)).collect();
    let resolved = store.get_override_with_child(&dir, &base).unwrap();
    assert_eq!(resolved.found.get(&NodeName::new("b")), Some(&OverrideNodeData::Deleted));
    assert_eq!(resolved.not_found, vec![NodeName::new("a"), NodeName::new("c")]);

    store.clear().unwrap();
    assert!(store.is_empty());
    assert!(store.list_overrides().unwrap().is_empty());
}
