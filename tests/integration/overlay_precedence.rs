use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;
use treecache::cache::CachedTree;
use treecache::overlay::{InMemoryOverrideTree, OverrideNodeData};
use treecache::{NodeData, NodeName, NodeNamesPath, OverrideTree, PartialTreeData, TreeData, UnionTree};

#[derive(Debug, Clone)]
enum Op {
    Put(usize, u64),
    Remove(usize),
    Forget(usize),
}

const NAMES: [&str; 4] = ["a", "b", "c", "d"];

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..NAMES.len(), 0u64..1000).prop_map(|(i, len)| Op::Put(i, len)),
        (0..NAMES.len()).prop_map(Op::Remove),
        (0..NAMES.len()).prop_map(Op::Forget),
    ]
}

fn base_with_all() -> Arc<CachedTree> {
    let base = Arc::new(CachedTree::default());
    base.put_prefetched(
        &NodeNamesPath::root(),
        NodeData::dir(NodeName::new("root"), NAMES.iter().map(|n| NodeName::new(n))),
        false,
    );
    for name in NAMES {
        base.put_prefetched(
            &NodeNamesPath::parse(name),
            NodeData::file(NodeName::new(name), 1, 0),
            false,
        );
    }
    base
}

proptest! {
    /// The union answer equals the last mutation per path, falling back to base
    #[test]
    fn union_follows_last_mutation(ops in proptest::collection::vec(op(), 0..40)) {
        let union = UnionTree::new(base_with_all(), Arc::new(InMemoryOverrideTree::new()));
        let mut model: BTreeMap<usize, Option<u64>> = BTreeMap::new();

        for op in &ops {
            match *op {
                Op::Put(i, len) => {
                    union.put(&NodeNamesPath::parse(NAMES[i]), NodeData::file(NodeName::new(NAMES[i]), len, 0)).unwrap();
                    model.insert(i, Some(len));
                }
                Op::Remove(i) => {
                    union.remove(&NodeNamesPath::parse(NAMES[i])).unwrap();
                    model.insert(i, None);
                }
                Op::Forget(i) => {
                    union.overrides().forget(&NodeNamesPath::parse(NAMES[i])).unwrap();
                    model.remove(&i);
                }
            }
        }

        for (i, name) in NAMES.iter().enumerate() {
            let got = union.get(&NodeNamesPath::parse(name)).unwrap();
            let partial = union.get_partial(&NodeNamesPath::parse(name));
            match model.get(&i) {
                Some(Some(len)) => {
                    prop_assert_eq!(got.map(|d| d.external_length), Some(*len));
                    prop_assert!(partial.is_complete_child_names);
                }
                Some(None) => {
                    prop_assert!(got.is_none());
                    prop_assert!(partial.is_absent());
                }
                None => prop_assert_eq!(got.map(|d| d.external_length), Some(1)),
            }
        }
    }
}

#[test]
fn listing_partitions_base_children_through_overrides() {
    let union = UnionTree::new(base_with_all(), Arc::new(InMemoryOverrideTree::new()));
    union.remove(&NodeNamesPath::parse("b")).unwrap();
    union
        .put(&NodeNamesPath::parse("c"), NodeData::file(NodeName::new("c"), 99, 0))
        .unwrap();

    let base_names = union.base().get(&NodeNamesPath::root()).unwrap().unwrap().child_names;
    let resolved = union
        .overrides()
        .get_override_with_child(&NodeNamesPath::root(), &base_names)
        .unwrap();
    assert_eq!(resolved.override_data, OverrideNodeData::NotOverriden);
    assert_eq!(resolved.found.len(), 2);
    assert_eq!(
        resolved.not_found,
        vec![NodeName::new("a"), NodeName::new("d")]
    );

    let children = union.list_children(&NodeNamesPath::root()).unwrap().unwrap();
    let lengths: Vec<(String, u64)> = children
        .iter()
        .map(|(p, d)| (p.to_string(), d.external_length))
        .collect();
    assert_eq!(
        lengths,
        vec![
            ("/a".to_string(), 1),
            ("/c".to_string(), 99),
            ("/d".to_string(), 1)
        ]
    );
}
