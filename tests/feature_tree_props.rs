//! Property tests for feature tree insertion.

use std::collections::HashMap;

use proptest::prelude::*;

use submission_core::feature_tree::plan_tree;
use submission_core::memory::MemoryStore;
use submission_core::ports::FeatureStore;
use submission_core::SubmissionIntakeService;
use submission_core::FeatureNodeInput;

/// Builds a tree from a parent index list: node `i + 1` hangs off node
/// `parents[i] % (i + 1)`, so every generated shape is a valid tree.
fn build_tree(parents: &[usize]) -> FeatureNodeInput {
    let count = parents.len() + 1;
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
    for (i, p) in parents.iter().enumerate() {
        children[p % (i + 1)].push(i + 1);
    }

    // Children always have a larger index than their parent, so building in
    // reverse index order sees every child finished first.
    let mut built: Vec<Option<FeatureNodeInput>> = (0..count).map(|_| None).collect();
    for index in (0..count).rev() {
        let mut node = FeatureNodeInput::new(format!("n{index}"), "observation");
        for child in &children[index] {
            if let Some(child_node) = built[*child].take() {
                node = node.with_child(child_node);
            }
        }
        built[index] = Some(node);
    }
    built[0].take().unwrap()
}

fn expected_parents(parents: &[usize]) -> HashMap<String, Option<String>> {
    let mut expected = HashMap::new();
    expected.insert("n0".to_string(), None);
    for (i, p) in parents.iter().enumerate() {
        expected.insert(format!("n{}", i + 1), Some(format!("n{}", p % (i + 1))));
    }
    expected
}

fn intake(store: &MemoryStore) -> SubmissionIntakeService {
    use std::sync::Arc;
    use submission_core::catalog::FileSchemaCatalog;
    use submission_core::ports::LoggingIndexer;
    use submission_core::schema_cache::SchemaCache;
    use submission_core::validation::ValidationEngine;

    let engine = ValidationEngine::new(Arc::new(SchemaCache::new(Arc::new(
        FileSchemaCatalog::default(),
    ))));
    SubmissionIntakeService::new(engine, Arc::new(store.clone()), Arc::new(LoggingIndexer), false)
}

/// Parent index lists where most nodes hang off the node just before them,
/// so long skinny chains show up alongside bushy shapes.
fn tree_shapes() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(
        prop_oneof![3 => Just(None), 1 => (0usize..64).prop_map(Some)],
        0..120,
    )
    .prop_map(|picks| {
        picks
            .into_iter()
            .enumerate()
            .map(|(i, pick)| pick.unwrap_or(i))
            .collect::<Vec<usize>>()
    })
}

fn chain_json(depth: usize) -> String {
    let mut json = String::new();
    for i in 0..depth {
        json.push_str(&format!(r#"{{"id":"n{i}","type":"observation","child_features":["#));
    }
    json.push_str(&format!(r#"{{"id":"n{depth}","type":"observation"}}"#));
    for _ in 0..depth {
        json.push_str("]}");
    }
    json
}

#[tokio::test]
async fn deep_chain_from_json_is_fully_inserted() {
    let depth = 1200;
    let root = FeatureNodeInput::from_json_str(&chain_json(depth)).unwrap();

    let store = MemoryStore::new();
    let report = intake(&store).ingest(1, &root).await.unwrap();
    assert_eq!(report.inserted.len(), depth + 1);

    let stored = store.list_features(1).await.unwrap();
    assert_eq!(stored.len(), depth + 1);
    assert_eq!(stored[0].source_id, "n0");
    assert_eq!(stored[0].parent_submission_feature_id, None);
    for pair in stored.windows(2) {
        assert_eq!(pair[1].source_id, format!("n{}", source_index(&pair[0].source_id) + 1));
        assert_eq!(
            pair[1].parent_submission_feature_id,
            Some(pair[0].submission_feature_id)
        );
    }
}

fn source_index(source_id: &str) -> usize {
    source_id.trim_start_matches('n').parse().unwrap()
}

proptest! {
    #[test]
    fn plan_puts_parents_first(parents in tree_shapes()) {
        let root = build_tree(&parents);
        let plan = plan_tree(&root).unwrap();
        prop_assert_eq!(plan.len(), parents.len() + 1);

        let mut seen = std::collections::HashSet::new();
        for planned in &plan {
            if let Some(parent_path) = &planned.parent_path {
                prop_assert!(seen.contains(parent_path));
            }
            seen.insert(planned.path.clone());
        }
    }

    #[test]
    fn insertion_persists_every_node_under_its_parent(parents in tree_shapes()) {
        let root = build_tree(&parents);
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let store = MemoryStore::new();
        let service = intake(&store);
        let stored = runtime.block_on(async {
            service.ingest(1, &root).await.unwrap();
            store.list_features(1).await.unwrap()
        });
        prop_assert_eq!(stored.len(), parents.len() + 1);

        let source_of: HashMap<i64, String> = stored
            .iter()
            .map(|f| (f.submission_feature_id, f.source_id.clone()))
            .collect();
        let expected = expected_parents(&parents);
        for feature in &stored {
            let parent_source = feature
                .parent_submission_feature_id
                .map(|id| source_of[&id].clone());
            prop_assert_eq!(&parent_source, &expected[&feature.source_id]);
        }
    }
}
