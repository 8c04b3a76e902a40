//! Flattening nested submission payloads into parent-linked feature rows.
//!
//! Nodes are addressed by their child index path from the root (`[]` is the
//! root, `[1, 0]` the first child of the root's second child). The plan lists
//! nodes depth-first with every parent before its children, so inserting in
//! plan order can always resolve a node's parent id from the path map filled
//! by earlier inserts. The walk uses an explicit stack; payload depth is not
//! bounded by recursion.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::error::{IntegrityViolation, Result};
use crate::models::{FeatureNodeInput, InsertedFeature, NewSubmissionFeature};
use crate::ports::FeatureWriter;

/// One node of the insertion plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedFeature<'a> {
    pub path: Vec<usize>,
    pub parent_path: Option<Vec<usize>>,
    pub node: &'a FeatureNodeInput,
}

/// Parent-before-child insertion order for every node of the tree.
///
/// Fails when two nodes share a caller-supplied id.
pub fn plan_tree(
    root: &FeatureNodeInput,
) -> std::result::Result<Vec<PlannedFeature<'_>>, IntegrityViolation> {
    let mut plan = Vec::new();
    let mut seen_ids = HashSet::new();
    let mut stack = vec![(Vec::new(), root)];

    while let Some((path, node)) = stack.pop() {
        if !seen_ids.insert(node.id.as_str()) {
            return Err(IntegrityViolation::DuplicateFeatureId {
                feature_id: node.id.clone(),
            });
        }

        for (index, child) in node.child_features.iter().enumerate().rev() {
            let mut child_path: Vec<usize> = path.clone();
            child_path.push(index);
            stack.push((child_path, child));
        }

        let parent_path = parent_of(&path);
        plan.push(PlannedFeature {
            path,
            parent_path,
            node,
        });
    }

    Ok(plan)
}

fn parent_of(path: &[usize]) -> Option<Vec<usize>> {
    path.split_last().map(|(_, parent)| parent.to_vec())
}

/// Insert every node of `root` through `writer`, returning the caller id to
/// persisted id mapping in insertion order.
pub async fn insert_tree(
    writer: &mut dyn FeatureWriter,
    submission_id: i64,
    root: &FeatureNodeInput,
) -> Result<Vec<InsertedFeature>> {
    let plan = plan_tree(root)?;
    insert_planned(writer, submission_id, &plan).await
}

/// Insert an already planned sequence. A planned node whose parent path has
/// not been inserted earlier in the sequence is an integrity violation.
pub async fn insert_planned(
    writer: &mut dyn FeatureWriter,
    submission_id: i64,
    plan: &[PlannedFeature<'_>],
) -> Result<Vec<InsertedFeature>> {
    let mut persisted: HashMap<&[usize], i64> = HashMap::with_capacity(plan.len());
    let mut inserted = Vec::with_capacity(plan.len());

    for planned in plan {
        let parent_id = match &planned.parent_path {
            None => None,
            Some(parent_path) => Some(*persisted.get(parent_path.as_slice()).ok_or_else(|| {
                IntegrityViolation::UnresolvedParent {
                    feature_id: planned.node.id.clone(),
                    parent_path: parent_path.clone(),
                }
            })?),
        };

        let id = writer
            .insert_feature(NewSubmissionFeature {
                submission_id,
                feature_type: planned.node.feature_type.clone(),
                source_id: planned.node.id.clone(),
                parent_submission_feature_id: parent_id,
                data: planned.node.properties.clone(),
            })
            .await?;

        persisted.insert(planned.path.as_slice(), id);
        inserted.push(InsertedFeature {
            source_id: planned.node.id.clone(),
            submission_feature_id: id,
            parent_submission_feature_id: parent_id,
        });
    }

    debug!(submission_id, count = inserted.len(), "feature tree inserted");
    Ok(inserted)
}
