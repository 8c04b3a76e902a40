//! Aggregate security status and the dataset review rollup.
//!
//! Status precedence for a snapshot:
//! 1. no security review timestamp: `PENDING`
//! 2. no node carries an active rule: `UNSECURED`
//! 3. every node carries an active rule: `SECURED`
//! 4. otherwise: `PARTIALLY_SECURED`

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::Result;
use crate::models::{DatasetReviewRow, ReviewEntry, SecuritySnapshot, SecurityStatus};
use crate::ports::ReviewStore;

pub fn classify_snapshot(snapshot: &SecuritySnapshot) -> SecurityStatus {
    if snapshot.security_review_timestamp.is_none() {
        return SecurityStatus::Pending;
    }

    let secured = snapshot.nodes.iter().filter(|n| n.is_secured()).count();
    if secured == 0 {
        SecurityStatus::Unsecured
    } else if secured == snapshot.nodes.len() {
        SecurityStatus::Secured
    } else {
        SecurityStatus::PartiallySecured
    }
}

/// Merge several submission snapshots into one.
///
/// The merge is reviewed only when every part is reviewed (and there is at
/// least one part); it then carries the latest review timestamp.
pub fn merge_snapshots(parts: impl IntoIterator<Item = SecuritySnapshot>) -> SecuritySnapshot {
    let mut merged = SecuritySnapshot::default();
    let mut reviewed_at: Option<Option<DateTime<Utc>>> = None;

    for part in parts {
        reviewed_at = Some(match (reviewed_at, part.security_review_timestamp) {
            (None, ts) => ts,
            (Some(Some(a)), Some(b)) => Some(a.max(b)),
            _ => None,
        });
        merged.nodes.extend(part.nodes);
    }

    merged.security_review_timestamp = reviewed_at.flatten();
    merged
}

/// Most recent date among `dates`.
pub fn latest_date(dates: &[DateTime<Utc>]) -> Option<DateTime<Utc>> {
    dates.iter().max().copied()
}

/// Date reported for a rolled-up review entry's oldest outstanding item.
///
/// FIXME: this sorts ascending and takes the first element, so it returns the
/// earliest date. Callers have historically labelled the value "most recent";
/// switching to `latest_date` is the fix once the intended semantics are
/// confirmed.
pub fn select_rollup_date(dates: &[DateTime<Utc>]) -> Option<DateTime<Utc>> {
    let mut sorted = dates.to_vec();
    sorted.sort();
    sorted.first().copied()
}

/// Build the review listing from per-dataset rows.
///
/// Each dataset's entry sums its own outstanding count with the counts of the
/// datasets it lists as related projects (one level, no transitive closure).
/// Dates are taken only from contributors with outstanding items. Datasets
/// whose total is not positive are left out, as are datasets not matching
/// `keyword_filter` (case-insensitive, any keyword; an empty filter keeps all).
pub fn roll_up_reviews(rows: &[DatasetReviewRow], keyword_filter: &[String]) -> Vec<ReviewEntry> {
    let by_id: HashMap<i64, &DatasetReviewRow> = rows.iter().map(|r| (r.dataset_id, r)).collect();
    let filter: Vec<String> = keyword_filter.iter().map(|k| k.to_lowercase()).collect();

    let mut entries: Vec<ReviewEntry> = rows
        .iter()
        .filter(|row| matches_keywords(row, &filter))
        .filter_map(|row| {
            let related: BTreeSet<i64> = row
                .related_project_ids
                .iter()
                .copied()
                .filter(|id| *id != row.dataset_id)
                .collect();
            let contributors = std::iter::once(row)
                .chain(related.iter().filter_map(|id| by_id.get(id).copied()));

            let mut total = 0;
            let mut dates = Vec::new();
            for contributor in contributors {
                if contributor.artifacts_to_review > 0 {
                    total += contributor.artifacts_to_review;
                    dates.extend(contributor.last_updated);
                }
            }

            (total > 0).then(|| ReviewEntry {
                dataset_id: row.dataset_id,
                name: row.name.clone(),
                keywords: row.keywords.clone(),
                artifacts_to_review: total,
                last_updated: latest_date(&dates),
                oldest_outstanding: select_rollup_date(&dates),
            })
        })
        .collect();

    entries.sort_by(|a, b| {
        b.last_updated
            .cmp(&a.last_updated)
            .then(a.dataset_id.cmp(&b.dataset_id))
    });
    entries
}

fn matches_keywords(row: &DatasetReviewRow, filter: &[String]) -> bool {
    filter.is_empty()
        || row
            .keywords
            .iter()
            .any(|keyword| filter.contains(&keyword.to_lowercase()))
}

/// Read path for security status and review reporting.
#[derive(Clone)]
pub struct SecurityClassifier {
    store: Arc<dyn ReviewStore>,
}

impl SecurityClassifier {
    pub fn new(store: Arc<dyn ReviewStore>) -> Self {
        Self { store }
    }

    pub async fn classify_submission(&self, submission_id: i64) -> Result<SecurityStatus> {
        let snapshot = self.store.submission_snapshot(submission_id).await?;
        let status = classify_snapshot(&snapshot);
        debug!(submission_id, nodes = snapshot.nodes.len(), %status, "submission classified");
        Ok(status)
    }

    /// Status over every submission of a dataset. A dataset without
    /// submissions is `PENDING`.
    pub async fn classify_dataset(&self, dataset_id: i64) -> Result<SecurityStatus> {
        self.classify_group(&[dataset_id]).await
    }

    /// Status over every submission of several datasets, e.g. a dataset and
    /// its related projects.
    pub async fn classify_group(&self, dataset_ids: &[i64]) -> Result<SecurityStatus> {
        let mut parts = Vec::new();
        for dataset_id in dataset_ids {
            for submission_id in self.store.dataset_submission_ids(*dataset_id).await? {
                parts.push(self.store.submission_snapshot(submission_id).await?);
            }
        }

        let status = classify_snapshot(&merge_snapshots(parts));
        debug!(?dataset_ids, %status, "dataset group classified");
        Ok(status)
    }

    pub async fn datasets_for_review(&self, keyword_filter: &[String]) -> Result<Vec<ReviewEntry>> {
        let rows = self.store.dataset_review_rows().await?;
        Ok(roll_up_reviews(&rows, keyword_filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NodeSecurity;
    use chrono::TimeZone;

    fn node(node_id: i64, rule_ids: &[i64]) -> NodeSecurity {
        NodeSecurity {
            node_id,
            rule_ids: rule_ids.to_vec(),
        }
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 0, 0, 0).unwrap()
    }

    fn row(dataset_id: i64, count: i64, last_updated: Option<DateTime<Utc>>, related: &[i64]) -> DatasetReviewRow {
        DatasetReviewRow {
            dataset_id,
            name: format!("dataset {dataset_id}"),
            keywords: vec!["Caribou".into()],
            artifacts_to_review: count,
            last_updated,
            related_project_ids: related.to_vec(),
        }
    }

    #[test]
    fn partially_secured_then_pending_without_review() {
        let mut snapshot = SecuritySnapshot {
            security_review_timestamp: Some(day(1)),
            nodes: vec![node(1, &[5]), node(2, &[6]), node(3, &[])],
        };
        assert_eq!(classify_snapshot(&snapshot), SecurityStatus::PartiallySecured);

        snapshot.security_review_timestamp = None;
        assert_eq!(classify_snapshot(&snapshot), SecurityStatus::Pending);
    }

    #[test]
    fn secured_and_unsecured() {
        let all = SecuritySnapshot {
            security_review_timestamp: Some(day(1)),
            nodes: vec![node(1, &[5]), node(2, &[5, 6])],
        };
        assert_eq!(classify_snapshot(&all), SecurityStatus::Secured);

        let none = SecuritySnapshot {
            security_review_timestamp: Some(day(1)),
            nodes: vec![node(1, &[]), node(2, &[])],
        };
        assert_eq!(classify_snapshot(&none), SecurityStatus::Unsecured);

        let empty = SecuritySnapshot {
            security_review_timestamp: Some(day(1)),
            nodes: vec![],
        };
        assert_eq!(classify_snapshot(&empty), SecurityStatus::Unsecured);
    }

    #[test]
    fn merge_is_pending_if_any_part_is_unreviewed() {
        let reviewed = SecuritySnapshot {
            security_review_timestamp: Some(day(2)),
            nodes: vec![node(1, &[1])],
        };
        let unreviewed = SecuritySnapshot {
            security_review_timestamp: None,
            nodes: vec![node(2, &[1])],
        };

        let merged = merge_snapshots(vec![reviewed.clone(), unreviewed]);
        assert_eq!(merged.nodes.len(), 2);
        assert_eq!(classify_snapshot(&merged), SecurityStatus::Pending);

        let later = SecuritySnapshot {
            security_review_timestamp: Some(day(5)),
            nodes: vec![],
        };
        let merged = merge_snapshots(vec![reviewed, later]);
        assert_eq!(merged.security_review_timestamp, Some(day(5)));
        assert_eq!(merge_snapshots(Vec::new()).security_review_timestamp, None);
    }

    #[test]
    fn date_reducers_differ() {
        let dates = [day(9), day(3), day(6)];
        assert_eq!(latest_date(&dates), Some(day(9)));
        assert_eq!(select_rollup_date(&dates), Some(day(3)));
        assert_eq!(latest_date(&[]), None);
        assert_eq!(select_rollup_date(&[]), None);
    }

    #[test]
    fn related_project_counts_roll_up() {
        // A (1) has nothing outstanding but lists B (2) as related.
        let rows = vec![row(1, 0, Some(day(1)), &[2]), row(2, 5, Some(day(4)), &[])];

        let entries = roll_up_reviews(&rows, &[]);
        assert_eq!(entries.len(), 2);

        let a = entries.iter().find(|e| e.dataset_id == 1).unwrap();
        assert_eq!(a.artifacts_to_review, 5);
        assert_eq!(a.last_updated, Some(day(4)));
        assert_eq!(a.oldest_outstanding, Some(day(4)));
    }

    #[test]
    fn zero_totals_are_excluded() {
        let rows = vec![row(1, 0, Some(day(1)), &[2]), row(2, 0, Some(day(2)), &[])];
        assert!(roll_up_reviews(&rows, &[]).is_empty());
    }

    #[test]
    fn rollup_sums_and_reduces_dates() {
        let rows = vec![
            row(1, 2, Some(day(3)), &[2, 3, 1]),
            row(2, 4, Some(day(8)), &[]),
            row(3, 1, Some(day(5)), &[]),
        ];
        let entries = roll_up_reviews(&rows, &[]);
        let parent = entries.iter().find(|e| e.dataset_id == 1).unwrap();
        assert_eq!(parent.artifacts_to_review, 7);
        assert_eq!(parent.last_updated, Some(day(8)));
        assert_eq!(parent.oldest_outstanding, Some(day(3)));

        let order: Vec<i64> = entries.iter().map(|e| e.dataset_id).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn keyword_filter_is_case_insensitive() {
        let mut moose = row(2, 3, Some(day(1)), &[]);
        moose.keywords = vec!["moose".into()];
        let rows = vec![row(1, 1, Some(day(1)), &[]), moose];

        let entries = roll_up_reviews(&rows, &["MOOSE".to_string()]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].dataset_id, 2);
    }
}
