//! Security rule assignment, status classification and the review rollup,
//! driven through `SubmissionCore` on the in-memory stores.

mod helpers;

use chrono::{TimeZone, Utc};

use helpers::{harness, valid_submission};
use submission_core::ports::SecurityStore;
use submission_core::{SecurityStatus, SecurityTarget, SubmissionError};

const FEATURE: SecurityTarget = SecurityTarget::SubmissionFeature;

#[tokio::test]
async fn apply_then_remove_round_trip() {
    let h = harness();
    let category = h.store.add_category("Sensitive species");
    let nesting = h.store.add_rule("Nesting sites", category);
    let dataset = h.store.add_dataset("Raptors", &["raptor"], &[]);
    let submission = h.store.add_submission(dataset);

    let report = h.core.intake.ingest(submission, &valid_submission()).await.unwrap();
    let node_ids: Vec<i64> = report.inserted.iter().map(|f| f.submission_feature_id).collect();
    h.store.mark_security_reviewed(submission, Utc::now());

    let applied = h
        .core
        .security
        .apply_rules(FEATURE, &node_ids, &[nesting])
        .await
        .unwrap();
    assert_eq!(applied.len(), 4);
    assert_eq!(
        h.core.classifier.classify_submission(submission).await.unwrap(),
        SecurityStatus::Secured
    );

    let removed = h
        .core
        .security
        .remove_rules(FEATURE, &node_ids[..1], Some(&[nesting][..]))
        .await
        .unwrap();
    assert_eq!(removed.len(), 1);
    assert!(removed[0].record_end_date.is_some());
    assert_eq!(
        h.core.classifier.classify_submission(submission).await.unwrap(),
        SecurityStatus::PartiallySecured
    );

    let removed = h.core.security.remove_rules(FEATURE, &node_ids, None).await.unwrap();
    assert_eq!(removed.len(), 3);
    assert!(h
        .core
        .security
        .active_assignments(FEATURE, &node_ids)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        h.core.classifier.classify_submission(submission).await.unwrap(),
        SecurityStatus::Unsecured
    );
}

#[tokio::test]
async fn three_nodes_two_secured_is_partially_secured() {
    let h = harness();
    let rule = h.store.add_rule("Persecution", 1);
    let dataset = h.store.add_dataset("Wolves", &[], &[]);
    let submission = h.store.add_submission(dataset);

    let root = valid_submission();
    let site = root.child_features[0].clone();
    let report = h.core.intake.ingest(submission, &site).await.unwrap();
    assert_eq!(report.inserted.len(), 3);

    let ids: Vec<i64> = report.inserted.iter().map(|f| f.submission_feature_id).collect();
    h.core.security.apply_rules(FEATURE, &ids[..2], &[rule]).await.unwrap();

    assert_eq!(
        h.core.classifier.classify_submission(submission).await.unwrap(),
        SecurityStatus::Pending,
        "unreviewed submissions are pending regardless of rules"
    );

    h.store.mark_security_reviewed(submission, Utc::now());
    assert_eq!(
        h.core.classifier.classify_submission(submission).await.unwrap(),
        SecurityStatus::PartiallySecured
    );
}

#[tokio::test]
async fn patch_is_all_or_nothing() {
    let h = harness();
    let keep = h.store.add_rule("Keep", 1);
    let add = h.store.add_rule("Add", 1);

    h.core.security.apply_rules(FEATURE, &[10, 11], &[keep]).await.unwrap();
    h.store.fail_security_removals(true);

    let err = h
        .core
        .security
        .patch_rules(FEATURE, &[10, 11], &[add], &[keep])
        .await
        .unwrap_err();
    assert!(matches!(err, SubmissionError::Persistence(_)));

    let active = h.store.active_assignments(FEATURE, &[10, 11]).await.unwrap();
    assert_eq!(active.len(), 2);
    assert!(active.iter().all(|a| a.security_rule_id == keep));

    h.store.fail_security_removals(false);
    let outcome = h
        .core
        .security
        .patch_rules(FEATURE, &[10, 11], &[add], &[keep])
        .await
        .unwrap();
    assert_eq!(outcome.applied.len(), 2);
    assert_eq!(outcome.removed.len(), 2);

    let active = h.store.active_assignments(FEATURE, &[10, 11]).await.unwrap();
    assert!(active.iter().all(|a| a.security_rule_id == add));
}

#[tokio::test]
async fn artifacts_and_features_are_tracked_separately() {
    let h = harness();
    let rule = h.store.add_rule("Location", 1);

    h.core
        .security
        .apply_rules(SecurityTarget::Artifact, &[1], &[rule])
        .await
        .unwrap();

    assert_eq!(
        h.core
            .security
            .active_assignments(SecurityTarget::Artifact, &[1])
            .await
            .unwrap()
            .len(),
        1
    );
    assert!(h
        .core
        .security
        .active_assignments(FEATURE, &[1])
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn dataset_status_spans_every_submission() {
    let h = harness();
    let rule = h.store.add_rule("Nesting", 1);
    let dataset = h.store.add_dataset("Owls", &[], &[]);

    assert_eq!(
        h.core.classifier.classify_dataset(dataset).await.unwrap(),
        SecurityStatus::Pending
    );

    let first = h.store.add_submission(dataset);
    let second = h.store.add_submission(dataset);
    let a = h.core.intake.ingest(first, &valid_submission()).await.unwrap();
    h.core.intake.ingest(second, &valid_submission()).await.unwrap();

    let secured: Vec<i64> = a.inserted.iter().map(|f| f.submission_feature_id).collect();
    h.core.security.apply_rules(FEATURE, &secured, &[rule]).await.unwrap();

    h.store.mark_security_reviewed(first, Utc::now());
    assert_eq!(
        h.core.classifier.classify_dataset(dataset).await.unwrap(),
        SecurityStatus::Pending
    );

    h.store.mark_security_reviewed(second, Utc::now());
    assert_eq!(
        h.core.classifier.classify_dataset(dataset).await.unwrap(),
        SecurityStatus::PartiallySecured
    );
}

#[tokio::test]
async fn related_project_counts_roll_up() {
    let h = harness();
    let b_updated = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

    let b = h.store.add_dataset("Project B", &["Caribou"], &[]);
    let a = h.store.add_dataset("Project A", &["Caribou"], &[b]);
    h.store.set_artifacts_to_review(b, 5, Some(b_updated));
    h.store.set_artifacts_to_review(a, 0, None);

    let entries = h.core.classifier.datasets_for_review(&[]).await.unwrap();
    let entry_a = entries.iter().find(|e| e.dataset_id == a).unwrap();
    assert_eq!(entry_a.artifacts_to_review, 5);
    assert_eq!(entry_a.last_updated, Some(b_updated));
    assert_eq!(entry_a.oldest_outstanding, Some(b_updated));

    let filtered = h
        .core
        .classifier
        .datasets_for_review(&["moose".to_string()])
        .await
        .unwrap();
    assert!(filtered.is_empty());

    let filtered = h
        .core
        .classifier
        .datasets_for_review(&["CARIBOU".to_string()])
        .await
        .unwrap();
    assert_eq!(filtered.len(), 2);
}

#[tokio::test]
async fn active_rule_listing_skips_end_dated_rules() {
    let h = harness();
    let category = h.store.add_category("Harm");
    let live = h.store.add_rule("Live", category);
    let retired = h.store.add_rule("Retired", category);
    h.store.end_date_rule(retired);

    let rules = h.core.security.active_rules().await.unwrap();
    assert_eq!(rules.iter().map(|r| r.security_rule_id).collect::<Vec<_>>(), vec![live]);

    let categories = h.core.security.active_categories().await.unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].security_category_id, category);
}
