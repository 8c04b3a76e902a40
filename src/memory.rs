//! In-process implementation of every storage port.
//!
//! Mirrors the transactional behaviour of the Postgres adapters: a feature
//! writer buffers rows until `commit`, and each security mutation is applied
//! to a scratch copy that only replaces the live state when every step
//! succeeds. Ids come from shared counters and, like database sequences, are
//! not reused after a rollback.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{Result, SubmissionError};
use crate::models::{
    DatasetReviewRow, NewSubmissionFeature, NodeSecurity, PatchOutcome, PersecutionHarmException,
    PersecutionHarmRule, SecurityAssignment, SecurityCategory, SecurityRule, SecuritySnapshot,
    SecurityTarget, SubmissionFeature,
};
use crate::ports::{ExceptionStore, FeatureStore, FeatureWriter, ReviewStore, SecurityStore};

#[derive(Debug, Clone)]
struct SubmissionRecord {
    submission_id: i64,
    dataset_id: i64,
    security_review_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct State {
    next_feature_id: i64,
    next_rule_id: i64,
    next_category_id: i64,
    next_persecution_rule_id: i64,
    next_submission_id: i64,
    next_dataset_id: i64,
    features: Vec<SubmissionFeature>,
    rules: Vec<SecurityRule>,
    categories: Vec<SecurityCategory>,
    persecution_rules: Vec<PersecutionHarmRule>,
    assignments: Assignments,
    exceptions: Vec<PersecutionHarmException>,
    datasets: Vec<DatasetReviewRow>,
    submissions: Vec<SubmissionRecord>,
    fail_feature_insert_at: Option<usize>,
    fail_security_removals: bool,
}

#[derive(Debug, Default, Clone)]
struct Assignments {
    by_target: HashMap<SecurityTarget, Vec<SecurityAssignment>>,
}

impl Assignments {
    fn rows(&mut self, target: SecurityTarget) -> &mut Vec<SecurityAssignment> {
        self.by_target.entry(target).or_default()
    }

    fn apply(
        &mut self,
        target: SecurityTarget,
        node_ids: &[i64],
        rule_ids: &[i64],
    ) -> Vec<SecurityAssignment> {
        let now = Utc::now();
        let rows = self.rows(target);
        let mut created = Vec::new();

        for &node_id in node_ids {
            for &security_rule_id in rule_ids {
                let already_active = rows.iter().any(|a| {
                    a.is_active() && a.node_id == node_id && a.security_rule_id == security_rule_id
                });
                if already_active {
                    continue;
                }
                let assignment = SecurityAssignment {
                    node_id,
                    security_rule_id,
                    record_effective_date: now,
                    record_end_date: None,
                };
                rows.push(assignment.clone());
                created.push(assignment);
            }
        }
        created
    }

    fn end_date(
        &mut self,
        target: SecurityTarget,
        node_ids: &[i64],
        rule_ids: Option<&[i64]>,
    ) -> Vec<SecurityAssignment> {
        let now = Utc::now();
        let mut removed = Vec::new();

        for assignment in self.rows(target).iter_mut() {
            let selected = assignment.is_active()
                && node_ids.contains(&assignment.node_id)
                && rule_ids.map_or(true, |ids| ids.contains(&assignment.security_rule_id));
            if selected {
                assignment.record_end_date = Some(now);
                removed.push(assignment.clone());
            }
        }
        removed
    }

    fn active_rule_ids(&self, target: SecurityTarget, node_id: i64) -> Vec<i64> {
        self.by_target
            .get(&target)
            .map(|rows| {
                rows.iter()
                    .filter(|a| a.is_active() && a.node_id == node_id)
                    .map(|a| a.security_rule_id)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ── Seeding ────────────────────────────────────────────────

    pub fn add_category(&self, name: &str) -> i64 {
        let mut state = self.state();
        state.next_category_id += 1;
        let security_category_id = state.next_category_id;
        state.categories.push(SecurityCategory {
            security_category_id,
            name: name.to_string(),
            description: String::new(),
            record_effective_date: Utc::now(),
            record_end_date: None,
        });
        security_category_id
    }

    pub fn add_rule(&self, name: &str, security_category_id: i64) -> i64 {
        let mut state = self.state();
        state.next_rule_id += 1;
        let security_rule_id = state.next_rule_id;
        state.rules.push(SecurityRule {
            security_rule_id,
            name: name.to_string(),
            description: String::new(),
            security_category_id,
            record_effective_date: Utc::now(),
            record_end_date: None,
        });
        security_rule_id
    }

    pub fn end_date_rule(&self, security_rule_id: i64) {
        let mut state = self.state();
        if let Some(rule) = state
            .rules
            .iter_mut()
            .find(|r| r.security_rule_id == security_rule_id)
        {
            rule.record_end_date = Some(Utc::now());
        }
    }

    pub fn add_dataset(&self, name: &str, keywords: &[&str], related_project_ids: &[i64]) -> i64 {
        let mut state = self.state();
        state.next_dataset_id += 1;
        let dataset_id = state.next_dataset_id;
        state.datasets.push(DatasetReviewRow {
            dataset_id,
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            artifacts_to_review: 0,
            last_updated: None,
            related_project_ids: related_project_ids.to_vec(),
        });
        dataset_id
    }

    pub fn set_artifacts_to_review(
        &self,
        dataset_id: i64,
        artifacts_to_review: i64,
        last_updated: Option<DateTime<Utc>>,
    ) {
        let mut state = self.state();
        if let Some(row) = state.datasets.iter_mut().find(|d| d.dataset_id == dataset_id) {
            row.artifacts_to_review = artifacts_to_review;
            row.last_updated = last_updated;
        }
    }

    pub fn add_submission(&self, dataset_id: i64) -> i64 {
        let mut state = self.state();
        state.next_submission_id += 1;
        let submission_id = state.next_submission_id;
        state.submissions.push(SubmissionRecord {
            submission_id,
            dataset_id,
            security_review_timestamp: None,
        });
        submission_id
    }

    pub fn mark_security_reviewed(&self, submission_id: i64, at: DateTime<Utc>) {
        let mut state = self.state();
        if let Some(submission) = state
            .submissions
            .iter_mut()
            .find(|s| s.submission_id == submission_id)
        {
            submission.security_review_timestamp = Some(at);
        }
    }

    pub fn add_persecution_rule(&self, name: &str, taxonomy_id: i64) -> i64 {
        let mut state = self.state();
        state.next_persecution_rule_id += 1;
        let persecution_or_harm_id = state.next_persecution_rule_id;
        state.persecution_rules.push(PersecutionHarmRule {
            persecution_or_harm_id,
            name: name.to_string(),
            description: String::new(),
            taxonomy_id,
        });
        persecution_or_harm_id
    }

    pub fn grant_exception(&self, system_user_id: i64, persecution_or_harm_id: i64) {
        self.state().exceptions.push(PersecutionHarmException {
            persecution_or_harm_id,
            system_user_id,
            record_effective_date: Utc::now(),
            record_end_date: None,
        });
    }

    pub fn revoke_exception(&self, system_user_id: i64, persecution_or_harm_id: i64) {
        let now = Utc::now();
        for exception in self.state().exceptions.iter_mut() {
            if exception.is_active()
                && exception.system_user_id == system_user_id
                && exception.persecution_or_harm_id == persecution_or_harm_id
            {
                exception.record_end_date = Some(now);
            }
        }
    }

    // ── Failure injection ──────────────────────────────────────

    /// Make the `n`th insert (zero based) of each feature writer affect no rows.
    pub fn fail_feature_insert_at(&self, n: Option<usize>) {
        self.state().fail_feature_insert_at = n;
    }

    /// Make every rule removal fail after its changes were staged.
    pub fn fail_security_removals(&self, fail: bool) {
        self.state().fail_security_removals = fail;
    }

    /// Stage a security mutation on a copy of the assignments; it replaces the
    /// live rows only if `op` succeeds.
    fn mutate_assignments<T>(
        &self,
        op: impl FnOnce(&mut Assignments, bool) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.state();
        let mut scratch = state.assignments.clone();
        let out = op(&mut scratch, state.fail_security_removals)?;
        state.assignments = scratch;
        Ok(out)
    }
}

fn removal_failure() -> SubmissionError {
    SubmissionError::Persistence("security rule removal failed".to_string())
}

pub struct MemoryFeatureWriter {
    inner: Arc<Mutex<State>>,
    pending: Vec<SubmissionFeature>,
}

#[async_trait]
impl FeatureWriter for MemoryFeatureWriter {
    async fn insert_feature(&mut self, feature: NewSubmissionFeature) -> Result<i64> {
        let mut state = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        if state.fail_feature_insert_at == Some(self.pending.len()) {
            return Err(SubmissionError::unexpected_rows("insert submission feature", 1, 0));
        }

        state.next_feature_id += 1;
        let submission_feature_id = state.next_feature_id;
        self.pending.push(SubmissionFeature {
            submission_feature_id,
            submission_id: feature.submission_id,
            feature_type: feature.feature_type,
            source_id: feature.source_id,
            parent_submission_feature_id: feature.parent_submission_feature_id,
            data: serde_json::Value::Object(feature.data),
            create_date: Utc::now(),
        });
        Ok(submission_feature_id)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut state = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        state.features.extend(self.pending);
        Ok(())
    }
}

#[async_trait]
impl FeatureStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn FeatureWriter>> {
        Ok(Box::new(MemoryFeatureWriter {
            inner: Arc::clone(&self.inner),
            pending: Vec::new(),
        }))
    }

    async fn list_features(&self, submission_id: i64) -> Result<Vec<SubmissionFeature>> {
        Ok(self
            .state()
            .features
            .iter()
            .filter(|f| f.submission_id == submission_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SecurityStore for MemoryStore {
    async fn apply(
        &self,
        target: SecurityTarget,
        node_ids: &[i64],
        rule_ids: &[i64],
    ) -> Result<Vec<SecurityAssignment>> {
        self.mutate_assignments(|rows, _| Ok(rows.apply(target, node_ids, rule_ids)))
    }

    async fn remove_all(
        &self,
        target: SecurityTarget,
        node_ids: &[i64],
    ) -> Result<Vec<SecurityAssignment>> {
        self.mutate_assignments(|rows, fail| {
            let removed = rows.end_date(target, node_ids, None);
            if fail {
                return Err(removal_failure());
            }
            Ok(removed)
        })
    }

    async fn remove_specific(
        &self,
        target: SecurityTarget,
        node_ids: &[i64],
        rule_ids: &[i64],
    ) -> Result<Vec<SecurityAssignment>> {
        self.mutate_assignments(|rows, fail| {
            let removed = rows.end_date(target, node_ids, Some(rule_ids));
            if fail {
                return Err(removal_failure());
            }
            Ok(removed)
        })
    }

    async fn patch(
        &self,
        target: SecurityTarget,
        node_ids: &[i64],
        apply_rule_ids: &[i64],
        remove_rule_ids: &[i64],
    ) -> Result<PatchOutcome> {
        self.mutate_assignments(|rows, fail| {
            let applied = rows.apply(target, node_ids, apply_rule_ids);
            let removed = rows.end_date(target, node_ids, Some(remove_rule_ids));
            if fail && !remove_rule_ids.is_empty() {
                return Err(removal_failure());
            }
            Ok(PatchOutcome { applied, removed })
        })
    }

    async fn active_assignments(
        &self,
        target: SecurityTarget,
        node_ids: &[i64],
    ) -> Result<Vec<SecurityAssignment>> {
        let state = self.state();
        Ok(state
            .assignments
            .by_target
            .get(&target)
            .map(|rows| {
                rows.iter()
                    .filter(|a| a.is_active() && node_ids.contains(&a.node_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_rules(&self) -> Result<Vec<SecurityRule>> {
        Ok(self.state().rules.clone())
    }

    async fn list_categories(&self) -> Result<Vec<SecurityCategory>> {
        Ok(self.state().categories.clone())
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn submission_snapshot(&self, submission_id: i64) -> Result<SecuritySnapshot> {
        let state = self.state();
        let security_review_timestamp = state
            .submissions
            .iter()
            .find(|s| s.submission_id == submission_id)
            .and_then(|s| s.security_review_timestamp);

        let nodes = state
            .features
            .iter()
            .filter(|f| f.submission_id == submission_id)
            .map(|f| NodeSecurity {
                node_id: f.submission_feature_id,
                rule_ids: state
                    .assignments
                    .active_rule_ids(SecurityTarget::SubmissionFeature, f.submission_feature_id),
            })
            .collect();

        Ok(SecuritySnapshot {
            security_review_timestamp,
            nodes,
        })
    }

    async fn dataset_submission_ids(&self, dataset_id: i64) -> Result<Vec<i64>> {
        Ok(self
            .state()
            .submissions
            .iter()
            .filter(|s| s.dataset_id == dataset_id)
            .map(|s| s.submission_id)
            .collect())
    }

    async fn dataset_review_rows(&self) -> Result<Vec<DatasetReviewRow>> {
        Ok(self.state().datasets.clone())
    }
}

#[async_trait]
impl ExceptionStore for MemoryStore {
    async fn exceptions_for_user(
        &self,
        system_user_id: i64,
    ) -> Result<Vec<PersecutionHarmException>> {
        Ok(self
            .state()
            .exceptions
            .iter()
            .filter(|e| e.system_user_id == system_user_id)
            .cloned()
            .collect())
    }

    async fn rules_for_taxon(&self, taxonomy_id: i64) -> Result<Vec<PersecutionHarmRule>> {
        Ok(self
            .state()
            .persecution_rules
            .iter()
            .filter(|r| r.taxonomy_id == taxonomy_id)
            .cloned()
            .collect())
    }
}
